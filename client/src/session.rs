//! Session lifecycle and the local mirror of room state
//!
//! [`SessionManager`] owns the one connection to the room server, the local
//! player's [`SessionIdentity`] and the reconciled [`Presence`]. Scenes borrow
//! it; nothing else writes to identity or presence.
//!
//! Lifecycle operations (`connect`, `join_or_create`) return a [`SessionError`]
//! and never leave a half-built session behind. Intents are optimistic and
//! non-durable: they report a [`Dispatch`] and the next snapshot is the only
//! confirmation the client ever gets.

use crate::config::SessionConfig;
use crate::error::{SessionError, TransportError};
use crate::presence::{Presence, PresenceEvent};
use crate::readiness;
use crate::transport::{Connector, Room, RoomEvent, Transport};
use log::{debug, error, info, warn};
use rand::seq::SliceRandom;
use shared::{
    Character, Difficulty, GamePhase, Intent, JoinOptions, RoomSnapshot, ServerMessage,
    SpecialKind,
};
use tokio::time::timeout;

/// Close code reported when the event channel vanishes without a leave notice.
pub const ABNORMAL_CLOSE: u16 = 1006;

const PLAYER_COLORS: [&str; 7] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FECA57", "#FF9FF3", "#54A0FF",
];

/// The local player, as known to this client.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionIdentity {
    /// Session id assigned by the server on join
    pub id: String,
    pub name: String,
    pub color: String,
    pub is_ready: bool,
    pub character: Option<Character>,
}

#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub name: String,
    pub character: Option<Character>,
    pub difficulty: Difficulty,
    /// Leave the current session first instead of failing
    pub replace: bool,
}

impl JoinRequest {
    pub fn new(name: impl Into<String>, character: Option<Character>) -> Self {
        Self {
            name: name.into(),
            character,
            difficulty: Difficulty::default(),
            replace: false,
        }
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn replacing(mut self) -> Self {
        self.replace = true;
        self
    }
}

/// Outcome of handing an intent to the transport.
///
/// `Sent` only means the bytes left this client. It never means the server
/// applied the intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Sent,
    Dropped,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A snapshot was reconciled into presence.
    State {
        phase: GamePhase,
        changes: Vec<PresenceEvent>,
    },
    Message(ServerMessage),
    /// The session is gone; identity and presence are already cleared.
    Disconnected(u16),
}

pub struct SessionManager {
    connector: Box<dyn Connector>,
    config: SessionConfig,
    transport: Option<Box<dyn Transport>>,
    room: Option<Box<dyn Room>>,
    identity: Option<SessionIdentity>,
    presence: Presence,
    phase: GamePhase,
}

impl SessionManager {
    pub fn new(connector: Box<dyn Connector>, config: SessionConfig) -> Self {
        Self {
            connector,
            config,
            transport: None,
            room: None,
            identity: None,
            presence: Presence::new(),
            phase: GamePhase::default(),
        }
    }

    /// Establishes the transport handle. Safe to retry after a failure.
    pub async fn connect(&mut self) -> Result<(), SessionError> {
        if self.transport.is_some() {
            debug!("Already connected to {}", self.config.endpoint);
            return Ok(());
        }

        let endpoint = self.config.endpoint.clone();
        info!("Connecting to {}...", endpoint);

        let result = match timeout(self.config.connect_timeout, self.connector.connect(&endpoint))
            .await
        {
            Ok(Ok(transport)) => Ok(transport),
            Ok(Err(e)) => Err(SessionError::ConnectionFailure(e.to_string())),
            Err(_) => Err(SessionError::connect_timeout(self.config.connect_timeout)),
        };

        match result {
            Ok(transport) => {
                info!("Connected to {}", endpoint);
                self.transport = Some(transport);
                Ok(())
            }
            Err(e) => {
                error!("Failed to connect to server: {}", e);
                Err(e)
            }
        }
    }

    /// Joins the configured room. Requires a prior successful [`connect`](Self::connect).
    pub async fn join_or_create(&mut self, request: JoinRequest) -> Result<(), SessionError> {
        if self.transport.is_none() {
            let e = SessionError::PreconditionViolation("join requires a successful connect");
            error!("Failed to join room: {}", e);
            return Err(e);
        }

        if self.room.is_some() {
            if !request.replace {
                let e = SessionError::PreconditionViolation("already joined a session");
                error!("Failed to join room: {}", e);
                return Err(e);
            }
            info!("Replacing current session");
            self.leave().await;
        }

        let options = JoinOptions {
            name: request.name.clone(),
            difficulty: request.difficulty,
            character: request.character.clone(),
        };
        let room_name = self.config.room_name.clone();
        let join_timeout = self.config.join_timeout;

        let transport = self
            .transport
            .as_mut()
            .ok_or(SessionError::PreconditionViolation("join requires a successful connect"))?;

        let room = match timeout(join_timeout, transport.join_or_create(&room_name, options)).await
        {
            Ok(Ok(room)) => room,
            Ok(Err(TransportError::Rejected(reason))) => {
                let e = SessionError::JoinRejected(reason);
                error!("Failed to join room: {}", e);
                return Err(e);
            }
            Ok(Err(other)) => {
                let e = SessionError::JoinRejected(other.to_string());
                error!("Failed to join room: {}", e);
                return Err(e);
            }
            Err(_) => {
                let e = SessionError::join_timeout(join_timeout);
                error!("Failed to join room: {}", e);
                return Err(e);
            }
        };

        let color = PLAYER_COLORS
            .choose(&mut rand::thread_rng())
            .unwrap_or(&PLAYER_COLORS[0])
            .to_string();

        info!(
            "Joined '{}' as {} (session {})",
            room_name,
            request.name,
            room.session_id()
        );

        self.identity = Some(SessionIdentity {
            id: room.session_id().to_string(),
            name: request.name,
            color,
            is_ready: false,
            character: request.character,
        });
        self.presence.clear();
        self.phase = GamePhase::default();
        self.room = Some(room);

        Ok(())
    }

    /// Leaves the room. Local state is cleared even if the request never
    /// reaches the server.
    pub async fn leave(&mut self) {
        if let Some(mut room) = self.room.take() {
            match timeout(self.config.leave_timeout, room.leave()).await {
                Ok(Ok(())) => info!("Left room"),
                Ok(Err(e)) => warn!("Leave request failed: {}", e),
                Err(_) => warn!("Leave request timed out"),
            }
        }
        self.identity = None;
        self.presence.clear();
        self.phase = GamePhase::default();
    }

    /// Leaves the room and drops the transport handle.
    pub async fn disconnect(&mut self) {
        self.leave().await;
        if self.transport.take().is_some() {
            info!("Disconnected from {}", self.config.endpoint);
        }
    }

    pub fn set_ready(&mut self, is_ready: bool) -> Dispatch {
        if self.room.is_none() {
            debug!("Ignoring ready toggle: no active session");
            return Dispatch::Dropped;
        }
        let Some(identity) = self.identity.as_mut() else {
            debug!("Ignoring ready toggle: no active session");
            return Dispatch::Dropped;
        };
        identity.is_ready = is_ready;
        self.send_intent(Intent::PlayerReady { is_ready })
    }

    pub fn request_start(&mut self) -> Dispatch {
        self.send_intent(Intent::StartGame)
    }

    pub fn send_answer(&mut self, answer: i64) -> Dispatch {
        self.send_intent(Intent::Answer { answer })
    }

    pub fn use_special(&mut self, kind: SpecialKind, target_id: Option<&str>) -> Dispatch {
        self.send_intent(Intent::UseSpecial {
            kind,
            target_id: target_id.map(str::to_string),
        })
    }

    fn send_intent(&mut self, intent: Intent) -> Dispatch {
        let Some(room) = self.room.as_mut() else {
            debug!("Dropping '{}' intent: no active session", intent.kind());
            return Dispatch::Dropped;
        };

        match room.send(&intent) {
            Ok(()) => {
                debug!("Sent '{}' intent", intent.kind());
                Dispatch::Sent
            }
            Err(e) => {
                warn!("Dropped '{}' intent: {}", intent.kind(), e);
                Dispatch::Dropped
            }
        }
    }

    /// Waits for the next room event and applies it.
    ///
    /// Returns `None` when there is no session to listen to.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let event = self.room.as_mut()?.recv().await;
        Some(match event {
            Some(event) => self.apply(event),
            None => self.apply(RoomEvent::Left(ABNORMAL_CLOSE)),
        })
    }

    /// Applies every event already buffered, without waiting.
    pub fn poll_events(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.room.as_mut().and_then(|room| room.try_recv()) {
            events.push(self.apply(event));
        }
        events
    }

    fn apply(&mut self, event: RoomEvent) -> SessionEvent {
        match event {
            RoomEvent::State(snapshot) => self.apply_snapshot(&snapshot),
            RoomEvent::Message(message) => {
                debug!("Received '{}' message", message.kind());
                SessionEvent::Message(message)
            }
            RoomEvent::Left(code) => {
                info!("Left room with code: {}", code);
                self.room = None;
                self.identity = None;
                self.presence.clear();
                self.phase = GamePhase::default();
                SessionEvent::Disconnected(code)
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: &RoomSnapshot) -> SessionEvent {
        self.phase = snapshot.game_phase;
        let changes = self.presence.reconcile(snapshot);

        if let Some(identity) = self.identity.as_mut() {
            if let Some(entry) = self.presence.get(&identity.id) {
                identity.is_ready = entry.record.is_ready;
            }
        }

        SessionEvent::State {
            phase: self.phase,
            changes,
        }
    }

    pub fn set_player_name(&mut self, name: &str) {
        if name.is_empty() {
            return;
        }
        if let Some(identity) = self.identity.as_mut() {
            identity.name = name.to_string();
        }
    }

    /// True iff both a transport handle and a joined session are held.
    pub fn is_connected(&self) -> bool {
        self.transport.is_some() && self.room.is_some()
    }

    pub fn can_start_game(&self) -> bool {
        readiness::can_start(&self.presence)
    }

    pub fn identity(&self) -> Option<&SessionIdentity> {
        self.identity.as_ref()
    }

    pub fn my_player_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|identity| identity.id.as_str())
    }

    pub fn presence(&self) -> &Presence {
        &self.presence
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryServer;
    use shared::{roster, PlayerRecord};
    use std::time::Duration;

    fn manager(server: &MemoryServer) -> SessionManager {
        SessionManager::new(Box::new(server.clone()), SessionConfig::default())
    }

    fn player(id: &str, ready: bool) -> PlayerRecord {
        let mut record = PlayerRecord::new(id, id);
        record.is_ready = ready;
        record
    }

    async fn joined(server: &MemoryServer, id: &str) -> SessionManager {
        server.assign_session_id(id);
        let mut session = manager(server);
        session.connect().await.unwrap();
        session
            .join_or_create(JoinRequest::new("Ava", None))
            .await
            .unwrap();
        session
    }

    #[tokio::test]
    async fn test_connect_failure_is_recoverable() {
        let server = MemoryServer::new();
        server.refuse_connections(true);
        let mut session = manager(&server);

        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, SessionError::ConnectionFailure(_)));
        assert!(!session.is_connected());

        server.refuse_connections(false);
        assert!(session.connect().await.is_ok());
        assert_eq!(server.connects(), 1);
    }

    #[tokio::test]
    async fn test_connect_timeout_is_connection_failure() {
        let server = MemoryServer::new();
        server.hang_connections(true);
        let config = SessionConfig::default().with_connect_timeout(Duration::from_millis(20));
        let mut session = SessionManager::new(Box::new(server.clone()), config);

        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, SessionError::ConnectionFailure(_)));
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_join_without_connect_is_precondition_violation() {
        let server = MemoryServer::new();
        let mut session = manager(&server);

        let err = session
            .join_or_create(JoinRequest::new("Ava", None))
            .await
            .unwrap_err();

        assert!(err.is_precondition_violation());
        assert!(session.identity().is_none());
        assert!(server.joins().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_join_leaves_no_identity() {
        let server = MemoryServer::new();
        server.reject_joins(Some("room full"));
        let mut session = manager(&server);
        session.connect().await.unwrap();

        let err = session
            .join_or_create(JoinRequest::new("Ava", None))
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::JoinRejected(ref r) if r == "room full"));
        assert!(session.identity().is_none());
        assert!(!session.is_connected());

        server.reject_joins(None);
        assert!(session
            .join_or_create(JoinRequest::new("Ava", None))
            .await
            .is_ok());
        assert!(session.is_connected());
    }

    #[tokio::test]
    async fn test_join_populates_identity() {
        let server = MemoryServer::new();
        server.assign_session_id("p1");
        let mut session = manager(&server);
        session.connect().await.unwrap();

        let character = roster().into_iter().next();
        session
            .join_or_create(
                JoinRequest::new("Ava", character.clone()).with_difficulty(Difficulty::Hard),
            )
            .await
            .unwrap();

        let identity = session.identity().unwrap();
        assert_eq!(identity.id, "p1");
        assert_eq!(identity.name, "Ava");
        assert!(!identity.is_ready);
        assert_eq!(identity.character, character);
        assert!(PLAYER_COLORS.contains(&identity.color.as_str()));
        assert_eq!(session.my_player_id(), Some("p1"));

        let joins = server.joins();
        assert_eq!(joins[0].0, "game_room");
        assert_eq!(joins[0].1.difficulty, Difficulty::Hard);
        assert_eq!(joins[0].1.character, character);
    }

    #[tokio::test]
    async fn test_second_join_requires_replace() {
        let server = MemoryServer::new();
        let mut session = joined(&server, "p1").await;

        let err = session
            .join_or_create(JoinRequest::new("Ava", None))
            .await
            .unwrap_err();
        assert!(err.is_precondition_violation());
        assert_eq!(session.my_player_id(), Some("p1"));

        server.assign_session_id("p7");
        session
            .join_or_create(JoinRequest::new("Ava", None).replacing())
            .await
            .unwrap();
        assert_eq!(session.my_player_id(), Some("p7"));
        assert_eq!(server.leave_requests(), 1);
    }

    #[tokio::test]
    async fn test_intents_without_session_are_dropped() {
        let server = MemoryServer::new();
        let mut session = manager(&server);
        session.connect().await.unwrap();

        assert_eq!(session.set_ready(true), Dispatch::Dropped);
        assert_eq!(session.request_start(), Dispatch::Dropped);
        assert_eq!(session.send_answer(4), Dispatch::Dropped);
        assert!(server.sent_intents().is_empty());
    }

    #[tokio::test]
    async fn test_intents_are_sent_in_order() {
        let server = MemoryServer::new();
        let mut session = joined(&server, "p1").await;

        assert_eq!(session.set_ready(true), Dispatch::Sent);
        assert!(session.identity().unwrap().is_ready);
        assert_eq!(session.request_start(), Dispatch::Sent);
        assert_eq!(session.send_answer(42), Dispatch::Sent);
        assert_eq!(
            session.use_special(SpecialKind::Attack, Some("p2")),
            Dispatch::Sent
        );

        assert_eq!(
            server.sent_intents(),
            vec![
                Intent::PlayerReady { is_ready: true },
                Intent::StartGame,
                Intent::Answer { answer: 42 },
                Intent::UseSpecial {
                    kind: SpecialKind::Attack,
                    target_id: Some("p2".to_string())
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_send_is_dropped_silently() {
        let server = MemoryServer::new();
        let mut session = joined(&server, "p1").await;
        server.fail_sends(true);

        assert_eq!(session.send_answer(3), Dispatch::Dropped);
        assert!(session.is_connected());
    }

    #[tokio::test]
    async fn test_leave_clears_state_even_when_request_fails() {
        let server = MemoryServer::new();
        let mut session = joined(&server, "p1").await;
        server.push_state(
            RoomSnapshot::new()
                .with_player(player("p1", true))
                .with_player(player("p2", true)),
        );
        session.poll_events();
        assert_eq!(session.presence().len(), 2);

        server.fail_leave(true);
        server.fail_sends(true);
        session.leave().await;

        assert!(session.identity().is_none());
        assert!(session.presence().is_empty());
        assert!(!session.is_connected());
        assert_eq!(server.leave_requests(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_is_authoritative_for_ready_flag() {
        let server = MemoryServer::new();
        let mut session = joined(&server, "p1").await;

        session.set_ready(true);
        server.push_state(RoomSnapshot::new().with_player(player("p1", false)));
        session.poll_events();

        assert!(!session.identity().unwrap().is_ready);
    }

    #[tokio::test]
    async fn test_server_leave_clears_session() {
        let server = MemoryServer::new();
        let mut session = joined(&server, "p1").await;
        server.push_state(RoomSnapshot::new().with_player(player("p1", false)));
        server.push_leave(4000);

        let events = session.poll_events();
        assert_eq!(events.last(), Some(&SessionEvent::Disconnected(4000)));
        assert!(session.identity().is_none());
        assert!(session.presence().is_empty());
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_lost_channel_is_polled_as_abnormal_close() {
        let server = MemoryServer::new();
        let mut session = joined(&server, "p1").await;
        server.push_state(RoomSnapshot::new().with_player(player("p1", false)));
        server.drop_connection();

        let events = session.poll_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], SessionEvent::Disconnected(ABNORMAL_CLOSE));
        assert!(session.identity().is_none());
        assert!(session.presence().is_empty());
        assert!(session.poll_events().is_empty());
    }

    #[tokio::test]
    async fn test_next_event_reconciles_and_forwards_messages() {
        let server = MemoryServer::new();
        let mut session = joined(&server, "p1").await;
        server.push_state(
            RoomSnapshot::new()
                .with_player(player("p1", false))
                .with_phase(GamePhase::Racing),
        );
        server.push_message(ServerMessage::GameStarted);

        match session.next_event().await {
            Some(SessionEvent::State { phase, changes }) => {
                assert_eq!(phase, GamePhase::Racing);
                assert_eq!(changes.len(), 1);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(session.phase(), GamePhase::Racing);
        assert_eq!(
            session.next_event().await,
            Some(SessionEvent::Message(ServerMessage::GameStarted))
        );
    }

    #[tokio::test]
    async fn test_set_player_name_ignores_empty() {
        let server = MemoryServer::new();
        let mut session = joined(&server, "p1").await;

        session.set_player_name("");
        assert_eq!(session.identity().unwrap().name, "Ava");
        session.set_player_name("Bea");
        assert_eq!(session.identity().unwrap().name, "Bea");
    }

    #[tokio::test]
    async fn test_disconnect_drops_transport() {
        let server = MemoryServer::new();
        let mut session = joined(&server, "p1").await;

        session.disconnect().await;
        assert!(!session.is_connected());
        let err = session
            .join_or_create(JoinRequest::new("Ava", None))
            .await
            .unwrap_err();
        assert!(err.is_precondition_violation());
    }
}
