//! In-process transport for tests and offline hosts
//!
//! A [`MemoryServer`] is both the [`Connector`] handed to the session manager
//! and the control handle a test keeps to script the server side: refuse
//! connections, reject joins, push snapshots and messages, and inspect the
//! intents the client sent.

use crate::error::TransportError;
use crate::session::ABNORMAL_CLOSE;
use crate::transport::{Connector, Room, RoomEvent, Transport};
use async_trait::async_trait;
use shared::{Intent, JoinOptions, RoomSnapshot, ServerMessage};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{self, error::TryRecvError};

#[derive(Default)]
struct ServerState {
    refuse_connect: bool,
    hang_connect: bool,
    reject_join: Option<String>,
    fail_sends: bool,
    fail_leave: bool,
    next_session_id: Option<String>,
    session_counter: u32,
    connects: usize,
    joins: Vec<(String, JoinOptions)>,
    sent: Vec<Intent>,
    leave_requests: usize,
    events: Option<mpsc::UnboundedSender<RoomEvent>>,
}

/// Scriptable stand-in for a remote room server.
#[derive(Clone, Default)]
pub struct MemoryServer {
    state: Arc<Mutex<ServerState>>,
}

impl MemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.lock().refuse_connect = refuse;
    }

    /// Makes `connect` never complete.
    pub fn hang_connections(&self, hang: bool) {
        self.lock().hang_connect = hang;
    }

    pub fn reject_joins(&self, reason: Option<&str>) {
        self.lock().reject_join = reason.map(str::to_string);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    pub fn fail_leave(&self, fail: bool) {
        self.lock().fail_leave = fail;
    }

    /// Session id handed to the next successful join. Defaults to `session-N`.
    pub fn assign_session_id(&self, id: &str) {
        self.lock().next_session_id = Some(id.to_string());
    }

    pub fn push_state(&self, snapshot: RoomSnapshot) -> bool {
        self.push(RoomEvent::State(snapshot))
    }

    pub fn push_message(&self, message: ServerMessage) -> bool {
        self.push(RoomEvent::Message(message))
    }

    pub fn push_leave(&self, code: u16) -> bool {
        self.push(RoomEvent::Left(code))
    }

    /// Drops the room channel without a leave notice, as a lost connection would.
    pub fn drop_connection(&self) -> bool {
        self.lock().events.take().is_some()
    }

    fn push(&self, event: RoomEvent) -> bool {
        match &self.lock().events {
            Some(events) => events.send(event).is_ok(),
            None => false,
        }
    }

    pub fn connects(&self) -> usize {
        self.lock().connects
    }

    pub fn joins(&self) -> Vec<(String, JoinOptions)> {
        self.lock().joins.clone()
    }

    pub fn sent_intents(&self) -> Vec<Intent> {
        self.lock().sent.clone()
    }

    pub fn leave_requests(&self) -> usize {
        self.lock().leave_requests
    }
}

#[async_trait]
impl Connector for MemoryServer {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Transport>, TransportError> {
        let (refuse, hang) = {
            let state = self.lock();
            (state.refuse_connect, state.hang_connect)
        };

        if hang {
            std::future::pending::<()>().await;
        }
        if refuse {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("{} refused the connection", endpoint),
            )));
        }

        self.lock().connects += 1;
        Ok(Box::new(MemoryTransport {
            server: self.clone(),
        }))
    }
}

struct MemoryTransport {
    server: MemoryServer,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn join_or_create(
        &mut self,
        room_name: &str,
        options: JoinOptions,
    ) -> Result<Box<dyn Room>, TransportError> {
        let mut state = self.server.lock();

        if let Some(reason) = &state.reject_join {
            return Err(TransportError::Rejected(reason.clone()));
        }

        state.joins.push((room_name.to_string(), options));
        state.session_counter += 1;
        let session_id = state
            .next_session_id
            .take()
            .unwrap_or_else(|| format!("session-{}", state.session_counter));

        let (tx, rx) = mpsc::unbounded_channel();
        state.events = Some(tx);

        Ok(Box::new(MemoryRoom {
            server: self.server.clone(),
            session_id,
            events: rx,
        }))
    }
}

struct MemoryRoom {
    server: MemoryServer,
    session_id: String,
    events: mpsc::UnboundedReceiver<RoomEvent>,
}

#[async_trait]
impl Room for MemoryRoom {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn send(&mut self, intent: &Intent) -> Result<(), TransportError> {
        let mut state = self.server.lock();
        if state.fail_sends {
            return Err(TransportError::Closed);
        }
        state.sent.push(intent.clone());
        Ok(())
    }

    fn try_recv(&mut self) -> Option<RoomEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(RoomEvent::Left(ABNORMAL_CLOSE)),
        }
    }

    async fn recv(&mut self) -> Option<RoomEvent> {
        self.events.recv().await
    }

    async fn leave(&mut self) -> Result<(), TransportError> {
        let mut state = self.server.lock();
        state.leave_requests += 1;
        state.events = None;
        if state.fail_leave {
            return Err(TransportError::Closed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Difficulty, PlayerRecord};

    fn options(name: &str) -> JoinOptions {
        JoinOptions {
            name: name.to_string(),
            difficulty: Difficulty::Easy,
            character: None,
        }
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let server = MemoryServer::new();
        server.refuse_connections(true);
        assert!(server.connect("mem").await.is_err());
        assert_eq!(server.connects(), 0);
    }

    #[tokio::test]
    async fn test_join_assigns_scripted_session_id() {
        let server = MemoryServer::new();
        server.assign_session_id("p1");

        let mut transport = server.connect("mem").await.unwrap();
        let room = transport.join_or_create("game_room", options("Ava")).await.unwrap();

        assert_eq!(room.session_id(), "p1");
        assert_eq!(server.joins()[0].0, "game_room");
        assert_eq!(server.joins()[0].1.name, "Ava");
    }

    #[tokio::test]
    async fn test_rejected_join() {
        let server = MemoryServer::new();
        server.reject_joins(Some("room full"));

        let mut transport = server.connect("mem").await.unwrap();
        match transport.join_or_create("game_room", options("Ava")).await {
            Err(TransportError::Rejected(reason)) => assert_eq!(reason, "room full"),
            _ => panic!("join should have been rejected"),
        }
    }

    #[tokio::test]
    async fn test_pushed_events_arrive_in_order() {
        let server = MemoryServer::new();
        let mut transport = server.connect("mem").await.unwrap();
        let mut room = transport.join_or_create("game_room", options("Ava")).await.unwrap();

        let snapshot = RoomSnapshot::new().with_player(PlayerRecord::new("p1", "Ava"));
        assert!(server.push_state(snapshot.clone()));
        assert!(server.push_message(ServerMessage::GameStarted));

        assert_eq!(room.try_recv(), Some(RoomEvent::State(snapshot)));
        assert_eq!(room.recv().await, Some(RoomEvent::Message(ServerMessage::GameStarted)));
        assert_eq!(room.try_recv(), None);
    }

    #[tokio::test]
    async fn test_leave_closes_event_channel() {
        let server = MemoryServer::new();
        let mut transport = server.connect("mem").await.unwrap();
        let mut room = transport.join_or_create("game_room", options("Ava")).await.unwrap();

        room.leave().await.unwrap();
        assert_eq!(server.leave_requests(), 1);
        assert!(!server.push_message(ServerMessage::GameStarted));
        assert_eq!(room.recv().await, None);
    }

    #[tokio::test]
    async fn test_dropped_connection_reads_as_abnormal_close() {
        let server = MemoryServer::new();
        let mut transport = server.connect("mem").await.unwrap();
        let mut room = transport.join_or_create("game_room", options("Ava")).await.unwrap();

        assert!(server.push_message(ServerMessage::GameStarted));
        assert!(server.drop_connection());

        assert_eq!(room.try_recv(), Some(RoomEvent::Message(ServerMessage::GameStarted)));
        assert_eq!(room.try_recv(), Some(RoomEvent::Left(ABNORMAL_CLOSE)));
    }
}
