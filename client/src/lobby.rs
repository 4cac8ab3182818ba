//! Lobby screen: who is in the room, who is ready, and when the race may start

use crate::error::SessionError;
use crate::readiness::LobbyStatus;
use crate::scene::SceneChange;
use crate::session::{Dispatch, JoinRequest, SessionEvent, SessionManager};
use log::info;
use shared::{Character, Difficulty, ServerMessage};

const DEFAULT_SPRITE: &str = "assets/png/char/mc.png";

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerCard {
    pub id: String,
    pub name: String,
    pub sprite: String,
    pub is_ready: bool,
    pub is_local: bool,
}

impl PlayerCard {
    pub fn status_label(&self) -> &'static str {
        if self.is_ready {
            "Ready"
        } else {
            "Not Ready"
        }
    }
}

pub struct LobbyScene {
    name: String,
    character: Option<Character>,
    difficulty: Difficulty,
    status: String,
    cards: Vec<PlayerCard>,
    start_visible: bool,
}

impl LobbyScene {
    pub fn new(name: impl Into<String>, character: Option<Character>) -> Self {
        Self {
            name: name.into(),
            character,
            difficulty: Difficulty::default(),
            status: "Connecting...".to_string(),
            cards: Vec::new(),
            start_visible: false,
        }
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Connects and joins. On failure the status line says what went wrong
    /// and the session stays in the not-connected state.
    pub async fn enter(&mut self, session: &mut SessionManager) -> Result<(), SessionError> {
        if let Err(e) = session.connect().await {
            self.status = "Failed to connect to server".to_string();
            return Err(e);
        }

        let request = JoinRequest::new(self.name.clone(), self.character.clone())
            .with_difficulty(self.difficulty);
        if let Err(e) = session.join_or_create(request).await {
            self.status = "Failed to join room".to_string();
            return Err(e);
        }

        self.status = format!("Connected as {}", self.name);
        Ok(())
    }

    pub fn handle_event(&mut self, session: &SessionManager, event: &SessionEvent) -> SceneChange {
        match event {
            SessionEvent::State { .. } => {
                self.refresh(session);
                SceneChange::Stay
            }
            SessionEvent::Message(ServerMessage::GameStarted) => SceneChange::ToRace,
            SessionEvent::Message(ServerMessage::PlayerReady {
                player_id,
                is_ready,
            }) => {
                info!(
                    "Player {} is {}",
                    player_id,
                    if *is_ready { "ready" } else { "not ready" }
                );
                SceneChange::Stay
            }
            SessionEvent::Message(_) => SceneChange::Stay,
            SessionEvent::Disconnected(_) => {
                self.cards.clear();
                self.start_visible = false;
                self.status = "Disconnected".to_string();
                SceneChange::Stay
            }
        }
    }

    fn refresh(&mut self, session: &SessionManager) {
        let local_id = session.my_player_id();
        self.cards = session
            .presence()
            .records()
            .map(|record| PlayerCard {
                id: record.id.clone(),
                name: if record.name.is_empty() {
                    "Unknown".to_string()
                } else {
                    record.name.clone()
                },
                sprite: record
                    .character
                    .as_ref()
                    .map(|c| c.sprite.clone())
                    .unwrap_or_else(|| DEFAULT_SPRITE.to_string()),
                is_ready: record.is_ready,
                is_local: Some(record.id.as_str()) == local_id,
            })
            .collect();

        let status = LobbyStatus::of(session.presence());
        self.status = status.message();
        self.start_visible = status == LobbyStatus::ReadyToStart;
    }

    pub fn toggle_ready(&mut self, session: &mut SessionManager) -> Dispatch {
        let Some(identity) = session.identity() else {
            return Dispatch::Dropped;
        };
        let ready = !identity.is_ready;
        session.set_ready(ready)
    }

    /// Sends the start intent, but only once the quorum is met.
    pub fn start(&mut self, session: &mut SessionManager) -> Dispatch {
        if !session.can_start_game() {
            return Dispatch::Dropped;
        }
        session.request_start()
    }

    pub async fn exit(&mut self, session: &mut SessionManager) -> SceneChange {
        session.leave().await;
        self.cards.clear();
        self.start_visible = false;
        SceneChange::ToCharacterSelect
    }

    pub fn ready_button_label(&self, session: &SessionManager) -> &'static str {
        match session.identity() {
            Some(identity) if identity.is_ready => "Cancel",
            _ => "Ready!",
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn cards(&self) -> &[PlayerCard] {
        &self.cards
    }

    pub fn start_visible(&self) -> bool {
        self.start_visible
    }
}
