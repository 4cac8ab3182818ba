use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const ROOM_NAME: &str = "game_room";
pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 4;
pub const TRACK_LENGTH: f32 = 2000.0;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    JoinOrCreate {
        room_name: String,
        options: JoinOptions,
    },
    Intent(Intent),
    Leave,

    JoinAccepted {
        session_id: String,
    },
    JoinRejected {
        reason: String,
    },
    RoomState(RoomSnapshot),
    Message(ServerMessage),
    Left {
        code: u16,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

/// Character picked on the selection screen and shown in the lobby and on the track.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Character {
    pub name: String,
    pub desc: String,
    pub sprite: String,
    pub car: String,
    #[serde(rename = "trait")]
    pub trait_name: String,
}

impl Character {
    fn new(name: &str, desc: &str, asset: &str) -> Self {
        Self {
            name: name.to_string(),
            desc: desc.to_string(),
            sprite: format!("assets/png/char/{}.png", asset),
            car: format!("assets/png/char/{}_car_.png", asset),
            trait_name: String::new(),
        }
    }
}

/// The five selectable racers.
pub fn roster() -> Vec<Character> {
    vec![
        Character::new(
            "Rahman",
            "Amateur racer chasing the legacy of his late father.",
            "mc",
        ),
        Character::new("Seto", "Workaholic lab researcher, far too curious.", "doc"),
        Character::new("Jacky", "Night-shift wolf courier who loves speed.", "wolf"),
        Character::new(
            "Rishaq",
            "Desert wanderer hunting for buried treasure.",
            "farmer",
        ),
        Character::new("Silfy", "Tiny fairy whose magic glows softly.", "fairy"),
    ]
}

/// Payload sent with a join request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct JoinOptions {
    pub name: String,
    pub difficulty: Difficulty,
    pub character: Option<Character>,
}

/// Authoritative state of one player, as last pushed by the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct PlayerRecord {
    pub id: String,
    pub name: String,
    pub color: String,
    /// Distance along the track.
    pub x: f32,
    pub speed: f32,
    pub score: u32,
    pub has_special: bool,
    /// Empty when no question is active.
    pub current_question: String,
    /// Time budget for `current_question`, in milliseconds.
    pub question_timer: u64,
    pub is_ready: bool,
    pub character: Option<Character>,
}

impl PlayerRecord {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn question_time_budget(&self) -> Duration {
        Duration::from_millis(self.question_timer)
    }

    pub fn has_question(&self) -> bool {
        !self.current_question.is_empty()
    }

    /// Fraction of the track covered, clamped to `[0, 1]`.
    pub fn track_progress(&self) -> f32 {
        (self.x / TRACK_LENGTH).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum GamePhase {
    #[default]
    Waiting,
    Racing,
    Finished,
}

/// Full room state. The server always pushes the whole thing, never a diff.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct RoomSnapshot {
    pub players: BTreeMap<String, PlayerRecord>,
    pub track_distance: f32,
    pub game_phase: GamePhase,
}

impl RoomSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_player(mut self, record: PlayerRecord) -> Self {
        self.players.insert(record.id.clone(), record);
        self
    }

    pub fn with_phase(mut self, phase: GamePhase) -> Self {
        self.game_phase = phase;
        self
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum SpecialKind {
    Boost,
    Attack,
}

/// Client to server request. Fire-and-forget: the next snapshot is the only
/// confirmation the client ever gets.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Intent {
    PlayerReady {
        is_ready: bool,
    },
    StartGame,
    Answer {
        answer: i64,
    },
    UseSpecial {
        kind: SpecialKind,
        target_id: Option<String>,
    },
}

impl Intent {
    /// Message type name on the session channel.
    pub fn kind(&self) -> &'static str {
        match self {
            Intent::PlayerReady { .. } => "playerReady",
            Intent::StartGame => "startGame",
            Intent::Answer { .. } => "answer",
            Intent::UseSpecial { .. } => "useSpecial",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Standing {
    pub id: String,
    pub name: String,
    pub score: u32,
}

/// Named events pushed by the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum ServerMessage {
    GameStarted,
    PlayerReady {
        player_id: String,
        is_ready: bool,
    },
    PlayerAnswered {
        player_id: String,
        correct: bool,
    },
    GameFinished {
        winner: String,
        standings: Vec<Standing>,
    },
    CanStart {
        players_needed: u32,
    },
}

impl ServerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::GameStarted => "gameStarted",
            ServerMessage::PlayerReady { .. } => "playerReady",
            ServerMessage::PlayerAnswered { .. } => "playerAnswered",
            ServerMessage::GameFinished { .. } => "gameFinished",
            ServerMessage::CanStart { .. } => "canStart",
        }
    }
}
