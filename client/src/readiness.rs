//! Quorum rule gating the race start

use crate::presence::Presence;
use shared::{MAX_PLAYERS, MIN_PLAYERS};

/// True when at least [`MIN_PLAYERS`] are present and every one of them is ready.
pub fn can_start(presence: &Presence) -> bool {
    presence.len() >= MIN_PLAYERS && presence.records().all(|record| record.is_ready)
}

/// How many more players must join before the quorum can be met.
pub fn players_needed(presence: &Presence) -> usize {
    MIN_PLAYERS.saturating_sub(presence.len())
}

/// What the lobby should tell the player while waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyStatus {
    WaitingForPlayers { count: usize, capacity: usize },
    WaitingForReady,
    ReadyToStart,
}

impl LobbyStatus {
    pub fn of(presence: &Presence) -> Self {
        if presence.len() < MIN_PLAYERS {
            LobbyStatus::WaitingForPlayers {
                count: presence.len(),
                capacity: MAX_PLAYERS,
            }
        } else if !can_start(presence) {
            LobbyStatus::WaitingForReady
        } else {
            LobbyStatus::ReadyToStart
        }
    }

    pub fn message(&self) -> String {
        match self {
            LobbyStatus::WaitingForPlayers { count, capacity } => {
                format!("Waiting for players... ({}/{})", count, capacity)
            }
            LobbyStatus::WaitingForReady => "Waiting for all players to be ready...".to_string(),
            LobbyStatus::ReadyToStart => "All players ready! Start when ready.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{PlayerRecord, RoomSnapshot};

    fn presence_of(ready_flags: &[bool]) -> Presence {
        let snapshot = ready_flags
            .iter()
            .enumerate()
            .fold(RoomSnapshot::new(), |snap, (i, ready)| {
                let mut record = PlayerRecord::new(&format!("p{}", i + 1), "racer");
                record.is_ready = *ready;
                snap.with_player(record)
            });
        let mut presence = Presence::new();
        presence.reconcile(&snapshot);
        presence
    }

    #[test]
    fn test_empty_room_cannot_start() {
        assert!(!can_start(&presence_of(&[])));
    }

    #[test]
    fn test_single_ready_player_cannot_start() {
        assert!(!can_start(&presence_of(&[true])));
    }

    #[test]
    fn test_two_players_mixed_ready() {
        assert!(!can_start(&presence_of(&[true, false])));
    }

    #[test]
    fn test_two_players_all_ready() {
        assert!(can_start(&presence_of(&[true, true])));
    }

    #[test]
    fn test_four_players_one_not_ready() {
        assert!(!can_start(&presence_of(&[true, true, false, true])));
        assert!(can_start(&presence_of(&[true, true, true, true])));
    }

    #[test]
    fn test_players_needed() {
        assert_eq!(players_needed(&presence_of(&[])), 2);
        assert_eq!(players_needed(&presence_of(&[false])), 1);
        assert_eq!(players_needed(&presence_of(&[false, false, false])), 0);
    }

    #[test]
    fn test_lobby_status_progression() {
        let status = LobbyStatus::of(&presence_of(&[true]));
        assert_eq!(
            status,
            LobbyStatus::WaitingForPlayers {
                count: 1,
                capacity: 4
            }
        );
        assert_eq!(status.message(), "Waiting for players... (1/4)");

        assert_eq!(
            LobbyStatus::of(&presence_of(&[true, false])),
            LobbyStatus::WaitingForReady
        );
        assert_eq!(
            LobbyStatus::of(&presence_of(&[true, true])),
            LobbyStatus::ReadyToStart
        );
    }
}
