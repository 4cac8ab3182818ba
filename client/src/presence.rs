//! Local mirror of which players are in the room
//!
//! The server only ever pushes whole snapshots, and a player who leaves simply
//! stops appearing in them. [`Presence::reconcile`] diffs each snapshot
//! against the local entries and turns it into explicit join, update and
//! leave events for the UI.

use log::debug;
use shared::{PlayerRecord, RoomSnapshot};
use std::collections::BTreeMap;

/// Opaque key a renderer can hang its sprites on.
///
/// Allocated once per join and never reused by the same [`Presence`], so a
/// player who leaves and rejoins gets a fresh handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderHandle(u64);

impl RenderHandle {
    pub fn index(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PresenceEntry {
    pub handle: RenderHandle,
    pub record: PlayerRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PresenceEvent {
    PlayerJoined {
        id: String,
        handle: RenderHandle,
        record: PlayerRecord,
    },
    PlayerUpdated {
        id: String,
        handle: RenderHandle,
        record: PlayerRecord,
    },
    PlayerLeft {
        id: String,
        handle: RenderHandle,
    },
}

impl PresenceEvent {
    pub fn id(&self) -> &str {
        match self {
            PresenceEvent::PlayerJoined { id, .. }
            | PresenceEvent::PlayerUpdated { id, .. }
            | PresenceEvent::PlayerLeft { id, .. } => id,
        }
    }
}

/// Keyed collection of every player the client currently believes is present.
#[derive(Debug, Default)]
pub struct Presence {
    entries: BTreeMap<String, PresenceEntry>,
    next_handle: u64,
}

impl Presence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one snapshot and returns the delta.
    ///
    /// Events come out as all joins, then updates for ids that were already
    /// present, then leaves. A freshly joined id gets only its join event in
    /// this pass. Updates are emitted even when nothing changed.
    pub fn reconcile(&mut self, snapshot: &RoomSnapshot) -> Vec<PresenceEvent> {
        let mut joins = Vec::new();
        let mut updates = Vec::new();

        for (id, record) in &snapshot.players {
            match self.entries.get_mut(id) {
                Some(entry) => {
                    entry.record = record.clone();
                    updates.push(PresenceEvent::PlayerUpdated {
                        id: id.clone(),
                        handle: entry.handle,
                        record: record.clone(),
                    });
                }
                None => {
                    let handle = RenderHandle(self.next_handle);
                    self.next_handle += 1;
                    self.entries.insert(
                        id.clone(),
                        PresenceEntry {
                            handle,
                            record: record.clone(),
                        },
                    );
                    joins.push(PresenceEvent::PlayerJoined {
                        id: id.clone(),
                        handle,
                        record: record.clone(),
                    });
                }
            }
        }

        let departed: Vec<String> = self
            .entries
            .keys()
            .filter(|id| !snapshot.players.contains_key(*id))
            .cloned()
            .collect();

        let mut leaves = Vec::with_capacity(departed.len());
        for id in departed {
            if let Some(entry) = self.entries.remove(&id) {
                leaves.push(PresenceEvent::PlayerLeft {
                    id,
                    handle: entry.handle,
                });
            }
        }

        debug!(
            "Reconciled snapshot: {} joined, {} updated, {} left",
            joins.len(),
            updates.len(),
            leaves.len()
        );

        joins.extend(updates);
        joins.extend(leaves);
        joins
    }

    pub fn get(&self, id: &str) -> Option<&PresenceEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn records(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.entries.values().map(|entry| &entry.record)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, ready: bool) -> PlayerRecord {
        let mut record = PlayerRecord::new(id, &format!("Player {}", id));
        record.is_ready = ready;
        record
    }

    fn snapshot(players: &[(&str, bool)]) -> RoomSnapshot {
        players
            .iter()
            .fold(RoomSnapshot::new(), |snap, (id, ready)| {
                snap.with_player(player(id, *ready))
            })
    }

    fn kinds(events: &[PresenceEvent]) -> Vec<(&'static str, String)> {
        events
            .iter()
            .map(|event| {
                let kind = match event {
                    PresenceEvent::PlayerJoined { .. } => "joined",
                    PresenceEvent::PlayerUpdated { .. } => "updated",
                    PresenceEvent::PlayerLeft { .. } => "left",
                };
                (kind, event.id().to_string())
            })
            .collect()
    }

    #[test]
    fn test_first_snapshot_only_joins() {
        let mut presence = Presence::new();
        let events = presence.reconcile(&snapshot(&[("p1", false), ("p2", true)]));

        assert_eq!(
            kinds(&events),
            vec![("joined", "p1".to_string()), ("joined", "p2".to_string())]
        );
        assert_eq!(presence.len(), 2);
    }

    #[test]
    fn test_key_set_matches_latest_snapshot() {
        let mut presence = Presence::new();
        presence.reconcile(&snapshot(&[("a", false), ("b", false), ("c", false)]));
        presence.reconcile(&snapshot(&[("b", true), ("d", false)]));

        let ids: Vec<&str> = presence.ids().collect();
        assert_eq!(ids, vec!["b", "d"]);
        assert!(presence.get("b").unwrap().record.is_ready);
    }

    #[test]
    fn test_emission_order_joins_updates_leaves() {
        let mut presence = Presence::new();
        presence.reconcile(&snapshot(&[("b", false), ("d", false)]));

        let events = presence.reconcile(&snapshot(&[("a", false), ("b", true), ("c", false)]));

        assert_eq!(
            kinds(&events),
            vec![
                ("joined", "a".to_string()),
                ("joined", "c".to_string()),
                ("updated", "b".to_string()),
                ("left", "d".to_string()),
            ]
        );
    }

    #[test]
    fn test_unchanged_record_still_updates() {
        let mut presence = Presence::new();
        let snap = snapshot(&[("p1", false)]);
        presence.reconcile(&snap);

        let events = presence.reconcile(&snap);
        assert_eq!(kinds(&events), vec![("updated", "p1".to_string())]);
    }

    #[test]
    fn test_empty_snapshot_removes_everyone() {
        let mut presence = Presence::new();
        presence.reconcile(&snapshot(&[("p1", false), ("p2", false)]));

        let events = presence.reconcile(&RoomSnapshot::new());
        assert_eq!(
            kinds(&events),
            vec![("left", "p1".to_string()), ("left", "p2".to_string())]
        );
        assert!(presence.is_empty());
    }

    #[test]
    fn test_rejoin_gets_fresh_handle() {
        let mut presence = Presence::new();
        presence.reconcile(&snapshot(&[("p1", false)]));
        let first = presence.get("p1").unwrap().handle;

        presence.reconcile(&RoomSnapshot::new());
        presence.reconcile(&snapshot(&[("p1", false)]));
        let second = presence.get("p1").unwrap().handle;

        assert_ne!(first, second);
    }

    #[test]
    fn test_update_carries_join_handle() {
        let mut presence = Presence::new();
        let joined = presence.reconcile(&snapshot(&[("p1", false)]));
        let updated = presence.reconcile(&snapshot(&[("p1", true)]));

        match (&joined[0], &updated[0]) {
            (
                PresenceEvent::PlayerJoined { handle: a, .. },
                PresenceEvent::PlayerUpdated { handle: b, record, .. },
            ) => {
                assert_eq!(a, b);
                assert!(record.is_ready);
            }
            _ => panic!("unexpected events {:?} / {:?}", joined, updated),
        }
    }
}
