//! Boundary to the session-protocol library
//!
//! The session manager never talks to sockets directly. It drives three
//! layers, each produced by the one before it:
//! - [`Connector`] establishes a transport-level handle to an endpoint
//! - [`Transport`] joins (or creates) a named room on that handle
//! - [`Room`] is one joined session: it pushes [`RoomEvent`]s and accepts
//!   fire-and-forget [`Intent`]s
//!
//! [`crate::network`] implements these over UDP, [`crate::memory`] in-process.

use crate::error::TransportError;
use async_trait::async_trait;
use shared::{Intent, JoinOptions, RoomSnapshot, ServerMessage};

/// Something pushed by the server for a joined room.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    /// A complete authoritative snapshot. The first one arrives right after join.
    State(RoomSnapshot),
    Message(ServerMessage),
    /// The session ended from the server side.
    Left(u16),
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Transport>, TransportError>;
}

#[async_trait]
pub trait Transport: Send {
    /// Fails with [`TransportError::Rejected`] when the server refuses the join.
    async fn join_or_create(
        &mut self,
        room_name: &str,
        options: JoinOptions,
    ) -> Result<Box<dyn Room>, TransportError>;
}

#[async_trait]
pub trait Room: Send {
    /// Identifier the server assigned to this client for the session.
    fn session_id(&self) -> &str;

    /// Hands an intent to the channel without waiting for any acknowledgment.
    fn send(&mut self, intent: &Intent) -> Result<(), TransportError>;

    /// Returns the next buffered event without waiting.
    fn try_recv(&mut self) -> Option<RoomEvent>;

    /// Waits for the next event. `None` once the channel is gone.
    async fn recv(&mut self) -> Option<RoomEvent>;

    async fn leave(&mut self) -> Result<(), TransportError>;
}
