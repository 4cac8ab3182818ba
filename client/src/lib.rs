//! # Math Racer Client Library
//!
//! This library provides the client side of the multiplayer math racing game.
//! Players pick a character, meet in a shared lobby, mark themselves ready and
//! race by answering arithmetic questions. The server owns every rule of the
//! game; the client mirrors what it is told and forwards player intents.
//!
//! ## Architecture Overview
//!
//! ### Authoritative Snapshots
//! The server pushes a complete room snapshot after every change. The client
//! never patches its view incrementally: each snapshot is diffed against the
//! previous one and turned into join, update and leave events for the screens.
//!
//! ### Fire-and-Forget Intents
//! Ready toggles, start requests and answers are sent without waiting for an
//! acknowledgment. Their effect only becomes visible once a later snapshot
//! reflects it.
//!
//! ### One Session Context
//! A single [`session::SessionManager`] owns the connection, the joined room
//! and the local identity. It is created by the host and handed to each screen,
//! so tests can drive it against the in-memory server.
//!
//! ## Module Organization
//!
//! ### Session Module (`session`)
//! Connection and room lifecycle:
//! - Connect and join with bounded waits
//! - Local identity and readiness
//! - Intent dispatch and event polling
//!
//! ### Presence Module (`presence`)
//! Snapshot reconciliation:
//! - Ordered join/update/leave events
//! - Stable render handles per player
//!
//! ### Countdown and Readiness Modules (`countdown`, `readiness`)
//! Pure view logic:
//! - Per-question timer that restarts only on a new question
//! - Lobby quorum and status line
//!
//! ### Transport Modules (`transport`, `network`, `memory`)
//! The boundary the session talks through, with a UDP implementation and a
//! scriptable in-process one.
//!
//! ### Screen Modules (`scene`, `lobby`, `race`)
//! Per-screen view-models that the binary draws with macroquad.
//!
//! ## Error Handling
//!
//! Lifecycle calls return [`error::SessionError`]. Connection and join
//! failures leave the manager ready for a retry; intents never fail, they
//! report whether they were sent or dropped.

pub mod config;
pub mod countdown;
pub mod error;
pub mod lobby;
pub mod memory;
pub mod network;
pub mod presence;
pub mod race;
pub mod readiness;
pub mod scene;
pub mod session;
pub mod transport;
