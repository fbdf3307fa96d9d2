//! Snapshot/delta policy for Arenalink.
//!
//! The wire format ([`arenalink_protocol::ArenaStateDelta`]) only says
//! *how* a partial update is shaped. This crate implements the contract
//! both ends follow:
//!
//! 1. **Sender** ([`DeltaEncoder`]): omit unchanged entities, flag
//!    exactly the changed fields, remember what was sent.
//! 2. **Receiver** ([`EntityTracker`]): apply only flagged fields,
//!    treat an absent entity as unchanged, never roll back to an older
//!    tick.
//!
//! # How it fits in the stack
//!
//! ```text
//! Game simulation (above)  ← produces EntityState each tick
//!     ↕
//! Sync layer (this crate)  ← decides what to send / how to apply it
//!     ↕
//! Protocol layer (below)   ← frames and encodes the messages
//! ```

mod config;
mod encoder;
mod error;
mod tracker;

pub use config::SyncConfig;
pub use encoder::DeltaEncoder;
pub use error::SyncError;
pub use tracker::{ApplyReport, EntityTracker};
