//! Payload shapes, one per [`MessageType`].
//!
//! Every struct here is an immutable value message: built by the sender,
//! serialized once, never mutated on the wire. Field names are camelCase
//! on the wire (`#[serde(rename_all = "camelCase")]`) so JSON payloads
//! line up with non-Rust clients.
//!
//! Optional fields are `Option<T>`, never sentinel empty strings or
//! zeros, so "not provided" and "provided but empty" stay distinct after
//! a round trip through any codec.

use serde::{Serialize, de::DeserializeOwned};

use crate::MessageType;

mod cinematic;
mod combat;
mod input;
mod opportunity;
mod state;

pub use cinematic::{CinematicExtensionMessage, DEFAULT_PAYLOAD_TYPE};
pub use combat::{CombatEvent, CombatEventMessage, CombatEventType};
pub use input::{ConnectRequestMessage, PingMessage, PlayerInputMessage};
pub use opportunity::{OpportunityDataMessage, OpportunityOption, OpportunityResponseMessage};
pub use state::{
    ArenaStateDelta, ArenaStateSnapshot, CinematicContext, EntityDelta, EntityDeltaFlags,
    EntityId, EntityState, MatchPhase, MatchStateMessage,
};

/// A payload struct that knows its own type byte.
///
/// Lets a sender write `encode_message(&snapshot, &codec)` instead of
/// repeating `MessageType::ArenaStateSnapshot` next to every call.
/// Receivers still pick the struct with a `match` on the parsed type.
pub trait WireMessage: Serialize + DeserializeOwned {
    /// The catalog entry this payload travels under.
    const MESSAGE_TYPE: MessageType;
}

/// A byte-valued enum field held a value outside its range.
///
/// Produced while deserializing [`MatchPhase`] or [`CombatEventType`];
/// codecs surface it as a decode error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} value {value}")]
pub struct InvalidDiscriminant {
    pub kind: &'static str,
    pub value: u8,
}

impl InvalidDiscriminant {
    pub(crate) fn new(kind: &'static str, value: u8) -> Self {
        Self { kind, value }
    }
}
