//! Wire protocol for Arenalink.
//!
//! This crate defines how game state and player intent cross the wire:
//!
//! - **Envelope** ([`serialize`], [`parse`], [`Frame`], [`Envelope`]):
//!   the 2-byte version + type header in front of every payload.
//! - **Catalog** ([`MessageType`]): which payload a type byte stands for.
//! - **Messages** ([`ArenaStateSnapshot`], [`ArenaStateDelta`],
//!   [`OpportunityDataMessage`], …): the payload shapes.
//! - **Codecs** ([`PayloadCodec`], [`CompactCodec`], [`JsonCodec`]): how
//!   payloads become bytes.
//! - **Errors** ([`ProtocolError`], [`CodecError`]).
//!
//! # Architecture
//!
//! The protocol layer holds no state and does no I/O. It doesn't know
//! about connections, ticks, or which opportunities are outstanding:
//! the `arenalink-sync` and `arenalink-exchange` crates build those
//! policies on top of these types.
//!
//! ```text
//! Transport (bytes) → Envelope (version, type, payload) → Codec (message)
//! ```

mod codec;
mod envelope;
mod error;
mod message_type;
mod messages;

pub use codec::PayloadCodec;
#[cfg(feature = "compact")]
pub use codec::{CompactCodec, CompactCodecConfig, CompressionLevel};
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use envelope::{
    CURRENT_VERSION, Decoded, Envelope, Frame, HEADER_LEN, deserialize_payload, encode_message,
    parse, parse_and_deserialize, serialize, serialize_current,
};
pub use error::{CodecError, ProtocolError};
pub use message_type::{CLIENT_RANGE_START, Direction, MessageType};
pub use messages::{
    ArenaStateDelta, ArenaStateSnapshot, CinematicContext, CinematicExtensionMessage,
    CombatEvent, CombatEventMessage, CombatEventType, ConnectRequestMessage,
    DEFAULT_PAYLOAD_TYPE, EntityDelta, EntityDeltaFlags, EntityId, EntityState,
    InvalidDiscriminant, MatchPhase, MatchStateMessage, OpportunityDataMessage,
    OpportunityOption, OpportunityResponseMessage, PingMessage, PlayerInputMessage,
    WireMessage,
};
