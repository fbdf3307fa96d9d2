//! # Arenalink
//!
//! Wire protocol and state-sync layer for real-time arena combat.
//!
//! Arenalink frames every message in a 2-byte envelope (version, type)
//! around a pluggable payload codec, and layers two policies on top:
//!
//! - **sync**: server-side delta encoding and client-side entity
//!   tracking, so only changed entities and fields cross the wire.
//! - **exchange**: the opportunity (QTE) state machine with deadlines
//!   and default resolution, and staleness gating for cinematic
//!   extensions.
//!
//! Transport, sessions and simulation are left to the host.
//!
//! ## Quick Start
//!
//! ```rust
//! use arenalink::prelude::*;
//!
//! let codec = CompactCodec::default();
//! let ping = PingMessage { client_time_ms: 1_000 };
//!
//! let bytes = encode_message(&ping, &codec)?;
//! let frame = parse(&bytes)?;
//! match frame.message_type {
//!     MessageType::Ping => {
//!         let back: PingMessage = frame.decode(&codec)?;
//!         assert_eq!(back, ping);
//!     }
//!     other => unreachable!("unexpected {other}"),
//! }
//! # Ok::<(), ArenalinkError>(())
//! ```

mod error;

pub use error::ArenalinkError;

pub use arenalink_exchange as exchange;
pub use arenalink_protocol as protocol;
pub use arenalink_sync as sync;

/// Everything a host needs for the common send/receive paths.
pub mod prelude {
    pub use crate::ArenalinkError;

    pub use arenalink_protocol::{
        ArenaStateDelta, ArenaStateSnapshot, CURRENT_VERSION, CinematicContext,
        CinematicExtensionMessage, CodecError, CombatEvent, CombatEventMessage, CombatEventType,
        CompactCodec, CompactCodecConfig, CompressionLevel, ConnectRequestMessage, Decoded,
        Direction, EntityDelta, EntityDeltaFlags, EntityId, EntityState, Envelope, Frame,
        JsonCodec, MatchPhase, MatchStateMessage, MessageType, OpportunityDataMessage,
        OpportunityOption, OpportunityResponseMessage, PayloadCodec, PingMessage,
        PlayerInputMessage, ProtocolError, WireMessage, encode_message, parse,
        parse_and_deserialize, serialize,
    };

    pub use arenalink_sync::{ApplyReport, DeltaEncoder, EntityTracker, SyncConfig, SyncError};

    pub use arenalink_exchange::{
        ExchangeConfig, ExchangeError, ExtensionGate, OpportunityState, OpportunityTracker,
        Resolution, ResolutionOutcome, now_epoch_ms,
    };
}
