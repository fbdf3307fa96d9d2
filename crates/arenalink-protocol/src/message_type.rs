//! The message catalog: which payload shape a type byte stands for.
//!
//! Byte 1 of every frame is a [`MessageType`]. The catalog is closed over
//! the values below, but the byte itself is open: any value we don't
//! recognize becomes [`MessageType::Unrecognized`] instead of an error, so
//! an older client can still read the header of a newer message and
//! decide for itself whether to skip it.
//!
//! By convention server → client types use low values and client → server
//! types start at [`CLIENT_RANGE_START`]. Nothing enforces that split; the
//! byte value alone decides dispatch.

use std::fmt;

/// First type byte of the client → server range.
pub const CLIENT_RANGE_START: u8 = 64;

/// The payload kind carried by a frame.
///
/// This is a plain data enum. Picking the payload struct to decode is a
/// `match` at the call site:
///
/// ```rust
/// use arenalink_protocol::{MessageType, ArenaStateSnapshot, JsonCodec, parse};
///
/// # fn handle(bytes: &[u8]) -> Result<(), arenalink_protocol::ProtocolError> {
/// let frame = parse(bytes)?;
/// match frame.message_type {
///     MessageType::ArenaStateSnapshot => {
///         let snapshot: ArenaStateSnapshot = frame.decode(&JsonCodec)?;
///         println!("tick {}", snapshot.tick);
///     }
///     MessageType::Unrecognized(byte) => println!("skipping type {byte}"),
///     _ => {}
/// }
/// # Ok(())
/// # }
/// ```
///
/// `Unrecognized(u8)` keeps the raw byte, so re-encoding a frame we
/// didn't understand is lossless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Reserved zero value.
    Unknown,

    // -- Server → client --
    ArenaStateSnapshot,
    ArenaStateDelta,
    CombatEvent,
    MatchState,
    OpportunityData,
    CinematicExtension,

    // -- Client → server --
    ConnectRequest,
    PlayerInput,
    OpportunityResponse,
    Ping,

    /// A byte outside the catalog. Not an error at the framing level.
    Unrecognized(u8),
}

/// Which side conventionally sends a message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ServerToClient,
    ClientToServer,
}

impl MessageType {
    /// Every catalogued type, in byte order. Handy for exhaustive tests.
    pub const ALL: [MessageType; 11] = [
        MessageType::Unknown,
        MessageType::ArenaStateSnapshot,
        MessageType::ArenaStateDelta,
        MessageType::CombatEvent,
        MessageType::MatchState,
        MessageType::OpportunityData,
        MessageType::CinematicExtension,
        MessageType::ConnectRequest,
        MessageType::PlayerInput,
        MessageType::OpportunityResponse,
        MessageType::Ping,
    ];

    /// Maps a wire byte to a type. Never fails.
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            0 => Self::Unknown,
            1 => Self::ArenaStateSnapshot,
            2 => Self::ArenaStateDelta,
            3 => Self::CombatEvent,
            4 => Self::MatchState,
            5 => Self::OpportunityData,
            6 => Self::CinematicExtension,
            64 => Self::ConnectRequest,
            65 => Self::PlayerInput,
            66 => Self::OpportunityResponse,
            67 => Self::Ping,
            other => Self::Unrecognized(other),
        }
    }

    /// The byte written at offset 1 of a frame.
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::ArenaStateSnapshot => 1,
            Self::ArenaStateDelta => 2,
            Self::CombatEvent => 3,
            Self::MatchState => 4,
            Self::OpportunityData => 5,
            Self::CinematicExtension => 6,
            Self::ConnectRequest => 64,
            Self::PlayerInput => 65,
            Self::OpportunityResponse => 66,
            Self::Ping => 67,
            Self::Unrecognized(byte) => byte,
        }
    }

    /// `true` for anything in the catalog, including `Unknown`.
    pub const fn is_recognized(self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    /// The conventional sender of this type.
    ///
    /// Informational only. Returns `None` for `Unknown` and for bytes
    /// outside the catalog.
    pub const fn direction(self) -> Option<Direction> {
        match self {
            Self::Unknown | Self::Unrecognized(_) => None,
            other if other.as_byte() < CLIENT_RANGE_START => {
                Some(Direction::ServerToClient)
            }
            _ => Some(Direction::ClientToServer),
        }
    }
}

impl From<u8> for MessageType {
    fn from(byte: u8) -> Self {
        Self::from_byte(byte)
    }
}

impl From<MessageType> for u8 {
    fn from(message_type: MessageType) -> Self {
        message_type.as_byte()
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unrecognized(byte) => write!(f, "Unrecognized({byte})"),
            // The derived Debug output is already the variant name.
            other => write!(f, "{other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_byte_catalog_values() {
        assert_eq!(MessageType::from_byte(0), MessageType::Unknown);
        assert_eq!(MessageType::from_byte(1), MessageType::ArenaStateSnapshot);
        assert_eq!(MessageType::from_byte(6), MessageType::CinematicExtension);
        assert_eq!(MessageType::from_byte(64), MessageType::ConnectRequest);
        assert_eq!(MessageType::from_byte(67), MessageType::Ping);
    }

    #[test]
    fn test_from_byte_unknown_value_is_unrecognized_not_error() {
        assert_eq!(MessageType::from_byte(7), MessageType::Unrecognized(7));
        assert_eq!(MessageType::from_byte(63), MessageType::Unrecognized(63));
        assert_eq!(MessageType::from_byte(255), MessageType::Unrecognized(255));
    }

    #[test]
    fn test_as_byte_inverts_from_byte_for_every_byte() {
        for byte in 0..=u8::MAX {
            assert_eq!(MessageType::from_byte(byte).as_byte(), byte);
        }
    }

    #[test]
    fn test_all_is_recognized_and_in_byte_order() {
        let bytes: Vec<u8> = MessageType::ALL.iter().map(|t| t.as_byte()).collect();
        let mut sorted = bytes.clone();
        sorted.sort_unstable();
        assert_eq!(bytes, sorted);
        assert!(MessageType::ALL.iter().all(|t| t.is_recognized()));
    }

    #[test]
    fn test_direction_follows_range_convention() {
        assert_eq!(
            MessageType::ArenaStateDelta.direction(),
            Some(Direction::ServerToClient)
        );
        assert_eq!(
            MessageType::PlayerInput.direction(),
            Some(Direction::ClientToServer)
        );
        assert_eq!(MessageType::Unknown.direction(), None);
        assert_eq!(MessageType::Unrecognized(100).direction(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(MessageType::CombatEvent.to_string(), "CombatEvent");
        assert_eq!(MessageType::Unrecognized(9).to_string(), "Unrecognized(9)");
    }
}
