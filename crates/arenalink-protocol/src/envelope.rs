//! The 2-byte envelope around every payload.
//!
//! ```text
//! byte 0       : protocol version (non-zero)
//! byte 1       : message type
//! bytes 2..N   : payload, produced by the payload codec
//! ```
//!
//! Everything here is a pure function of its inputs: no shared state, no
//! I/O, no logging. Any number of connection tasks can call these
//! concurrently.
//!
//! # Sending
//!
//! ```rust
//! use arenalink_protocol::{
//!     encode_message, parse, ArenaStateSnapshot, CompactCodec, MatchPhase, MessageType,
//! };
//!
//! let codec = CompactCodec::default();
//! let snapshot = ArenaStateSnapshot::new(42, MatchPhase::Fighting, vec![]);
//!
//! let bytes = encode_message(&snapshot, &codec).unwrap();
//! assert_eq!(bytes[0], 1); // CURRENT_VERSION
//! assert_eq!(bytes[1], 1); // ArenaStateSnapshot
//!
//! let frame = parse(&bytes).unwrap();
//! assert_eq!(frame.message_type, MessageType::ArenaStateSnapshot);
//! let decoded: ArenaStateSnapshot = frame.decode(&codec).unwrap();
//! assert_eq!(decoded, snapshot);
//! ```

use std::num::NonZeroU8;

use serde::{Serialize, de::DeserializeOwned};

use crate::{CodecError, MessageType, PayloadCodec, ProtocolError, WireMessage};

/// The protocol version this crate writes by default.
pub const CURRENT_VERSION: u8 = 1;

/// Bytes taken by the version and type header.
pub const HEADER_LEN: usize = 2;

// ---------------------------------------------------------------------------
// Owned envelope
// ---------------------------------------------------------------------------

/// An owned frame: version, type, and already-serialized payload bytes.
///
/// The version is a `NonZeroU8`, so an `Envelope` with version 0 cannot
/// exist. [`Envelope::new`] is the only way to build one from a raw byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    version: NonZeroU8,
    pub message_type: MessageType,
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Wraps an already-serialized payload.
    ///
    /// # Errors
    /// [`ProtocolError::ZeroVersion`] if `version == 0`.
    pub fn new(
        version: u8,
        message_type: MessageType,
        payload: Vec<u8>,
    ) -> Result<Self, ProtocolError> {
        let version = NonZeroU8::new(version).ok_or(ProtocolError::ZeroVersion)?;
        Ok(Self {
            version,
            message_type,
            payload,
        })
    }

    /// The protocol version byte. Never 0.
    pub fn version(&self) -> u8 {
        self.version.get()
    }

    /// Writes header + payload into a fresh buffer of exactly
    /// `HEADER_LEN + payload.len()` bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        frame_bytes(self.version, self.message_type, &self.payload)
    }

    /// Borrows this envelope as a [`Frame`].
    pub fn as_frame(&self) -> Frame<'_> {
        Frame {
            version: self.version.get(),
            message_type: self.message_type,
            payload: &self.payload,
        }
    }
}

// ---------------------------------------------------------------------------
// Borrowed frame
// ---------------------------------------------------------------------------

/// A parsed frame that borrows its payload from the receive buffer.
///
/// The lifetime `'a` ties `payload` to the buffer passed to [`parse`].
/// No bytes are copied until the payload is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub version: u8,
    pub message_type: MessageType,
    /// Empty (not missing) when the frame is exactly the header.
    pub payload: &'a [u8],
}

impl Frame<'_> {
    /// Decodes the payload as `T`.
    ///
    /// The caller picks `T`, normally by matching on `message_type`.
    /// Failures carry this frame's type and payload length.
    ///
    /// # Errors
    /// [`ProtocolError::PayloadDecode`] if the codec rejects the bytes.
    pub fn decode<T: DeserializeOwned, C: PayloadCodec>(
        &self,
        codec: &C,
    ) -> Result<T, ProtocolError> {
        codec
            .deserialize(self.payload)
            .map_err(|source| payload_decode_error(Some(self.message_type), self.payload, source))
    }

    /// Copies the frame into an owned [`Envelope`].
    ///
    /// # Errors
    /// [`ProtocolError::ZeroVersion`] if the frame carried version 0.
    pub fn to_envelope(&self) -> Result<Envelope, ProtocolError> {
        Envelope::new(self.version, self.message_type, self.payload.to_vec())
    }
}

/// A fully decoded message plus its header.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub version: u8,
    pub message_type: MessageType,
    pub message: T,
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Serializes `message` and frames it with `version` and `message_type`.
///
/// The version is checked before the codec runs, so a zero version
/// never costs a serialization.
///
/// # Errors
/// - [`ProtocolError::ZeroVersion`] if `version == 0`.
/// - [`ProtocolError::Encode`] if the codec fails.
pub fn serialize<T: Serialize, C: PayloadCodec>(
    message_type: MessageType,
    message: &T,
    version: u8,
    codec: &C,
) -> Result<Vec<u8>, ProtocolError> {
    let version = NonZeroU8::new(version).ok_or(ProtocolError::ZeroVersion)?;
    let payload = codec
        .serialize(message)
        .map_err(|source| ProtocolError::Encode {
            message_type,
            source,
        })?;
    Ok(frame_bytes(version, message_type, &payload))
}

/// [`serialize`] with [`CURRENT_VERSION`].
pub fn serialize_current<T: Serialize, C: PayloadCodec>(
    message_type: MessageType,
    message: &T,
    codec: &C,
) -> Result<Vec<u8>, ProtocolError> {
    serialize(message_type, message, CURRENT_VERSION, codec)
}

/// Serializes a typed payload under its own [`WireMessage::MESSAGE_TYPE`]
/// at [`CURRENT_VERSION`].
pub fn encode_message<M: WireMessage, C: PayloadCodec>(
    message: &M,
    codec: &C,
) -> Result<Vec<u8>, ProtocolError> {
    serialize(M::MESSAGE_TYPE, message, CURRENT_VERSION, codec)
}

fn frame_bytes(version: NonZeroU8, message_type: MessageType, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.push(version.get());
    buf.push(message_type.as_byte());
    buf.extend_from_slice(payload);
    buf
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Splits a buffer into header fields and a borrowed payload slice.
///
/// Only the header is inspected. An unknown type byte parses fine as
/// [`MessageType::Unrecognized`]. The version byte is returned as-is;
/// deciding what to do with versions it doesn't speak is the caller's
/// call.
///
/// # Errors
/// [`ProtocolError::Framing`] if `bytes.len() < HEADER_LEN`.
pub fn parse(bytes: &[u8]) -> Result<Frame<'_>, ProtocolError> {
    match bytes {
        [version, message_type, payload @ ..] => Ok(Frame {
            version: *version,
            message_type: MessageType::from_byte(*message_type),
            payload,
        }),
        _ => Err(ProtocolError::Framing { len: bytes.len() }),
    }
}

/// Decodes a bare payload slice as `T`.
///
/// Prefer [`Frame::decode`], which records the message type in errors.
///
/// # Errors
/// [`ProtocolError::PayloadDecode`] with `message_type: None`.
pub fn deserialize_payload<T: DeserializeOwned, C: PayloadCodec>(
    payload: &[u8],
    codec: &C,
) -> Result<T, ProtocolError> {
    codec
        .deserialize(payload)
        .map_err(|source| payload_decode_error(None, payload, source))
}

/// [`parse`] then [`Frame::decode`], without copying the payload.
pub fn parse_and_deserialize<T: DeserializeOwned, C: PayloadCodec>(
    bytes: &[u8],
    codec: &C,
) -> Result<Decoded<T>, ProtocolError> {
    let frame = parse(bytes)?;
    let message = frame.decode(codec)?;
    Ok(Decoded {
        version: frame.version,
        message_type: frame.message_type,
        message,
    })
}

fn payload_decode_error(
    message_type: Option<MessageType>,
    payload: &[u8],
    source: CodecError,
) -> ProtocolError {
    ProtocolError::PayloadDecode {
        message_type,
        len: payload.len(),
        source,
    }
}
