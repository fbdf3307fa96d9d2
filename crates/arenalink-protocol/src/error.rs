//! Error types for the protocol layer.
//!
//! Two enums, one per layer of the wire format:
//!
//! - [`CodecError`]: the payload codec couldn't turn a value into bytes
//!   or bytes back into a value.
//! - [`ProtocolError`]: what the envelope functions return. Codec
//!   failures are wrapped with the frame context (type, length) so the
//!   caller can log and drop the connection without re-deriving it.

use crate::MessageType;

/// Errors produced by a [`PayloadCodec`](crate::PayloadCodec).
///
/// Variants that depend on an optional codec only exist when that
/// codec's feature is enabled.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON (de)serialization failed.
    #[cfg(feature = "json")]
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// bincode (de)serialization failed.
    #[cfg(feature = "compact")]
    #[error("bincode: {0}")]
    Bincode(#[from] bincode::Error),

    /// Compressing or decompressing the payload body failed.
    #[error("compression: {0}")]
    Compression(#[source] std::io::Error),

    /// The payload's first byte isn't a compression marker we know.
    #[error("unknown compression marker {0:#04x}")]
    UnknownMarker(u8),

    /// The payload is empty but the codec needs at least a marker byte.
    #[error("empty payload")]
    Empty,

    /// The decompressed body would exceed the configured limit.
    #[error("payload exceeds {max} bytes")]
    TooLarge { max: usize },
}

/// Errors returned by the envelope functions.
///
/// Each variant maps to one failure class of the wire format. An
/// unrecognized message type is not one of them: it parses successfully
/// as [`MessageType::Unrecognized`].
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A frame was requested with protocol version 0.
    ///
    /// Version 0 is reserved and never transmitted. This is returned
    /// before the payload is serialized.
    #[error("protocol version 0 is reserved")]
    ZeroVersion,

    /// The buffer is too short to hold the 2-byte header.
    #[error("frame too short: {len} bytes, need at least {min}", min = crate::HEADER_LEN)]
    Framing { len: usize },

    /// The payload codec failed to serialize an outgoing message.
    #[error("failed to encode {message_type} payload: {source}")]
    Encode {
        message_type: MessageType,
        #[source]
        source: CodecError,
    },

    /// The payload codec failed to deserialize a payload slice.
    ///
    /// `message_type` is `None` when the slice was decoded on its own
    /// via [`deserialize_payload`](crate::deserialize_payload) and the
    /// caller didn't say which frame it came from.
    #[error(
        "failed to decode {} payload ({len} bytes): {source}",
        type_label(.message_type)
    )]
    PayloadDecode {
        message_type: Option<MessageType>,
        len: usize,
        #[source]
        source: CodecError,
    },
}

fn type_label(message_type: &Option<MessageType>) -> String {
    match message_type {
        Some(t) => t.to_string(),
        None => "untyped".to_string(),
    }
}
