//! Payload codecs: how a message struct becomes the bytes after the header.
//!
//! The envelope never looks inside the payload. It hands the message to
//! whatever implements [`PayloadCodec`] and copies the result after the
//! 2-byte header. Swapping the codec changes the payload encoding without
//! touching framing.
//!
//! Two implementations ship with the crate:
//!
//! - [`CompactCodec`] (feature `compact`): bincode body, deflate-compressed
//!   when it's worth it. This is the production codec.
//! - [`JsonCodec`] (feature `json`): plain JSON, no compression. Readable
//!   in logs and browser DevTools, useful while debugging a client.
//!
//! Both sides of a connection must agree on the codec; nothing on the wire
//! says which one produced a payload.

use serde::{Serialize, de::DeserializeOwned};

use crate::CodecError;

#[cfg(feature = "compact")]
use std::io::{Read, Write};

#[cfg(feature = "compact")]
use serde::Deserialize;

/// Serializes payload structs to bytes and back.
///
/// ## Contract
///
/// - `deserialize(serialize(x)) == x` for every valid `x`.
/// - Output is deterministic: the same value and configuration always
///   produce the same bytes.
///
/// ## Trait bounds
///
/// `Send + Sync + 'static` lets one codec instance be shared by every
/// connection task. Implementations hold configuration only, never
/// per-message state.
pub trait PayloadCodec: Send + Sync + 'static {
    /// Serializes a value into payload bytes.
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    /// Deserializes payload bytes into a value.
    ///
    /// `DeserializeOwned` means the result owns its data, so the input
    /// buffer can be dropped (or reused for the next packet) right after.
    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`PayloadCodec`] that writes JSON via `serde_json`.
///
/// ```rust
/// use arenalink_protocol::{JsonCodec, PayloadCodec, PingMessage};
///
/// let codec = JsonCodec;
/// let bytes = codec.serialize(&PingMessage { client_time_ms: 5000 }).unwrap();
/// assert_eq!(bytes, br#"{"clientTimeMs":5000}"#);
///
/// let back: PingMessage = codec.deserialize(&bytes).unwrap();
/// assert_eq!(back.client_time_ms, 5000);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl PayloadCodec for JsonCodec {
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError> {
        Ok(serde_json::from_slice(data)?)
    }
}

// ---------------------------------------------------------------------------
// CompactCodec
// ---------------------------------------------------------------------------

/// Marker byte: the rest of the payload is a raw bincode body.
#[cfg(feature = "compact")]
const MARKER_RAW: u8 = 0;

/// Marker byte: the rest of the payload is a deflate stream of the body.
#[cfg(feature = "compact")]
const MARKER_DEFLATE: u8 = 1;

/// How hard [`CompactCodec`] tries to shrink a payload.
#[cfg(feature = "compact")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum CompressionLevel {
    /// Never compress. Every payload is stored raw.
    None,
    /// Fastest deflate level.
    Fast,
    /// Deflate's default trade-off.
    #[default]
    Balanced,
    /// Smallest output, most CPU.
    Best,
}

#[cfg(feature = "compact")]
impl CompressionLevel {
    fn to_flate2(self) -> Option<flate2::Compression> {
        match self {
            Self::None => None,
            Self::Fast => Some(flate2::Compression::fast()),
            Self::Balanced => Some(flate2::Compression::default()),
            Self::Best => Some(flate2::Compression::best()),
        }
    }
}

/// Configuration for [`CompactCodec`].
#[cfg(feature = "compact")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactCodecConfig {
    /// Compression level for bodies at or above `min_compress_len`.
    pub compression: CompressionLevel,

    /// Bodies shorter than this are stored raw. Deflate's own framing
    /// outweighs the savings on tiny messages like input or pings.
    pub min_compress_len: usize,

    /// Upper bound on a decoded body, checked after decompression.
    /// A tiny deflate stream can expand enormously; this caps it.
    pub max_payload_len: usize,
}

#[cfg(feature = "compact")]
impl Default for CompactCodecConfig {
    fn default() -> Self {
        Self {
            compression: CompressionLevel::default(),
            min_compress_len: 64,
            max_payload_len: 1024 * 1024,
        }
    }
}

#[cfg(feature = "compact")]
impl CompactCodecConfig {
    /// Smallest accepted `max_payload_len`.
    pub const MIN_PAYLOAD_LIMIT: usize = 1024;

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called by [`CompactCodec::new`]. `max_payload_len` is raised to
    /// [`Self::MIN_PAYLOAD_LIMIT`] if set lower.
    pub fn validated(mut self) -> Self {
        if self.max_payload_len < Self::MIN_PAYLOAD_LIMIT {
            tracing::warn!(
                max_payload_len = self.max_payload_len,
                min = Self::MIN_PAYLOAD_LIMIT,
                "max_payload_len below minimum, clamping"
            );
            self.max_payload_len = Self::MIN_PAYLOAD_LIMIT;
        }
        self
    }
}

/// Binary [`PayloadCodec`]: bincode with optional deflate compression.
///
/// ## Payload layout
///
/// ```text
/// byte 0     : 0 = raw body, 1 = deflate-compressed body
/// bytes 1..N : the body
/// ```
///
/// The marker lives inside the payload, so the envelope stays ignorant
/// of compression. A body is compressed only when it is at least
/// `min_compress_len` bytes and deflate actually makes it smaller.
#[cfg(feature = "compact")]
#[derive(Debug, Clone)]
pub struct CompactCodec {
    config: CompactCodecConfig,
}

#[cfg(feature = "compact")]
impl CompactCodec {
    /// Creates a codec from config (validated first).
    pub fn new(config: CompactCodecConfig) -> Self {
        Self {
            config: config.validated(),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &CompactCodecConfig {
        &self.config
    }

    fn compress(&self, body: &[u8], level: flate2::Compression) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(body.len() / 2 + 1);
        out.push(MARKER_DEFLATE);
        let mut encoder = flate2::write::DeflateEncoder::new(out, level);
        encoder.write_all(body).map_err(CodecError::Compression)?;
        encoder.finish().map_err(CodecError::Compression)
    }

    fn inflate(&self, compressed: &[u8]) -> Result<Vec<u8>, CodecError> {
        let max = self.config.max_payload_len;
        let mut body = Vec::new();
        // Read one byte past the limit so "exactly max" and "over max"
        // are distinguishable.
        flate2::read::DeflateDecoder::new(compressed)
            .take(max as u64 + 1)
            .read_to_end(&mut body)
            .map_err(CodecError::Compression)?;
        if body.len() > max {
            return Err(CodecError::TooLarge { max });
        }
        Ok(body)
    }
}

#[cfg(feature = "compact")]
impl Default for CompactCodec {
    fn default() -> Self {
        Self::new(CompactCodecConfig::default())
    }
}

#[cfg(feature = "compact")]
impl PayloadCodec for CompactCodec {
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        let body = bincode::serialize(value)?;

        if let Some(level) = self.config.compression.to_flate2() {
            if body.len() >= self.config.min_compress_len {
                let compressed = self.compress(&body, level)?;
                if compressed.len() <= body.len() {
                    return Ok(compressed);
                }
            }
        }

        let mut out = Vec::with_capacity(body.len() + 1);
        out.push(MARKER_RAW);
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError> {
        let (&marker, rest) = data.split_first().ok_or(CodecError::Empty)?;
        match marker {
            MARKER_RAW => {
                if rest.len() > self.config.max_payload_len {
                    return Err(CodecError::TooLarge {
                        max: self.config.max_payload_len,
                    });
                }
                Ok(bincode::deserialize(rest)?)
            }
            MARKER_DEFLATE => {
                let body = self.inflate(rest)?;
                Ok(bincode::deserialize(&body)?)
            }
            other => Err(CodecError::UnknownMarker(other)),
        }
    }
}

#[cfg(all(test, feature = "json", feature = "compact"))]
mod tests {
    use super::*;
    use crate::{CombatEvent, CombatEventMessage, CombatEventType, PingMessage};

    fn big_combat_batch() -> CombatEventMessage {
        // 50 near-identical events: large and very compressible.
        let events = (0..50)
            .map(|i| CombatEvent {
                event_type: CombatEventType::Hit,
                source_entity_id: crate::EntityId(1),
                target_entity_id: crate::EntityId(2),
                amount: 5.0,
                remaining_hp: 100.0 - i as f32,
                duration_ms: 0,
            })
            .collect();
        CombatEventMessage { tick: 9, events }
    }

    // =====================================================================
    // JsonCodec
    // =====================================================================

    #[test]
    fn test_json_codec_uses_camel_case_field_names() {
        let bytes = JsonCodec.serialize(&PingMessage { client_time_ms: 1 }).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["clientTimeMs"], 1);
    }

    #[test]
    fn test_json_codec_decode_garbage_returns_error() {
        let result: Result<PingMessage, _> = JsonCodec.deserialize(b"not json");
        assert!(matches!(result, Err(CodecError::Json(_))));
    }

    // =====================================================================
    // CompactCodec
    // =====================================================================

    #[test]
    fn test_compact_small_payload_stored_raw() {
        let codec = CompactCodec::default();
        let bytes = codec.serialize(&PingMessage { client_time_ms: 7 }).unwrap();
        assert_eq!(bytes[0], MARKER_RAW);
        // marker + u64
        assert_eq!(bytes.len(), 9);
    }

    #[test]
    fn test_compact_large_payload_is_compressed_and_round_trips() {
        let codec = CompactCodec::default();
        let msg = big_combat_batch();
        let raw_len = bincode::serialize(&msg).unwrap().len();

        let bytes = codec.serialize(&msg).unwrap();
        assert_eq!(bytes[0], MARKER_DEFLATE);
        assert!(bytes.len() < raw_len);

        let decoded: CombatEventMessage = codec.deserialize(&bytes).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_compact_compression_none_never_compresses() {
        let codec = CompactCodec::new(CompactCodecConfig {
            compression: CompressionLevel::None,
            ..Default::default()
        });
        let bytes = codec.serialize(&big_combat_batch()).unwrap();
        assert_eq!(bytes[0], MARKER_RAW);
    }

    #[test]
    fn test_compact_output_is_deterministic() {
        let codec = CompactCodec::default();
        let a = codec.serialize(&big_combat_batch()).unwrap();
        let b = codec.serialize(&big_combat_batch()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_compact_empty_payload_returns_error() {
        let result: Result<PingMessage, _> = CompactCodec::default().deserialize(&[]);
        assert!(matches!(result, Err(CodecError::Empty)));
    }

    #[test]
    fn test_compact_unknown_marker_returns_error() {
        let result: Result<PingMessage, _> =
            CompactCodec::default().deserialize(&[9, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert!(matches!(result, Err(CodecError::UnknownMarker(9))));
    }

    #[test]
    fn test_compact_truncated_body_returns_bincode_error() {
        let result: Result<PingMessage, _> =
            CompactCodec::default().deserialize(&[MARKER_RAW, 1, 2]);
        assert!(matches!(result, Err(CodecError::Bincode(_))));
    }

    #[test]
    fn test_compact_decompression_bomb_is_capped() {
        // 64 KiB of zeros compresses to a few hundred bytes.
        let zeros = vec![0u8; 64 * 1024];
        let mut encoder = flate2::write::DeflateEncoder::new(
            vec![MARKER_DEFLATE],
            flate2::Compression::best(),
        );
        encoder.write_all(&zeros).unwrap();
        let payload = encoder.finish().unwrap();

        let codec = CompactCodec::new(CompactCodecConfig {
            max_payload_len: 4096,
            ..Default::default()
        });
        let result: Result<Vec<u8>, _> = codec.deserialize(&payload);
        assert!(matches!(result, Err(CodecError::TooLarge { max: 4096 })));
    }

    #[test]
    fn test_compact_config_validated_clamps_payload_limit() {
        let config = CompactCodecConfig {
            max_payload_len: 10,
            ..Default::default()
        }
        .validated();
        assert_eq!(config.max_payload_len, CompactCodecConfig::MIN_PAYLOAD_LIMIT);
    }

    #[test]
    fn test_compression_level_default_is_balanced() {
        assert_eq!(CompressionLevel::default(), CompressionLevel::Balanced);
        assert_eq!(CompactCodecConfig::default().compression, CompressionLevel::Balanced);
    }
}
