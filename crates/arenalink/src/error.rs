//! Unified error type for Arenalink.

use arenalink_exchange::ExchangeError;
use arenalink_protocol::{CodecError, ProtocolError};
use arenalink_sync::SyncError;

/// Top-level error wrapping every layer's error.
///
/// `#[from]` on each variant lets `?` convert layer errors directly.
#[derive(Debug, thiserror::Error)]
pub enum ArenalinkError {
    /// Framing, construction or payload decode failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A payload codec used directly, outside the envelope.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Out-of-order snapshot or delta.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Invalid opportunity response or refused cinematic extension.
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}
