//! Error types for the sync layer.

/// Errors from building or applying snapshots and deltas.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// A snapshot or delta is older than state already applied (or sent).
    ///
    /// Ticks are non-decreasing within a session; an older update arriving
    /// late (reordering, retransmission) must not roll state back.
    #[error("stale tick {got}: already at tick {last}")]
    StaleTick { last: u32, got: u32 },
}
