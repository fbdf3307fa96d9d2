//! Change-detection thresholds for the delta encoder.

use arenalink_protocol::{EntityDeltaFlags, EntityState};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How much a field must move before it counts as changed.
///
/// All thresholds default to `0.0`: any difference is a change. Raising
/// them trades precision for bandwidth. The encoder only advances its
/// baseline for fields it actually sends, so small movements accumulate
/// until they cross the threshold instead of drifting away silently.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Largest per-axis change in `x`/`y`/`z` treated as "unchanged".
    pub position_epsilon: f32,
    /// Largest change in `rotation_y` (radians) treated as "unchanged".
    pub rotation_epsilon: f32,
    /// Largest change in `health` treated as "unchanged".
    pub health_epsilon: f32,
}

impl SyncConfig {
    /// Clamp negative or non-finite thresholds to `0.0`.
    pub fn validated(mut self) -> Self {
        for (name, value) in [
            ("position_epsilon", &mut self.position_epsilon),
            ("rotation_epsilon", &mut self.rotation_epsilon),
            ("health_epsilon", &mut self.health_epsilon),
        ] {
            if !value.is_finite() || *value < 0.0 {
                warn!(field = name, value = *value, "invalid sync threshold, using 0.0");
                *value = 0.0;
            }
        }
        self
    }

    /// Which fields of `current` differ from `previous` beyond the
    /// configured thresholds. `action_state` is compared exactly.
    pub fn changed_flags(&self, previous: &EntityState, current: &EntityState) -> EntityDeltaFlags {
        let mut flags = EntityDeltaFlags::NONE;
        if differs(previous.x, current.x, self.position_epsilon)
            || differs(previous.y, current.y, self.position_epsilon)
            || differs(previous.z, current.z, self.position_epsilon)
        {
            flags |= EntityDeltaFlags::POSITION;
        }
        if differs(previous.rotation_y, current.rotation_y, self.rotation_epsilon) {
            flags |= EntityDeltaFlags::ROTATION;
        }
        if differs(previous.health, current.health, self.health_epsilon) {
            flags |= EntityDeltaFlags::HEALTH;
        }
        if previous.action_state != current.action_state {
            flags |= EntityDeltaFlags::ACTION_STATE;
        }
        flags
    }
}

/// Bit-identical values never differ (so NaN → NaN is "unchanged");
/// otherwise the gap must exceed `epsilon`. A NaN on one side always
/// differs because `NaN <= epsilon` is false.
#[allow(clippy::neg_cmp_op_on_partial_ord)]
fn differs(a: f32, b: f32, epsilon: f32) -> bool {
    a.to_bits() != b.to_bits() && !((a - b).abs() <= epsilon)
}
