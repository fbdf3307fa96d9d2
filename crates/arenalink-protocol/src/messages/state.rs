//! World state payloads: full snapshots, partial deltas, and match phase.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use super::{InvalidDiscriminant, WireMessage};
use crate::MessageType;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Identifies an entity within one arena session.
///
/// Newtype over the wire's `int` so an entity id can't be mixed up with
/// a tick or an action state. `#[serde(transparent)]` keeps it a plain
/// number on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(pub i32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// MatchPhase
// ---------------------------------------------------------------------------

/// Where the match is in its lifecycle.
///
/// ```text
/// Waiting → Countdown → Fighting ⇄ Opportunity
///                          ⇅
///                      Cinematic → … → Finished
/// ```
///
/// Serialized as its integer value (`#[serde(into = "u8", try_from = "u8")]`)
/// rather than as a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum MatchPhase {
    #[default]
    Waiting,
    Countdown,
    Fighting,
    Opportunity,
    Cinematic,
    Finished,
}

impl From<MatchPhase> for u8 {
    fn from(phase: MatchPhase) -> Self {
        match phase {
            MatchPhase::Waiting => 0,
            MatchPhase::Countdown => 1,
            MatchPhase::Fighting => 2,
            MatchPhase::Opportunity => 3,
            MatchPhase::Cinematic => 4,
            MatchPhase::Finished => 5,
        }
    }
}

impl TryFrom<u8> for MatchPhase {
    type Error = InvalidDiscriminant;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Waiting),
            1 => Ok(Self::Countdown),
            2 => Ok(Self::Fighting),
            3 => Ok(Self::Opportunity),
            4 => Ok(Self::Cinematic),
            5 => Ok(Self::Finished),
            other => Err(InvalidDiscriminant::new("MatchPhase", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Entity state
// ---------------------------------------------------------------------------

/// Everything a client renders for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityState {
    pub entity_id: EntityId,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Yaw in radians.
    pub rotation_y: f32,
    pub health: f32,
    /// Animation/behavior discriminator. Owned by the simulation; this
    /// crate never interprets it.
    pub action_state: i32,
}

impl EntityState {
    /// A zeroed state for `entity_id`.
    pub fn new(entity_id: EntityId) -> Self {
        Self {
            entity_id,
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Who is doing what to whom during a cinematic.
///
/// Not a wire type: it's the grouped view of the four `cinematic_*`
/// fields on [`ArenaStateSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CinematicContext {
    pub cinematic_id: Option<String>,
    /// Player slot, 0 or 1.
    pub attacker_slot: u8,
    /// Player slot, 0 or 1.
    pub defender_slot: u8,
    pub target_id: Option<String>,
}

/// The complete world at one tick.
///
/// The `cinematic_*` fields only carry meaning while `phase` is
/// [`MatchPhase::Cinematic`]; otherwise they stay `None`/`0`. Build
/// snapshots through [`ArenaStateSnapshot::new`] and
/// [`ArenaStateSnapshot::with_cinematic`] to keep it that way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArenaStateSnapshot {
    /// Non-decreasing within a session.
    pub tick: u32,
    pub entities: Vec<EntityState>,
    pub phase: MatchPhase,
    #[serde(default)]
    pub cinematic_id: Option<String>,
    #[serde(default)]
    pub cinematic_attacker: u8,
    #[serde(default)]
    pub cinematic_defender: u8,
    #[serde(default)]
    pub cinematic_target_id: Option<String>,
}

impl ArenaStateSnapshot {
    /// A snapshot with no cinematic context.
    pub fn new(tick: u32, phase: MatchPhase, entities: Vec<EntityState>) -> Self {
        Self {
            tick,
            entities,
            phase,
            cinematic_id: None,
            cinematic_attacker: 0,
            cinematic_defender: 0,
            cinematic_target_id: None,
        }
    }

    /// Switches the snapshot into the cinematic phase with `context`.
    pub fn with_cinematic(mut self, context: CinematicContext) -> Self {
        self.phase = MatchPhase::Cinematic;
        self.cinematic_id = context.cinematic_id;
        self.cinematic_attacker = context.attacker_slot;
        self.cinematic_defender = context.defender_slot;
        self.cinematic_target_id = context.target_id;
        self
    }

    /// The cinematic fields, if the snapshot is in the cinematic phase.
    pub fn cinematic_context(&self) -> Option<CinematicContext> {
        (self.phase == MatchPhase::Cinematic).then(|| CinematicContext {
            cinematic_id: self.cinematic_id.clone(),
            attacker_slot: self.cinematic_attacker,
            defender_slot: self.cinematic_defender,
            target_id: self.cinematic_target_id.clone(),
        })
    }

    /// `false` if cinematic fields are set outside the cinematic phase.
    ///
    /// The wire format can't prevent that combination, so receivers
    /// that care can check it.
    pub fn cinematic_fields_consistent(&self) -> bool {
        self.phase == MatchPhase::Cinematic
            || (self.cinematic_id.is_none()
                && self.cinematic_attacker == 0
                && self.cinematic_defender == 0
                && self.cinematic_target_id.is_none())
    }
}

impl WireMessage for ArenaStateSnapshot {
    const MESSAGE_TYPE: MessageType = MessageType::ArenaStateSnapshot;
}

// ---------------------------------------------------------------------------
// Delta
// ---------------------------------------------------------------------------

/// Which fields of an [`EntityDelta`] are real updates.
///
/// A bitmask newtype: combine flags with `|`.
///
/// ```rust
/// use arenalink_protocol::EntityDeltaFlags;
///
/// let flags = EntityDeltaFlags::POSITION | EntityDeltaFlags::HEALTH;
/// assert!(flags.contains(EntityDeltaFlags::HEALTH));
/// assert!(!flags.contains(EntityDeltaFlags::ROTATION));
/// assert_eq!(flags.bits(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityDeltaFlags(u8);

impl EntityDeltaFlags {
    pub const NONE: Self = Self(0);
    /// `x`, `y` and `z`.
    pub const POSITION: Self = Self(1);
    pub const ROTATION: Self = Self(2);
    pub const HEALTH: Self = Self(4);
    pub const ACTION_STATE: Self = Self(8);
    pub const ALL: Self = Self(1 | 2 | 4 | 8);

    /// Wraps raw bits. Unknown high bits are kept so a newer sender's
    /// flags survive a round trip, but no known field reads them.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// `true` if every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for EntityDeltaFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for EntityDeltaFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for EntityDeltaFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(EntityDeltaFlags, &str); 4] = [
            (EntityDeltaFlags::POSITION, "Position"),
            (EntityDeltaFlags::ROTATION, "Rotation"),
            (EntityDeltaFlags::HEALTH, "Health"),
            (EntityDeltaFlags::ACTION_STATE, "ActionState"),
        ];
        let set: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if set.is_empty() {
            write!(f, "None")
        } else {
            write!(f, "{}", set.join("|"))
        }
    }
}

/// A partial update for one entity.
///
/// The payload is fixed-width: every field is always present. Only the
/// fields whose bit is set in `flags` are updates; the rest are filler
/// and must be ignored. [`EntityDelta::apply_to`] enforces that.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDelta {
    pub entity_id: EntityId,
    pub flags: EntityDeltaFlags,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rotation_y: f32,
    pub health: f32,
    pub action_state: i32,
}

impl EntityDelta {
    /// Builds a delta carrying `state`'s values for the fields in
    /// `flags`. Unflagged fields are zero.
    pub fn from_state(state: &EntityState, flags: EntityDeltaFlags) -> Self {
        let mut delta = Self {
            entity_id: state.entity_id,
            flags,
            ..Default::default()
        };
        if flags.contains(EntityDeltaFlags::POSITION) {
            delta.x = state.x;
            delta.y = state.y;
            delta.z = state.z;
        }
        if flags.contains(EntityDeltaFlags::ROTATION) {
            delta.rotation_y = state.rotation_y;
        }
        if flags.contains(EntityDeltaFlags::HEALTH) {
            delta.health = state.health;
        }
        if flags.contains(EntityDeltaFlags::ACTION_STATE) {
            delta.action_state = state.action_state;
        }
        delta
    }

    /// Writes the flagged fields into `state`. Unflagged fields of
    /// `state` are left untouched whatever this delta carries for them.
    pub fn apply_to(&self, state: &mut EntityState) {
        if self.flags.contains(EntityDeltaFlags::POSITION) {
            state.x = self.x;
            state.y = self.y;
            state.z = self.z;
        }
        if self.flags.contains(EntityDeltaFlags::ROTATION) {
            state.rotation_y = self.rotation_y;
        }
        if self.flags.contains(EntityDeltaFlags::HEALTH) {
            state.health = self.health;
        }
        if self.flags.contains(EntityDeltaFlags::ACTION_STATE) {
            state.action_state = self.action_state;
        }
    }
}

/// Changed entities since the last snapshot or delta.
///
/// An entity missing from `entities` did not change. It is never sent
/// with empty flags.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArenaStateDelta {
    pub tick: u32,
    pub entities: Vec<EntityDelta>,
}

impl ArenaStateDelta {
    /// `true` if no entity changed this tick.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl WireMessage for ArenaStateDelta {
    const MESSAGE_TYPE: MessageType = MessageType::ArenaStateDelta;
}

// ---------------------------------------------------------------------------
// Match state
// ---------------------------------------------------------------------------

/// Phase changes and match results, sent when the phase moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStateMessage {
    pub tick: u32,
    pub phase: MatchPhase,
    /// Time left in the current phase, when it is timed (countdown).
    #[serde(default)]
    pub phase_remaining_ms: Option<u32>,
    /// Winning player slot once `phase` is `Finished`. `None` for a draw
    /// or while the match is still running.
    #[serde(default)]
    pub winner_slot: Option<u8>,
}

impl WireMessage for MatchStateMessage {
    const MESSAGE_TYPE: MessageType = MessageType::MatchState;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(id: i32) -> EntityState {
        EntityState {
            entity_id: EntityId(id),
            x: 1.0,
            y: 2.0,
            z: 3.0,
            rotation_y: 0.5,
            health: 80.0,
            action_state: 4,
        }
    }

    // =====================================================================
    // MatchPhase
    // =====================================================================

    #[test]
    fn test_match_phase_serializes_as_integer() {
        let json = serde_json::to_string(&MatchPhase::Fighting).unwrap();
        assert_eq!(json, "2");
        let phase: MatchPhase = serde_json::from_str("4").unwrap();
        assert_eq!(phase, MatchPhase::Cinematic);
    }

    #[test]
    fn test_match_phase_out_of_range_returns_error() {
        assert_eq!(
            MatchPhase::try_from(6u8),
            Err(InvalidDiscriminant::new("MatchPhase", 6))
        );
        let result: Result<MatchPhase, _> = serde_json::from_str("9");
        assert!(result.is_err());
    }

    // =====================================================================
    // Snapshot
    // =====================================================================

    #[test]
    fn test_snapshot_new_has_no_cinematic_fields() {
        let snap = ArenaStateSnapshot::new(1, MatchPhase::Fighting, vec![state(1)]);
        assert!(snap.cinematic_context().is_none());
        assert!(snap.cinematic_fields_consistent());
    }

    #[test]
    fn test_snapshot_with_cinematic_sets_phase_and_context() {
        let context = CinematicContext {
            cinematic_id: Some("finisher-02".into()),
            attacker_slot: 1,
            defender_slot: 0,
            target_id: None,
        };
        let snap = ArenaStateSnapshot::new(10, MatchPhase::Fighting, vec![])
            .with_cinematic(context.clone());
        assert_eq!(snap.phase, MatchPhase::Cinematic);
        assert_eq!(snap.cinematic_context(), Some(context));
    }

    #[test]
    fn test_snapshot_cinematic_fields_outside_cinematic_are_inconsistent() {
        let mut snap = ArenaStateSnapshot::new(1, MatchPhase::Fighting, vec![]);
        snap.cinematic_attacker = 1;
        assert!(!snap.cinematic_fields_consistent());
    }

    #[test]
    fn test_snapshot_json_absent_optionals_decode_as_none() {
        let json = r#"{"tick":3,"entities":[],"phase":2}"#;
        let snap: ArenaStateSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap, ArenaStateSnapshot::new(3, MatchPhase::Fighting, vec![]));
    }

    #[test]
    fn test_snapshot_empty_cinematic_id_stays_distinct_from_none() {
        let mut snap = ArenaStateSnapshot::new(1, MatchPhase::Cinematic, vec![]);
        snap.cinematic_id = Some(String::new());
        let bytes = serde_json::to_vec(&snap).unwrap();
        let back: ArenaStateSnapshot = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.cinematic_id, Some(String::new()));
    }

    // =====================================================================
    // Flags
    // =====================================================================

    #[test]
    fn test_flags_insert_remove_contains() {
        let mut flags = EntityDeltaFlags::NONE;
        assert!(flags.is_empty());
        flags.insert(EntityDeltaFlags::ROTATION);
        flags |= EntityDeltaFlags::ACTION_STATE;
        assert_eq!(flags.bits(), 10);
        flags.remove(EntityDeltaFlags::ROTATION);
        assert_eq!(flags, EntityDeltaFlags::ACTION_STATE);
        assert!(EntityDeltaFlags::ALL.contains(flags));
    }

    #[test]
    fn test_flags_serialize_as_plain_number() {
        let flags = EntityDeltaFlags::POSITION | EntityDeltaFlags::HEALTH;
        assert_eq!(serde_json::to_string(&flags).unwrap(), "5");
    }

    #[test]
    fn test_flags_display() {
        assert_eq!(EntityDeltaFlags::NONE.to_string(), "None");
        assert_eq!(
            (EntityDeltaFlags::POSITION | EntityDeltaFlags::ACTION_STATE).to_string(),
            "Position|ActionState"
        );
    }

    // =====================================================================
    // EntityDelta
    // =====================================================================

    #[test]
    fn test_delta_from_state_zero_fills_unflagged_fields() {
        let delta = EntityDelta::from_state(&state(3), EntityDeltaFlags::HEALTH);
        assert_eq!(delta.entity_id, EntityId(3));
        assert_eq!(delta.health, 80.0);
        assert_eq!(delta.x, 0.0);
        assert_eq!(delta.rotation_y, 0.0);
        assert_eq!(delta.action_state, 0);
    }

    #[test]
    fn test_delta_apply_position_only_leaves_health_and_action_state() {
        let mut target = state(1);
        let delta = EntityDelta {
            entity_id: EntityId(1),
            flags: EntityDeltaFlags::POSITION,
            x: 9.0,
            y: 8.0,
            z: 7.0,
            rotation_y: 3.0,
            health: -1.0,
            action_state: 99,
        };

        delta.apply_to(&mut target);

        assert_eq!((target.x, target.y, target.z), (9.0, 8.0, 7.0));
        assert_eq!(target.rotation_y, 0.5);
        assert_eq!(target.health, 80.0);
        assert_eq!(target.action_state, 4);
    }

    #[test]
    fn test_delta_apply_all_flags_overwrites_everything_but_id() {
        let mut target = EntityState::new(EntityId(5));
        let source = EntityState {
            entity_id: EntityId(5),
            ..state(5)
        };
        EntityDelta::from_state(&source, EntityDeltaFlags::ALL).apply_to(&mut target);
        assert_eq!(target, source);
    }

    // =====================================================================
    // MatchStateMessage
    // =====================================================================

    #[test]
    fn test_match_state_json_shape() {
        let msg = MatchStateMessage {
            tick: 600,
            phase: MatchPhase::Finished,
            phase_remaining_ms: None,
            winner_slot: Some(1),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["phase"], 5);
        assert_eq!(json["winnerSlot"], 1);
        assert!(json["phaseRemainingMs"].is_null());
    }
}
