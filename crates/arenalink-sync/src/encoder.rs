//! Sender side of the delta policy.
//!
//! The server keeps, per entity, the state it last put on the wire (the
//! "baseline"). Each tick it asks the encoder for a delta: entities whose
//! state matches the baseline are left out entirely, and changed entities
//! carry exactly the flags of the fields that moved.
//!
//! ```text
//! snapshot(t0) ──→ baseline = full state
//!       │
//! delta(t1) ──→ changed entities only, field-gated ──→ baseline += sent fields
//!       │
//! delta(t2) ──→ …
//! ```

use std::collections::HashMap;

use arenalink_protocol::{
    ArenaStateDelta, ArenaStateSnapshot, EntityDelta, EntityDeltaFlags, EntityId, EntityState,
    MatchPhase,
};
use tracing::{debug, trace};

use crate::{SyncConfig, SyncError};

/// Builds snapshots and deltas for one session's stream of world states.
///
/// One encoder per receiving client: the baseline is "what this client
/// was last told", and two clients joined at different times have
/// different baselines.
#[derive(Debug, Default)]
pub struct DeltaEncoder {
    config: SyncConfig,
    baseline: HashMap<EntityId, EntityState>,
    last_tick: Option<u32>,
}

impl DeltaEncoder {
    /// Creates an encoder with an empty baseline.
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config: config.validated(),
            baseline: HashMap::new(),
            last_tick: None,
        }
    }

    /// Emits a full snapshot and resets the baseline to exactly `entities`.
    ///
    /// Use for the first message to a client, after it reports lost state,
    /// or whenever entities have been removed (a delta can't express
    /// removal).
    ///
    /// # Errors
    /// [`SyncError::StaleTick`] if `tick` is older than the last one sent.
    pub fn snapshot(
        &mut self,
        tick: u32,
        phase: MatchPhase,
        entities: &[EntityState],
    ) -> Result<ArenaStateSnapshot, SyncError> {
        self.check_tick(tick)?;

        self.baseline = entities.iter().map(|e| (e.entity_id, *e)).collect();
        self.last_tick = Some(tick);

        debug!(tick, entities = self.baseline.len(), "snapshot baseline reset");
        Ok(ArenaStateSnapshot::new(tick, phase, entities.to_vec()))
    }

    /// Emits a delta of `entities` against the baseline.
    ///
    /// - Entities unchanged within the [`SyncConfig`] thresholds are
    ///   omitted.
    /// - Changed entities carry only their changed flags; other fields
    ///   are zero.
    /// - Entities missing from the baseline are sent with all flags.
    ///
    /// The baseline advances only for the fields that were sent.
    ///
    /// # Errors
    /// [`SyncError::StaleTick`] if `tick` is older than the last one sent.
    pub fn delta(
        &mut self,
        tick: u32,
        entities: &[EntityState],
    ) -> Result<ArenaStateDelta, SyncError> {
        self.check_tick(tick)?;

        let mut changed = Vec::new();
        for current in entities {
            let flags = match self.baseline.get(&current.entity_id) {
                Some(previous) => self.config.changed_flags(previous, current),
                None => EntityDeltaFlags::ALL,
            };
            if flags.is_empty() {
                continue;
            }

            let delta = EntityDelta::from_state(current, flags);
            delta.apply_to(
                self.baseline
                    .entry(current.entity_id)
                    .or_insert_with(|| EntityState::new(current.entity_id)),
            );
            changed.push(delta);
        }

        self.last_tick = Some(tick);
        trace!(
            tick,
            changed = changed.len(),
            total = entities.len(),
            "delta built"
        );
        Ok(ArenaStateDelta {
            tick,
            entities: changed,
        })
    }

    /// Drops an entity from the baseline.
    ///
    /// If it shows up in a later delta it's sent in full, as a new entity.
    /// Returns `true` if it was tracked.
    pub fn forget(&mut self, entity_id: EntityId) -> bool {
        self.baseline.remove(&entity_id).is_some()
    }

    /// What the client was last told about `entity_id`.
    pub fn baseline(&self, entity_id: EntityId) -> Option<&EntityState> {
        self.baseline.get(&entity_id)
    }

    /// Number of entities in the baseline.
    pub fn len(&self) -> usize {
        self.baseline.len()
    }

    /// `true` if nothing has been sent yet (or everything was forgotten).
    pub fn is_empty(&self) -> bool {
        self.baseline.is_empty()
    }

    /// The most recent tick passed to `snapshot` or `delta`.
    pub fn last_tick(&self) -> Option<u32> {
        self.last_tick
    }

    fn check_tick(&self, tick: u32) -> Result<(), SyncError> {
        match self.last_tick {
            Some(last) if tick < last => Err(SyncError::StaleTick { last, got: tick }),
            _ => Ok(()),
        }
    }
}
