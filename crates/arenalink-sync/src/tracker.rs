//! Receiver side of the delta policy: the client's "last known state".
//!
//! Rules the tracker enforces:
//!
//! - A snapshot replaces everything.
//! - A delta touches only the entities it lists, and only their flagged
//!   fields. An entity absent from a delta keeps its state unmodified.
//! - Nothing older than the last applied tick is applied.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use arenalink_protocol::{
    ArenaStateDelta, ArenaStateSnapshot, EntityId, EntityState, MatchPhase, MatchStateMessage,
};
use tracing::{debug, trace};

use crate::SyncError;

/// What an [`EntityTracker::apply_delta`] call changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyReport {
    /// Known entities that received at least one flagged field.
    pub updated: usize,
    /// Entities seen for the first time in this delta.
    pub created: usize,
}

/// Per-entity state reconstructed from snapshots and deltas.
#[derive(Debug, Default)]
pub struct EntityTracker {
    entities: HashMap<EntityId, EntityState>,
    tick: Option<u32>,
    phase: MatchPhase,
}

impl EntityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all state with the snapshot's.
    ///
    /// # Errors
    /// [`SyncError::StaleTick`] if the snapshot is older than the last
    /// applied tick. State is left unchanged.
    pub fn apply_snapshot(&mut self, snapshot: &ArenaStateSnapshot) -> Result<(), SyncError> {
        self.check_tick(snapshot.tick)?;

        self.entities = snapshot
            .entities
            .iter()
            .map(|e| (e.entity_id, *e))
            .collect();
        self.tick = Some(snapshot.tick);
        self.phase = snapshot.phase;

        debug!(
            tick = snapshot.tick,
            entities = self.entities.len(),
            phase = ?snapshot.phase,
            "snapshot applied"
        );
        Ok(())
    }

    /// Applies the flagged fields of every listed entity.
    ///
    /// An entity the tracker hasn't seen starts from a zeroed state before
    /// its flagged fields are written.
    ///
    /// # Errors
    /// [`SyncError::StaleTick`] if the delta is older than the last
    /// applied tick. State is left unchanged.
    pub fn apply_delta(&mut self, delta: &ArenaStateDelta) -> Result<ApplyReport, SyncError> {
        self.check_tick(delta.tick)?;

        let mut report = ApplyReport::default();
        for entity_delta in &delta.entities {
            let state = match self.entities.entry(entity_delta.entity_id) {
                Entry::Occupied(slot) => {
                    report.updated += 1;
                    slot.into_mut()
                }
                Entry::Vacant(slot) => {
                    debug!(
                        entity = %entity_delta.entity_id,
                        flags = %entity_delta.flags,
                        "delta introduced unknown entity"
                    );
                    report.created += 1;
                    slot.insert(EntityState::new(entity_delta.entity_id))
                }
            };
            entity_delta.apply_to(state);
        }
        self.tick = Some(delta.tick);

        trace!(tick = delta.tick, ?report, "delta applied");
        Ok(report)
    }

    /// Records a phase change.
    ///
    /// # Errors
    /// [`SyncError::StaleTick`] if the message is older than the last
    /// applied tick.
    pub fn apply_match_state(&mut self, message: &MatchStateMessage) -> Result<(), SyncError> {
        self.check_tick(message.tick)?;
        if self.phase != message.phase {
            debug!(from = ?self.phase, to = ?message.phase, tick = message.tick, "phase changed");
        }
        self.phase = message.phase;
        self.tick = Some(message.tick);
        Ok(())
    }

    /// Last known state of one entity.
    pub fn get(&self, entity_id: EntityId) -> Option<&EntityState> {
        self.entities.get(&entity_id)
    }

    /// All tracked entities, in no particular order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityState> {
        self.entities.values()
    }

    /// Stops tracking an entity (e.g. on a despawn event).
    pub fn remove(&mut self, entity_id: EntityId) -> Option<EntityState> {
        self.entities.remove(&entity_id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Tick of the last applied update, `None` before the first one.
    pub fn tick(&self) -> Option<u32> {
        self.tick
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    fn check_tick(&self, tick: u32) -> Result<(), SyncError> {
        match self.tick {
            Some(last) if tick < last => {
                debug!(last, got = tick, "stale update rejected");
                Err(SyncError::StaleTick { last, got: tick })
            }
            _ => Ok(()),
        }
    }
}
