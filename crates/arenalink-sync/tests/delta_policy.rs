//! Integration tests for the delta contract, end to end: encoder → wire
//! bytes → tracker.

use arenalink_protocol::{
    ArenaStateDelta, ArenaStateSnapshot, CompactCodec, EntityDelta, EntityDeltaFlags, EntityId,
    EntityState, MatchPhase, MessageType, encode_message, parse,
};
use arenalink_sync::{ApplyReport, DeltaEncoder, EntityTracker, SyncConfig};

// =========================================================================
// Helpers
// =========================================================================

fn fighter(id: i32, x: f32, health: f32, action_state: i32) -> EntityState {
    EntityState {
        entity_id: EntityId(id),
        x,
        y: 0.0,
        z: 1.0,
        rotation_y: 0.25,
        health,
        action_state,
    }
}

/// Sends a delta over the wire and hands back what the client decodes.
fn over_the_wire(delta: &ArenaStateDelta) -> ArenaStateDelta {
    let codec = CompactCodec::default();
    let bytes = encode_message(delta, &codec).unwrap();
    let frame = parse(&bytes).unwrap();
    assert_eq!(frame.message_type, MessageType::ArenaStateDelta);
    frame.decode(&codec).unwrap()
}

fn tracker_from(snapshot: &ArenaStateSnapshot) -> EntityTracker {
    let mut tracker = EntityTracker::new();
    tracker.apply_snapshot(snapshot).unwrap();
    tracker
}

// =========================================================================
// Field gating
// =========================================================================

#[test]
fn test_position_flag_leaves_health_and_action_state_unchanged() {
    let mut tracker = tracker_from(&ArenaStateSnapshot::new(
        1,
        MatchPhase::Fighting,
        vec![fighter(1, 0.0, 100.0, 3)],
    ));

    // Filler values in unflagged fields are deliberately wild.
    let delta = ArenaStateDelta {
        tick: 2,
        entities: vec![EntityDelta {
            entity_id: EntityId(1),
            flags: EntityDeltaFlags::POSITION,
            x: 4.0,
            y: 0.5,
            z: 1.5,
            rotation_y: 9.0,
            health: 0.0,
            action_state: -77,
        }],
    };
    tracker.apply_delta(&over_the_wire(&delta)).unwrap();

    let state = tracker.get(EntityId(1)).unwrap();
    assert_eq!((state.x, state.y, state.z), (4.0, 0.5, 1.5));
    assert_eq!(state.health, 100.0);
    assert_eq!(state.action_state, 3);
    assert_eq!(state.rotation_y, 0.25);
}

// =========================================================================
// Omission
// =========================================================================

#[test]
fn test_entity_absent_from_delta_is_byte_identical() {
    let snapshot = ArenaStateSnapshot::new(
        1,
        MatchPhase::Fighting,
        vec![fighter(1, 0.0, 100.0, 0), fighter(2, 5.0, 100.0, 0)],
    );
    let mut tracker = tracker_from(&snapshot);
    let before = *tracker.get(EntityId(2)).unwrap();

    let delta = ArenaStateDelta {
        tick: 2,
        entities: vec![EntityDelta::from_state(
            &fighter(1, 1.0, 90.0, 2),
            EntityDeltaFlags::ALL,
        )],
    };
    tracker.apply_delta(&over_the_wire(&delta)).unwrap();

    let after = *tracker.get(EntityId(2)).unwrap();
    assert_eq!(before, after);
    assert_eq!(before.x.to_bits(), after.x.to_bits());
    assert_eq!(before.health.to_bits(), after.health.to_bits());
}

#[test]
fn test_empty_delta_changes_nothing_but_tick() {
    let mut tracker = tracker_from(&ArenaStateSnapshot::new(
        1,
        MatchPhase::Fighting,
        vec![fighter(1, 0.0, 100.0, 0)],
    ));
    let report = tracker
        .apply_delta(&ArenaStateDelta {
            tick: 8,
            entities: vec![],
        })
        .unwrap();
    assert_eq!(report, ApplyReport::default());
    assert_eq!(tracker.tick(), Some(8));
    assert_eq!(tracker.get(EntityId(1)), Some(&fighter(1, 0.0, 100.0, 0)));
}

// =========================================================================
// Encoder and tracker agree
// =========================================================================

#[test]
fn test_encoder_and_tracker_converge_over_many_ticks() {
    let mut encoder = DeltaEncoder::new(SyncConfig::default());
    let mut world = vec![fighter(1, 0.0, 100.0, 0), fighter(2, 10.0, 100.0, 0)];

    let snapshot = encoder.snapshot(0, MatchPhase::Fighting, &world).unwrap();
    let mut tracker = tracker_from(&snapshot);

    for tick in 1..=30u32 {
        // Fighter 1 walks every tick; fighter 2 only loses health every 5th.
        world[0].x += 0.1;
        if tick % 5 == 0 {
            world[1].health -= 10.0;
            world[1].action_state = 2;
        }
        // A third fighter joins halfway.
        if tick == 15 {
            world.push(fighter(3, -4.0, 80.0, 1));
        }

        let delta = encoder.delta(tick, &world).unwrap();
        for entity in &delta.entities {
            assert!(!entity.flags.is_empty(), "unchanged entities must be omitted");
        }
        if tick % 5 != 0 && tick != 15 {
            assert_eq!(delta.entities.len(), 1);
            assert_eq!(delta.entities[0].flags, EntityDeltaFlags::POSITION);
        }

        tracker.apply_delta(&over_the_wire(&delta)).unwrap();
    }

    for expected in &world {
        assert_eq!(tracker.get(expected.entity_id), Some(expected));
    }
    assert_eq!(tracker.len(), 3);
}

#[test]
fn test_epsilon_encoder_keeps_client_within_threshold() {
    let epsilon = 0.05;
    let mut encoder = DeltaEncoder::new(SyncConfig {
        position_epsilon: epsilon,
        ..Default::default()
    });
    let mut world = vec![fighter(1, 0.0, 100.0, 0)];
    let mut tracker = tracker_from(&encoder.snapshot(0, MatchPhase::Fighting, &world).unwrap());

    let mut sent = 0;
    for tick in 1..=100u32 {
        world[0].x += 0.01;
        let delta = encoder.delta(tick, &world).unwrap();
        sent += delta.entities.len();
        tracker.apply_delta(&over_the_wire(&delta)).unwrap();

        let seen = tracker.get(EntityId(1)).unwrap().x;
        assert!((seen - world[0].x).abs() <= epsilon + 1e-5);
    }
    // Far fewer than one update per tick.
    assert!(sent < 30, "sent {sent} updates");
}

#[test]
fn test_stale_delta_rejected_after_reordering() {
    let mut encoder = DeltaEncoder::default();
    let mut world = vec![fighter(1, 0.0, 100.0, 0)];
    let mut tracker = tracker_from(&encoder.snapshot(0, MatchPhase::Fighting, &world).unwrap());

    world[0].health = 90.0;
    let older = encoder.delta(1, &world).unwrap();
    world[0].health = 80.0;
    let newer = encoder.delta(2, &world).unwrap();

    // Arrives out of order: newer first.
    tracker.apply_delta(&over_the_wire(&newer)).unwrap();
    assert!(tracker.apply_delta(&over_the_wire(&older)).is_err());
    assert_eq!(tracker.get(EntityId(1)).map(|e| e.health), Some(80.0));
}
