//! Client half of the duel: rebuilds the arena from snapshots and deltas
//! and plays the local fighter.

use std::sync::Arc;
use std::time::Duration;

use arenalink::prelude::*;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, info, trace, warn};

use crate::{DemoResult, OPPONENT, PLAYER};

/// How long the player takes to react to a prompt.
const REACTION: Duration = Duration::from_millis(120);
const PING_EVERY: u32 = 20;

/// What the client saw, for the closing log lines.
#[derive(Debug)]
pub struct ClientSummary {
    pub last_tick: u32,
    pub frames: usize,
    pub bytes: usize,
    pub entities: Vec<EntityState>,
}

struct Client<C: PayloadCodec> {
    codec: Arc<C>,
    outbound: mpsc::Sender<Vec<u8>>,
    tracker: EntityTracker,
    gate: ExtensionGate,
    prompts_seen: u32,
}

impl<C: PayloadCodec> Client<C> {
    async fn send<M: WireMessage>(&self, message: &M) -> DemoResult {
        let bytes = encode_message(message, &*self.codec)?;
        trace!(message_type = %M::MESSAGE_TYPE, len = bytes.len(), "client → server");
        if self.outbound.send(bytes).await.is_err() {
            debug!(message_type = %M::MESSAGE_TYPE, "server already gone, message dropped");
        }
        Ok(())
    }

    /// Handles one frame. Returns `true` when the match is over.
    async fn handle(&mut self, bytes: &[u8]) -> DemoResult<bool> {
        let frame = parse(bytes)?;
        match frame.message_type {
            MessageType::ArenaStateSnapshot => {
                let snapshot: ArenaStateSnapshot = frame.decode(&*self.codec)?;
                if let Some(context) = snapshot.cinematic_context() {
                    info!(
                        cinematic = context.cinematic_id.as_deref().unwrap_or("<none>"),
                        attacker_slot = context.attacker_slot,
                        defender_slot = context.defender_slot,
                        "cinematic framing received"
                    );
                }
                self.tracker.apply_snapshot(&snapshot)?;
                debug!(tick = snapshot.tick, entities = snapshot.entities.len(), "snapshot applied");
            }
            MessageType::ArenaStateDelta => {
                let delta: ArenaStateDelta = frame.decode(&*self.codec)?;
                match self.tracker.apply_delta(&delta) {
                    Ok(report) => trace!(tick = delta.tick, ?report, "delta applied"),
                    Err(err) => warn!(%err, "delta dropped"),
                }
                self.play(delta.tick).await?;
            }
            MessageType::CombatEvent => {
                let message: CombatEventMessage = frame.decode(&*self.codec)?;
                for event in &message.events {
                    info!(
                        tick = message.tick,
                        kind = ?event.event_type,
                        source = %event.source_entity_id,
                        target = %event.target_entity_id,
                        amount = event.amount,
                        remaining_hp = event.remaining_hp,
                        "combat event"
                    );
                }
            }
            MessageType::MatchState => {
                let state: MatchStateMessage = frame.decode(&*self.codec)?;
                self.tracker.apply_match_state(&state)?;
                info!(tick = state.tick, phase = ?state.phase, "phase");
                if state.phase == MatchPhase::Finished {
                    let winner = state.winner_slot.map(|slot| slot.to_string());
                    info!(winner_slot = winner.as_deref().unwrap_or("<draw>"), "match over");
                    return Ok(true);
                }
            }
            MessageType::OpportunityData => {
                let received = Instant::now();
                let prompt: OpportunityDataMessage = frame.decode(&*self.codec)?;
                self.prompts_seen += 1;
                info!(
                    opportunity_id = %prompt.opportunity_id,
                    prompt = %prompt.prompt,
                    deadline_ms = prompt.deadline_ms,
                    "prompt"
                );
                // The player counters the first prompt and freezes on the rest.
                if self.prompts_seen == 1 && prompt.offers("counter") {
                    time::sleep(REACTION).await;
                    let latency = i32::try_from(received.elapsed().as_millis()).unwrap_or(i32::MAX);
                    self.send(&prompt.respond("counter", latency)).await?;
                } else {
                    info!(opportunity_id = %prompt.opportunity_id, "player hesitates");
                }
            }
            MessageType::CinematicExtension => {
                let extension: CinematicExtensionMessage = frame.decode(&*self.codec)?;
                match self.gate.admit(&extension) {
                    Ok(()) => info!(
                        exchange_id = %extension.exchange_id,
                        attach_point = %extension.attach_point,
                        url = %extension.payload_url,
                        "fetching cinematic extension"
                    ),
                    Err(err) => info!(%err, "cinematic extension skipped"),
                }
            }
            MessageType::Unrecognized(byte) => warn!(byte, "unrecognized message type dropped"),
            other => warn!(
                message_type = %other,
                direction = ?other.direction(),
                "unexpected message from server"
            ),
        }
        Ok(false)
    }

    /// Walks toward the opponent and swings once in reach.
    async fn play(&self, tick: u32) -> DemoResult {
        let gap = match (self.tracker.get(PLAYER), self.tracker.get(OPPONENT)) {
            (Some(me), Some(them)) => me.x - them.x,
            _ => 0.0,
        };
        let in_reach = gap.abs() <= 1.5;
        self.send(&PlayerInputMessage {
            tick,
            move_x: if in_reach { 0.0 } else { -gap.signum() },
            move_y: 0.0,
            action1: in_reach,
            action2: false,
            action3: false,
            dodge: false,
        })
        .await?;

        if tick % PING_EVERY == 0 {
            let client_time_ms = u64::try_from(now_epoch_ms()).unwrap_or_default();
            self.send(&PingMessage { client_time_ms }).await?;
        }
        Ok(())
    }
}

/// Runs the client side until the match is over or the server leaves.
pub async fn run<C: PayloadCodec>(
    codec: Arc<C>,
    outbound: mpsc::Sender<Vec<u8>>,
    mut inbound: mpsc::Receiver<Vec<u8>>,
) -> DemoResult<ClientSummary> {
    let mut client = Client {
        codec,
        outbound,
        tracker: EntityTracker::new(),
        gate: ExtensionGate::new(),
        prompts_seen: 0,
    };
    client
        .send(&ConnectRequestMessage {
            player_id: "player-2".into(),
            session_id: "demo-session".into(),
            match_id: "duel-1".into(),
        })
        .await?;

    let mut frames = 0;
    let mut bytes_in = 0;
    while let Some(bytes) = inbound.recv().await {
        frames += 1;
        bytes_in += bytes.len();
        if client.handle(&bytes).await? {
            break;
        }
    }

    let mut entities: Vec<EntityState> = client.tracker.entities().copied().collect();
    entities.sort_by_key(|e| e.entity_id.0);
    Ok(ClientSummary {
        last_tick: client.tracker.tick().unwrap_or_default(),
        frames,
        bytes: bytes_in,
        entities,
    })
}
