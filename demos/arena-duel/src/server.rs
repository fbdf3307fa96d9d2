//! Server half of the duel: owns the simulation, the delta encoder and
//! the opportunity tracker.

use std::collections::BTreeMap;
use std::f32::consts::PI;
use std::sync::Arc;
use std::time::Duration;

use arenalink::prelude::*;
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{DemoConfig, DemoResult, OPPONENT, PLAYER};

const OPPONENT_SLOT: usize = 0;
const PLAYER_SLOT: usize = 1;

const IDLE: i32 = 0;
const WALKING: i32 = 1;
const ATTACKING: i32 = 2;
const STAGGERED: i32 = 3;

const OPPONENT_SPEED: f32 = 0.1;
const PLAYER_SPEED: f32 = 0.15;
const REACH: f32 = 1.5;

struct Arena<C: PayloadCodec> {
    codec: Arc<C>,
    outbound: mpsc::Sender<Vec<u8>>,
    encoder: DeltaEncoder,
    opportunities: OpportunityTracker,
    fighters: [EntityState; 2],
    pending_events: Vec<CombatEvent>,
    phase: MatchPhase,
    tick: u32,
    ticks: u32,
    exchanges: u32,
}

impl<C: PayloadCodec> Arena<C> {
    fn new(codec: Arc<C>, config: &DemoConfig, outbound: mpsc::Sender<Vec<u8>>) -> Self {
        let fighter = |entity_id, x: f32, rotation_y| EntityState {
            entity_id,
            x,
            y: 0.0,
            z: 0.0,
            rotation_y,
            health: 100.0,
            action_state: IDLE,
        };
        Self {
            codec,
            outbound,
            encoder: DeltaEncoder::new(config.sync.clone()),
            opportunities: OpportunityTracker::new(config.exchange.clone()),
            fighters: [fighter(OPPONENT, -5.0, 0.0), fighter(PLAYER, 5.0, PI)],
            pending_events: Vec::new(),
            phase: MatchPhase::Waiting,
            tick: 0,
            ticks: config.ticks,
            exchanges: 0,
        }
    }

    async fn send<M: WireMessage>(&self, message: &M) -> DemoResult {
        let bytes = encode_message(message, &*self.codec)?;
        debug!(message_type = %M::MESSAGE_TYPE, len = bytes.len(), "server → client");
        self.outbound.send(bytes).await?;
        Ok(())
    }

    async fn set_phase(&mut self, phase: MatchPhase, phase_remaining_ms: Option<u32>) -> DemoResult {
        self.phase = phase;
        self.send(&MatchStateMessage {
            tick: self.tick,
            phase,
            phase_remaining_ms,
            winner_slot: None,
        })
        .await
    }

    /// Countdown, then the full snapshot every later delta builds on.
    async fn start(&mut self) -> DemoResult {
        self.set_phase(MatchPhase::Countdown, Some(3_000)).await?;
        self.phase = MatchPhase::Fighting;
        let snapshot = self.encoder.snapshot(self.tick, self.phase, &self.fighters)?;
        self.send(&snapshot).await
    }

    /// Advances one tick. Returns `true` once the match is over.
    async fn step(&mut self) -> DemoResult<bool> {
        self.tick += 1;

        let gap = self.fighters[PLAYER_SLOT].x - self.fighters[OPPONENT_SLOT].x;
        let opponent = &mut self.fighters[OPPONENT_SLOT];
        // A staggered opponent stays down until the next multiple of 10.
        let recovering = opponent.action_state == STAGGERED && self.tick % 10 != 0;
        if !recovering {
            if gap.abs() > REACH * 0.8 {
                opponent.x += OPPONENT_SPEED * gap.signum();
                opponent.rotation_y = if gap > 0.0 { 0.0 } else { PI };
                opponent.action_state = WALKING;
            } else {
                opponent.action_state = IDLE;
            }
        }

        if self.phase == MatchPhase::Fighting && gap.abs() <= REACH && self.tick % 4 == 0 {
            self.fighters[OPPONENT_SLOT].action_state = ATTACKING;
            let target = &mut self.fighters[PLAYER_SLOT];
            target.health = (target.health - 7.0).max(0.0);
            self.pending_events.push(CombatEvent {
                event_type: CombatEventType::Hit,
                source_entity_id: OPPONENT,
                target_entity_id: PLAYER,
                amount: 7.0,
                remaining_hp: target.health,
                duration_ms: 0,
            });
        }

        let delta = self.encoder.delta(self.tick, &self.fighters)?;
        self.send(&delta).await?;

        if !self.pending_events.is_empty() {
            let message = CombatEventMessage {
                tick: self.tick,
                events: std::mem::take(&mut self.pending_events),
            };
            self.send(&message).await?;
        }

        if self.tick == self.ticks / 3 || self.tick == self.ticks * 2 / 3 {
            self.offer_opportunity().await?;
        }

        let knocked_out = self.fighters.iter().any(|f| f.health <= 0.0);
        if self.tick >= self.ticks || knocked_out {
            self.finish().await?;
            return Ok(true);
        }
        Ok(false)
    }

    async fn offer_opportunity(&mut self) -> DemoResult {
        self.exchanges += 1;
        let option = |id: &str, label: &str| OpportunityOption {
            id: id.into(),
            label: label.into(),
        };
        let message = OpportunityDataMessage {
            opportunity_id: format!("opp-{}", self.tick),
            prompt: "Overhead strike incoming".into(),
            options: vec![
                option("dodge_left", "Dodge left"),
                option("dodge_right", "Dodge right"),
                option("counter", "Counter"),
            ],
            default_option_id: Some("dodge_left".into()),
            deadline_ms: 400,
            exchange_id: Some(format!("ex-{}", self.exchanges)),
            forced: true,
        };

        for dismissed in self.opportunities.offer(message.clone())? {
            debug!(opportunity_id = %dismissed, "advisory prompt dismissed");
        }
        self.set_phase(MatchPhase::Opportunity, u32::try_from(message.deadline_ms).ok())
            .await?;
        self.send(&message).await
    }

    async fn resolve(&mut self, resolution: Resolution) -> DemoResult {
        info!(
            opportunity_id = %resolution.opportunity_id,
            option = resolution.selected_option_id.as_deref().unwrap_or("<none>"),
            outcome = ?resolution.outcome,
            "opportunity settled"
        );

        match resolution.selected_option_id.as_deref() {
            Some("counter") => {
                let opponent = &mut self.fighters[OPPONENT_SLOT];
                opponent.health = (opponent.health - 15.0).max(0.0);
                opponent.action_state = STAGGERED;
                self.pending_events.push(CombatEvent {
                    event_type: CombatEventType::Stagger,
                    source_entity_id: PLAYER,
                    target_entity_id: OPPONENT,
                    amount: 15.0,
                    remaining_hp: opponent.health,
                    duration_ms: 600,
                });
                if let Some(exchange_id) = resolution.exchange_id {
                    self.play_cinematic(exchange_id).await?;
                }
            }
            Some("dodge_left") => self.fighters[PLAYER_SLOT].x -= 1.0,
            Some("dodge_right") => self.fighters[PLAYER_SLOT].x += 1.0,
            _ => {}
        }

        if !self.opportunities.is_input_blocked() {
            self.set_phase(MatchPhase::Fighting, None).await?;
        }
        self.opportunities.cleanup_settled();
        Ok(())
    }

    /// Frames the counter as a cinematic and points the client at the
    /// behavior to attach. The extension is sent twice, as a lossy
    /// transport's retransmission would.
    async fn play_cinematic(&mut self, exchange_id: String) -> DemoResult {
        self.set_phase(MatchPhase::Cinematic, None).await?;
        let snapshot = self
            .encoder
            .snapshot(self.tick, MatchPhase::Cinematic, &self.fighters)?
            .with_cinematic(CinematicContext {
                cinematic_id: Some("counter-finisher".into()),
                attacker_slot: PLAYER_SLOT as u8,
                defender_slot: OPPONENT_SLOT as u8,
                target_id: Some("torso".into()),
            });
        self.send(&snapshot).await?;

        let mut extension = CinematicExtensionMessage::new(
            exchange_id,
            "combat/counter",
            "https://cdn.arenalink.dev/behaviors/counter-finisher.abml",
        );
        extension.hint = Some("slow-motion".into());
        extension.initiate_state = Some(BTreeMap::from([
            ("attacker".to_string(), PLAYER.to_string()),
            ("defender".to_string(), OPPONENT.to_string()),
        ]));
        extension.valid_until_epoch_ms = Some(now_epoch_ms().saturating_add(5_000));

        self.send(&extension).await?;
        self.send(&extension).await
    }

    async fn finish(&mut self) -> DemoResult {
        let [opponent, player] = &self.fighters;
        let winner_slot = if player.health >= opponent.health {
            PLAYER_SLOT
        } else {
            OPPONENT_SLOT
        };
        info!(tick = self.tick, winner_slot, "match finished");

        self.phase = MatchPhase::Finished;
        self.send(&MatchStateMessage {
            tick: self.tick,
            phase: MatchPhase::Finished,
            phase_remaining_ms: None,
            winner_slot: Some(winner_slot as u8),
        })
        .await
    }

    async fn handle_client_frame(&mut self, bytes: &[u8]) -> DemoResult {
        let frame = parse(bytes)?;
        match frame.message_type {
            MessageType::PlayerInput => {
                let input: PlayerInputMessage = frame.decode(&*self.codec)?;
                if !input.move_in_range() {
                    warn!(tick = input.tick, move_x = input.move_x, "out-of-range input dropped");
                    return Ok(());
                }
                if self.opportunities.is_input_blocked() {
                    debug!(tick = input.tick, "input ignored while an opportunity is open");
                    return Ok(());
                }
                self.apply_input(&input);
            }
            MessageType::OpportunityResponse => {
                let response: OpportunityResponseMessage = frame.decode(&*self.codec)?;
                match self.opportunities.respond(&response) {
                    Ok(resolution) => self.resolve(resolution).await?,
                    Err(err) => warn!(%err, "opportunity response rejected"),
                }
            }
            MessageType::Ping => {
                let ping: PingMessage = frame.decode(&*self.codec)?;
                let sent = i64::try_from(ping.client_time_ms).unwrap_or(i64::MAX);
                let one_way = now_epoch_ms().saturating_sub(sent);
                debug!(client_time_ms = ping.client_time_ms, one_way_ms = one_way, "ping");
            }
            MessageType::ConnectRequest => warn!("duplicate connect request ignored"),
            MessageType::Unrecognized(byte) => warn!(byte, "unrecognized message type dropped"),
            other => warn!(
                message_type = %other,
                direction = ?other.direction(),
                "unexpected message from client"
            ),
        }
        Ok(())
    }

    fn apply_input(&mut self, input: &PlayerInputMessage) {
        let player = &mut self.fighters[PLAYER_SLOT];
        player.x += input.move_x * PLAYER_SPEED;
        player.action_state = if input.move_x != 0.0 { WALKING } else { IDLE };
        let player_x = player.x;

        let gap = (player_x - self.fighters[OPPONENT_SLOT].x).abs();
        if input.action1 && gap <= REACH && input.tick % 5 == 0 {
            self.fighters[PLAYER_SLOT].action_state = ATTACKING;
            let opponent = &mut self.fighters[OPPONENT_SLOT];
            opponent.health = (opponent.health - 5.0).max(0.0);
            self.pending_events.push(CombatEvent {
                event_type: CombatEventType::Hit,
                source_entity_id: PLAYER,
                target_entity_id: OPPONENT,
                amount: 5.0,
                remaining_hp: opponent.health,
                duration_ms: 0,
            });
        }
    }
}

/// Runs the server side until the match is over or the client leaves.
pub async fn run<C: PayloadCodec>(
    codec: Arc<C>,
    config: DemoConfig,
    outbound: mpsc::Sender<Vec<u8>>,
    mut inbound: mpsc::Receiver<Vec<u8>>,
) -> DemoResult {
    let Some(hello) = inbound.recv().await else {
        return Ok(());
    };
    let hello = parse(&hello)?;
    if hello.message_type != MessageType::ConnectRequest {
        return Err(format!("expected ConnectRequest, got {}", hello.message_type).into());
    }
    let hello: ConnectRequestMessage = hello.decode(&*codec)?;
    info!(player_id = %hello.player_id, match_id = %hello.match_id, "player connected");

    let mut arena = Arena::new(codec, &config, outbound);
    arena.start().await?;

    let mut interval = time::interval(Duration::from_millis(config.tick_ms));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if arena.step().await? {
                    break;
                }
            }
            _ = arena.opportunities.deadline_reached() => {
                for resolution in arena.opportunities.expire_due() {
                    arena.resolve(resolution).await?;
                }
            }
            received = inbound.recv() => match received {
                Some(bytes) => arena.handle_client_frame(&bytes).await?,
                None => {
                    warn!("client hung up");
                    break;
                }
            },
        }
    }
    Ok(())
}
