//! In-process arena duel.
//!
//! A server task and a client task exchange real Arenalink frames over
//! Tokio channels: connect, countdown, snapshot, a delta per tick,
//! combat events, two opportunities (one answered, one left to expire),
//! a cinematic extension with a retransmission, and the final result.
//!
//! ```text
//! cargo run -p arena-duel                  # defaults
//! cargo run -p arena-duel -- duel.json     # DemoConfig from JSON
//! RUST_LOG=debug cargo run -p arena-duel   # per-frame logging
//! ```

mod client;
mod server;

use std::path::Path;
use std::sync::Arc;

use arenalink::prelude::*;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub type DemoResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// The server-controlled fighter (slot 0).
pub const OPPONENT: EntityId = EntityId(1);
/// The client's fighter (slot 1).
pub const PLAYER: EntityId = EntityId(2);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Everything the duel can be tuned with. Missing fields keep defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub codec: CompactCodecConfig,
    /// Use the JSON codec instead of the compact one.
    pub json: bool,
    pub sync: SyncConfig,
    pub exchange: ExchangeConfig,
    /// Length of the match in ticks.
    pub ticks: u32,
    pub tick_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            codec: CompactCodecConfig::default(),
            json: false,
            sync: SyncConfig::default(),
            exchange: ExchangeConfig::default(),
            ticks: 60,
            tick_ms: 50,
        }
    }
}

impl DemoConfig {
    fn load(path: &Path) -> DemoResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&text)?;
        config.ticks = config.ticks.max(12);
        config.tick_ms = config.tick_ms.max(1);
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

/// Runs one duel with `codec` on both ends.
async fn duel<C: PayloadCodec>(codec: C, config: DemoConfig) -> DemoResult {
    let codec = Arc::new(codec);
    let (to_client, from_server) = mpsc::channel::<Vec<u8>>(64);
    let (to_server, from_client) = mpsc::channel::<Vec<u8>>(64);

    let server = tokio::spawn(server::run(
        Arc::clone(&codec),
        config.clone(),
        to_client,
        from_client,
    ));
    let client = tokio::spawn(client::run(codec, to_server, from_server));

    server.await??;
    let summary = client.await??;

    info!(
        ticks = summary.last_tick,
        frames = summary.frames,
        bytes = summary.bytes,
        "duel finished"
    );
    for entity in &summary.entities {
        info!(
            entity = %entity.entity_id,
            x = entity.x,
            health = entity.health,
            "final client view"
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> DemoResult {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => DemoConfig::load(Path::new(&path))?,
        None => DemoConfig::default(),
    };
    info!(ticks = config.ticks, json = config.json, "starting arena duel");

    if config.json {
        duel(JsonCodec, config).await
    } else {
        duel(CompactCodec::new(config.codec.clone()), config).await
    }
}
