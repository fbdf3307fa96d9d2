//! Timed exchanges for Arenalink: opportunities (QTEs) and cinematic
//! extensions.
//!
//! The wire layer only carries these messages. This crate holds the
//! rules around them:
//!
//! - [`OpportunityTracker`]: the server's per-`opportunityId` state
//!   machine (`Offered` → `Resolved` | `Expired` | `Superseded`), with
//!   deadlines on the Tokio clock and default-option resolution.
//! - [`ExtensionGate`]: the client's check that a cinematic extension
//!   is neither stale nor a retransmission before fetching its payload.

mod cinematic;
mod config;
mod error;
mod opportunity;

pub use cinematic::{ExtensionGate, now_epoch_ms};
pub use config::ExchangeConfig;
pub use error::ExchangeError;
pub use opportunity::{OpportunityState, OpportunityTracker, Resolution, ResolutionOutcome};
