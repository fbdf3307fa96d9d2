//! Server-side bookkeeping for opportunities (QTEs).
//!
//! Every `OpportunityDataMessage` the server sends opens an entry here,
//! keyed by `opportunityId`. The entry settles exactly once:
//!
//! ```text
//!                 respond() before deadline
//!   offer() ──→ [Offered] ───────────────────────→ [Resolved]
//!                  │   │
//!                  │   └── expire_due() after deadline ──→ [Expired]
//!                  │                                   (default applied, if any)
//!                  └── offer() of a newer opportunity ──→ [Superseded]
//!                      (advisory only)
//! ```
//!
//! Settled entries stay around so late or duplicate responses get a
//! precise [`ExchangeError::AlreadySettled`] rather than "unknown".
//! Call [`OpportunityTracker::cleanup_settled`] to drop them.
//!
//! # Clock
//!
//! Deadlines use [`tokio::time::Instant`], so tests can drive them with
//! a paused runtime and `tokio::time::advance`.
//!
//! # Concurrency note
//!
//! Like the rest of the policy types, the tracker is a plain struct
//! owned by one task (the match loop). Wrap it at a higher level if it
//! must be shared.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use arenalink_protocol::{OpportunityDataMessage, OpportunityResponseMessage};
use tokio::time::{self, Instant};
use tracing::{debug, info};

use crate::config::MAX_RESPONSE_GRACE;
use crate::{ExchangeConfig, ExchangeError};

/// Where an opportunity is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpportunityState {
    /// Sent to the client, waiting for a response or the deadline.
    Offered,
    /// The client picked a valid option in time.
    Resolved,
    /// The deadline passed without a valid response.
    Expired,
    /// An advisory opportunity replaced by a newer offer.
    Superseded,
}

impl OpportunityState {
    /// `true` for every state except `Offered`.
    pub fn is_settled(self) -> bool {
        !matches!(self, Self::Offered)
    }
}

impl fmt::Display for OpportunityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Offered => "offered",
            Self::Resolved => "resolved",
            Self::Expired => "expired",
            Self::Superseded => "superseded",
        })
    }
}

/// How an opportunity was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// The client answered in time.
    Responded { client_latency_ms: i32 },
    /// The deadline passed; the server applied `defaultOptionId`.
    DefaultApplied,
    /// The deadline passed and there was no default to apply.
    ExpiredWithoutDefault,
}

/// The server's final word on one opportunity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub opportunity_id: String,
    pub exchange_id: Option<String>,
    /// The option the game should act on. `None` only for
    /// [`ResolutionOutcome::ExpiredWithoutDefault`].
    pub selected_option_id: Option<String>,
    pub outcome: ResolutionOutcome,
}

#[derive(Debug)]
struct Entry {
    message: OpportunityDataMessage,
    /// Last instant a response is accepted: deadline plus grace.
    cutoff: Instant,
    state: OpportunityState,
}

/// Tracks every opportunity offered in one match.
#[derive(Debug)]
pub struct OpportunityTracker {
    config: ExchangeConfig,
    entries: HashMap<String, Entry>,
}

impl Default for OpportunityTracker {
    fn default() -> Self {
        Self::new(ExchangeConfig::default())
    }
}

impl OpportunityTracker {
    pub fn new(config: ExchangeConfig) -> Self {
        Self {
            config: config.validated(),
            entries: HashMap::new(),
        }
    }

    /// Starts tracking an opportunity that is about to be sent.
    ///
    /// The deadline clock starts now. Any outstanding advisory
    /// (`forced=false`) opportunities are superseded; their ids are
    /// returned so the caller can tell the client to dismiss them.
    ///
    /// # Errors
    /// - [`ExchangeError::DuplicateOpportunity`] if the id is still tracked
    /// - [`ExchangeError::DefaultNotOffered`] if `defaultOptionId` is not
    ///   one of the options
    /// - [`ExchangeError::TooManyOutstanding`] if `message` is forced and
    ///   the forced opportunities already outstanding fill
    ///   [`ExchangeConfig::max_outstanding`]
    ///
    /// Nothing changes on error.
    pub fn offer(&mut self, message: OpportunityDataMessage) -> Result<Vec<String>, ExchangeError> {
        let id = &message.opportunity_id;
        if self.entries.contains_key(id) {
            return Err(ExchangeError::DuplicateOpportunity(id.clone()));
        }
        if let Some(default) = &message.default_option_id {
            if !message.offers(default) {
                return Err(ExchangeError::DefaultNotOffered {
                    opportunity_id: id.clone(),
                    option_id: default.clone(),
                });
            }
        }
        if message.forced {
            let forced_outstanding = self
                .entries
                .values()
                .filter(|e| e.state == OpportunityState::Offered && e.message.forced)
                .count();
            if forced_outstanding >= self.config.max_outstanding {
                return Err(ExchangeError::TooManyOutstanding {
                    max: self.config.max_outstanding,
                });
            }
        }

        let mut superseded = Vec::new();
        for (other_id, entry) in &mut self.entries {
            if entry.state == OpportunityState::Offered && !entry.message.forced {
                entry.state = OpportunityState::Superseded;
                superseded.push(other_id.clone());
            }
        }
        superseded.sort();
        for other_id in &superseded {
            info!(opportunity_id = %other_id, by = %id, "advisory opportunity superseded");
        }

        let now = Instant::now();
        let cutoff = now
            .checked_add(message.deadline() + self.config.response_grace)
            .unwrap_or(now + MAX_RESPONSE_GRACE);
        info!(
            opportunity_id = %id,
            deadline_ms = message.deadline_ms,
            forced = message.forced,
            options = message.options.len(),
            "opportunity offered"
        );
        self.entries.insert(
            id.clone(),
            Entry {
                message,
                cutoff,
                state: OpportunityState::Offered,
            },
        );
        Ok(superseded)
    }

    /// Settles an opportunity with the client's answer.
    ///
    /// # Errors
    /// - [`ExchangeError::UnknownOpportunity`] if the id was never offered
    /// - [`ExchangeError::AlreadySettled`] if it is no longer `Offered`
    /// - [`ExchangeError::ExchangeMismatch`] if the `exchangeId` differs
    ///   from the offer's
    /// - [`ExchangeError::OptionNotOffered`] if the option isn't one of
    ///   the offered ones
    /// - [`ExchangeError::DeadlinePassed`] if the cutoff has passed
    ///
    /// On error the opportunity keeps its state: an invalid answer can
    /// be followed by a valid one before the deadline.
    pub fn respond(
        &mut self,
        response: &OpportunityResponseMessage,
    ) -> Result<Resolution, ExchangeError> {
        let id = &response.opportunity_id;
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| ExchangeError::UnknownOpportunity(id.clone()))?;

        if entry.state.is_settled() {
            debug!(opportunity_id = %id, state = %entry.state, "response for settled opportunity");
            return Err(ExchangeError::AlreadySettled {
                opportunity_id: id.clone(),
                state: entry.state,
            });
        }
        if entry.message.exchange_id != response.exchange_id {
            return Err(ExchangeError::ExchangeMismatch {
                opportunity_id: id.clone(),
                expected: entry.message.exchange_id.clone(),
                got: response.exchange_id.clone(),
            });
        }
        if !entry.message.offers(&response.selected_option_id) {
            return Err(ExchangeError::OptionNotOffered {
                opportunity_id: id.clone(),
                option_id: response.selected_option_id.clone(),
            });
        }
        let now = Instant::now();
        if now >= entry.cutoff {
            return Err(ExchangeError::DeadlinePassed {
                opportunity_id: id.clone(),
                late_by: now.duration_since(entry.cutoff),
            });
        }

        entry.state = OpportunityState::Resolved;
        info!(
            opportunity_id = %id,
            option = %response.selected_option_id,
            client_latency_ms = response.client_latency_ms,
            "opportunity resolved"
        );
        Ok(Resolution {
            opportunity_id: id.clone(),
            exchange_id: entry.message.exchange_id.clone(),
            selected_option_id: Some(response.selected_option_id.clone()),
            outcome: ResolutionOutcome::Responded {
                client_latency_ms: response.client_latency_ms,
            },
        })
    }

    /// Expires every `Offered` opportunity whose cutoff has passed,
    /// applying its default option. Returned in cutoff order.
    pub fn expire_due(&mut self) -> Vec<Resolution> {
        let now = Instant::now();
        let mut due: Vec<(Instant, Resolution)> = Vec::new();

        for (id, entry) in &mut self.entries {
            if entry.state != OpportunityState::Offered || now < entry.cutoff {
                continue;
            }
            entry.state = OpportunityState::Expired;

            let selected = entry.message.default_option_id.clone();
            let outcome = if selected.is_some() {
                ResolutionOutcome::DefaultApplied
            } else {
                ResolutionOutcome::ExpiredWithoutDefault
            };
            info!(
                opportunity_id = %id,
                default = selected.as_deref().unwrap_or("<none>"),
                "opportunity expired"
            );
            due.push((
                entry.cutoff,
                Resolution {
                    opportunity_id: id.clone(),
                    exchange_id: entry.message.exchange_id.clone(),
                    selected_option_id: selected,
                    outcome,
                },
            ));
        }

        due.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| a.1.opportunity_id.cmp(&b.1.opportunity_id))
        });
        due.into_iter().map(|(_, resolution)| resolution).collect()
    }

    /// Earliest cutoff among `Offered` opportunities.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries
            .values()
            .filter(|e| e.state == OpportunityState::Offered)
            .map(|e| e.cutoff)
            .min()
    }

    /// Resolves when the earliest outstanding cutoff is reached.
    ///
    /// Pends forever when nothing is outstanding, so it can sit in a
    /// `tokio::select!` next to the input and tick branches:
    ///
    /// ```ignore
    /// tokio::select! {
    ///     _ = tracker.deadline_reached() => {
    ///         for resolution in tracker.expire_due() { /* apply */ }
    ///     }
    ///     Some(response) = responses.recv() => { tracker.respond(&response)?; }
    /// }
    /// ```
    pub async fn deadline_reached(&self) {
        match self.next_deadline() {
            Some(deadline) => time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    }

    /// `true` while any forced opportunity is outstanding.
    pub fn is_input_blocked(&self) -> bool {
        self.entries
            .values()
            .any(|e| e.state == OpportunityState::Offered && e.message.forced)
    }

    /// Messages of every `Offered` opportunity, in no particular order.
    pub fn outstanding(&self) -> impl Iterator<Item = &OpportunityDataMessage> {
        self.entries
            .values()
            .filter(|e| e.state == OpportunityState::Offered)
            .map(|e| &e.message)
    }

    pub fn state(&self, opportunity_id: &str) -> Option<OpportunityState> {
        self.entries.get(opportunity_id).map(|e| e.state)
    }

    /// Time left before `opportunity_id` stops accepting responses.
    /// `None` if it is unknown or settled.
    pub fn remaining(&self, opportunity_id: &str) -> Option<Duration> {
        self.entries
            .get(opportunity_id)
            .filter(|e| e.state == OpportunityState::Offered)
            .map(|e| e.cutoff.saturating_duration_since(Instant::now()))
    }

    /// Drops every settled entry. Returns how many were removed.
    pub fn cleanup_settled(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.state.is_settled());
        before - self.entries.len()
    }

    /// Number of tracked entries (any state).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
