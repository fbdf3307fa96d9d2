//! Error types for the exchange layer.

use std::time::Duration;

use crate::OpportunityState;

/// Errors raised by the opportunity state machine and the extension gate.
///
/// These are the semantic anomalies the wire layer passes through
/// untouched: a well-formed message that makes no sense in context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    /// An opportunity with this id is already tracked (offered or not
    /// yet cleaned up).
    #[error("opportunity {0} is already tracked")]
    DuplicateOpportunity(String),

    /// The offer names a default option that isn't in its option list.
    #[error("default option {option_id} is not offered by opportunity {opportunity_id}")]
    DefaultNotOffered {
        opportunity_id: String,
        option_id: String,
    },

    /// Offering another forced opportunity would exceed
    /// [`ExchangeConfig::max_outstanding`](crate::ExchangeConfig::max_outstanding).
    #[error("{max} opportunities already outstanding")]
    TooManyOutstanding { max: usize },

    /// A response names an opportunity that was never offered.
    #[error("no opportunity {0} was offered")]
    UnknownOpportunity(String),

    /// A response arrived for an opportunity that is no longer `Offered`.
    #[error("opportunity {opportunity_id} is already {state}")]
    AlreadySettled {
        opportunity_id: String,
        state: OpportunityState,
    },

    /// The selected option is not among those offered.
    #[error("option {option_id} was not offered by opportunity {opportunity_id}")]
    OptionNotOffered {
        opportunity_id: String,
        option_id: String,
    },

    /// The response carries a different `exchangeId` than the offer.
    #[error("exchange id mismatch for opportunity {opportunity_id}: expected {expected:?}, got {got:?}")]
    ExchangeMismatch {
        opportunity_id: String,
        expected: Option<String>,
        got: Option<String>,
    },

    /// The response arrived after the deadline (plus grace). The
    /// opportunity stays `Offered` until [`expire_due`] settles it.
    ///
    /// [`expire_due`]: crate::OpportunityTracker::expire_due
    #[error("response to opportunity {opportunity_id} is {late_by:?} past its deadline")]
    DeadlinePassed {
        opportunity_id: String,
        late_by: Duration,
    },

    /// A cinematic extension was received after `validUntilEpochMs`.
    #[error("cinematic extension {exchange_id} expired at {valid_until} (now {now})")]
    StaleExtension {
        exchange_id: String,
        valid_until: i64,
        now: i64,
    },

    /// A cinematic extension with this `exchangeId` was already admitted
    /// (retransmission or replay).
    #[error("cinematic extension {0} was already admitted")]
    DuplicateExtension(String),
}
