//! Exchange configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Upper bound on [`ExchangeConfig::response_grace`].
pub const MAX_RESPONSE_GRACE: Duration = Duration::from_secs(60);

/// Tunables for [`OpportunityTracker`](crate::OpportunityTracker).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Extra time past `deadlineMs` during which a response is still
    /// accepted. Covers the one-way trip of a response the client sent
    /// in time. Expiry waits for the grace window too.
    pub response_grace: Duration,

    /// Maximum number of forced opportunities `Offered` at once.
    /// Advisory ones never count: a new offer supersedes them.
    pub max_outstanding: usize,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            response_grace: Duration::ZERO,
            max_outstanding: 8,
        }
    }
}

impl ExchangeConfig {
    /// Clamp `max_outstanding` to at least 1 and `response_grace` to
    /// [`MAX_RESPONSE_GRACE`].
    pub fn validated(mut self) -> Self {
        if self.max_outstanding == 0 {
            warn!("max_outstanding of 0 would refuse every offer, using 1");
            self.max_outstanding = 1;
        }
        if self.response_grace > MAX_RESPONSE_GRACE {
            warn!(
                response_grace = ?self.response_grace,
                max = ?MAX_RESPONSE_GRACE,
                "response_grace too large, clamping"
            );
            self.response_grace = MAX_RESPONSE_GRACE;
        }
        self
    }
}
