//! Opportunity (quick-time event) prompt and response.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::WireMessage;
use crate::MessageType;

/// One choice in an opportunity prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpportunityOption {
    pub id: String,
    pub label: String,
}

/// Server → client: "choose one of these within `deadline_ms`".
///
/// If no matching response arrives in time the server resolves the
/// opportunity with `default_option_id` (when set). `forced` prompts
/// block client input until resolved; advisory ones may be superseded
/// by the next prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityDataMessage {
    /// Correlates responses with this prompt.
    pub opportunity_id: String,
    pub prompt: String,
    pub options: Vec<OpportunityOption>,
    #[serde(default)]
    pub default_option_id: Option<String>,
    /// Response window, measured from receipt. Sent as a plain signed
    /// int; a negative window reads as already elapsed.
    pub deadline_ms: i32,
    /// Parent exchange (e.g. a cinematic beat), if any.
    #[serde(default)]
    pub exchange_id: Option<String>,
    pub forced: bool,
}

impl OpportunityDataMessage {
    /// `true` if `option_id` is one of the offered options.
    pub fn offers(&self, option_id: &str) -> bool {
        self.option(option_id).is_some()
    }

    /// Looks up an offered option by id.
    pub fn option(&self, option_id: &str) -> Option<&OpportunityOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    /// The response window as a `Duration`. Negative windows are zero.
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(u64::try_from(self.deadline_ms).unwrap_or_default())
    }

    /// Builds the client's answer, copying the correlation ids.
    ///
    /// Doesn't check that `option_id` is offered; see [`Self::offers`].
    pub fn respond(
        &self,
        option_id: impl Into<String>,
        client_latency_ms: i32,
    ) -> OpportunityResponseMessage {
        OpportunityResponseMessage {
            opportunity_id: self.opportunity_id.clone(),
            selected_option_id: option_id.into(),
            exchange_id: self.exchange_id.clone(),
            client_latency_ms,
        }
    }
}

impl WireMessage for OpportunityDataMessage {
    const MESSAGE_TYPE: MessageType = MessageType::OpportunityData;
}

/// Client → server: the option the player picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityResponseMessage {
    pub opportunity_id: String,
    pub selected_option_id: String,
    #[serde(default)]
    pub exchange_id: Option<String>,
    /// Client-measured round trip, a hint for server-side fairness.
    /// Passed through unchecked.
    pub client_latency_ms: i32,
}

impl WireMessage for OpportunityResponseMessage {
    const MESSAGE_TYPE: MessageType = MessageType::OpportunityResponse;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dodge_prompt() -> OpportunityDataMessage {
        OpportunityDataMessage {
            opportunity_id: "opp-1".into(),
            prompt: "Incoming swing!".into(),
            options: vec![
                OpportunityOption {
                    id: "dodge_left".into(),
                    label: "Dodge left".into(),
                },
                OpportunityOption {
                    id: "parry".into(),
                    label: "Parry".into(),
                },
            ],
            default_option_id: Some("dodge_left".into()),
            deadline_ms: 400,
            exchange_id: Some("beat-3".into()),
            forced: true,
        }
    }

    #[test]
    fn test_offers_checks_option_ids() {
        let prompt = dodge_prompt();
        assert!(prompt.offers("parry"));
        assert!(!prompt.offers("jump"));
        assert_eq!(prompt.option("parry").map(|o| o.label.as_str()), Some("Parry"));
    }

    #[test]
    fn test_deadline_duration() {
        assert_eq!(dodge_prompt().deadline(), Duration::from_millis(400));
    }

    #[test]
    fn test_deadline_negative_is_zero() {
        let mut prompt = dodge_prompt();
        prompt.deadline_ms = -250;
        assert_eq!(prompt.deadline(), Duration::ZERO);
    }

    #[test]
    fn test_negative_timings_decode_unchanged() {
        let prompt: OpportunityDataMessage = serde_json::from_str(
            r#"{"opportunityId":"o","prompt":"p","options":[],"deadlineMs":-5,"forced":false}"#,
        )
        .unwrap();
        assert_eq!(prompt.deadline_ms, -5);

        let response: OpportunityResponseMessage = serde_json::from_str(
            r#"{"opportunityId":"o","selectedOptionId":"x","clientLatencyMs":-12}"#,
        )
        .unwrap();
        assert_eq!(response.client_latency_ms, -12);
    }

    #[test]
    fn test_respond_copies_correlation_ids() {
        let response = dodge_prompt().respond("parry", 48);
        assert_eq!(response.opportunity_id, "opp-1");
        assert_eq!(response.selected_option_id, "parry");
        assert_eq!(response.exchange_id.as_deref(), Some("beat-3"));
        assert_eq!(response.client_latency_ms, 48);
    }

    #[test]
    fn test_prompt_without_default_round_trips_as_none() {
        let mut prompt = dodge_prompt();
        prompt.default_option_id = None;
        prompt.exchange_id = None;
        let bytes = serde_json::to_vec(&prompt).unwrap();
        let back: OpportunityDataMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.default_option_id, None);
        assert_eq!(back.exchange_id, None);
    }
}
