//! Cinematic extension: a pointer to behavior content fetched out of band.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::WireMessage;
use crate::MessageType;

/// `payload_type` when the sender doesn't specify one.
pub const DEFAULT_PAYLOAD_TYPE: &str = "abml-bytecode";

fn default_payload_type() -> String {
    DEFAULT_PAYLOAD_TYPE.to_string()
}

/// Server → client: attach the behavior at `payload_url` to the client's
/// behavior tree at `attach_point`.
///
/// The behavior body never rides in this message. `initiate_state` is a
/// `BTreeMap` so its serialized order, and therefore the payload bytes,
/// are deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CinematicExtensionMessage {
    pub exchange_id: String,
    pub attach_point: String,
    #[serde(default = "default_payload_type")]
    pub payload_type: String,
    pub payload_url: String,
    #[serde(default)]
    pub hint: Option<String>,
    /// Seed variables for the attached behavior. Never inspected here.
    #[serde(default)]
    pub initiate_state: Option<BTreeMap<String, String>>,
    /// Absolute expiry (Unix epoch, milliseconds).
    #[serde(default)]
    pub valid_until_epoch_ms: Option<i64>,
}

impl CinematicExtensionMessage {
    /// An extension with the default payload type and no optional fields.
    pub fn new(
        exchange_id: impl Into<String>,
        attach_point: impl Into<String>,
        payload_url: impl Into<String>,
    ) -> Self {
        Self {
            exchange_id: exchange_id.into(),
            attach_point: attach_point.into(),
            payload_type: default_payload_type(),
            payload_url: payload_url.into(),
            hint: None,
            initiate_state: None,
            valid_until_epoch_ms: None,
        }
    }

    /// `true` if `now_epoch_ms` is past `valid_until_epoch_ms`.
    ///
    /// An extension with no expiry never goes stale. The expiry instant
    /// itself is still valid.
    pub fn is_stale_at(&self, now_epoch_ms: i64) -> bool {
        self.valid_until_epoch_ms
            .is_some_and(|until| now_epoch_ms > until)
    }
}

impl WireMessage for CinematicExtensionMessage {
    const MESSAGE_TYPE: MessageType = MessageType::CinematicExtension;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_default_payload_type() {
        let ext = CinematicExtensionMessage::new("ex-1", "combat/finisher", "https://cdn/x.abml");
        assert_eq!(ext.payload_type, "abml-bytecode");
        assert!(ext.initiate_state.is_none());
    }

    #[test]
    fn test_missing_payload_type_defaults_when_decoding_json() {
        let json = r#"{"exchangeId":"ex-1","attachPoint":"root","payloadUrl":"u"}"#;
        let ext: CinematicExtensionMessage = serde_json::from_str(json).unwrap();
        assert_eq!(ext.payload_type, DEFAULT_PAYLOAD_TYPE);
        assert_eq!(ext.valid_until_epoch_ms, None);
    }

    #[test]
    fn test_is_stale_at_boundaries() {
        let mut ext = CinematicExtensionMessage::new("ex-1", "root", "u");
        assert!(!ext.is_stale_at(i64::MAX));

        ext.valid_until_epoch_ms = Some(1_000);
        assert!(!ext.is_stale_at(999));
        assert!(!ext.is_stale_at(1_000));
        assert!(ext.is_stale_at(1_001));
    }

    #[test]
    fn test_empty_initiate_state_is_distinct_from_none() {
        let mut ext = CinematicExtensionMessage::new("ex-1", "root", "u");
        ext.initiate_state = Some(BTreeMap::new());
        let bytes = serde_json::to_vec(&ext).unwrap();
        let back: CinematicExtensionMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.initiate_state, Some(BTreeMap::new()));
    }
}
