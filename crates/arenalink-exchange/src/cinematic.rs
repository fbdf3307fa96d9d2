//! Client-side gate for cinematic extensions.
//!
//! A `CinematicExtensionMessage` points at behavior content to fetch and
//! attach. Before the client fetches anything it asks the gate, which
//! refuses extensions that arrive past `validUntilEpochMs` and
//! retransmissions of an `exchangeId` already admitted.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use arenalink_protocol::CinematicExtensionMessage;
use tracing::{debug, warn};

use crate::ExchangeError;

/// Remembers which extensions were admitted.
#[derive(Debug, Default)]
pub struct ExtensionGate {
    admitted: HashSet<String>,
}

impl ExtensionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits `message` if it is still valid at `now_epoch_ms` and its
    /// exchange id is new.
    ///
    /// `now == validUntilEpochMs` is still valid. Refused extensions are
    /// not remembered.
    ///
    /// # Errors
    /// - [`ExchangeError::StaleExtension`] if `now_epoch_ms` is past
    ///   `validUntilEpochMs`
    /// - [`ExchangeError::DuplicateExtension`] if the exchange id was
    ///   admitted before
    pub fn admit_at(
        &mut self,
        message: &CinematicExtensionMessage,
        now_epoch_ms: i64,
    ) -> Result<(), ExchangeError> {
        if message.is_stale_at(now_epoch_ms) {
            let valid_until = message.valid_until_epoch_ms.unwrap_or_default();
            warn!(
                exchange_id = %message.exchange_id,
                valid_until,
                now = now_epoch_ms,
                "stale cinematic extension dropped"
            );
            return Err(ExchangeError::StaleExtension {
                exchange_id: message.exchange_id.clone(),
                valid_until,
                now: now_epoch_ms,
            });
        }
        if !self.admitted.insert(message.exchange_id.clone()) {
            debug!(exchange_id = %message.exchange_id, "duplicate cinematic extension dropped");
            return Err(ExchangeError::DuplicateExtension(
                message.exchange_id.clone(),
            ));
        }

        debug!(
            exchange_id = %message.exchange_id,
            attach_point = %message.attach_point,
            payload_type = %message.payload_type,
            "cinematic extension admitted"
        );
        Ok(())
    }

    /// [`admit_at`](Self::admit_at) against the system clock.
    pub fn admit(&mut self, message: &CinematicExtensionMessage) -> Result<(), ExchangeError> {
        self.admit_at(message, now_epoch_ms())
    }

    /// Forgets an admitted exchange id, e.g. once the cinematic finished
    /// and the id may legitimately be reused.
    pub fn forget(&mut self, exchange_id: &str) -> bool {
        self.admitted.remove(exchange_id)
    }

    pub fn is_admitted(&self, exchange_id: &str) -> bool {
        self.admitted.contains(exchange_id)
    }

    pub fn len(&self) -> usize {
        self.admitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.admitted.is_empty()
    }
}

/// Milliseconds since the Unix epoch, the clock `validUntilEpochMs` is
/// measured against. A clock set before 1970 reads as 0.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extension(id: &str, valid_until: Option<i64>) -> CinematicExtensionMessage {
        let mut msg = CinematicExtensionMessage::new(id, "combat/finisher", "https://cdn.example/x");
        msg.valid_until_epoch_ms = valid_until;
        msg
    }

    #[test]
    fn test_admit_at_expiry_instant_is_valid() {
        let mut gate = ExtensionGate::new();
        assert!(gate.admit_at(&extension("ex-1", Some(1_000)), 1_000).is_ok());
        assert!(gate.is_admitted("ex-1"));
    }

    #[test]
    fn test_admit_at_duplicate_returns_error() {
        let mut gate = ExtensionGate::new();
        let msg = extension("ex-1", None);
        gate.admit_at(&msg, 0).unwrap();
        assert_eq!(
            gate.admit_at(&msg, 1),
            Err(ExchangeError::DuplicateExtension("ex-1".into()))
        );
    }

    #[test]
    fn test_now_epoch_ms_tracks_system_clock() {
        let before = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis();
        let now = now_epoch_ms();
        assert!(now > 0);
        assert!(u128::try_from(now).unwrap() >= before);
    }

    #[test]
    fn test_stale_extension_is_not_remembered() {
        let mut gate = ExtensionGate::new();
        assert!(gate.admit_at(&extension("ex-1", Some(10)), 11).is_err());
        assert!(gate.is_empty());
    }

    #[test]
    fn test_forget_allows_reuse() {
        let mut gate = ExtensionGate::new();
        let msg = extension("ex-1", None);
        gate.admit_at(&msg, 0).unwrap();
        assert!(gate.forget("ex-1"));
        assert!(gate.admit_at(&msg, 0).is_ok());
    }

    #[test]
    fn test_admit_uses_system_clock() {
        let mut gate = ExtensionGate::new();
        // Expired in 2001.
        assert!(matches!(
            gate.admit(&extension("old", Some(1_000_000_000_000))),
            Err(ExchangeError::StaleExtension { .. })
        ));
        assert!(gate.admit(&extension("open", None)).is_ok());
    }
}
