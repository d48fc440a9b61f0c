//! Two-phase OAuth2 device-pairing state machine.
//!
//! Pairing an external device or service account spans two independent
//! console commands: `\d start-oauth2 <kind>` asks the device factory for a
//! redirect URL plus an opaque session blob, and `\d complete-oauth2 <url>`
//! replays that blob verbatim, together with the callback URL the operator
//! pasted back, into the same factory entry point.
//!
//! The state is an explicit value so tests can assert transitions directly:
//! `Idle -> AwaitingCallback -> Idle`, with failures always landing back in
//! `Idle`.

use std::collections::HashMap;

use tracing::debug;

use crate::engine::{DeviceFactory, OAuthCallback, OAuthOutcome};
use crate::error::{HearthError, Result};
use crate::types::DeviceEntry;

/// Pairing phase. `session` is opaque: recorded at phase 1, replayed at
/// phase 2, never interpreted here.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PairingPhase {
    #[default]
    Idle,
    AwaitingCallback {
        kind: String,
        session: HashMap<String, serde_json::Value>,
    },
}

/// The pairing coordinator held by the session across commands.
///
/// There is no timeout on `AwaitingCallback`; the operator may issue other
/// commands freely between the two phases.
#[derive(Debug, Default)]
pub struct OAuthPairing {
    phase: PairingPhase,
}

impl OAuthPairing {
    pub fn new() -> Self {
        Self {
            phase: PairingPhase::Idle,
        }
    }

    pub fn phase(&self) -> &PairingPhase {
        &self.phase
    }

    /// Kind recorded by an unfinished phase 1, if any.
    pub fn pending_kind(&self) -> Option<&str> {
        match &self.phase {
            PairingPhase::AwaitingCallback { kind, .. } => Some(kind),
            PairingPhase::Idle => None,
        }
    }

    /// Phase 1: request a redirect URL for `kind`.
    ///
    /// On success the returned session is recorded for the next `complete`
    /// call and the redirect URL is returned for the operator to visit
    /// out-of-band. On failure the phase stays `Idle`.
    pub async fn begin(&mut self, factory: &dyn DeviceFactory, kind: &str) -> Result<String> {
        match factory.run_oauth2(kind, None).await {
            Ok(OAuthOutcome::Redirect { url, session }) => {
                debug!(kind, "oauth phase 1 complete, awaiting callback");
                self.phase = PairingPhase::AwaitingCallback {
                    kind: kind.to_string(),
                    session,
                };
                Ok(url)
            }
            Ok(OAuthOutcome::Completed(_)) => Err(HearthError::OAuthInitiation {
                kind: kind.to_string(),
                message: "factory completed without issuing a redirect".into(),
            }),
            Err(e) => Err(HearthError::OAuthInitiation {
                kind: kind.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Phase 2: replay the recorded session against the supplied callback
    /// URL.
    ///
    /// With no preceding phase 1 this is deliberately lenient: an empty kind
    /// and an empty session are passed through and the factory's refusal is
    /// what gets reported. Whatever the outcome, the phase returns to
    /// `Idle`; no automatic retry is attempted.
    pub async fn complete(
        &mut self,
        factory: &dyn DeviceFactory,
        callback_url: &str,
    ) -> Result<DeviceEntry> {
        let (kind, session) = match std::mem::take(&mut self.phase) {
            PairingPhase::AwaitingCallback { kind, session } => (kind, session),
            PairingPhase::Idle => (String::new(), HashMap::new()),
        };

        let query = parse_query(callback_url).map_err(|message| HearthError::OAuthCompletion {
            kind: kind.clone(),
            message,
        })?;

        let callback = OAuthCallback {
            method: "GET",
            query,
            session,
        };

        match factory.run_oauth2(&kind, Some(callback)).await {
            Ok(OAuthOutcome::Completed(device)) => {
                debug!(kind, device_id = %device.id, "oauth phase 2 complete");
                Ok(device)
            }
            Ok(OAuthOutcome::Redirect { .. }) => Err(HearthError::OAuthCompletion {
                kind,
                message: "factory restarted the handshake instead of completing it".into(),
            }),
            Err(e) => Err(HearthError::OAuthCompletion {
                kind,
                message: e.to_string(),
            }),
        }
    }
}

fn parse_query(callback_url: &str) -> std::result::Result<HashMap<String, String>, String> {
    let url = url::Url::parse(callback_url).map_err(|e| format!("invalid callback URL: {e}"))?;
    Ok(url.query_pairs().into_owned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDeviceFactory;
    use pretty_assertions::assert_eq;

    const KIND: &str = "com.example.thermostat";

    #[tokio::test]
    async fn test_begin_records_kind_and_session() {
        let factory = MockDeviceFactory::new();
        let mut pairing = OAuthPairing::new();

        let url = pairing.begin(&factory, KIND).await.unwrap();
        assert!(url.contains(KIND));
        assert_eq!(pairing.pending_kind(), Some(KIND));
        match pairing.phase() {
            PairingPhase::AwaitingCallback { kind, session } => {
                assert_eq!(kind, KIND);
                assert!(!session.is_empty());
            }
            PairingPhase::Idle => panic!("expected AwaitingCallback"),
        }
    }

    #[tokio::test]
    async fn test_round_trip_completes_and_resets() {
        let factory = MockDeviceFactory::new();
        let mut pairing = OAuthPairing::new();

        pairing.begin(&factory, KIND).await.unwrap();
        let device = pairing
            .complete(&factory, "https://127.0.0.1:3000/callback?code=abc123")
            .await
            .unwrap();
        assert_eq!(device.kind, KIND);
        assert_eq!(pairing.phase(), &PairingPhase::Idle);
        assert_eq!(factory.paired().len(), 1);
    }

    #[tokio::test]
    async fn test_begin_failure_stays_idle() {
        let factory = MockDeviceFactory::new();
        let mut pairing = OAuthPairing::new();

        // An empty kind is refused by the factory.
        let err = pairing.begin(&factory, "").await.unwrap_err();
        assert!(matches!(err, HearthError::OAuthInitiation { .. }));
        assert_eq!(pairing.phase(), &PairingPhase::Idle);
    }

    #[tokio::test]
    async fn test_complete_without_begin_is_lenient_but_reported() {
        let factory = MockDeviceFactory::new();
        let mut pairing = OAuthPairing::new();

        // Documented design choice: no local hard error, the factory sees an
        // empty kind and empty session and its refusal is reported.
        let err = pairing
            .complete(&factory, "https://127.0.0.1:3000/callback?code=abc123")
            .await
            .unwrap_err();
        assert!(matches!(err, HearthError::OAuthCompletion { .. }));
        assert_eq!(pairing.phase(), &PairingPhase::Idle);
        assert!(factory.paired().is_empty());
    }

    #[tokio::test]
    async fn test_tampered_session_is_rejected() {
        let factory = MockDeviceFactory::new();
        let mut pairing = OAuthPairing::new();

        pairing.begin(&factory, KIND).await.unwrap();
        // Tamper with the recorded session behind the coordinator's back.
        pairing.phase = PairingPhase::AwaitingCallback {
            kind: KIND.to_string(),
            session: HashMap::from([("oauth2-state".into(), serde_json::json!("forged"))]),
        };

        let err = pairing
            .complete(&factory, "https://127.0.0.1:3000/callback?code=abc123")
            .await
            .unwrap_err();
        assert!(matches!(err, HearthError::OAuthCompletion { .. }));
        assert_eq!(pairing.phase(), &PairingPhase::Idle);
    }

    #[tokio::test]
    async fn test_invalid_callback_url_resets_to_idle() {
        let factory = MockDeviceFactory::new();
        let mut pairing = OAuthPairing::new();

        pairing.begin(&factory, KIND).await.unwrap();
        let err = pairing.complete(&factory, "not a url").await.unwrap_err();
        assert!(matches!(err, HearthError::OAuthCompletion { .. }));
        assert_eq!(pairing.phase(), &PairingPhase::Idle);
    }

    #[tokio::test]
    async fn test_failed_completion_requires_fresh_begin() {
        let factory = MockDeviceFactory::new();
        let mut pairing = OAuthPairing::new();

        pairing.begin(&factory, KIND).await.unwrap();
        // Missing authorization code in the callback query.
        let err = pairing
            .complete(&factory, "https://127.0.0.1:3000/callback?error=denied")
            .await
            .unwrap_err();
        assert!(matches!(err, HearthError::OAuthCompletion { .. }));

        // A second completion attempt runs with no recorded state.
        let err = pairing
            .complete(&factory, "https://127.0.0.1:3000/callback?code=abc123")
            .await
            .unwrap_err();
        assert!(matches!(err, HearthError::OAuthCompletion { .. }));
    }
}
