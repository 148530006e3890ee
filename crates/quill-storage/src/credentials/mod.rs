//! Credential resolution and lifecycle management.
//!
//! Each supported strategy has a [`CredentialProvider`] that turns persisted
//! configuration into a [`ResolvedCredential`]. The [`CredentialManager`]
//! owns the active provider, caches the current credential, and guarantees
//! single-flight refresh under concurrency.

mod assume_role;
mod identity_center;
mod long_lived;
mod manager;
mod provider;
mod static_temporary;
mod web_identity;

use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

pub use self::assume_role::AssumeRoleProvider;
pub use self::identity_center::IdentityCenterProvider;
pub use self::long_lived::LongLivedProvider;
pub use self::manager::{
    CredentialManager, CredentialStatus, InMemorySettingsStore, LifecyclePhase, ProviderFactory,
    SettingsStore,
};
pub use self::provider::{CredentialProvider, provider_for};
pub use self::static_temporary::StaticTemporaryProvider;
pub use self::web_identity::WebIdentityProvider;

/// A set of keys ready to sign storage requests with.
///
/// `expires_at` is `None` for strategies whose credentials are refreshed
/// out of band and never go stale from the caller's perspective.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCredential {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
}

impl ResolvedCredential {
    /// Whether the credential is already past its expiry.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= Timestamp::now(),
            None => false,
        }
    }

    /// Whether the credential expires within the given window.
    ///
    /// Non-expiring credentials never do.
    pub fn expires_within(&self, window: SignedDuration) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= Timestamp::now() + window,
            None => false,
        }
    }

    /// Remaining lifetime, if the credential expires at all.
    pub fn remaining(&self) -> Option<SignedDuration> {
        self.expires_at
            .map(|expires_at| expires_at.duration_since(Timestamp::now()))
    }
}

// Manual impl keeps the secret key out of logs.
impl std::fmt::Debug for ResolvedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCredential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(expires_at: Option<Timestamp>) -> ResolvedCredential {
        ResolvedCredential {
            access_key_id: "AKIA_TEST".to_owned(),
            secret_access_key: "secret".to_owned(),
            session_token: None,
            expires_at,
        }
    }

    #[test]
    fn expiry_checks_respect_the_clock() {
        let now = Timestamp::now();

        let stale = credential(Some(now - SignedDuration::from_secs(60)));
        assert!(stale.is_expired());

        let fresh = credential(Some(now + SignedDuration::from_secs(3600)));
        assert!(!fresh.is_expired());
        assert!(fresh.expires_within(SignedDuration::from_secs(7200)));
        assert!(!fresh.expires_within(SignedDuration::from_secs(60)));
    }

    #[test]
    fn non_expiring_credential_never_expires() {
        let credential = credential(None);
        assert!(!credential.is_expired());
        assert!(!credential.expires_within(SignedDuration::from_secs(u32::MAX as i64)));
        assert!(credential.remaining().is_none());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let credential = ResolvedCredential {
            access_key_id: "AKIA_TEST".to_owned(),
            secret_access_key: "super-secret".to_owned(),
            session_token: Some("FwoGZXIvYXdzEBY".to_owned()),
            expires_at: None,
        };

        let rendered = format!("{credential:?}");
        assert!(rendered.contains("AKIA_TEST"));
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("FwoGZXIvYXdzEBY"));
    }
}
