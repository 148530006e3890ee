use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};

use super::{CredentialProvider, ResolvedCredential};
use crate::config::{StaticTemporaryConfig, Strategy};
use crate::error::CredentialResult;

/// Assumed lifetime of pasted temporary keys when the operator does not
/// declare one.
const DEFAULT_LIFETIME: SignedDuration = SignedDuration::from_hours(12);

/// Serves operator-pasted temporary keys verbatim.
pub struct StaticTemporaryProvider {
    config: StaticTemporaryConfig,
}

impl StaticTemporaryProvider {
    pub fn new(config: StaticTemporaryConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl CredentialProvider for StaticTemporaryProvider {
    fn strategy(&self) -> Strategy {
        Strategy::StaticTemporary
    }

    async fn resolve(&self) -> CredentialResult<ResolvedCredential> {
        let (access_key_id, secret_access_key) = self.config.validated()?;
        let expires_at = self
            .config
            .expires_at
            .unwrap_or_else(|| Timestamp::now() + DEFAULT_LIFETIME);

        tracing::debug!(
            target: crate::TRACING_TARGET_CREDENTIALS,
            %expires_at, "Resolved static temporary credential",
        );

        Ok(ResolvedCredential {
            access_key_id: access_key_id.to_owned(),
            secret_access_key: secret_access_key.to_owned(),
            session_token: self.config.session_token.clone(),
            expires_at: Some(expires_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CredentialError;

    #[tokio::test]
    async fn defaults_expiry_to_twelve_hours() {
        let provider = StaticTemporaryProvider::new(StaticTemporaryConfig {
            access_key_id: Some("AKIA_TEST".to_owned()),
            secret_access_key: Some("secret".to_owned()),
            session_token: Some("session".to_owned()),
            expires_at: None,
        });

        let credential = provider.resolve().await.unwrap();
        let remaining = credential.remaining().unwrap();
        assert!(remaining > SignedDuration::from_hours(11));
        assert!(remaining <= SignedDuration::from_hours(12));
        assert_eq!(credential.session_token.as_deref(), Some("session"));
    }

    #[tokio::test]
    async fn rejects_missing_secret_key() {
        let provider = StaticTemporaryProvider::new(StaticTemporaryConfig {
            access_key_id: Some("AKIA_TEST".to_owned()),
            ..StaticTemporaryConfig::default()
        });

        let error = provider.resolve().await.unwrap_err();
        assert!(matches!(
            error,
            CredentialError::ConfigurationIncomplete {
                strategy: Strategy::StaticTemporary,
                field: "secret_access_key",
            }
        ));
    }
}
