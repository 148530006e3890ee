use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};

use super::{CredentialProvider, ResolvedCredential};
use crate::config::{LongLivedConfig, Strategy};
use crate::error::CredentialResult;

/// Local expiry stamped on permanent keys so every consumer cycles its
/// clients on the same cadence as temporary strategies.
const FORCED_LIFETIME: SignedDuration = SignedDuration::from_mins(30);

/// Serves permanent keys with a short forced expiry.
pub struct LongLivedProvider {
    config: LongLivedConfig,
}

impl LongLivedProvider {
    pub fn new(config: LongLivedConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl CredentialProvider for LongLivedProvider {
    fn strategy(&self) -> Strategy {
        Strategy::LongLived
    }

    async fn resolve(&self) -> CredentialResult<ResolvedCredential> {
        let (access_key_id, secret_access_key) = self.config.validated()?;

        Ok(ResolvedCredential {
            access_key_id: access_key_id.to_owned(),
            secret_access_key: secret_access_key.to_owned(),
            session_token: None,
            expires_at: Some(Timestamp::now() + FORCED_LIFETIME),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn permanent_keys_get_a_forced_expiry() {
        let provider = LongLivedProvider::new(LongLivedConfig {
            access_key_id: Some("AKIA_TEST".to_owned()),
            secret_access_key: Some("secret".to_owned()),
        });

        let credential = provider.resolve().await.unwrap();
        assert!(credential.session_token.is_none());

        let remaining = credential.remaining().unwrap();
        assert!(remaining > SignedDuration::from_mins(29));
        assert!(remaining <= SignedDuration::from_mins(30));
    }
}
