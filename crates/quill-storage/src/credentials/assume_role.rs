use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_sts::config::{BehaviorVersion, Region};
use jiff::Timestamp;

use super::{CredentialProvider, ResolvedCredential};
use crate::config::{ROLE_SESSION_NAME, RoleAssumptionConfig, Strategy};
use crate::error::{CredentialError, CredentialResult};

/// Session length requested for every assumption.
const SESSION_DURATION_SECONDS: i32 = 3600;

/// Exchanges long-lived base keys for a one-hour role session.
pub struct AssumeRoleProvider {
    config: RoleAssumptionConfig,
}

impl AssumeRoleProvider {
    pub fn new(config: RoleAssumptionConfig) -> Self {
        Self { config }
    }

    fn client(&self, sts_region: &str, access_key_id: &str, secret_access_key: &str) -> aws_sdk_sts::Client {
        let base_keys = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "quill-storage-config",
        );
        let config = aws_sdk_sts::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(sts_region.to_owned()))
            .credentials_provider(base_keys)
            .build();
        aws_sdk_sts::Client::from_conf(config)
    }
}

#[async_trait]
impl CredentialProvider for AssumeRoleProvider {
    fn strategy(&self) -> Strategy {
        Strategy::RoleAssumption
    }

    async fn resolve(&self) -> CredentialResult<ResolvedCredential> {
        let (role_arn, sts_region, base_access_key_id, base_secret_access_key) =
            self.config.validated()?;

        tracing::debug!(
            target: crate::TRACING_TARGET_CREDENTIALS,
            role_arn, "Assuming storage role",
        );

        let output = self
            .client(sts_region, base_access_key_id, base_secret_access_key)
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(ROLE_SESSION_NAME)
            .duration_seconds(SESSION_DURATION_SECONDS)
            .set_external_id(self.config.external_id.clone())
            .send()
            .await
            .map_err(|err| {
                CredentialError::upstream_auth(err.into_service_error().to_string())
            })?;

        let credentials = output
            .credentials()
            .ok_or_else(|| CredentialError::upstream_auth("assume-role returned no credentials"))?;

        Ok(ResolvedCredential {
            access_key_id: credentials.access_key_id().to_owned(),
            secret_access_key: credentials.secret_access_key().to_owned(),
            session_token: Some(credentials.session_token().to_owned()),
            expires_at: Some(timestamp_from_expiration(credentials.expiration())?),
        })
    }
}

/// Converts an upstream expiration timestamp into a [`Timestamp`].
pub(super) fn timestamp_from_expiration(
    expiration: &aws_sdk_sts::primitives::DateTime,
) -> CredentialResult<Timestamp> {
    Timestamp::new(expiration.secs(), expiration.subsec_nanos() as i32)
        .map_err(|err| CredentialError::upstream_auth(format!("invalid expiration: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_configuration_without_role_arn() {
        let provider = AssumeRoleProvider::new(RoleAssumptionConfig {
            sts_region: Some("us-east-1".to_owned()),
            base_access_key_id: Some("AKIA_TEST".to_owned()),
            base_secret_access_key: Some("secret".to_owned()),
            ..RoleAssumptionConfig::default()
        });

        let error = provider.resolve().await.unwrap_err();
        assert!(matches!(
            error,
            CredentialError::ConfigurationIncomplete {
                strategy: Strategy::RoleAssumption,
                field: "role_arn",
            }
        ));
    }

    #[test]
    fn upstream_expiration_converts_to_timestamp() {
        let expiration = aws_sdk_sts::primitives::DateTime::from_secs(1_750_000_000);
        let timestamp = timestamp_from_expiration(&expiration).unwrap();
        assert_eq!(timestamp.as_second(), 1_750_000_000);
    }
}
