use async_trait::async_trait;
use aws_sdk_sso::config::{BehaviorVersion, Region};
use jiff::Timestamp;

use super::{CredentialProvider, ResolvedCredential};
use crate::config::{IdentityCenterSsoConfig, Strategy};
use crate::error::{CredentialError, CredentialResult};

/// Mints role credentials from an Identity Center access token.
///
/// The access token comes from an interactive SSO login and lives in the
/// persisted configuration; when it lapses upstream the error asks for a
/// fresh login rather than being retried.
pub struct IdentityCenterProvider {
    config: IdentityCenterSsoConfig,
}

impl IdentityCenterProvider {
    pub fn new(config: IdentityCenterSsoConfig) -> Self {
        Self { config }
    }

    fn client(&self, sso_region: &str) -> aws_sdk_sso::Client {
        let config = aws_sdk_sso::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(sso_region.to_owned()))
            .build();
        aws_sdk_sso::Client::from_conf(config)
    }
}

#[async_trait]
impl CredentialProvider for IdentityCenterProvider {
    fn strategy(&self) -> Strategy {
        Strategy::IdentityCenterSso
    }

    async fn resolve(&self) -> CredentialResult<ResolvedCredential> {
        let (sso_region, account_id, role_name, access_token) = self.config.validated()?;

        tracing::debug!(
            target: crate::TRACING_TARGET_CREDENTIALS,
            account_id, role_name, "Requesting identity center role credentials",
        );

        let output = self
            .client(sso_region)
            .get_role_credentials()
            .access_token(access_token)
            .account_id(account_id)
            .role_name(role_name)
            .send()
            .await
            .map_err(|err| {
                let service_error = err.into_service_error();
                if service_error.is_unauthorized_exception() {
                    CredentialError::session_expired(format!(
                        "identity center rejected the stored access token: {service_error}",
                    ))
                } else {
                    CredentialError::upstream_auth(service_error.to_string())
                }
            })?;

        let role_credentials = output.role_credentials().ok_or_else(|| {
            CredentialError::upstream_auth("identity center returned no role credentials")
        })?;
        let access_key_id = role_credentials.access_key_id().ok_or_else(|| {
            CredentialError::upstream_auth("identity center response missing access key id")
        })?;
        let secret_access_key = role_credentials.secret_access_key().ok_or_else(|| {
            CredentialError::upstream_auth("identity center response missing secret access key")
        })?;

        // Expiration is epoch milliseconds.
        let expires_at = Timestamp::from_millisecond(role_credentials.expiration())
            .map_err(|err| CredentialError::upstream_auth(format!("invalid expiration: {err}")))?;

        Ok(ResolvedCredential {
            access_key_id: access_key_id.to_owned(),
            secret_access_key: secret_access_key.to_owned(),
            session_token: role_credentials.session_token().map(ToOwned::to_owned),
            expires_at: Some(expires_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_configuration_without_access_token() {
        let provider = IdentityCenterProvider::new(IdentityCenterSsoConfig {
            sso_region: Some("us-east-1".to_owned()),
            account_id: Some("123456789012".to_owned()),
            role_name: Some("MediaAccess".to_owned()),
            access_token: None,
        });

        let error = provider.resolve().await.unwrap_err();
        assert!(matches!(
            error,
            CredentialError::ConfigurationIncomplete {
                strategy: Strategy::IdentityCenterSso,
                field: "access_token",
            }
        ));
    }
}
