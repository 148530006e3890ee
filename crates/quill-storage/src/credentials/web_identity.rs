use async_trait::async_trait;
use aws_sdk_sts::config::{BehaviorVersion, Region};

use super::assume_role::timestamp_from_expiration;
use super::{CredentialProvider, ResolvedCredential};
use crate::config::{ROLE_SESSION_NAME, Strategy, WebIdentityConfig};
use crate::error::{CredentialError, CredentialResult};

/// Exchanges a platform-rotated OIDC token for role credentials.
///
/// The token file is re-read on every resolution so rotations are picked
/// up without restarting. Resolved credentials carry no expiry: the
/// platform rotates the underlying token and the exchange is repeated on
/// demand, so callers never see them go stale.
pub struct WebIdentityProvider {
    config: WebIdentityConfig,
}

impl WebIdentityProvider {
    pub fn new(config: WebIdentityConfig) -> Self {
        Self { config }
    }

    fn client(&self, sts_region: &str) -> aws_sdk_sts::Client {
        // AssumeRoleWithWebIdentity is unsigned, no base credentials needed.
        let config = aws_sdk_sts::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(sts_region.to_owned()))
            .build();
        aws_sdk_sts::Client::from_conf(config)
    }
}

#[async_trait]
impl CredentialProvider for WebIdentityProvider {
    fn strategy(&self) -> Strategy {
        Strategy::WebIdentity
    }

    async fn resolve(&self) -> CredentialResult<ResolvedCredential> {
        let (role_arn, sts_region, token_file) = self.config.validated()?;

        let token = tokio::fs::read_to_string(&token_file).await.map_err(|err| {
            CredentialError::environment_mismatch(format!(
                "web identity token file `{}` is not readable: {err}",
                token_file.display(),
            ))
        })?;
        let token = token.trim();
        if token.is_empty() {
            return Err(CredentialError::environment_mismatch(format!(
                "web identity token file `{}` is empty",
                token_file.display(),
            )));
        }

        tracing::debug!(
            target: crate::TRACING_TARGET_CREDENTIALS,
            role_arn, "Exchanging web identity token",
        );

        let output = self
            .client(sts_region)
            .assume_role_with_web_identity()
            .role_arn(role_arn)
            .role_session_name(ROLE_SESSION_NAME)
            .web_identity_token(token)
            .send()
            .await
            .map_err(|err| {
                CredentialError::upstream_auth(err.into_service_error().to_string())
            })?;

        let credentials = output.credentials().ok_or_else(|| {
            CredentialError::upstream_auth("web identity exchange returned no credentials")
        })?;

        // The upstream session expiry is logged but deliberately not
        // carried on the credential; see the type-level docs.
        let upstream_expiry = timestamp_from_expiration(credentials.expiration())?;
        tracing::trace!(
            target: crate::TRACING_TARGET_CREDENTIALS,
            %upstream_expiry, "Web identity session minted",
        );

        Ok(ResolvedCredential {
            access_key_id: credentials.access_key_id().to_owned(),
            secret_access_key: credentials.secret_access_key().to_owned(),
            session_token: Some(credentials.session_token().to_owned()),
            expires_at: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn config(token_file: Option<PathBuf>) -> WebIdentityConfig {
        WebIdentityConfig {
            role_arn: Some("arn:aws:iam::123456789012:role/media".to_owned()),
            sts_region: Some("us-east-1".to_owned()),
            token_file,
        }
    }

    #[tokio::test]
    async fn unreadable_token_file_is_an_environment_mismatch() {
        let provider =
            WebIdentityProvider::new(config(Some(PathBuf::from("/nonexistent/token"))));

        let error = provider.resolve().await.unwrap_err();
        assert!(matches!(error, CredentialError::EnvironmentMismatch { .. }));
    }

    #[tokio::test]
    async fn empty_token_file_is_an_environment_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "  \n").unwrap();

        let provider = WebIdentityProvider::new(config(Some(path)));

        let error = provider.resolve().await.unwrap_err();
        assert!(matches!(error, CredentialError::EnvironmentMismatch { .. }));
    }
}
