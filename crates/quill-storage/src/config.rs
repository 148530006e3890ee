//! Storage configuration model.
//!
//! The platform persists one storage configuration per deployment in the
//! settings store: a bucket profile plus a tagged credential strategy.
//! Partial configurations are accepted at write time and only validated
//! when a credential is actually resolved.

use std::path::PathBuf;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::{CredentialError, CredentialResult};

/// Settings key holding the strategy discriminant as text.
pub const SETTING_MEDIA_STORAGE_TYPE: &str = "media_storage_type";

/// Settings key holding the full [`StorageConfig`] as JSON.
pub const SETTING_MEDIA_STORAGE_CONFIG: &str = "media_storage_config";

/// Settings key holding the last persisted temporary credential as JSON.
///
/// Kept separate from [`SETTING_MEDIA_STORAGE_CONFIG`] so credential
/// refreshes never rewrite operator-authored configuration.
pub const SETTING_MEDIA_STORAGE_CACHED_CREDENTIAL: &str = "media_storage_cached_credential";

/// Default web identity token path provisioned by workload identity
/// integrations on Kubernetes.
pub const DEFAULT_WEB_IDENTITY_TOKEN_FILE: &str =
    "/var/run/secrets/eks.amazonaws.com/serviceaccount/token";

/// Session name stamped on every role assumption performed by this service.
pub const ROLE_SESSION_NAME: &str = "quill-media-storage";

/// Credential strategy discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString, strum::EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Strategy {
    /// Pre-issued temporary keys pasted in by an operator.
    StaticTemporary,
    /// Identity Center (SSO) role credentials minted from an access token.
    IdentityCenterSso,
    /// Role assumption from long-lived base keys.
    RoleAssumption,
    /// OIDC web identity exchange using a platform-rotated token file.
    WebIdentity,
    /// Permanent keys, force-expired locally to keep clients cycling.
    LongLived,
}

impl Strategy {
    /// Whether resolved credentials of this strategy carry a hard expiry.
    pub fn expires(&self) -> bool {
        // Web identity tokens are rotated by the platform underneath us,
        // so the resolved credential is treated as non-expiring.
        !matches!(self, Self::WebIdentity)
    }
}

/// Bucket-level connection profile, independent of how credentials
/// are obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageProfile {
    /// Target bucket name.
    pub bucket: String,
    /// Bucket region.
    pub region: String,
    /// Custom endpoint for S3-compatible providers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl StorageProfile {
    /// Creates a profile for the given bucket and region.
    pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            endpoint: None,
        }
    }

    /// Overrides the storage endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

/// Full persisted storage configuration: where objects live and how to
/// authenticate to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Bucket connection profile.
    pub profile: StorageProfile,
    /// Credential acquisition strategy and its parameters.
    pub credentials: CredentialStrategyConfig,
}

impl StorageConfig {
    /// Strategy discriminant of the configured credential source.
    pub fn strategy(&self) -> Strategy {
        self.credentials.strategy()
    }
}

/// Tagged union of per-strategy credential configuration.
///
/// The `strategy` tag matches the text stored under
/// [`SETTING_MEDIA_STORAGE_TYPE`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum CredentialStrategyConfig {
    StaticTemporary(StaticTemporaryConfig),
    IdentityCenterSso(IdentityCenterSsoConfig),
    RoleAssumption(RoleAssumptionConfig),
    WebIdentity(WebIdentityConfig),
    LongLived(LongLivedConfig),
}

impl CredentialStrategyConfig {
    /// Strategy discriminant for this configuration.
    pub fn strategy(&self) -> Strategy {
        match self {
            Self::StaticTemporary(_) => Strategy::StaticTemporary,
            Self::IdentityCenterSso(_) => Strategy::IdentityCenterSso,
            Self::RoleAssumption(_) => Strategy::RoleAssumption,
            Self::WebIdentity(_) => Strategy::WebIdentity,
            Self::LongLived(_) => Strategy::LongLived,
        }
    }
}

/// Requires a field to be present and non-empty, naming it in the error.
fn require<'a>(
    strategy: Strategy,
    field: &'static str,
    value: &'a Option<String>,
) -> CredentialResult<&'a str> {
    match value.as_deref() {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(CredentialError::missing_field(strategy, field)),
    }
}

/// Pre-issued temporary keys with an operator-declared expiry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticTemporaryConfig {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    /// Declared expiry of the pasted keys. Defaults to twelve hours from
    /// resolution when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
}

impl StaticTemporaryConfig {
    pub(crate) fn validated(&self) -> CredentialResult<(&str, &str)> {
        let strategy = Strategy::StaticTemporary;
        let access_key_id = require(strategy, "access_key_id", &self.access_key_id)?;
        let secret_access_key = require(strategy, "secret_access_key", &self.secret_access_key)?;
        Ok((access_key_id, secret_access_key))
    }
}

/// Identity Center (SSO) role credentials minted from a device access token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityCenterSsoConfig {
    /// Region of the Identity Center instance, not of the bucket.
    pub sso_region: Option<String>,
    pub account_id: Option<String>,
    pub role_name: Option<String>,
    /// Access token from the most recent interactive SSO login.
    pub access_token: Option<String>,
}

impl IdentityCenterSsoConfig {
    pub(crate) fn validated(&self) -> CredentialResult<(&str, &str, &str, &str)> {
        let strategy = Strategy::IdentityCenterSso;
        let sso_region = require(strategy, "sso_region", &self.sso_region)?;
        let account_id = require(strategy, "account_id", &self.account_id)?;
        let role_name = require(strategy, "role_name", &self.role_name)?;
        let access_token = require(strategy, "access_token", &self.access_token)?;
        Ok((sso_region, account_id, role_name, access_token))
    }
}

/// Role assumption from long-lived base keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleAssumptionConfig {
    pub role_arn: Option<String>,
    /// Region the token service is called in.
    pub sts_region: Option<String>,
    pub base_access_key_id: Option<String>,
    pub base_secret_access_key: Option<String>,
    /// External id required by the role's trust policy, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl RoleAssumptionConfig {
    pub(crate) fn validated(&self) -> CredentialResult<(&str, &str, &str, &str)> {
        let strategy = Strategy::RoleAssumption;
        let role_arn = require(strategy, "role_arn", &self.role_arn)?;
        let sts_region = require(strategy, "sts_region", &self.sts_region)?;
        let base_access_key_id =
            require(strategy, "base_access_key_id", &self.base_access_key_id)?;
        let base_secret_access_key = require(
            strategy,
            "base_secret_access_key",
            &self.base_secret_access_key,
        )?;
        Ok((
            role_arn,
            sts_region,
            base_access_key_id,
            base_secret_access_key,
        ))
    }
}

/// OIDC web identity exchange against a platform-rotated token file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebIdentityConfig {
    pub role_arn: Option<String>,
    /// Region the token service is called in.
    pub sts_region: Option<String>,
    /// Token file path. Defaults to [`DEFAULT_WEB_IDENTITY_TOKEN_FILE`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
}

impl WebIdentityConfig {
    pub(crate) fn validated(&self) -> CredentialResult<(&str, &str, PathBuf)> {
        let strategy = Strategy::WebIdentity;
        let role_arn = require(strategy, "role_arn", &self.role_arn)?;
        let sts_region = require(strategy, "sts_region", &self.sts_region)?;
        let token_file = self
            .token_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WEB_IDENTITY_TOKEN_FILE));
        Ok((role_arn, sts_region, token_file))
    }
}

/// Permanent keys for providers without a token service.
///
/// Resolved credentials are stamped with a short local expiry so the rest
/// of the system exercises the same refresh path as temporary strategies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LongLivedConfig {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl LongLivedConfig {
    pub(crate) fn validated(&self) -> CredentialResult<(&str, &str)> {
        let strategy = Strategy::LongLived;
        let access_key_id = require(strategy, "access_key_id", &self.access_key_id)?;
        let secret_access_key = require(strategy, "secret_access_key", &self.secret_access_key)?;
        Ok((access_key_id, secret_access_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_tag_round_trips_through_json() {
        let config = CredentialStrategyConfig::RoleAssumption(RoleAssumptionConfig {
            role_arn: Some("arn:aws:iam::123456789012:role/media".to_owned()),
            sts_region: Some("us-east-1".to_owned()),
            base_access_key_id: Some("AKIA_TEST".to_owned()),
            base_secret_access_key: Some("secret".to_owned()),
            external_id: None,
        });

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["strategy"], "role_assumption");

        let parsed: CredentialStrategyConfig = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.strategy(), Strategy::RoleAssumption);
        assert_eq!(parsed, config);
    }

    #[test]
    fn strategy_display_matches_settings_text() {
        assert_eq!(Strategy::IdentityCenterSso.to_string(), "identity_center_sso");
        assert_eq!(Strategy::WebIdentity.to_string(), "web_identity");
        assert_eq!(
            "static_temporary".parse::<Strategy>().unwrap(),
            Strategy::StaticTemporary,
        );
    }

    #[test]
    fn incomplete_configuration_names_missing_field() {
        let config = IdentityCenterSsoConfig {
            sso_region: Some("us-east-1".to_owned()),
            account_id: Some("123456789012".to_owned()),
            role_name: Some("MediaAccess".to_owned()),
            access_token: None,
        };

        let error = config.validated().unwrap_err();
        match error {
            CredentialError::ConfigurationIncomplete { strategy, field } => {
                assert_eq!(strategy, Strategy::IdentityCenterSso);
                assert_eq!(field, "access_token");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blank_fields_are_treated_as_missing() {
        let config = LongLivedConfig {
            access_key_id: Some("  ".to_owned()),
            secret_access_key: Some("secret".to_owned()),
        };

        let error = config.validated().unwrap_err();
        assert!(matches!(
            error,
            CredentialError::ConfigurationIncomplete {
                field: "access_key_id",
                ..
            }
        ));
    }

    #[test]
    fn web_identity_falls_back_to_default_token_path() {
        let config = WebIdentityConfig {
            role_arn: Some("arn:aws:iam::123456789012:role/media".to_owned()),
            sts_region: Some("us-east-1".to_owned()),
            token_file: None,
        };

        let (_, _, token_file) = config.validated().unwrap();
        assert_eq!(token_file, PathBuf::from(DEFAULT_WEB_IDENTITY_TOKEN_FILE));
    }
}
