use std::borrow::Cow;

use crate::config::Strategy;

/// Boxed error type for failures originating outside this crate.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures in resolving, caching, or persisting storage credentials.
///
/// Every variant carries enough context to tell the operator which
/// strategy misbehaved and what to fix.
#[derive(Debug, thiserror::Error)]
#[must_use = "errors do nothing unless handled"]
pub enum CredentialError {
    /// No storage configuration has been written yet.
    #[error("media storage is not configured")]
    NotConfigured,

    /// The persisted configuration is missing a field the strategy needs.
    ///
    /// Partial configurations are stored as-is and only rejected here,
    /// at resolution time.
    #[error("incomplete {strategy} configuration: missing `{field}`")]
    ConfigurationIncomplete {
        strategy: Strategy,
        field: &'static str,
    },

    /// A federated session (SSO access token) is no longer accepted upstream.
    #[error("federated session expired: {message}")]
    SessionExpired { message: String },

    /// The runtime environment lacks something the strategy depends on,
    /// such as a readable web identity token file.
    #[error("environment mismatch: {message}")]
    EnvironmentMismatch { message: String },

    /// The upstream token service rejected the exchange.
    #[error("upstream credential exchange failed: {message}")]
    UpstreamAuth { message: String },

    /// The settings store failed to load or persist credential state.
    #[error("credential settings store failure: {0}")]
    Store(#[source] BoxError),

    /// The persisted configuration or cached credential could not be decoded.
    #[error("malformed storage configuration: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Catch-all for invariant violations inside the lifecycle manager.
    #[error("unexpected credential lifecycle error: {0}")]
    Unexpected(Cow<'static, str>),
}

impl CredentialError {
    /// Creates a [`CredentialError::ConfigurationIncomplete`] for a missing field.
    pub fn missing_field(strategy: Strategy, field: &'static str) -> Self {
        Self::ConfigurationIncomplete { strategy, field }
    }

    /// Creates a [`CredentialError::SessionExpired`] from an upstream message.
    pub fn session_expired(message: impl Into<String>) -> Self {
        Self::SessionExpired {
            message: message.into(),
        }
    }

    /// Creates a [`CredentialError::EnvironmentMismatch`] from a message.
    pub fn environment_mismatch(message: impl Into<String>) -> Self {
        Self::EnvironmentMismatch {
            message: message.into(),
        }
    }

    /// Creates a [`CredentialError::UpstreamAuth`] from an upstream message.
    pub fn upstream_auth(message: impl Into<String>) -> Self {
        Self::UpstreamAuth {
            message: message.into(),
        }
    }

    /// Creates a [`CredentialError::Store`] from any boxable error.
    pub fn store(error: impl Into<BoxError>) -> Self {
        Self::Store(error.into())
    }

    /// Creates a [`CredentialError::Unexpected`] from a static or owned message.
    pub fn unexpected(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Operator-facing remediation hint for surfacing in status endpoints
    /// and admin tooling.
    pub fn remediation(&self) -> &'static str {
        match self {
            Self::NotConfigured => "write a storage configuration before requesting credentials",
            Self::ConfigurationIncomplete { .. } => {
                "fill in the missing field and re-save the storage configuration"
            }
            Self::SessionExpired { .. } => {
                "re-run the interactive SSO login and update the stored access token"
            }
            Self::EnvironmentMismatch { .. } => {
                "deploy to an environment that provisions the required identity material"
            }
            Self::UpstreamAuth { .. } => {
                "verify the configured role, keys, and trust policy with the storage provider"
            }
            Self::Store(_) | Self::Malformed(_) => {
                "inspect the storage_settings rows for this deployment"
            }
            Self::Unexpected(_) => "check service logs for the underlying failure",
        }
    }

    /// Whether retrying the same resolution without operator action can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamAuth { .. } | Self::Store(_))
    }
}

/// Failures in talking to the object store itself.
#[derive(Debug, thiserror::Error)]
#[must_use = "errors do nothing unless handled"]
pub enum StorageError {
    /// Credential resolution failed before any storage call was made.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The storage client could not be constructed from the profile.
    #[error("storage client initialization failed: {message}")]
    Init { message: String },

    /// The requested object does not exist in the bucket.
    #[error("object not found: {key}")]
    NotFound { key: String },

    /// A catalog record references a bucket other than the configured one.
    #[error("bucket mismatch: configured `{configured}`, record references `{referenced}`")]
    BucketMismatch {
        configured: String,
        referenced: String,
    },

    /// Presigning failed even after retrying with freshly resolved credentials.
    #[error("signing failed for `{key}`: {message}")]
    Signing { key: String, message: String },

    /// Any other backend failure, kept with its original error.
    #[error("storage backend error: {0}")]
    Backend(#[source] opendal::Error),
}

impl StorageError {
    /// Creates a [`StorageError::Init`] from a message.
    pub fn init(message: impl Into<String>) -> Self {
        Self::Init {
            message: message.into(),
        }
    }

    /// Creates a [`StorageError::NotFound`] for an object key.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates a [`StorageError::Signing`] for an object key.
    pub fn signing(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Signing {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether the failure means the object is absent rather than the
    /// operation broken.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<opendal::Error> for StorageError {
    fn from(error: opendal::Error) -> Self {
        match error.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound {
                key: error.to_string(),
            },
            _ => Self::Backend(error),
        }
    }
}

/// Result alias for credential lifecycle operations.
pub type CredentialResult<T, E = CredentialError> = Result<T, E>;

/// Result alias for object storage operations.
pub type StorageResult<T, E = StorageError> = Result<T, E>;
