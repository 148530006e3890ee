//! Time-limited signed download URLs.

use std::sync::Arc;
use std::time::Duration;

use crate::client::StorageClientFactory;
use crate::error::{StorageError, StorageResult};

/// Tracing target for URL signing operations.
const TRACING_TARGET: &str = "quill_storage::signer";

/// Default signed URL lifetime.
pub const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(3600);

/// Produces presigned download URLs for cataloged objects.
///
/// Signing is retried exactly once with freshly resolved credentials, which
/// covers the window where a credential was rotated upstream but the cached
/// client has not noticed yet.
#[derive(Debug, Clone)]
pub struct SignedUrlService {
    factory: Arc<StorageClientFactory>,
}

impl SignedUrlService {
    /// Creates a signing service over the given client factory.
    pub fn new(factory: Arc<StorageClientFactory>) -> Self {
        Self { factory }
    }

    /// Signs a GET URL for the object, valid for the default lifetime.
    pub async fn sign(&self, key: &str) -> StorageResult<String> {
        self.sign_with_ttl(key, DEFAULT_SIGNED_URL_TTL).await
    }

    /// Signs a GET URL for the object, valid for `ttl`.
    pub async fn sign_with_ttl(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        let client = self.factory.client().await?;

        let first_error = match client.presign_read(key, ttl).await {
            Ok(url) => return Ok(url),
            Err(err) => err,
        };

        tracing::warn!(
            target: TRACING_TARGET,
            key = %key,
            error = %first_error,
            "Presign failed, retrying with fresh credentials"
        );

        let client = self.factory.fresh_client().await?;
        client
            .presign_read(key, ttl)
            .await
            .map_err(|err| match err {
                StorageError::Credential(err) => StorageError::Credential(err),
                err => StorageError::signing(key, err.to_string()),
            })
    }
}
