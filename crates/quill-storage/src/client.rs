//! S3-backed object client and the credential-aware factory.

use std::sync::Arc;
use std::time::Duration;

use futures::{StreamExt, TryStreamExt};
use opendal::{Operator, services};
use tokio::sync::RwLock;

use crate::config::StorageProfile;
use crate::credentials::{CredentialManager, ResolvedCredential};
use crate::error::{StorageError, StorageResult};

/// Tracing target for object storage operations.
const TRACING_TARGET: &str = "quill_storage::client";

/// Upper bound on keys returned by a single listing.
pub const LIST_LIMIT: usize = 1000;

/// Object metadata from the remote store.
#[derive(Debug, Clone)]
pub struct ObjectMetadata {
    /// Object size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: Option<jiff::Timestamp>,
    /// Content type reported by the store.
    pub content_type: Option<String>,
}

/// A listed remote object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    /// Full object key.
    pub key: String,
    /// Object size in bytes, when the listing reports it.
    pub size: Option<u64>,
}

/// Object store client bound to one bucket and one credential.
///
/// Clients are cheap to clone and immutable: when the credential rotates,
/// the factory builds a replacement instead of mutating this one.
#[derive(Clone)]
pub struct StorageClient {
    operator: Operator,
    profile: StorageProfile,
    credential: Arc<ResolvedCredential>,
}

impl StorageClient {
    /// Creates a client for the given bucket profile and credential.
    pub fn new(
        profile: StorageProfile,
        credential: Arc<ResolvedCredential>,
    ) -> StorageResult<Self> {
        let mut builder = services::S3::default()
            .bucket(&profile.bucket)
            .region(&profile.region)
            .access_key_id(&credential.access_key_id)
            .secret_access_key(&credential.secret_access_key);

        if let Some(ref session_token) = credential.session_token {
            builder = builder.session_token(session_token);
        }

        if let Some(ref endpoint) = profile.endpoint {
            builder = builder.endpoint(endpoint);
        }

        let operator = Operator::new(builder)
            .map(|op| op.finish())
            .map_err(|err| StorageError::init(err.to_string()))?;

        tracing::debug!(
            target: TRACING_TARGET,
            bucket = %profile.bucket,
            region = %profile.region,
            "Storage client initialized"
        );

        Ok(Self {
            operator,
            profile,
            credential,
        })
    }

    /// Bucket profile this client is bound to.
    pub fn profile(&self) -> &StorageProfile {
        &self.profile
    }

    /// Credential this client was built with.
    pub fn credential(&self) -> &Arc<ResolvedCredential> {
        &self.credential
    }

    /// Whether the bound credential has expired.
    pub fn is_stale(&self) -> bool {
        self.credential.is_expired()
    }

    /// Writes an object.
    pub async fn write(&self, key: &str, data: impl Into<bytes::Bytes>) -> StorageResult<()> {
        let data = data.into();

        tracing::debug!(
            target: TRACING_TARGET,
            key = %key,
            size = data.len(),
            "Writing object"
        );

        self.operator.write(key, data).await?;
        Ok(())
    }

    /// Reads an entire object.
    pub async fn read(&self, key: &str) -> StorageResult<Vec<u8>> {
        tracing::debug!(
            target: TRACING_TARGET,
            key = %key,
            "Reading object"
        );

        Ok(self.operator.read(key).await?.to_vec())
    }

    /// Gets metadata for an object.
    pub async fn stat(&self, key: &str) -> StorageResult<ObjectMetadata> {
        let meta = self.operator.stat(key).await?;

        let last_modified = meta
            .last_modified()
            .and_then(|dt| jiff::Timestamp::from_second(dt.timestamp()).ok());

        Ok(ObjectMetadata {
            size: meta.content_length(),
            last_modified,
            content_type: meta.content_type().map(|s| s.to_string()),
        })
    }

    /// Checks if an object exists.
    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.operator.exists(key).await?)
    }

    /// Deletes an object. Deleting an absent key is not an error.
    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        tracing::debug!(
            target: TRACING_TARGET,
            key = %key,
            "Deleting object"
        );

        self.operator.delete(key).await?;
        Ok(())
    }

    /// Lists up to [`LIST_LIMIT`] objects under a prefix.
    ///
    /// Directory placeholders are skipped.
    pub async fn list(&self, prefix: &str) -> StorageResult<Vec<RemoteObject>> {
        let lister = self.operator.lister_with(prefix).recursive(true).await?;

        let entries: Vec<_> = lister.take(LIST_LIMIT).try_collect().await?;

        let objects = entries
            .into_iter()
            .filter(|entry| !entry.path().ends_with('/'))
            .map(|entry| {
                let size = entry.metadata().content_length();
                RemoteObject {
                    key: entry.path().to_string(),
                    size: (size > 0).then_some(size),
                }
            })
            .collect();

        Ok(objects)
    }

    /// Presigns a GET for the object, valid for `ttl`.
    pub async fn presign_read(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        let request = self.operator.presign_read(key, ttl).await?;
        Ok(request.uri().to_string())
    }
}

impl std::fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageClient")
            .field("bucket", &self.profile.bucket)
            .field("region", &self.profile.region)
            .field("credential_expires_at", &self.credential.expires_at)
            .finish()
    }
}

/// Builds and caches [`StorageClient`]s keyed by the current credential.
///
/// A cached client is reused until its credential is rotated or expires;
/// both checks happen on every acquisition so callers always hold a
/// client whose keys are valid.
pub struct StorageClientFactory {
    manager: CredentialManager,
    cached: RwLock<Option<Arc<StorageClient>>>,
}

impl StorageClientFactory {
    /// Creates a factory over the given credential manager.
    pub fn new(manager: CredentialManager) -> Self {
        Self {
            manager,
            cached: RwLock::new(None),
        }
    }

    /// Credential manager this factory draws from.
    pub fn manager(&self) -> &CredentialManager {
        &self.manager
    }

    /// Returns a client bound to a currently valid credential.
    pub async fn client(&self) -> StorageResult<Arc<StorageClient>> {
        let credential = self.manager.credentials().await?;

        {
            let cached = self.cached.read().await;
            if let Some(client) = cached.as_ref()
                && Arc::ptr_eq(client.credential(), &credential)
            {
                return Ok(client.clone());
            }
        }

        self.rebuild(credential).await
    }

    /// Forces a credential refresh and returns a client bound to the
    /// fresh credential.
    pub async fn fresh_client(&self) -> StorageResult<Arc<StorageClient>> {
        let credential = self.manager.refresh_now().await?;
        self.rebuild(credential).await
    }

    async fn rebuild(
        &self,
        credential: Arc<ResolvedCredential>,
    ) -> StorageResult<Arc<StorageClient>> {
        let profile = self.manager.storage_profile().await?;
        let client = Arc::new(StorageClient::new(profile, credential)?);

        *self.cached.write().await = Some(client.clone());

        tracing::debug!(
            target: TRACING_TARGET,
            bucket = %client.profile().bucket,
            "Storage client rebuilt"
        );

        Ok(client)
    }
}

impl std::fmt::Debug for StorageClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageClientFactory").finish_non_exhaustive()
    }
}
