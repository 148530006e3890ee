//! Database-backed settings store for the credential lifecycle.
//!
//! Bridges the storage crate's [`SettingsStore`] trait onto the
//! `storage_settings` table. The strategy discriminant is mirrored into a
//! text row so admin tooling can read it without parsing the JSON blob,
//! and the cached credential lives in its own row so refreshes never
//! rewrite operator-authored configuration.

use async_trait::async_trait;
use quill_postgres::PgClient;
use quill_postgres::model::NewStorageSetting;
use quill_postgres::query::StorageSettingRepository;
use quill_storage::config::{
    SETTING_MEDIA_STORAGE_CACHED_CREDENTIAL, SETTING_MEDIA_STORAGE_CONFIG,
    SETTING_MEDIA_STORAGE_TYPE, StorageConfig,
};
use quill_storage::credentials::{ResolvedCredential, SettingsStore};
use quill_storage::BoxError;

use crate::error::MediaResult;

/// Tracing target for settings store operations.
const TRACING_TARGET: &str = "quill_media::settings";

/// Settings store over the catalog database.
#[derive(Debug, Clone)]
pub struct PgSettingsStore {
    pg: PgClient,
}

impl PgSettingsStore {
    /// Creates a store over the given database client.
    pub fn new(pg: PgClient) -> Self {
        Self { pg }
    }

    /// Writes a full storage configuration.
    ///
    /// Replaces both the JSON configuration row and the mirrored strategy
    /// discriminant. The cached credential row is left alone; callers that
    /// change strategy should follow up with a manager reinitialization.
    pub async fn write_storage_config(&self, config: &StorageConfig) -> MediaResult<()> {
        let json = serde_json::to_value(config)
            .map_err(quill_storage::CredentialError::Malformed)?;

        let mut conn = self.pg.get_connection().await?;
        conn.upsert_storage_setting(NewStorageSetting::text(
            SETTING_MEDIA_STORAGE_TYPE,
            config.strategy().to_string(),
        ))
        .await?;
        conn.upsert_storage_setting(NewStorageSetting::json(SETTING_MEDIA_STORAGE_CONFIG, json))
            .await?;

        tracing::info!(
            target: TRACING_TARGET,
            strategy = %config.strategy(),
            bucket = %config.profile.bucket,
            "Storage configuration written"
        );

        Ok(())
    }

    /// Removes the persisted cached credential, if any.
    pub async fn clear_cached_credential(&self) -> MediaResult<bool> {
        let mut conn = self.pg.get_connection().await?;
        let removed = conn
            .delete_storage_setting(SETTING_MEDIA_STORAGE_CACHED_CREDENTIAL)
            .await?;
        Ok(removed)
    }
}

#[async_trait]
impl SettingsStore for PgSettingsStore {
    async fn load_storage_config(&self) -> Result<Option<StorageConfig>, BoxError> {
        let mut conn = self.pg.get_connection().await?;
        let setting = conn
            .find_storage_setting(SETTING_MEDIA_STORAGE_CONFIG)
            .await?;

        let Some(json) = setting.and_then(|s| s.json_value) else {
            return Ok(None);
        };

        let config = serde_json::from_value(json)?;
        Ok(Some(config))
    }

    async fn load_cached_credential(&self) -> Result<Option<ResolvedCredential>, BoxError> {
        let mut conn = self.pg.get_connection().await?;
        let setting = conn
            .find_storage_setting(SETTING_MEDIA_STORAGE_CACHED_CREDENTIAL)
            .await?;

        let Some(json) = setting.and_then(|s| s.json_value) else {
            return Ok(None);
        };

        let credential = serde_json::from_value(json)?;
        Ok(Some(credential))
    }

    async fn store_cached_credential(
        &self,
        credential: &ResolvedCredential,
    ) -> Result<(), BoxError> {
        let json = serde_json::to_value(credential)?;

        let mut conn = self.pg.get_connection().await?;
        conn.upsert_storage_setting(NewStorageSetting::json(
            SETTING_MEDIA_STORAGE_CACHED_CREDENTIAL,
            json,
        ))
        .await?;

        tracing::debug!(
            target: TRACING_TARGET,
            expires_at = ?credential.expires_at,
            "Cached credential persisted"
        );

        Ok(())
    }
}
