//! Storage settings repository.
//!
//! Settings are string-keyed rows carrying either a text or a JSON value.
//! Writes are upserts so that admin edits replace the previous value.

use std::future::Future;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::model::{NewStorageSetting, StorageSetting};
use crate::{PgConnection, PgError, PgResult, schema};

/// Repository for storage setting database operations.
pub trait StorageSettingRepository {
    /// Finds a setting by key.
    fn find_storage_setting(
        &mut self,
        key: &str,
    ) -> impl Future<Output = PgResult<Option<StorageSetting>>> + Send;

    /// Inserts or replaces a setting.
    fn upsert_storage_setting(
        &mut self,
        setting: NewStorageSetting,
    ) -> impl Future<Output = PgResult<StorageSetting>> + Send;

    /// Removes a setting. Returns whether a row was removed.
    fn delete_storage_setting(&mut self, key: &str)
    -> impl Future<Output = PgResult<bool>> + Send;
}

impl StorageSettingRepository for PgConnection {
    async fn find_storage_setting(&mut self, key: &str) -> PgResult<Option<StorageSetting>> {
        use schema::storage_settings::{self, dsl};

        let setting = storage_settings::table
            .filter(dsl::key.eq(key))
            .select(StorageSetting::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(setting)
    }

    async fn upsert_storage_setting(
        &mut self,
        setting: NewStorageSetting,
    ) -> PgResult<StorageSetting> {
        use schema::storage_settings::{self, dsl};

        let setting = diesel::insert_into(storage_settings::table)
            .values(&setting)
            .on_conflict(dsl::key)
            .do_update()
            .set((&setting, dsl::updated_at.eq(diesel::dsl::now)))
            .returning(StorageSetting::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(setting)
    }

    async fn delete_storage_setting(&mut self, key: &str) -> PgResult<bool> {
        use schema::storage_settings::{self, dsl};

        let deleted = diesel::delete(storage_settings::table.filter(dsl::key.eq(key)))
            .execute(self)
            .await
            .map_err(PgError::from)?;

        Ok(deleted > 0)
    }
}
