//! Media record repository for the storage catalog.

use std::future::Future;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::model::{MediaRecord, NewMediaRecord, UpdateMediaRecord};
use crate::types::{MediaFilter, OffsetPagination};
use crate::{PgConnection, PgError, PgResult, schema};

/// Repository for media record database operations.
pub trait MediaRecordRepository {
    /// Inserts a new media record.
    fn create_media_record(
        &mut self,
        new_record: NewMediaRecord,
    ) -> impl Future<Output = PgResult<MediaRecord>> + Send;

    /// Inserts a new media record unless its `(bucket, storage_key)` pair
    /// already exists.
    ///
    /// Returns `None` when the key was already cataloged. Conflict-safe so
    /// that concurrent reconciliation passes never produce duplicate rows.
    fn create_media_record_if_absent(
        &mut self,
        new_record: NewMediaRecord,
    ) -> impl Future<Output = PgResult<Option<MediaRecord>>> + Send;

    /// Finds a media record by its identifier.
    fn find_media_record(
        &mut self,
        record_id: Uuid,
    ) -> impl Future<Output = PgResult<Option<MediaRecord>>> + Send;

    /// Finds a media record by bucket and storage key.
    fn find_media_record_by_key(
        &mut self,
        bucket: &str,
        storage_key: &str,
    ) -> impl Future<Output = PgResult<Option<MediaRecord>>> + Send;

    /// Lists records, optionally scoped to a folder path, with filtering
    /// and offset pagination. Newest first.
    fn list_media_records(
        &mut self,
        folder_path: Option<&str>,
        filter: MediaFilter,
        pagination: OffsetPagination,
    ) -> impl Future<Output = PgResult<Vec<MediaRecord>>> + Send;

    /// Lists every record in a bucket under a key prefix, in one query.
    /// Reconciliation loads its view of the catalog through this.
    fn list_media_records_under_prefix(
        &mut self,
        bucket: &str,
        prefix: &str,
    ) -> impl Future<Output = PgResult<Vec<MediaRecord>>> + Send;

    /// Applies an update to a media record.
    fn update_media_record(
        &mut self,
        record_id: Uuid,
        updates: UpdateMediaRecord,
    ) -> impl Future<Output = PgResult<MediaRecord>> + Send;

    /// Deletes a media record. Returns whether a row was removed.
    fn delete_media_record(
        &mut self,
        record_id: Uuid,
    ) -> impl Future<Output = PgResult<bool>> + Send;
}

impl MediaRecordRepository for PgConnection {
    async fn create_media_record(&mut self, new_record: NewMediaRecord) -> PgResult<MediaRecord> {
        use schema::media_records;

        let record = diesel::insert_into(media_records::table)
            .values(&new_record)
            .returning(MediaRecord::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(record)
    }

    async fn create_media_record_if_absent(
        &mut self,
        new_record: NewMediaRecord,
    ) -> PgResult<Option<MediaRecord>> {
        use schema::media_records::{self, dsl};

        let record = diesel::insert_into(media_records::table)
            .values(&new_record)
            .on_conflict((dsl::bucket, dsl::storage_key))
            .do_nothing()
            .returning(MediaRecord::as_returning())
            .get_result(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(record)
    }

    async fn find_media_record(&mut self, record_id: Uuid) -> PgResult<Option<MediaRecord>> {
        use schema::media_records::{self, dsl};

        let record = media_records::table
            .filter(dsl::id.eq(record_id))
            .select(MediaRecord::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(record)
    }

    async fn find_media_record_by_key(
        &mut self,
        bucket: &str,
        storage_key: &str,
    ) -> PgResult<Option<MediaRecord>> {
        use schema::media_records::{self, dsl};

        let record = media_records::table
            .filter(dsl::bucket.eq(bucket))
            .filter(dsl::storage_key.eq(storage_key))
            .select(MediaRecord::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(record)
    }

    async fn list_media_records(
        &mut self,
        folder_path: Option<&str>,
        filter: MediaFilter,
        pagination: OffsetPagination,
    ) -> PgResult<Vec<MediaRecord>> {
        use schema::media_records::{self, dsl};

        let mut query = media_records::table.into_boxed();

        if let Some(folder) = folder_path {
            query = query.filter(dsl::folder_path.eq(folder.to_string()));
        }

        if let Some(kind) = filter.kind {
            query = query.filter(dsl::kind.eq(kind));
        }

        if let Some(fragment) = filter.name_contains {
            query = query.filter(dsl::storage_key.ilike(format!("%{fragment}%")));
        }

        let records = query
            .order(dsl::created_at.desc())
            .limit(pagination.limit)
            .offset(pagination.offset)
            .select(MediaRecord::as_select())
            .load(self)
            .await
            .map_err(PgError::from)?;

        Ok(records)
    }

    async fn list_media_records_under_prefix(
        &mut self,
        bucket: &str,
        prefix: &str,
    ) -> PgResult<Vec<MediaRecord>> {
        use schema::media_records::{self, dsl};

        let records = media_records::table
            .filter(dsl::bucket.eq(bucket))
            .filter(dsl::storage_key.like(format!("{}%", like_escape(prefix))))
            .select(MediaRecord::as_select())
            .load(self)
            .await
            .map_err(PgError::from)?;

        Ok(records)
    }

    async fn update_media_record(
        &mut self,
        record_id: Uuid,
        updates: UpdateMediaRecord,
    ) -> PgResult<MediaRecord> {
        use schema::media_records::{self, dsl};

        let record = diesel::update(media_records::table.filter(dsl::id.eq(record_id)))
            .set((&updates, dsl::updated_at.eq(diesel::dsl::now)))
            .returning(MediaRecord::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(record)
    }

    async fn delete_media_record(&mut self, record_id: Uuid) -> PgResult<bool> {
        use schema::media_records::{self, dsl};

        let deleted = diesel::delete(media_records::table.filter(dsl::id.eq(record_id)))
            .execute(self)
            .await
            .map_err(PgError::from)?;

        Ok(deleted > 0)
    }
}

/// Escapes LIKE wildcards in a literal prefix.
fn like_escape(prefix: &str) -> String {
    prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(like_escape("a%b_c"), "a\\%b\\_c");
        assert_eq!(like_escape("plain/prefix"), "plain/prefix");
    }
}
