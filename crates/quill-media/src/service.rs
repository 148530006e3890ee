//! Media service facade.
//!
//! One entry point for everything the rest of the platform does with
//! media: uploads, signed downloads, catalog browsing, folder management,
//! reconciliation, and credential administration.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use quill_postgres::PgClient;
use quill_postgres::model::{MediaFolder, MediaRecord, NewMediaFolder, NewMediaRecord, UpdateMediaRecord};
use quill_postgres::query::{MediaFolderRepository, MediaRecordRepository};
use quill_postgres::types::{MediaFilter, MediaKind, OffsetPagination};
use quill_storage::credentials::{CredentialManager, CredentialStatus};
use quill_storage::{RemoteObject, SignedUrlService, StorageClientFactory, StorageError, StorageResult};
use uuid::Uuid;

use crate::error::{MediaError, MediaResult};
use crate::mime;
use crate::settings::PgSettingsStore;
use crate::sync::{CatalogEntry, MediaCatalog, NewCatalogEntry, ReconciliationEngine, RemoteStore, SyncReport};
use crate::thumbnail::{GeneratedThumbnail, ThumbnailPipeline};

/// Tracing target for media service operations.
const TRACING_TARGET: &str = "quill_media::service";

/// An upload request.
#[derive(Debug, Clone)]
pub struct NewUpload {
    /// Original file name, used for classification and the storage key.
    pub file_name: String,
    /// File contents.
    pub data: Bytes,
    /// Declared MIME type. Inferred from the file extension when absent.
    pub mime_type: Option<String>,
    /// Folder to file the record under instead of the canonical one for
    /// its kind. The next reconciliation pass re-canonicalizes it.
    pub folder_hint: Option<String>,
    /// Identity of the uploader, when known.
    pub uploaded_by: Option<String>,
    /// Free-form metadata (display name, alt text).
    pub metadata: Option<serde_json::Value>,
}

impl NewUpload {
    /// Creates an upload request for a file.
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
            mime_type: None,
            folder_hint: None,
            uploaded_by: None,
            metadata: None,
        }
    }

    /// Declares the MIME type instead of inferring it.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Files the record under a specific folder.
    pub fn with_folder_hint(mut self, folder_hint: impl Into<String>) -> Self {
        self.folder_hint = Some(folder_hint.into());
        self
    }

    /// Attributes the upload to a user.
    pub fn with_uploaded_by(mut self, uploaded_by: impl Into<String>) -> Self {
        self.uploaded_by = Some(uploaded_by.into());
        self
    }

    /// Attaches metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Media service over the catalog database and the object store.
#[derive(Clone)]
pub struct MediaService {
    pg: PgClient,
    factory: Arc<StorageClientFactory>,
    signer: SignedUrlService,
    thumbnails: ThumbnailPipeline,
}

impl MediaService {
    /// Creates the service, wiring the credential lifecycle to the
    /// database-backed settings store.
    pub fn new(pg: PgClient, thumbnails: ThumbnailPipeline) -> Self {
        let store = Arc::new(PgSettingsStore::new(pg.clone()));
        let manager = CredentialManager::new(store);
        Self::with_manager(pg, manager, thumbnails)
    }

    /// Creates the service over an existing credential manager.
    pub fn with_manager(
        pg: PgClient,
        manager: CredentialManager,
        thumbnails: ThumbnailPipeline,
    ) -> Self {
        let factory = Arc::new(StorageClientFactory::new(manager));
        let signer = SignedUrlService::new(factory.clone());

        Self {
            pg,
            factory,
            signer,
            thumbnails,
        }
    }

    /// Credential manager driving this service's storage access.
    pub fn credential_manager(&self) -> &CredentialManager {
        self.factory.manager()
    }

    /// Uploads a file: classifies it, writes it to the bucket, catalogs
    /// it, and derives a thumbnail where supported.
    ///
    /// Thumbnail failures are logged and leave the record without one;
    /// the upload itself still succeeds.
    pub async fn upload(&self, upload: NewUpload) -> MediaResult<MediaRecord> {
        let (kind, mime_type) = match upload.mime_type {
            Some(ref mime_type) => (MediaKind::from_mime(mime_type), mime_type.clone()),
            None => {
                let (kind, mime_type) = mime::classify_key(&upload.file_name);
                (kind, mime_type.to_owned())
            }
        };
        let folder_path = upload
            .folder_hint
            .clone()
            .unwrap_or_else(|| kind.folder_path().to_owned());

        let client = self.factory.client().await?;
        let bucket = client.profile().bucket.clone();

        let storage_key = format!(
            "{}/{}_{}",
            kind.folder_path().trim_start_matches('/'),
            Uuid::new_v4(),
            upload.file_name,
        );

        client.write(&storage_key, upload.data.clone()).await?;

        tracing::info!(
            target: TRACING_TARGET,
            key = %storage_key,
            kind = %kind,
            size = upload.data.len(),
            "Uploaded object"
        );

        let thumbnail = derive_thumbnail(
            &self.thumbnails,
            &storage_key,
            kind,
            &mime_type,
            upload.data.to_vec(),
        )
        .await;

        let mut new_record = NewMediaRecord {
            storage_key: storage_key.clone(),
            bucket,
            kind,
            folder_path,
            mime_type,
            size_bytes: upload.data.len() as i64,
            uploaded_by: upload.uploaded_by,
            metadata: upload.metadata,
            ..NewMediaRecord::default()
        };

        if let Some(thumbnail) = thumbnail {
            match client.write(&thumbnail.key, thumbnail.data.clone()).await {
                Ok(()) => {
                    new_record.thumbnail_key = Some(thumbnail.key);
                    new_record.width = Some(thumbnail.width as i32);
                    new_record.height = Some(thumbnail.height as i32);
                }
                Err(err) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        key = %thumbnail.key,
                        error = %err,
                        "Failed to upload thumbnail"
                    );
                }
            }
        }

        let mut conn = self.pg.get_connection().await?;
        let record = conn.create_media_record(new_record).await?;
        Ok(record)
    }

    /// Fetches a catalog record.
    pub async fn get(&self, record_id: Uuid) -> MediaResult<MediaRecord> {
        let mut conn = self.pg.get_connection().await?;
        conn.find_media_record(record_id)
            .await?
            .ok_or(MediaError::RecordNotFound(record_id))
    }

    /// Lists catalog records, optionally scoped to a folder.
    pub async fn list(
        &self,
        folder_path: Option<&str>,
        filter: MediaFilter,
        pagination: OffsetPagination,
    ) -> MediaResult<Vec<MediaRecord>> {
        let mut conn = self.pg.get_connection().await?;
        let records = conn
            .list_media_records(folder_path, filter, pagination)
            .await?;
        Ok(records)
    }

    /// Produces a time-limited signed download URL for a record.
    ///
    /// Rejects records whose bucket is not the configured one, since the
    /// active credential cannot sign for a foreign bucket.
    pub async fn signed_url(&self, record_id: Uuid) -> MediaResult<String> {
        self.signed_url_with_ttl(record_id, quill_storage::DEFAULT_SIGNED_URL_TTL)
            .await
    }

    /// Like [`MediaService::signed_url`] with an explicit lifetime.
    pub async fn signed_url_with_ttl(
        &self,
        record_id: Uuid,
        ttl: std::time::Duration,
    ) -> MediaResult<String> {
        let record = self.get(record_id).await?;

        let profile = self.factory.manager().storage_profile().await?;
        if record.bucket != profile.bucket {
            return Err(StorageError::BucketMismatch {
                configured: profile.bucket,
                referenced: record.bucket,
            }
            .into());
        }

        let url = self
            .signer
            .sign_with_ttl(&record.storage_key, ttl)
            .await?;
        Ok(url)
    }

    /// Produces a signed download URL addressed by storage key rather
    /// than record id. The key must belong to a cataloged object in the
    /// configured bucket.
    pub async fn signed_url_for_key(
        &self,
        storage_key: &str,
        ttl: std::time::Duration,
    ) -> MediaResult<String> {
        let profile = self.factory.manager().storage_profile().await?;

        let mut conn = self.pg.get_connection().await?;
        let record = conn
            .find_media_record_by_key(&profile.bucket, storage_key)
            .await?;
        drop(conn);

        let Some(record) = record else {
            return Err(StorageError::not_found(storage_key).into());
        };

        let url = self
            .signer
            .sign_with_ttl(&record.storage_key, ttl)
            .await?;
        Ok(url)
    }

    /// Deletes a record and, best effort, its remote object and thumbnail.
    ///
    /// The catalog row is removed first; remote deletions that fail leave
    /// orphaned objects for the next reconciliation to report, which is
    /// preferred over a record pointing at a deleted object.
    pub async fn delete(&self, record_id: Uuid) -> MediaResult<()> {
        let record = self.get(record_id).await?;

        let mut conn = self.pg.get_connection().await?;
        conn.delete_media_record(record_id).await?;
        drop(conn);

        let client = self.factory.client().await?;
        if let Err(err) = client.delete(&record.storage_key).await {
            tracing::warn!(
                target: TRACING_TARGET,
                key = %record.storage_key,
                error = %err,
                "Failed to delete remote object"
            );
        }
        if let Some(ref thumbnail_key) = record.thumbnail_key
            && let Err(err) = client.delete(thumbnail_key).await
        {
            tracing::warn!(
                target: TRACING_TARGET,
                key = %thumbnail_key,
                error = %err,
                "Failed to delete remote thumbnail"
            );
        }

        tracing::info!(
            target: TRACING_TARGET,
            key = %record.storage_key,
            "Deleted media record"
        );

        Ok(())
    }

    /// Moves a record to a folder. The remote object stays where it is.
    pub async fn move_record(
        &self,
        record_id: Uuid,
        folder_path: &str,
    ) -> MediaResult<MediaRecord> {
        let mut conn = self.pg.get_connection().await?;

        if conn.find_media_record(record_id).await?.is_none() {
            return Err(MediaError::RecordNotFound(record_id));
        }

        let record = conn
            .update_media_record(
                record_id,
                UpdateMediaRecord {
                    folder_path: Some(folder_path.to_owned()),
                    ..UpdateMediaRecord::default()
                },
            )
            .await?;
        Ok(record)
    }

    /// Replaces a record's free-form metadata.
    pub async fn update_metadata(
        &self,
        record_id: Uuid,
        metadata: serde_json::Value,
    ) -> MediaResult<MediaRecord> {
        let mut conn = self.pg.get_connection().await?;

        if conn.find_media_record(record_id).await?.is_none() {
            return Err(MediaError::RecordNotFound(record_id));
        }

        let record = conn
            .update_media_record(
                record_id,
                UpdateMediaRecord {
                    metadata: Some(metadata),
                    ..UpdateMediaRecord::default()
                },
            )
            .await?;
        Ok(record)
    }

    /// Creates a navigation folder under an optional parent path.
    pub async fn create_folder(
        &self,
        name: &str,
        parent_path: Option<&str>,
    ) -> MediaResult<MediaFolder> {
        let mut conn = self.pg.get_connection().await?;

        let (path, parent_id) = match parent_path {
            Some(parent_path) => {
                let parent = conn
                    .find_media_folder_by_path(parent_path)
                    .await?
                    .ok_or_else(|| MediaError::FolderNotFound(parent_path.to_owned()))?;
                (format!("{}/{name}", parent.path), Some(parent.id))
            }
            None => (format!("/{name}"), None),
        };

        let folder = conn
            .create_media_folder(NewMediaFolder {
                name: name.to_owned(),
                path,
                parent_id,
            })
            .await?;
        Ok(folder)
    }

    /// Lists child folders of a parent path, or roots when `None`.
    pub async fn list_folders(&self, parent_path: Option<&str>) -> MediaResult<Vec<MediaFolder>> {
        let mut conn = self.pg.get_connection().await?;

        let parent_id = match parent_path {
            Some(parent_path) => {
                let parent = conn
                    .find_media_folder_by_path(parent_path)
                    .await?
                    .ok_or_else(|| MediaError::FolderNotFound(parent_path.to_owned()))?;
                Some(parent.id)
            }
            None => None,
        };

        let folders = conn.list_media_folders(parent_id).await?;
        Ok(folders)
    }

    /// Deletes a navigation folder by path.
    pub async fn delete_folder(&self, path: &str) -> MediaResult<()> {
        let mut conn = self.pg.get_connection().await?;

        let folder = conn
            .find_media_folder_by_path(path)
            .await?
            .ok_or_else(|| MediaError::FolderNotFound(path.to_owned()))?;

        conn.delete_media_folder(folder.id).await?;
        Ok(())
    }

    /// Runs one reconciliation pass under a key prefix.
    ///
    /// A single pass examines at most the backend's listing cap; callers
    /// wanting the whole bucket pass an empty prefix and repeat until the
    /// report is a clean no-op.
    pub async fn sync(&self, prefix: &str) -> MediaResult<SyncReport> {
        let profile = self.factory.manager().storage_profile().await?;

        let engine = ReconciliationEngine::new(
            FactoryRemote {
                factory: self.factory.clone(),
            },
            PgCatalog {
                pg: self.pg.clone(),
                bucket: profile.bucket,
            },
        );

        engine.run(prefix).await
    }

    /// Current credential lifecycle snapshot.
    pub async fn credential_status(&self) -> CredentialStatus {
        self.factory.manager().status().await
    }

    /// Forces a credential refresh.
    pub async fn refresh_credentials(&self) -> MediaResult<CredentialStatus> {
        self.factory.manager().refresh_now().await?;
        Ok(self.factory.manager().status().await)
    }

    /// Reloads storage configuration and re-resolves credentials, for use
    /// after an admin rewrites the configuration.
    pub async fn reinitialize_credentials(&self) -> MediaResult<CredentialStatus> {
        self.factory.manager().reinitialize().await?;
        Ok(self.factory.manager().status().await)
    }
}

impl std::fmt::Debug for MediaService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaService")
            .field("thumbnails", &self.thumbnails)
            .finish_non_exhaustive()
    }
}

/// Remote store adapter over the client factory.
struct FactoryRemote {
    factory: Arc<StorageClientFactory>,
}

#[async_trait]
impl RemoteStore for FactoryRemote {
    async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<RemoteObject>> {
        let client = self.factory.client().await?;
        client.list(prefix).await
    }
}

/// Catalog adapter over the media record repository.
struct PgCatalog {
    pg: PgClient,
    bucket: String,
}

#[async_trait]
impl MediaCatalog for PgCatalog {
    async fn list_entries_under_prefix(&self, prefix: &str) -> MediaResult<Vec<CatalogEntry>> {
        let mut conn = self.pg.get_connection().await?;
        let records = conn
            .list_media_records_under_prefix(&self.bucket, prefix)
            .await?;

        Ok(records
            .into_iter()
            .map(|record| CatalogEntry {
                id: record.id,
                storage_key: record.storage_key,
                folder_path: record.folder_path,
                kind: record.kind,
            })
            .collect())
    }

    async fn insert_entry_if_absent(&self, entry: NewCatalogEntry) -> MediaResult<bool> {
        let mut conn = self.pg.get_connection().await?;
        let inserted = conn
            .create_media_record_if_absent(NewMediaRecord {
                storage_key: entry.storage_key,
                bucket: self.bucket.clone(),
                kind: entry.kind,
                folder_path: entry.folder_path,
                mime_type: entry.mime_type,
                size_bytes: entry.size_bytes,
                ..NewMediaRecord::default()
            })
            .await?;
        Ok(inserted.is_some())
    }

    async fn set_entry_folder(&self, id: Uuid, folder_path: &str) -> MediaResult<()> {
        let mut conn = self.pg.get_connection().await?;
        conn.update_media_record(
            id,
            UpdateMediaRecord {
                folder_path: Some(folder_path.to_owned()),
                ..UpdateMediaRecord::default()
            },
        )
        .await?;
        Ok(())
    }
}

/// Attempts thumbnail generation, logging failures instead of propagating
/// them. The record is created without a thumbnail in that case.
async fn derive_thumbnail(
    thumbnails: &ThumbnailPipeline,
    storage_key: &str,
    kind: MediaKind,
    mime_type: &str,
    data: Vec<u8>,
) -> Option<GeneratedThumbnail> {
    match thumbnails.generate(storage_key, kind, mime_type, data).await {
        Ok(thumbnail) => thumbnail,
        Err(err) => {
            tracing::warn!(
                target: TRACING_TARGET,
                key = %storage_key,
                error = %err,
                "Thumbnail generation failed, record will have none"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_fixture() -> Vec<u8> {
        let image = image::RgbImage::from_pixel(32, 24, image::Rgb([10, 120, 200]));
        let mut buffer = std::io::Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[tokio::test]
    async fn thumbnail_failures_do_not_abort_an_upload() {
        let pipeline = ThumbnailPipeline::new();

        // Undecodable image bytes fail generation; the upload path gets
        // `None` instead of an error.
        let thumbnail = derive_thumbnail(
            &pipeline,
            "images/broken.png",
            MediaKind::Image,
            "image/png",
            vec![0, 1, 2, 3],
        )
        .await;

        assert!(thumbnail.is_none());
    }

    #[tokio::test]
    async fn decodable_images_still_get_a_thumbnail() {
        let pipeline = ThumbnailPipeline::new();

        let thumbnail = derive_thumbnail(
            &pipeline,
            "images/cover.png",
            MediaKind::Image,
            "image/png",
            png_fixture(),
        )
        .await
        .unwrap();

        assert_eq!(thumbnail.key, "images/cover_thumb.jpg");
    }
}
