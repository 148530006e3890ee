//! Media record model for the storage catalog.

use diesel::prelude::*;
use jiff_diesel::Timestamp;
use uuid::Uuid;

use crate::schema::media_records;
use crate::types::MediaKind;

/// A cataloged object in the remote store.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = media_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MediaRecord {
    /// Unique record identifier.
    pub id: Uuid,
    /// Object key within the bucket. Unique per bucket.
    pub storage_key: String,
    /// Bucket the object lives in.
    pub bucket: String,
    /// Classification derived from the MIME type.
    pub kind: MediaKind,
    /// Folder path the record files under; canonical for its kind
    /// unless explicitly moved.
    pub folder_path: String,
    /// MIME type of the object.
    pub mime_type: String,
    /// Object size in bytes.
    pub size_bytes: i64,
    /// Storage key of the derived thumbnail, when one exists.
    pub thumbnail_key: Option<String>,
    /// Pixel width, when known.
    pub width: Option<i32>,
    /// Pixel height, when known.
    pub height: Option<i32>,
    /// Identity of the uploader, when uploaded through the app.
    pub uploaded_by: Option<String>,
    /// Free-form metadata (display name, alt text).
    pub metadata: serde_json::Value,
    /// Timestamp when the record was created.
    pub created_at: Timestamp,
    /// Timestamp when the record was last updated.
    pub updated_at: Timestamp,
}

/// Data for inserting a new media record.
#[derive(Debug, Default, Clone, Insertable)]
#[diesel(table_name = media_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewMediaRecord {
    /// Object key within the bucket.
    pub storage_key: String,
    /// Bucket the object lives in.
    pub bucket: String,
    /// Classification derived from the MIME type.
    pub kind: MediaKind,
    /// Folder path the record files under.
    pub folder_path: String,
    /// MIME type of the object.
    pub mime_type: String,
    /// Object size in bytes.
    pub size_bytes: i64,
    /// Thumbnail key, when derived at insert time.
    pub thumbnail_key: Option<String>,
    /// Pixel width, when known.
    pub width: Option<i32>,
    /// Pixel height, when known.
    pub height: Option<i32>,
    /// Identity of the uploader.
    pub uploaded_by: Option<String>,
    /// Free-form metadata.
    pub metadata: Option<serde_json::Value>,
}

/// Data for updating a media record.
#[derive(Debug, Default, Clone, AsChangeset)]
#[diesel(table_name = media_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UpdateMediaRecord {
    /// Folder path override (move operation).
    pub folder_path: Option<String>,
    /// Classification correction.
    pub kind: Option<MediaKind>,
    /// Thumbnail attach/detach.
    pub thumbnail_key: Option<Option<String>>,
    /// Pixel width.
    pub width: Option<Option<i32>>,
    /// Pixel height.
    pub height: Option<Option<i32>>,
    /// Metadata replacement.
    pub metadata: Option<serde_json::Value>,
}

impl MediaRecord {
    /// Returns whether the record's folder path matches the canonical
    /// folder for its MIME-derived classification.
    pub fn is_canonically_filed(&self) -> bool {
        self.folder_path == MediaKind::from_mime(&self.mime_type).folder_path()
    }

    /// Returns whether a thumbnail has been attached.
    #[inline]
    pub fn has_thumbnail(&self) -> bool {
        self.thumbnail_key.is_some()
    }

    /// Returns the final path segment of the storage key.
    pub fn file_name(&self) -> &str {
        self.storage_key
            .rsplit('/')
            .next()
            .unwrap_or(&self.storage_key)
    }
}
