//! Media kind enumeration for catalog classification.

use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// High-level classification of a stored object.
///
/// Corresponds to the `media_kind` PostgreSQL enum. The classification is
/// derived from the object's MIME type and determines the canonical folder
/// a record files under.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
#[derive(Serialize, Deserialize, DbEnum, Display, EnumIter, EnumString)]
#[ExistingTypePath = "crate::schema::sql_types::MediaKind"]
pub enum MediaKind {
    /// Raster and vector images (PNG, JPEG, GIF, WebP, SVG, ...).
    #[db_rename = "image"]
    #[serde(rename = "image")]
    Image,

    /// Video files (MP4, WebM, MOV, ...).
    #[db_rename = "video"]
    #[serde(rename = "video")]
    Video,

    /// Documents (PDF, text, office files).
    #[db_rename = "document"]
    #[serde(rename = "document")]
    Document,

    /// Anything that does not match a known MIME family.
    #[db_rename = "other"]
    #[serde(rename = "other")]
    #[default]
    Other,
}

impl MediaKind {
    /// Derives the classification from a MIME type.
    pub fn from_mime(mime_type: &str) -> MediaKind {
        let mime = mime_type.to_ascii_lowercase();

        if mime.starts_with("image/") {
            MediaKind::Image
        } else if mime.starts_with("video/") {
            MediaKind::Video
        } else if mime == "application/pdf" || mime.starts_with("text/") || mime.contains("document")
        {
            MediaKind::Document
        } else {
            MediaKind::Other
        }
    }

    /// Returns the canonical folder path for this classification.
    ///
    /// Unclassified objects file under `/documents` alongside documents.
    pub fn folder_path(self) -> &'static str {
        match self {
            MediaKind::Image => "/images",
            MediaKind::Video => "/videos",
            MediaKind::Document | MediaKind::Other => "/documents",
        }
    }

    /// Returns whether objects of this kind get a thumbnail derived.
    #[inline]
    pub fn supports_thumbnail(self) -> bool {
        matches!(self, MediaKind::Image | MediaKind::Document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_mime_families() {
        assert_eq!(MediaKind::from_mime("image/png"), MediaKind::Image);
        assert_eq!(MediaKind::from_mime("video/mp4"), MediaKind::Video);
        assert_eq!(MediaKind::from_mime("application/pdf"), MediaKind::Document);
        assert_eq!(MediaKind::from_mime("text/plain"), MediaKind::Document);
        assert_eq!(
            MediaKind::from_mime("application/octet-stream"),
            MediaKind::Other
        );
    }

    #[test]
    fn canonical_folders() {
        assert_eq!(MediaKind::Image.folder_path(), "/images");
        assert_eq!(MediaKind::Video.folder_path(), "/videos");
        assert_eq!(MediaKind::Document.folder_path(), "/documents");
        assert_eq!(MediaKind::Other.folder_path(), "/documents");
    }
}
