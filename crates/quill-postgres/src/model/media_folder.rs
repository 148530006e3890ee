//! Media folder model for catalog navigation.

use diesel::prelude::*;
use jiff_diesel::Timestamp;
use uuid::Uuid;

use crate::schema::media_folders;

/// A navigation folder in the media library.
///
/// Folders form a self-referential hierarchy used for browsing only;
/// they do not constrain which folder path a record may carry.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = media_folders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MediaFolder {
    /// Unique folder identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Full path, unique across the hierarchy.
    pub path: String,
    /// Parent folder, `None` for roots.
    pub parent_id: Option<Uuid>,
    /// Timestamp when the folder was created.
    pub created_at: Timestamp,
}

/// Data for creating a new media folder.
#[derive(Debug, Default, Clone, Insertable)]
#[diesel(table_name = media_folders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewMediaFolder {
    /// Display name.
    pub name: String,
    /// Full path.
    pub path: String,
    /// Parent folder.
    pub parent_id: Option<Uuid>,
}

impl MediaFolder {
    /// Returns whether this is a root folder.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
