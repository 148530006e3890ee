//! Media folder repository for catalog navigation.

use std::future::Future;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::model::{MediaFolder, NewMediaFolder};
use crate::{PgConnection, PgError, PgResult, schema};

/// Repository for media folder database operations.
pub trait MediaFolderRepository {
    /// Creates a new navigation folder.
    fn create_media_folder(
        &mut self,
        new_folder: NewMediaFolder,
    ) -> impl Future<Output = PgResult<MediaFolder>> + Send;

    /// Finds a folder by its full path.
    fn find_media_folder_by_path(
        &mut self,
        path: &str,
    ) -> impl Future<Output = PgResult<Option<MediaFolder>>> + Send;

    /// Lists child folders of a parent, or root folders when `parent_id`
    /// is `None`.
    fn list_media_folders(
        &mut self,
        parent_id: Option<Uuid>,
    ) -> impl Future<Output = PgResult<Vec<MediaFolder>>> + Send;

    /// Deletes a folder (children cascade). Returns whether a row was removed.
    fn delete_media_folder(
        &mut self,
        folder_id: Uuid,
    ) -> impl Future<Output = PgResult<bool>> + Send;
}

impl MediaFolderRepository for PgConnection {
    async fn create_media_folder(&mut self, new_folder: NewMediaFolder) -> PgResult<MediaFolder> {
        use schema::media_folders;

        let folder = diesel::insert_into(media_folders::table)
            .values(&new_folder)
            .returning(MediaFolder::as_returning())
            .get_result(self)
            .await
            .map_err(PgError::from)?;

        Ok(folder)
    }

    async fn find_media_folder_by_path(&mut self, path: &str) -> PgResult<Option<MediaFolder>> {
        use schema::media_folders::{self, dsl};

        let folder = media_folders::table
            .filter(dsl::path.eq(path))
            .select(MediaFolder::as_select())
            .first(self)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(folder)
    }

    async fn list_media_folders(&mut self, parent_id: Option<Uuid>) -> PgResult<Vec<MediaFolder>> {
        use schema::media_folders::{self, dsl};

        let mut query = media_folders::table.into_boxed();

        query = match parent_id {
            Some(parent) => query.filter(dsl::parent_id.eq(parent)),
            None => query.filter(dsl::parent_id.is_null()),
        };

        let folders = query
            .order(dsl::name.asc())
            .select(MediaFolder::as_select())
            .load(self)
            .await
            .map_err(PgError::from)?;

        Ok(folders)
    }

    async fn delete_media_folder(&mut self, folder_id: Uuid) -> PgResult<bool> {
        use schema::media_folders::{self, dsl};

        let deleted = diesel::delete(media_folders::table.filter(dsl::id.eq(folder_id)))
            .execute(self)
            .await
            .map_err(PgError::from)?;

        Ok(deleted > 0)
    }
}
