use quill_postgres::PgError;
use quill_storage::{CredentialError, StorageError};
use uuid::Uuid;

/// Failures across the media service.
#[derive(Debug, thiserror::Error)]
#[must_use = "errors do nothing unless handled"]
pub enum MediaError {
    /// Catalog database failure.
    #[error(transparent)]
    Database(#[from] PgError),

    /// Object storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Credential lifecycle failure.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// No catalog record with the given id.
    #[error("media record not found: {0}")]
    RecordNotFound(Uuid),

    /// No folder with the given path.
    #[error("media folder not found: {0}")]
    FolderNotFound(String),

    /// Thumbnail generation failed for one object.
    ///
    /// Always non-fatal to the operation that triggered it.
    #[error("thumbnail generation failed for `{key}`: {message}")]
    Thumbnail { key: String, message: String },
}

impl MediaError {
    /// Creates a [`MediaError::Thumbnail`] for an object key.
    pub fn thumbnail(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Thumbnail {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether the failure means the requested thing does not exist.
    ///
    /// Bucket mismatches count: a record pointing at a foreign bucket is
    /// not servable from this deployment.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::RecordNotFound(_) | Self::FolderNotFound(_) => true,
            Self::Storage(err) => {
                err.is_not_found() || matches!(err, StorageError::BucketMismatch { .. })
            }
            _ => false,
        }
    }
}

/// Result alias for media service operations.
pub type MediaResult<T, E = MediaError> = Result<T, E>;
