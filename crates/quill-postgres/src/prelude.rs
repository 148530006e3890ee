//! Prelude module for quill-postgres.
//!
//! Re-exports the most commonly used types and traits so a single
//! `use quill_postgres::prelude::*;` covers typical catalog work.

// Common query traits
pub use diesel::prelude::*;
pub use diesel_async::RunQueryDsl;

// Connection and client types
pub use crate::client::{ConnectionPool, PgClient, PgConfig, PgPoolStatus, PooledConnection};
pub use crate::model::{
    MediaFolder, MediaRecord, NewMediaFolder, NewMediaRecord, NewStorageSetting, StorageSetting,
    UpdateMediaRecord,
};
pub use crate::query::{MediaFolderRepository, MediaRecordRepository, StorageSettingRepository};
pub use crate::types::{MediaFilter, MediaKind, OffsetPagination, SettingValueType};
// Error types
pub use crate::{PgConnection, PgError, PgResult};
