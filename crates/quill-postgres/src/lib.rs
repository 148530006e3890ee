#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Embeds all migrations into the final binary.
pub(crate) const MIGRATIONS: diesel_migrations::EmbeddedMigrations =
    diesel_migrations::embed_migrations!();

/// Tracing target for client and connection operations.
pub const TRACING_TARGET_CONNECTION: &str = "quill_postgres::connection";

/// Tracing target for database query operations.
pub const TRACING_TARGET_QUERY: &str = "quill_postgres::query";

/// Tracing target for database migration operations.
pub const TRACING_TARGET_MIGRATION: &str = "quill_postgres::migrations";

mod client;
mod error;
pub mod model;
pub mod query;
mod schema;
pub mod types;

#[doc(hidden)]
pub mod prelude;

pub use diesel_async::AsyncPgConnection as PgConnection;

pub use crate::client::{ConnectionPool, PgClient, PgConfig, PgPoolStatus, PooledConnection};
pub use crate::error::{BoxError, PgError, PgResult};
