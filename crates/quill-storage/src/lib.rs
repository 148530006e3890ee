#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for credential lifecycle operations.
pub const TRACING_TARGET_CREDENTIALS: &str = "quill_storage::credentials";

mod client;
pub mod config;
pub mod credentials;
mod error;
mod signer;
mod worker;

pub use crate::client::{
    LIST_LIMIT, ObjectMetadata, RemoteObject, StorageClient, StorageClientFactory,
};
pub use crate::error::{BoxError, CredentialError, CredentialResult, StorageError, StorageResult};
pub use crate::signer::{DEFAULT_SIGNED_URL_TTL, SignedUrlService};
pub use crate::worker::{CredentialRefreshWorker, DEFAULT_CHECK_INTERVAL};
