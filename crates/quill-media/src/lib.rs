#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
pub mod mime;
mod service;
mod settings;
pub mod sync;
pub mod thumbnail;

pub use crate::error::{MediaError, MediaResult};
pub use crate::service::{MediaService, NewUpload};
pub use crate::settings::PgSettingsStore;
pub use crate::sync::{ReconciliationEngine, SyncFailure, SyncReport};
pub use crate::thumbnail::{
    CommandPageRenderer, GeneratedThumbnail, PageRenderer, ThumbnailPipeline,
};
