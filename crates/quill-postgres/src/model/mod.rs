//! Database models for the media catalog.

mod media_folder;
mod media_record;
mod storage_setting;

pub use media_folder::{MediaFolder, NewMediaFolder};
pub use media_record::{MediaRecord, NewMediaRecord, UpdateMediaRecord};
pub use storage_setting::{NewStorageSetting, StorageSetting};
