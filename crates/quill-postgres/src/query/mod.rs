//! Repository traits implemented on [`PgConnection`](crate::PgConnection).

mod media_folder;
mod media_record;
mod storage_setting;

pub use media_folder::MediaFolderRepository;
pub use media_record::MediaRecordRepository;
pub use storage_setting::StorageSettingRepository;
