//! Shared catalog types: classifications, filters, and pagination.

mod filtering;
mod media_kind;
mod pagination;
mod setting_value_type;

pub use filtering::MediaFilter;
pub use media_kind::MediaKind;
pub use pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, OffsetPagination};
pub use setting_value_type::SettingValueType;
