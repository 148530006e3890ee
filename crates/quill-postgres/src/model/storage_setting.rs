//! Storage setting model for the string-keyed configuration table.

use diesel::prelude::*;
use jiff_diesel::Timestamp;

use crate::schema::storage_settings;
use crate::types::SettingValueType;

/// A persisted configuration entry.
///
/// Each row carries either a text or a JSON value, discriminated by
/// `value_type`. Strategy configuration and the cached resolved credential
/// live in separate rows so that editing one never clobbers the other.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = storage_settings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StorageSetting {
    /// Setting key.
    pub key: String,
    /// Which value column is populated.
    pub value_type: SettingValueType,
    /// Text payload.
    pub text_value: Option<String>,
    /// JSON payload.
    pub json_value: Option<serde_json::Value>,
    /// Timestamp when the setting was last written.
    pub updated_at: Timestamp,
}

/// Data for inserting or replacing a setting.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = storage_settings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewStorageSetting {
    /// Setting key.
    pub key: String,
    /// Which value column is populated.
    pub value_type: SettingValueType,
    /// Text payload.
    pub text_value: Option<String>,
    /// JSON payload.
    pub json_value: Option<serde_json::Value>,
}

impl NewStorageSetting {
    /// Creates a text-valued setting.
    pub fn text(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value_type: SettingValueType::Text,
            text_value: Some(value.into()),
            json_value: None,
        }
    }

    /// Creates a JSON-valued setting.
    pub fn json(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            value_type: SettingValueType::Json,
            text_value: None,
            json_value: Some(value),
        }
    }
}
