//! Value type discriminator for the string-keyed settings table.

use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Discriminates whether a setting row carries a text or a JSON value.
///
/// Corresponds to the `setting_value_type` PostgreSQL enum.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[derive(Serialize, Deserialize, DbEnum, Display, EnumString)]
#[ExistingTypePath = "crate::schema::sql_types::SettingValueType"]
pub enum SettingValueType {
    /// Plain text value stored in `text_value`.
    #[db_rename = "text"]
    #[serde(rename = "text")]
    Text,

    /// JSON value stored in `json_value`.
    #[db_rename = "json"]
    #[serde(rename = "json")]
    Json,
}
