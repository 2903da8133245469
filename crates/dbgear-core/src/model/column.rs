use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::manager::{Manager, Named, as_list};
use crate::model::column_type::ColumnType;
use crate::model::note::Note;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    #[serde(alias = "column_name")]
    pub column_name: String,
    #[serde(default, alias = "display_name", skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(alias = "column_type")]
    pub column_type: ColumnType,
    #[serde(default = "crate::model::default_true", skip_serializing_if = "crate::model::is_true")]
    pub nullable: bool,
    /// 1-based position inside the primary key.
    #[serde(default, alias = "primary_key", skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<u32>,
    #[serde(default, alias = "default_value", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// Generation expression; such columns are never inserted into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stored: bool,
    #[serde(default, alias = "auto_increment", skip_serializing_if = "std::ops::Not::not")]
    pub auto_increment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    #[serde(default, with = "as_list", skip_serializing_if = "Manager::is_empty")]
    pub notes: Manager<Note>,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            column_name: name.into(),
            display_name: String::new(),
            column_type,
            nullable: true,
            primary_key: None,
            default_value: None,
            expression: None,
            stored: false,
            auto_increment: false,
            charset: None,
            collation: None,
            notes: Manager::new(),
        }
    }

    /// Generated columns are computed by the database.
    pub fn is_generated(&self) -> bool {
        self.expression.is_some()
    }

    pub fn is_insertable(&self) -> bool {
        !self.is_generated()
    }
}

impl Named for Column {
    const KIND: &'static str = "column";

    fn key(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.column_name)
    }
}
