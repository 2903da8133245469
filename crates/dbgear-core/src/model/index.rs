use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::manager::{Manager, Named, as_list};
use crate::model::note::Note;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndexType {
    #[default]
    #[serde(alias = "btree")]
    Btree,
    #[serde(alias = "hash")]
    Hash,
    #[serde(alias = "fulltext")]
    Fulltext,
    #[serde(alias = "spatial")]
    Spatial,
}

impl IndexType {
    pub fn is_default(&self) -> bool {
        *self == IndexType::Btree
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexType::Btree => "BTREE",
            IndexType::Hash => "HASH",
            IndexType::Fulltext => "FULLTEXT",
            IndexType::Spatial => "SPATIAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    /// Empty names are rendered as `{table}_IX{n}`.
    #[serde(default, alias = "index_name")]
    pub index_name: String,
    pub columns: Vec<String>,
    #[serde(default, alias = "index_type", skip_serializing_if = "IndexType::is_default")]
    pub index_type: IndexType,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,
    #[serde(default, alias = "partial_condition", skip_serializing_if = "Option::is_none")]
    pub partial_condition: Option<String>,
    #[serde(default, alias = "include_columns", skip_serializing_if = "Vec::is_empty")]
    pub include_columns: Vec<String>,
    #[serde(default, with = "as_list", skip_serializing_if = "Manager::is_empty")]
    pub notes: Manager<Note>,
}

impl Index {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            index_name: name.into(),
            columns,
            index_type: IndexType::Btree,
            unique: false,
            partial_condition: None,
            include_columns: Vec::new(),
            notes: Manager::new(),
        }
    }
}

impl Named for Index {
    const KIND: &'static str = "index";

    /// Unnamed indexes are keyed by their column list.
    fn key(&self) -> Cow<'_, str> {
        if self.index_name.is_empty() {
            Cow::Owned(format!("({})", self.columns.join(",")))
        } else {
            Cow::Borrowed(&self.index_name)
        }
    }
}
