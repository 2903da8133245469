use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::manager::{Manager, Named, as_list};
use crate::model::note::Note;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    #[serde(default, alias = "view_name", skip_serializing)]
    pub view_name: String,
    #[serde(default, alias = "display_name", skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(alias = "select_statement")]
    pub select_statement: String,
    #[serde(default, with = "as_list", skip_serializing_if = "Manager::is_empty")]
    pub notes: Manager<Note>,
}

impl View {
    pub fn new(name: impl Into<String>, select_statement: impl Into<String>) -> Self {
        Self {
            view_name: name.into(),
            display_name: String::new(),
            select_statement: select_statement.into(),
            notes: Manager::new(),
        }
    }
}

impl Named for View {
    const KIND: &'static str = "view";

    fn key(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.view_name)
    }

    fn assign_key(&mut self, key: &str) {
        if self.view_name.is_empty() {
            self.view_name = key.to_string();
        }
    }
}
