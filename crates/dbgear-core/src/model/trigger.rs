use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::manager::{Manager, Named, as_list};
use crate::model::note::Note;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerTiming {
    #[serde(rename = "BEFORE")]
    Before,
    #[serde(rename = "AFTER")]
    After,
    #[serde(rename = "INSTEAD OF")]
    InsteadOf,
}

impl TriggerTiming {
    pub fn as_sql(&self) -> &'static str {
        match self {
            TriggerTiming::Before => "BEFORE",
            TriggerTiming::After => "AFTER",
            TriggerTiming::InsteadOf => "INSTEAD OF",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

impl TriggerEvent {
    pub fn as_sql(&self) -> &'static str {
        match self {
            TriggerEvent::Insert => "INSERT",
            TriggerEvent::Update => "UPDATE",
            TriggerEvent::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    #[serde(default, alias = "trigger_name", skip_serializing)]
    pub trigger_name: String,
    #[serde(default, alias = "display_name", skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    /// Table the trigger fires on, in the same schema.
    #[serde(alias = "table_name")]
    pub table_name: String,
    pub timing: TriggerTiming,
    pub event: TriggerEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub body: String,
    #[serde(default, with = "as_list", skip_serializing_if = "Manager::is_empty")]
    pub notes: Manager<Note>,
}

impl Named for Trigger {
    const KIND: &'static str = "trigger";

    fn key(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.trigger_name)
    }

    fn assign_key(&mut self, key: &str) {
        if self.trigger_name.is_empty() {
            self.trigger_name = key.to_string();
        }
    }
}
