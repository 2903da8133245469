use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::manager::Named;

/// Free-form annotation attached to most model objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub checked: bool,
}

impl Note {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            checked: false,
        }
    }

    /// Text used when the note becomes an inline SQL comment.
    pub fn comment_text(&self) -> &str {
        if self.content.trim().is_empty() {
            &self.title
        } else {
            &self.content
        }
    }
}

impl Named for Note {
    const KIND: &'static str = "note";

    fn key(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.title)
    }
}
