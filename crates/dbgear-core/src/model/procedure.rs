use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::manager::{Manager, Named, as_list};
use crate::model::note::Note;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParameterMode {
    #[default]
    In,
    Out,
    Inout,
}

impl ParameterMode {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ParameterMode::In => "IN",
            ParameterMode::Out => "OUT",
            ParameterMode::Inout => "INOUT",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SecurityType {
    #[default]
    Definer,
    Invoker,
}

impl SecurityType {
    pub fn is_default(&self) -> bool {
        *self == SecurityType::Definer
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SecurityType::Definer => "DEFINER",
            SecurityType::Invoker => "INVOKER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureParameter {
    #[serde(alias = "parameter_name")]
    pub parameter_name: String,
    #[serde(default, alias = "parameter_type")]
    pub parameter_type: ParameterMode,
    #[serde(alias = "data_type")]
    pub data_type: String,
    #[serde(default, alias = "default_value", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// Stored procedure, or stored function when `return_type` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Procedure {
    #[serde(default, alias = "procedure_name", skip_serializing)]
    pub procedure_name: String,
    #[serde(default, alias = "display_name", skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ProcedureParameter>,
    #[serde(default, alias = "return_type", skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    pub body: String,
    #[serde(default = "default_language", skip_serializing_if = "is_default_language")]
    pub language: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deterministic: bool,
    #[serde(
        default = "crate::model::default_true",
        alias = "reads_sql_data",
        skip_serializing_if = "crate::model::is_true"
    )]
    pub reads_sql_data: bool,
    #[serde(default, alias = "modifies_sql_data", skip_serializing_if = "std::ops::Not::not")]
    pub modifies_sql_data: bool,
    #[serde(default, alias = "security_type", skip_serializing_if = "SecurityType::is_default")]
    pub security_type: SecurityType,
    #[serde(default, with = "as_list", skip_serializing_if = "Manager::is_empty")]
    pub notes: Manager<Note>,
}

fn default_language() -> String {
    "SQL".to_string()
}

fn is_default_language(language: &String) -> bool {
    language == "SQL"
}

impl Procedure {
    pub fn is_function(&self) -> bool {
        self.return_type.is_some()
    }
}

impl Named for Procedure {
    const KIND: &'static str = "procedure";

    fn key(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.procedure_name)
    }

    fn assign_key(&mut self, key: &str) {
        if self.procedure_name.is_empty() {
            self.procedure_name = key.to_string();
        }
    }
}
