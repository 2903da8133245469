use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::manager::{Manager, Named, as_list};
use crate::model::note::Note;

/// Schema-qualified reference to a table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityInfo {
    #[serde(alias = "schema_name")]
    pub schema_name: String,
    #[serde(alias = "table_name")]
    pub table_name: String,
}

impl EntityInfo {
    pub fn new(schema_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
        }
    }
}

impl fmt::Display for EntityInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema_name, self.table_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindColumn {
    #[serde(alias = "source_column")]
    pub source_column: String,
    #[serde(alias = "target_column")]
    pub target_column: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    #[default]
    #[serde(rename = "1")]
    One,
    #[serde(rename = "0..1")]
    ZeroOrOne,
    #[serde(rename = "0..*")]
    ZeroOrMany,
    #[serde(rename = "1..*")]
    OneOrMany,
}

impl Cardinality {
    pub fn is_default(&self) -> bool {
        *self == Cardinality::One
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FkAction {
    #[serde(rename = "CASCADE")]
    Cascade,
    #[serde(rename = "SET NULL")]
    SetNull,
    #[serde(rename = "SET DEFAULT")]
    SetDefault,
    #[default]
    #[serde(rename = "RESTRICT")]
    Restrict,
    #[serde(rename = "NO ACTION")]
    NoAction,
}

impl FkAction {
    pub fn is_default(&self) -> bool {
        *self == FkAction::Restrict
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            FkAction::Cascade => "CASCADE",
            FkAction::SetNull => "SET NULL",
            FkAction::SetDefault => "SET DEFAULT",
            FkAction::Restrict => "RESTRICT",
            FkAction::NoAction => "NO ACTION",
        }
    }
}

/// Foreign-key style link from the owning table to `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub target: EntityInfo,
    #[serde(alias = "bind_columns")]
    pub bind_columns: Vec<BindColumn>,
    #[serde(
        default,
        alias = "cardinality_source",
        alias = "cardinaritySource",
        alias = "cardinarity_source",
        skip_serializing_if = "Cardinality::is_default"
    )]
    pub cardinality_source: Cardinality,
    #[serde(
        default,
        alias = "cardinality_target",
        alias = "cardinarityTarget",
        alias = "cardinarity_target",
        skip_serializing_if = "Cardinality::is_default"
    )]
    pub cardinality_target: Cardinality,
    #[serde(default, alias = "constraint_name", skip_serializing_if = "Option::is_none")]
    pub constraint_name: Option<String>,
    #[serde(default, alias = "on_delete", skip_serializing_if = "FkAction::is_default")]
    pub on_delete: FkAction,
    #[serde(default, alias = "on_update", skip_serializing_if = "FkAction::is_default")]
    pub on_update: FkAction,
    #[serde(default, with = "as_list", skip_serializing_if = "Manager::is_empty")]
    pub notes: Manager<Note>,
}

impl Relation {
    pub fn new(target: EntityInfo, bind_columns: Vec<BindColumn>) -> Self {
        Self {
            target,
            bind_columns,
            cardinality_source: Cardinality::One,
            cardinality_target: Cardinality::One,
            constraint_name: None,
            on_delete: FkAction::Restrict,
            on_update: FkAction::Restrict,
            notes: Manager::new(),
        }
    }

    pub fn source_columns(&self) -> Vec<String> {
        self.bind_columns
            .iter()
            .map(|bind| bind.source_column.clone())
            .collect()
    }

    pub fn target_columns(&self) -> Vec<String> {
        self.bind_columns
            .iter()
            .map(|bind| bind.target_column.clone())
            .collect()
    }

    /// Constraint name, or the conventional `fk_{source}_{target}` name.
    pub fn object_name(&self, source_table: &str) -> String {
        self.constraint_name
            .clone()
            .unwrap_or_else(|| format!("fk_{source_table}_{}", self.target.table_name))
    }
}

impl Named for Relation {
    const KIND: &'static str = "relation";

    fn key(&self) -> Cow<'_, str> {
        match &self.constraint_name {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(format!(
                "{}({})",
                self.target,
                self.source_columns().join(",")
            )),
        }
    }
}
