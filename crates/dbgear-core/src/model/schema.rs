use std::borrow::Cow;
use std::ops::{Deref, DerefMut};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fileio;
use crate::manager::{Manager, Named, as_list};
use crate::model::column_type::ColumnType;
use crate::model::note::Note;
use crate::model::procedure::Procedure;
use crate::model::relation::EntityInfo;
use crate::model::table::Table;
use crate::model::trigger::Trigger;
use crate::model::view::View;
use crate::populate::{SCHEMA_RULES, auto_populate};
use crate::validation::validate_schemas;

/// Named container of tables, views, procedures and triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(default, skip_serializing)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Manager::is_empty")]
    pub tables: Manager<Table>,
    #[serde(default, skip_serializing_if = "Manager::is_empty")]
    pub views: Manager<View>,
    #[serde(default, skip_serializing_if = "Manager::is_empty")]
    pub procedures: Manager<Procedure>,
    #[serde(default, skip_serializing_if = "Manager::is_empty")]
    pub triggers: Manager<Trigger>,
    #[serde(default, with = "as_list", skip_serializing_if = "Manager::is_empty")]
    pub notes: Manager<Note>,
    /// Reusable column types offered to schema authors.
    #[serde(
        default,
        alias = "column_types",
        with = "as_list",
        skip_serializing_if = "Manager::is_empty"
    )]
    pub column_types: Manager<ColumnType>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Manager::new(),
            views: Manager::new(),
            procedures: Manager::new(),
            triggers: Manager::new(),
            notes: Manager::new(),
            column_types: Manager::new(),
        }
    }

    /// Add a table after checking its column-level invariants.
    pub fn add_table(&mut self, table: Table) -> Result<&mut Table> {
        table.validate(&self.name)?;
        self.tables.add(table)
    }
}

impl Named for Schema {
    const KIND: &'static str = "schema";

    fn key(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn assign_key(&mut self, key: &str) {
        if self.name.is_empty() {
            self.name = key.to_string();
        }
    }
}

#[derive(Deserialize)]
struct SchemaDocument {
    #[serde(default)]
    schemas: Manager<Schema>,
}

/// Owner of every [`Schema`] in a project, persisted as `schema.yaml`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaManager {
    schemas: Manager<Schema>,
}

impl SchemaManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut document = fileio::read_yaml_value(path)?;
        auto_populate(&mut document, SCHEMA_RULES);
        let document: SchemaDocument = fileio::from_value(path, document)?;
        let manager = Self {
            schemas: document.schemas,
        };
        manager.validate()?;
        tracing::debug!(
            event = "schema_loaded",
            path = %path.display(),
            schemas = manager.schemas.len()
        );
        Ok(manager)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let mut document: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|err| Error::Validation(err.to_string()))?;
        auto_populate(&mut document, SCHEMA_RULES);
        let document: SchemaDocument =
            serde_yaml::from_value(document).map_err(|err| Error::Validation(err.to_string()))?;
        let manager = Self {
            schemas: document.schemas,
        };
        manager.validate()?;
        Ok(manager)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(&SchemaDocumentRef {
            schemas: &self.schemas,
        })
        .map_err(|err| Error::Validation(err.to_string()))
    }

    /// Validate and write the whole tree back to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        fileio::write_yaml_atomic(
            path,
            &SchemaDocumentRef {
                schemas: &self.schemas,
            },
        )
    }

    pub fn validate(&self) -> Result<()> {
        validate_schemas(self)
    }

    pub fn table(&self, schema: &str, table: &str) -> Result<&Table> {
        self.schemas.require(schema)?.tables.require(table)
    }

    pub fn find_table(&self, entity: &EntityInfo) -> Option<&Table> {
        self.schemas
            .get(&entity.schema_name)
            .and_then(|schema| schema.tables.get(&entity.table_name))
    }
}

#[derive(Serialize)]
struct SchemaDocumentRef<'a> {
    schemas: &'a Manager<Schema>,
}

impl Deref for SchemaManager {
    type Target = Manager<Schema>;

    fn deref(&self) -> &Self::Target {
        &self.schemas
    }
}

impl DerefMut for SchemaManager {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.schemas
    }
}
