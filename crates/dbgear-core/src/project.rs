//! Project root: `project.yaml`, `schema.yaml` and environment directories.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::environ::EnvironManager;
use crate::error::Result;
use crate::fileio;
use crate::model::SchemaManager;

pub const PROJECT_FILE: &str = "project.yaml";
pub const SCHEMA_FILE: &str = "schema.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOptions {
    /// Emit FOREIGN KEY clauses for named relations.
    #[serde(
        default = "crate::model::default_true",
        alias = "create_foreign_key_constraints",
        skip_serializing_if = "crate::model::is_true"
    )]
    pub create_foreign_key_constraints: bool,
}

impl Default for ProjectOptions {
    fn default() -> Self {
        Self {
            create_foreign_key_constraints: true,
        }
    }
}

impl ProjectOptions {
    fn is_default(&self) -> bool {
        *self == ProjectOptions::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectFile {
    #[serde(default, alias = "name", alias = "project_name")]
    project_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(default, skip_serializing_if = "ProjectOptions::is_default")]
    options: ProjectOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub folder: PathBuf,
    pub name: String,
    pub description: String,
    pub options: ProjectOptions,
    pub schemas: SchemaManager,
}

impl Project {
    pub fn new(folder: &Path, name: impl Into<String>) -> Self {
        Self {
            folder: folder.to_path_buf(),
            name: name.into(),
            description: String::new(),
            options: ProjectOptions::default(),
            schemas: SchemaManager::new(),
        }
    }

    pub fn load(folder: &Path) -> Result<Self> {
        let file: ProjectFile = fileio::read_yaml_document(&folder.join(PROJECT_FILE))?;
        let schemas = SchemaManager::load(&folder.join(SCHEMA_FILE))?;
        tracing::info!(
            event = "project_loaded",
            project = %file.project_name,
            folder = %folder.display(),
            schemas = schemas.len()
        );
        Ok(Self {
            folder: folder.to_path_buf(),
            name: file.project_name,
            description: file.description,
            options: file.options,
            schemas,
        })
    }

    /// Write `project.yaml` and `schema.yaml`.
    pub fn save(&self) -> Result<()> {
        let file = ProjectFile {
            project_name: self.name.clone(),
            description: self.description.clone(),
            options: self.options.clone(),
        };
        fileio::write_yaml_atomic(&self.folder.join(PROJECT_FILE), &file)?;
        self.schemas.save(&self.folder.join(SCHEMA_FILE))
    }

    pub fn environs(&self) -> EnvironManager {
        EnvironManager::new(&self.folder)
    }
}
