//! Per-table authoring metadata inside a mapping directory.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::datasource::{DataSource, Row};
use crate::error::{Error, Result};
use crate::fileio;
use crate::model::EntityInfo;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Table,
    Matrix,
    Single,
}

impl Layout {
    pub fn is_default(&self) -> bool {
        *self == Layout::Table
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// Seed rows replace the table content.
    #[default]
    #[serde(rename = "drop-create", alias = "drop_create")]
    DropCreate,
    /// Rows present before a delta apply survive next to the seed rows.
    #[serde(rename = "update-diff", alias = "update_diff")]
    UpdateDiff,
}

impl SyncMode {
    pub fn is_default(&self) -> bool {
        *self == SyncMode::DropCreate
    }
}

/// Parse a `schema@table` reference.
pub fn parse_table_ref(text: &str) -> Result<EntityInfo> {
    match text.split_once('@') {
        Some((schema, table))
            if !schema.is_empty() && !table.is_empty() && !table.contains('@') =>
        {
            Ok(EntityInfo::new(schema, table))
        }
        _ => Err(Error::Validation(format!(
            "malformed table reference {text:?}, expected schema@table"
        ))),
    }
}

pub fn table_ref(entity: &EntityInfo) -> String {
    format!("{}@{}", entity.schema_name, entity.table_name)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataModel {
    /// Mapping directory holding this model and its data files.
    #[serde(skip)]
    pub folder: PathBuf,
    #[serde(default, alias = "schema_name")]
    pub schema_name: String,
    #[serde(default, alias = "table_name")]
    pub table_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Layout::is_default")]
    pub layout: Layout,
    /// Authoring hints for the data grid, carried verbatim.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub settings: IndexMap<String, serde_yaml::Value>,
    #[serde(default, alias = "sync_mode", skip_serializing_if = "SyncMode::is_default")]
    pub sync_mode: SyncMode,
    /// Explicit ordering constraints as `schema@table`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, alias = "x_axis", skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<String>,
    #[serde(default, alias = "y_axis", skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cells: Option<Vec<String>>,
}

impl DataModel {
    pub fn new(folder: &Path, schema_name: &str, table_name: &str) -> Self {
        Self {
            folder: folder.to_path_buf(),
            schema_name: schema_name.to_string(),
            table_name: table_name.to_string(),
            description: String::new(),
            layout: Layout::Table,
            settings: IndexMap::new(),
            sync_mode: SyncMode::DropCreate,
            dependencies: Vec::new(),
            value: None,
            caption: None,
            x_axis: None,
            y_axis: None,
            cells: None,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut model: DataModel = fileio::read_yaml_document(path)?;
        model.folder = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        if model.schema_name.is_empty() || model.table_name.is_empty() {
            let stem = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            let entity = parse_table_ref(&stem)?;
            if model.schema_name.is_empty() {
                model.schema_name = entity.schema_name;
            }
            if model.table_name.is_empty() {
                model.table_name = entity.table_name;
            }
        }
        Ok(model)
    }

    pub fn save(&self) -> Result<()> {
        fileio::write_yaml_atomic(&self.path(), self)
    }

    pub fn file_name(&self) -> String {
        format!("{}@{}.yaml", self.schema_name, self.table_name)
    }

    pub fn path(&self) -> PathBuf {
        self.folder.join(self.file_name())
    }

    pub fn entity(&self) -> EntityInfo {
        EntityInfo::new(&self.schema_name, &self.table_name)
    }

    pub fn key(&self) -> String {
        table_ref(&self.entity())
    }

    /// Parsed explicit dependencies.
    pub fn dependency_refs(&self) -> Result<Vec<EntityInfo>> {
        self.dependencies
            .iter()
            .map(|dependency| parse_table_ref(dependency))
            .collect()
    }

    pub fn datasources(&self) -> Result<Vec<DataSource>> {
        DataSource::discover(&self.folder, &self.schema_name, &self.table_name)
    }

    /// Rows from every data file of this model, segments concatenated.
    pub fn load_rows(&self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        for source in self.datasources()? {
            rows.extend(source.load()?);
        }
        Ok(rows)
    }
}

/// Data models of one mapping directory.
#[derive(Debug, Clone)]
pub struct DataModelManager {
    folder: PathBuf,
}

impl DataModelManager {
    pub fn new(folder: &Path) -> Self {
        Self {
            folder: folder.to_path_buf(),
        }
    }

    fn path_of(&self, schema_name: &str, table_name: &str) -> PathBuf {
        self.folder.join(format!("{schema_name}@{table_name}.yaml"))
    }

    pub fn contains(&self, schema_name: &str, table_name: &str) -> bool {
        self.path_of(schema_name, table_name).is_file()
    }

    pub fn get(&self, schema_name: &str, table_name: &str) -> Result<DataModel> {
        let path = self.path_of(schema_name, table_name);
        if !path.is_file() {
            return Err(Error::not_found(
                "data model",
                format!("{schema_name}@{table_name}"),
            ));
        }
        DataModel::load(&path)
    }

    /// All data models, ordered by file name.
    pub fn list(&self) -> Result<Vec<DataModel>> {
        if !self.folder.is_dir() {
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.folder).map_err(|err| Error::file(&self.folder, err))? {
            let path = entry.map_err(|err| Error::file(&self.folder, err))?.path();
            let is_model = path.extension().is_some_and(|ext| ext == "yaml")
                && path
                    .file_name()
                    .is_some_and(|name| name.to_string_lossy().contains('@'));
            if is_model {
                paths.push(path);
            }
        }
        paths.sort();
        paths.iter().map(|path| DataModel::load(path)).collect()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.list()?.len())
    }

    pub fn add(&self, mut model: DataModel) -> Result<DataModel> {
        parse_table_ref(&model.key())?;
        if self.contains(&model.schema_name, &model.table_name) {
            return Err(Error::exists("data model", model.key()));
        }
        model.folder = self.folder.clone();
        model.save()?;
        Ok(model)
    }

    pub fn save(&self, model: &DataModel) -> Result<()> {
        if !self.contains(&model.schema_name, &model.table_name) {
            return Err(Error::not_found("data model", model.key()));
        }
        let mut model = model.clone();
        model.folder = self.folder.clone();
        model.save()
    }

    /// Remove the model file; refused while its data files still exist.
    pub fn remove(&self, schema_name: &str, table_name: &str) -> Result<()> {
        let model = self.get(schema_name, table_name)?;
        let sources = model.datasources()?;
        if !sources.is_empty() {
            return Err(Error::EntityRemoval {
                kind: "data model",
                name: model.key(),
                reason: format!(
                    "data files still exist: {}",
                    sources
                        .iter()
                        .map(DataSource::file_name)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            });
        }
        let path = model.path();
        std::fs::remove_file(&path).map_err(|err| Error::file(&path, err))
    }
}
