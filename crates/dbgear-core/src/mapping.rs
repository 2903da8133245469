//! Mappings: groups of data models inside an environment, with optional
//! inheritance from a parent mapping.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::datamodel::{DataModel, DataModelManager};
use crate::datasource::{DataSource, Row};
use crate::error::{Error, Result};
use crate::fileio;

pub const MAPPING_FILE: &str = "mapping.yaml";
const LEGACY_MAPPING_FILE: &str = "_mapping.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    #[serde(skip)]
    pub name: String,
    /// Environment directory the mapping lives in.
    #[serde(skip)]
    pub folder: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Parent mapping in the same environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// Instance (schema) names deployed by this mapping, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deployment: bool,
}

/// A row set together with the mapping it was found in.
#[derive(Debug, Clone, PartialEq)]
pub struct InheritedRows {
    pub mapping: String,
    pub rows: Vec<Row>,
}

impl Mapping {
    pub fn new(environ_dir: &Path, name: &str) -> Self {
        Self {
            name: name.to_string(),
            folder: environ_dir.to_path_buf(),
            group: None,
            base: None,
            instances: Vec::new(),
            description: String::new(),
            deployment: false,
        }
    }

    pub fn load(environ_dir: &Path, name: &str) -> Result<Self> {
        let dir = environ_dir.join(name);
        let path = mapping_file(&dir)
            .ok_or_else(|| Error::not_found("mapping", name))?;
        let mut mapping: Mapping = fileio::read_yaml_document(&path)?;
        mapping.name = name.to_string();
        mapping.folder = environ_dir.to_path_buf();
        Ok(mapping)
    }

    pub fn path(&self) -> PathBuf {
        self.folder.join(&self.name)
    }

    pub fn save(&self) -> Result<()> {
        let dir = self.path();
        let legacy = dir.join(LEGACY_MAPPING_FILE);
        fileio::write_yaml_atomic(&dir.join(MAPPING_FILE), self)?;
        if legacy.is_file() {
            std::fs::remove_file(&legacy).map_err(|err| Error::file(&legacy, err))?;
        }
        Ok(())
    }

    pub fn datamodels(&self) -> DataModelManager {
        DataModelManager::new(&self.path())
    }

    /// This mapping followed by its ancestors through `base`.
    pub fn lineage(&self) -> Result<Vec<Mapping>> {
        let mut chain = vec![self.clone()];
        let mut seen = BTreeSet::from([self.name.clone()]);
        let mut next = self.base.clone();
        while let Some(name) = next {
            if !seen.insert(name.clone()) {
                return Err(Error::Validation(format!(
                    "mapping inheritance cycle at {name} (starting from {})",
                    self.name
                )));
            }
            let parent = Mapping::load(&self.folder, &name)?;
            next = parent.base.clone();
            chain.push(parent);
        }
        Ok(chain)
    }

    /// Own data models plus inherited ones not overridden by (schema, table).
    pub fn effective_datamodels(&self) -> Result<Vec<DataModel>> {
        let mut models: IndexMap<String, DataModel> = IndexMap::new();
        for mapping in self.lineage()? {
            for model in mapping.datamodels().list()? {
                models.entry(model.key()).or_insert(model);
            }
        }
        Ok(models.into_values().collect())
    }

    /// Walk the lineage until a mapping holds data files for the table.
    pub fn find_rows(&self, schema_name: &str, table_name: &str) -> Result<Option<InheritedRows>> {
        for mapping in self.lineage()? {
            let sources = DataSource::discover(&mapping.path(), schema_name, table_name)?;
            if sources.is_empty() {
                continue;
            }
            let mut rows = Vec::new();
            for source in &sources {
                rows.extend(source.load()?);
            }
            return Ok(Some(InheritedRows {
                mapping: mapping.name,
                rows,
            }));
        }
        Ok(None)
    }
}

fn mapping_file(dir: &Path) -> Option<PathBuf> {
    [MAPPING_FILE, LEGACY_MAPPING_FILE]
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Mappings of one environment directory.
#[derive(Debug, Clone)]
pub struct MappingManager {
    folder: PathBuf,
}

impl MappingManager {
    pub fn new(environ_dir: &Path) -> Self {
        Self {
            folder: environ_dir.to_path_buf(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        mapping_file(&self.folder.join(name)).is_some()
    }

    pub fn get(&self, name: &str) -> Result<Mapping> {
        Mapping::load(&self.folder, name)
    }

    pub fn names(&self) -> Result<Vec<String>> {
        if !self.folder.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.folder).map_err(|err| Error::file(&self.folder, err))? {
            let entry = entry.map_err(|err| Error::file(&self.folder, err))?;
            if mapping_file(&entry.path()).is_some() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn list(&self) -> Result<Vec<Mapping>> {
        self.names()?
            .iter()
            .map(|name| self.get(name))
            .collect()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.names()?.len())
    }

    pub fn add(&self, mut mapping: Mapping) -> Result<Mapping> {
        let dir = self.folder.join(&mapping.name);
        if dir.exists() {
            return Err(Error::exists("mapping", &mapping.name));
        }
        std::fs::create_dir_all(&dir).map_err(|err| Error::file(&dir, err))?;
        mapping.folder = self.folder.clone();
        mapping.save()?;
        Ok(mapping)
    }

    pub fn save(&self, mapping: &Mapping) -> Result<()> {
        if !self.contains(&mapping.name) {
            return Err(Error::not_found("mapping", &mapping.name));
        }
        let mut mapping = mapping.clone();
        mapping.folder = self.folder.clone();
        mapping.save()
    }

    /// Delete an empty mapping directory.
    pub fn remove(&self, name: &str) -> Result<()> {
        let dir = self.folder.join(name);
        let Some(file) = mapping_file(&dir) else {
            return Err(Error::not_found("mapping", name));
        };
        let extra = fileio::other_entries(&dir, &[MAPPING_FILE, LEGACY_MAPPING_FILE])?;
        if !extra.is_empty() {
            return Err(Error::EntityRemoval {
                kind: "mapping",
                name: name.to_string(),
                reason: format!("directory still contains {}", extra.join(", ")),
            });
        }
        std::fs::remove_file(&file).map_err(|err| Error::file(&file, err))?;
        std::fs::remove_dir(&dir).map_err(|err| Error::file(&dir, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn write(path: &Path, text: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, text).expect("write");
    }

    #[test]
    fn add_list_and_remove() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = MappingManager::new(dir.path());
        let mut mapping = Mapping::new(dir.path(), "base");
        mapping.instances = vec!["main".to_string()];
        mapping.deployment = true;
        manager.add(mapping.clone()).expect("add");

        assert!(manager.contains("base"));
        assert_eq!(manager.names().expect("names"), vec!["base"]);
        assert_eq!(manager.get("base").expect("get"), mapping);

        let err = manager.add(mapping).expect_err("duplicate");
        assert_eq!(err.kind(), ErrorKind::EntityExists);

        write(&dir.path().join("base/main@users.dat"), "[]");
        let err = manager.remove("base").expect_err("has data");
        assert_eq!(err.kind(), ErrorKind::EntityRemoval);

        std::fs::remove_file(dir.path().join("base/main@users.dat")).expect("cleanup");
        manager.remove("base").expect("remove");
        let err = manager.remove("base").expect_err("gone");
        assert_eq!(err.kind(), ErrorKind::EntityNotFound);
    }

    #[test]
    fn reads_legacy_mapping_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            &dir.path().join("old/_mapping.yaml"),
            "description: legacy\ninstances: [main]\n",
        );
        let mapping = MappingManager::new(dir.path()).get("old").expect("load");
        assert_eq!(mapping.description, "legacy");
        assert_eq!(mapping.instances, vec!["main"]);
    }

    #[test]
    fn inherits_models_and_rows_from_base() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(&dir.path().join("base/mapping.yaml"), "instances: [main]\n");
        write(&dir.path().join("base/main@roles.yaml"), "description: parent roles\n");
        write(&dir.path().join("base/main@roles.dat"), "- id: 1\n- id: 2\n");
        write(&dir.path().join("base/main@users.yaml"), "description: parent users\n");
        write(&dir.path().join("child/mapping.yaml"), "base: base\ninstances: [main]\n");
        write(&dir.path().join("child/main@users.yaml"), "description: child users\n");
        write(&dir.path().join("child/main@users#b.dat"), "- id: 20\n");
        write(&dir.path().join("child/main@users#a.dat"), "- id: 10\n");

        let child = MappingManager::new(dir.path()).get("child").expect("child");
        let models = child.effective_datamodels().expect("models");
        let descriptions: Vec<(&str, &str)> = models
            .iter()
            .map(|model| (model.table_name.as_str(), model.description.as_str()))
            .collect();
        assert_eq!(
            descriptions,
            vec![("users", "child users"), ("roles", "parent roles")]
        );

        let roles = child.find_rows("main", "roles").expect("rows").expect("inherited");
        assert_eq!(roles.mapping, "base");
        assert_eq!(roles.rows.len(), 2);

        let users = child.find_rows("main", "users").expect("rows").expect("own");
        assert_eq!(users.mapping, "child");
        let ids: Vec<i64> = users
            .rows
            .iter()
            .filter_map(|row| row.get("id").and_then(|value| value.as_i64()))
            .collect();
        assert_eq!(ids, vec![10, 20]);

        assert!(child.find_rows("main", "orders").expect("rows").is_none());
    }

    #[test]
    fn inheritance_cycles_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(&dir.path().join("a/mapping.yaml"), "base: b\n");
        write(&dir.path().join("b/mapping.yaml"), "base: a\n");
        let a = MappingManager::new(dir.path()).get("a").expect("a");
        let err = a.lineage().expect_err("cycle");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
