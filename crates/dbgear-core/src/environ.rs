//! Environments: named deployment contexts holding connection strings and
//! mappings.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fileio;
use crate::mapping::MappingManager;
use crate::project::ProjectOptions;

pub const ENVIRON_FILE: &str = "environ.yaml";

/// Per-environment overrides of [`ProjectOptions`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironOptions {
    #[serde(
        default,
        alias = "create_foreign_key_constraints",
        skip_serializing_if = "Option::is_none"
    )]
    pub create_foreign_key_constraints: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environ {
    #[serde(skip)]
    pub name: String,
    /// Project directory the environment lives in.
    #[serde(skip)]
    pub folder: PathBuf,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Deployment alias to connection string.
    #[serde(
        default,
        alias = "deployments",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub deployment: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<EnvironOptions>,
}

impl Environ {
    pub fn new(project_dir: &Path, name: &str) -> Self {
        Self {
            name: name.to_string(),
            folder: project_dir.to_path_buf(),
            description: String::new(),
            deployment: IndexMap::new(),
            options: None,
        }
    }

    pub fn load(project_dir: &Path, name: &str) -> Result<Self> {
        let path = project_dir.join(name).join(ENVIRON_FILE);
        if !path.is_file() {
            return Err(Error::not_found("environment", name));
        }
        let mut environ: Environ = fileio::read_yaml_document(&path)?;
        environ.name = name.to_string();
        environ.folder = project_dir.to_path_buf();
        Ok(environ)
    }

    pub fn path(&self) -> PathBuf {
        self.folder.join(&self.name)
    }

    pub fn save(&self) -> Result<()> {
        fileio::write_yaml_atomic(&self.path().join(ENVIRON_FILE), self)
    }

    pub fn mappings(&self) -> MappingManager {
        MappingManager::new(&self.path())
    }

    /// Connection string registered under `alias`.
    pub fn connection_string(&self, alias: &str) -> Result<&str> {
        let conn = self
            .deployment
            .get(alias)
            .ok_or_else(|| Error::not_found("deployment", format!("{}/{alias}", self.name)))?;
        if conn.trim().is_empty() {
            return Err(Error::Validation(format!(
                "connection string for deployment {alias} in {} is empty",
                self.name
            )));
        }
        Ok(conn)
    }

    /// Project options with this environment's overrides applied.
    pub fn effective_options(&self, project: &ProjectOptions) -> ProjectOptions {
        let mut options = project.clone();
        if let Some(overrides) = &self.options {
            if let Some(value) = overrides.create_foreign_key_constraints {
                options.create_foreign_key_constraints = value;
            }
        }
        options
    }
}

/// Environments of one project directory.
#[derive(Debug, Clone)]
pub struct EnvironManager {
    folder: PathBuf,
}

impl EnvironManager {
    pub fn new(project_dir: &Path) -> Self {
        Self {
            folder: project_dir.to_path_buf(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.folder.join(name).join(ENVIRON_FILE).is_file()
    }

    pub fn get(&self, name: &str) -> Result<Environ> {
        Environ::load(&self.folder, name)
    }

    pub fn names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.folder).map_err(|err| Error::file(&self.folder, err))? {
            let entry = entry.map_err(|err| Error::file(&self.folder, err))?;
            if entry.path().join(ENVIRON_FILE).is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn list(&self) -> Result<Vec<Environ>> {
        self.names()?.iter().map(|name| self.get(name)).collect()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.names()?.len())
    }

    pub fn add(&self, mut environ: Environ) -> Result<Environ> {
        let dir = self.folder.join(&environ.name);
        if dir.exists() {
            return Err(Error::exists("environment", &environ.name));
        }
        std::fs::create_dir_all(&dir).map_err(|err| Error::file(&dir, err))?;
        environ.folder = self.folder.clone();
        environ.save()?;
        Ok(environ)
    }

    pub fn save(&self, environ: &Environ) -> Result<()> {
        if !self.contains(&environ.name) {
            return Err(Error::not_found("environment", &environ.name));
        }
        let mut environ = environ.clone();
        environ.folder = self.folder.clone();
        environ.save()
    }

    /// Delete an environment directory that holds nothing but `environ.yaml`.
    pub fn remove(&self, name: &str) -> Result<()> {
        if !self.contains(name) {
            return Err(Error::not_found("environment", name));
        }
        let dir = self.folder.join(name);
        let extra = fileio::other_entries(&dir, &[ENVIRON_FILE])?;
        if !extra.is_empty() {
            return Err(Error::EntityRemoval {
                kind: "environment",
                name: name.to_string(),
                reason: format!("directory still contains {}", extra.join(", ")),
            });
        }
        let file = dir.join(ENVIRON_FILE);
        std::fs::remove_file(&file).map_err(|err| Error::file(&file, err))?;
        std::fs::remove_dir(&dir).map_err(|err| Error::file(&dir, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::mapping::Mapping;

    #[test]
    fn lifecycle_with_removal_guard() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = EnvironManager::new(dir.path());
        let mut environ = Environ::new(dir.path(), "dev");
        environ.description = "Development".to_string();
        environ
            .deployment
            .insert("local".to_string(), "mysql://root@localhost:3306".to_string());
        manager.add(environ.clone()).expect("add");

        assert_eq!(manager.names().expect("names"), vec!["dev"]);
        assert_eq!(manager.get("dev").expect("get"), environ);

        let loaded = manager.get("dev").expect("get");
        loaded
            .mappings()
            .add(Mapping::new(&loaded.path(), "base"))
            .expect("add mapping");
        let err = manager.remove("dev").expect_err("has mappings");
        assert_eq!(err.kind(), ErrorKind::EntityRemoval);

        loaded.mappings().remove("base").expect("remove mapping");
        manager.remove("dev").expect("remove");
        assert!(!manager.contains("dev"));
        assert_eq!(
            manager.get("dev").expect_err("gone").kind(),
            ErrorKind::EntityNotFound
        );
    }

    #[test]
    fn resolves_deployments_and_option_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("prod")).expect("mkdir");
        std::fs::write(
            dir.path().join("prod").join(ENVIRON_FILE),
            "deployments:\n  main: mysql://app@db/prod\n  blank: ''\noptions:\n  create_foreign_key_constraints: false\n",
        )
        .expect("write");

        let environ = EnvironManager::new(dir.path()).get("prod").expect("load");
        assert_eq!(
            environ.connection_string("main").expect("alias"),
            "mysql://app@db/prod"
        );
        assert_eq!(
            environ.connection_string("other").expect_err("missing").kind(),
            ErrorKind::EntityNotFound
        );
        assert_eq!(
            environ.connection_string("blank").expect_err("empty").kind(),
            ErrorKind::Validation
        );

        let options = environ.effective_options(&ProjectOptions::default());
        assert!(!options.create_foreign_key_constraints);
    }
}
