//! YAML file helpers shared by every persisted entity.

use std::fs::{OpenOptions, create_dir_all};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_yaml::Value;

use crate::error::{Error, Result};

pub fn read_yaml_value(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).map_err(|err| Error::file(path, err))?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str(&text).map_err(|err| Error::file(path, err))
}

pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let value = read_yaml_value(path)?;
    from_value(path, value)
}

/// Read a mapping-shaped document; an empty file counts as `{}`.
pub fn read_yaml_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let value = match read_yaml_value(path)? {
        Value::Null => Value::Mapping(serde_yaml::Mapping::new()),
        value => value,
    };
    from_value(path, value)
}

/// Deserialize an already-parsed document. The YAML itself is well formed at
/// this point, so a failure is a model error, reported against `path`.
pub fn from_value<T: DeserializeOwned>(path: &Path, value: Value) -> Result<T> {
    serde_yaml::from_value(value)
        .map_err(|err| Error::Validation(format!("{}: {err}", path.display())))
}

pub fn write_yaml_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_yaml::to_string(value).map_err(|err| Error::file(path, err))?;
    write_bytes_atomic(path, text.as_bytes()).map_err(|err| Error::file(path, err))
}

/// Write through a sibling temp file and rename it into place. The parent
/// directory is synced around the rename so the new entry survives a crash.
pub fn write_bytes_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let parent = path.parent().filter(|parent| !parent.as_os_str().is_empty());
    if let Some(parent) = parent {
        create_dir_all(parent)?;
    }

    let tmp_path = temp_path(path)?;
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&tmp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    if let Some(parent) = parent {
        sync_dir(parent)?;
    }
    std::fs::rename(&tmp_path, path)?;
    if let Some(parent) = parent {
        sync_dir(parent)?;
    }
    Ok(())
}

#[cfg(unix)]
fn sync_dir(path: &Path) -> io::Result<()> {
    OpenOptions::new().read(true).open(path)?.sync_all()
}

// Directories cannot be opened for syncing outside unix.
#[cfg(not(unix))]
fn sync_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}

fn temp_path(path: &Path) -> io::Result<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "invalid path for atomic write")
    })?;
    let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
    Ok(path.with_file_name(tmp_name))
}

/// Names of the entries in `dir`, excluding `keep`.
pub fn other_entries(dir: &Path, keep: &[&str]) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|err| Error::file(dir, err))? {
        let entry = entry.map_err(|err| Error::file(dir, err))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !keep.contains(&name.as_str()) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
