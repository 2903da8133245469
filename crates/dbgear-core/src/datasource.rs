//! Seed rows stored next to their data model as `<schema>@<table>[#<segment>].dat`.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::fileio;

/// One seed row: column name to value.
pub type Row = serde_json::Map<String, serde_json::Value>;

pub const DATA_EXTENSION: &str = "dat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    pub path: PathBuf,
    pub schema_name: String,
    pub table_name: String,
    pub segment: Option<String>,
}

/// Components of a data file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFileName {
    pub schema_name: String,
    pub table_name: String,
    pub segment: Option<String>,
}

impl DataFileName {
    /// Parse `schema@table.dat` or `schema@table#segment.dat`.
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(".dat")?;
        let (schema_name, rest) = stem.split_once('@')?;
        let (table_name, segment) = match rest.split_once('#') {
            Some((table, segment)) => (table, Some(segment.to_string())),
            None => (rest, None),
        };
        if schema_name.is_empty() || table_name.is_empty() || table_name.contains('@') {
            return None;
        }
        if segment.as_deref().is_some_and(|segment| segment.is_empty() || segment.contains('#')) {
            return None;
        }
        Some(Self {
            schema_name: schema_name.to_string(),
            table_name: table_name.to_string(),
            segment,
        })
    }

    pub fn render(&self) -> String {
        match &self.segment {
            Some(segment) => format!(
                "{}@{}#{segment}.{DATA_EXTENSION}",
                self.schema_name, self.table_name
            ),
            None => format!("{}@{}.{DATA_EXTENSION}", self.schema_name, self.table_name),
        }
    }
}

impl DataSource {
    pub fn new(dir: &Path, schema_name: &str, table_name: &str, segment: Option<&str>) -> Self {
        let name = DataFileName {
            schema_name: schema_name.to_string(),
            table_name: table_name.to_string(),
            segment: segment.map(str::to_string),
        };
        Self {
            path: dir.join(name.render()),
            schema_name: name.schema_name,
            table_name: name.table_name,
            segment: name.segment,
        }
    }

    /// Every data file for `schema.table` in `dir`: the unsegmented file
    /// first, then segments in lexicographic order.
    pub fn discover(dir: &Path, schema_name: &str, table_name: &str) -> Result<Vec<DataSource>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut base = None;
        let mut segments = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(|err| Error::file(dir, err))? {
            let entry = entry.map_err(|err| Error::file(dir, err))?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some(parsed) = DataFileName::parse(&file_name) else {
                continue;
            };
            if parsed.schema_name != schema_name || parsed.table_name != table_name {
                continue;
            }
            let source = DataSource {
                path: entry.path(),
                schema_name: parsed.schema_name,
                table_name: parsed.table_name,
                segment: parsed.segment,
            };
            if source.segment.is_some() {
                segments.push(source);
            } else {
                base = Some(source);
            }
        }
        segments.sort_by(|left, right| left.segment.cmp(&right.segment));
        Ok(base.into_iter().chain(segments).collect())
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the rows; an empty file holds zero rows.
    pub fn load(&self) -> Result<Vec<Row>> {
        let rows: Option<Vec<Row>> = fileio::read_yaml(&self.path)?;
        Ok(rows.unwrap_or_default())
    }

    pub fn save(&self, rows: &[Row]) -> Result<()> {
        fileio::write_yaml_atomic(&self.path, &rows)
    }
}
