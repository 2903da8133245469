//! Core model and analysis for DBGear.
//!
//! This crate owns the project tree (schemas, environments, mappings, data
//! models and their seed files), its YAML persistence, and the two graph
//! analyses built on it: per-table dependency reports and the insertion
//! order used when seeding a database.

pub mod datamodel;
pub mod datasource;
pub mod dependency;
pub mod environ;
pub mod error;
pub mod fileio;
pub mod graph;
pub mod issues;
pub mod manager;
pub mod mapping;
pub mod model;
pub mod populate;
pub mod project;
pub mod redaction;
pub mod validation;

pub use datamodel::{DataModel, DataModelManager, Layout, SyncMode, parse_table_ref, table_ref};
pub use datasource::{DataFileName, DataSource, Row};
pub use dependency::{
    DependencyAnalyzer, DependencyItem, DependencyKind, DependencyReport, MAX_LEVEL, PathStep,
};
pub use environ::{Environ, EnvironManager, EnvironOptions};
pub use error::{Error, ErrorKind, Result};
pub use graph::{OrderReport, ResolvedOrder, resolve_insertion_order};
pub use issues::Warning;
pub use manager::{Manager, Named};
pub use mapping::{InheritedRows, Mapping, MappingManager};
pub use project::{Project, ProjectOptions};
pub use redaction::{RedactedConnection, redact_connection_string};
pub use validation::{validate_relation_targets, validate_schemas};
