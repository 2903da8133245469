//! Database I/O for DBGear.
//!
//! [`Session`] abstracts one database connection; [`mysql`] holds the MySQL
//! templates, connection and `information_schema` introspection; [`apply`]
//! drives a full deployment of a project onto a server.

pub mod apply;
pub mod mysql;
pub mod params;
pub mod session;

pub use apply::{
    ApplyEngine, ApplyMode, ApplyReport, InstanceReport, TableReport, select_mappings,
};
pub use mysql::{MySqlSession, MySqlTemplates, introspect};
pub use params::{ExpandedSql, expand_named};
pub use session::{DryRunSession, Params, Record, RecordedStatement, Session, params};
