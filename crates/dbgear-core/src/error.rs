use std::path::{Path, PathBuf};

use thiserror::Error;

/// Core error type shared across DBGear crates.
#[derive(Debug, Error)]
pub enum Error {
    /// An entity with the same name is already registered.
    #[error("{kind} already exists: {name}")]
    EntityExists { kind: &'static str, name: String },
    /// Lookup, removal or update of an absent entity.
    #[error("{kind} not found: {name}")]
    EntityNotFound { kind: &'static str, name: String },
    /// Removal would orphan persistent state.
    #[error("cannot remove {kind} {name}: {reason}")]
    EntityRemoval {
        kind: &'static str,
        name: String,
        reason: String,
    },
    /// A model invariant is violated.
    #[error("validation error: {0}")]
    Validation(String),
    /// The explicit dependency graph contains a cycle.
    #[error("dependency cycle detected: {}", nodes.join(" -> "))]
    Cycle { nodes: Vec<String> },
    /// Driver failure, annotated with the statement that caused it.
    #[error("database error: {message} (sql: {sql})")]
    Database { message: String, sql: String },
    /// Missing or unreadable project file.
    #[error("file error: {}: {message}", path.display())]
    File { path: PathBuf, message: String },
    /// Caller supplied an argument outside the accepted range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A requested feature is not supported by the active dialect.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// SQL template rendering failed.
    #[error("template error: {0}")]
    Template(String),
}

/// Coarse classification of [`Error`] for collaborators that map errors onto
/// their own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    EntityExists,
    EntityNotFound,
    EntityRemoval,
    Validation,
    Cycle,
    Database,
    File,
    InvalidArgument,
    Unsupported,
    Template,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EntityExists { .. } => ErrorKind::EntityExists,
            Error::EntityNotFound { .. } => ErrorKind::EntityNotFound,
            Error::EntityRemoval { .. } => ErrorKind::EntityRemoval,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Cycle { .. } => ErrorKind::Cycle,
            Error::Database { .. } => ErrorKind::Database,
            Error::File { .. } => ErrorKind::File,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Unsupported(_) => ErrorKind::Unsupported,
            Error::Template(_) => ErrorKind::Template,
        }
    }

    pub fn exists(kind: &'static str, name: impl Into<String>) -> Self {
        Error::EntityExists {
            kind,
            name: name.into(),
        }
    }

    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Error::EntityNotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn file(path: &Path, message: impl ToString) -> Self {
        Error::File {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn database(message: impl ToString, sql: impl Into<String>) -> Self {
        Error::Database {
            message: message.to_string(),
            sql: sql.into(),
        }
    }
}

/// Convenience alias for results returned by DBGear crates.
pub type Result<T> = std::result::Result<T, Error>;
