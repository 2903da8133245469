//! MySQL dialect: connection, statement templates and `information_schema`
//! introspection.

use dbgear_core::model::Schema;
use dbgear_core::{Error, Result};

use crate::session::Session;

mod mapper;
pub mod queries;
mod session;
mod templates;

pub use session::{MySqlSession, normalize_url};
pub use templates::{
    DEFAULT_CHARSET, DEFAULT_COLLATION, InsertValue, MySqlTemplates, ObjectKind, backup_table_name,
};

/// Read one database back into a [`Schema`] named after it.
pub async fn introspect(session: &mut dyn Session, database: &str) -> Result<Schema> {
    if !queries::database_exists(session, database).await? {
        return Err(Error::not_found("database", database));
    }

    let mut schema = Schema::new(database);

    for raw_table in queries::list_tables(session, database).await? {
        let columns = queries::list_columns(session, database, &raw_table.name).await?;
        let indexes = queries::list_indexes(session, database, &raw_table.name).await?;
        let foreign_keys = queries::list_foreign_keys(session, database, &raw_table.name).await?;
        let table = mapper::map_table(raw_table, columns, indexes, foreign_keys)?;
        schema.tables.add(table)?;
    }

    for raw_view in queries::list_views(session, database).await? {
        schema.views.add(mapper::map_view(raw_view))?;
    }

    for raw_trigger in queries::list_triggers(session, database).await? {
        schema.triggers.add(mapper::map_trigger(raw_trigger)?)?;
    }

    tracing::info!(
        event = "database_introspected",
        database,
        tables = schema.tables.len(),
        views = schema.views.len(),
        triggers = schema.triggers.len()
    );
    Ok(schema)
}
