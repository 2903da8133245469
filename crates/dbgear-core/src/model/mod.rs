//! Schema model: schemas, tables and everything a table owns.

pub mod column;
pub mod column_type;
pub mod index;
pub mod note;
pub mod procedure;
pub mod relation;
pub mod schema;
pub mod table;
pub mod trigger;
pub mod view;

pub use column::Column;
pub use column_type::{ColumnType, ColumnTypeItem};
pub use index::{Index, IndexType};
pub use note::Note;
pub use procedure::{ParameterMode, Procedure, ProcedureParameter, SecurityType};
pub use relation::{BindColumn, Cardinality, EntityInfo, FkAction, Relation};
pub use schema::{Schema, SchemaManager};
pub use table::{MySqlTableOptions, Table};
pub use trigger::{Trigger, TriggerEvent, TriggerTiming};
pub use view::View;

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn is_true(value: &bool) -> bool {
    *value
}
