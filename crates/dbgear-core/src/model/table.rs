use std::borrow::Cow;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::manager::{Manager, Named, as_list};
use crate::model::column::Column;
use crate::model::index::Index;
use crate::model::note::Note;
use crate::model::relation::Relation;

/// MySQL-specific table options rendered in the closing clause of `CREATE TABLE`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MySqlTableOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    #[serde(default, alias = "auto_increment", skip_serializing_if = "Option::is_none")]
    pub auto_increment: Option<u64>,
    #[serde(default, alias = "row_format", skip_serializing_if = "Option::is_none")]
    pub row_format: Option<String>,
}

/// A table definition.
///
/// `add_column`, `add_index` and `add_relation` keep the column-level
/// invariants on every call. Edits made directly through the public managers
/// are checked when the owning [`SchemaManager`](crate::model::SchemaManager)
/// validates, which `load` and `save` always do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    #[serde(default, alias = "table_name", skip_serializing)]
    pub table_name: String,
    #[serde(default, alias = "display_name", skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(default, with = "as_list", skip_serializing_if = "Manager::is_empty")]
    pub columns: Manager<Column>,
    #[serde(default, with = "as_list", skip_serializing_if = "Manager::is_empty")]
    pub indexes: Manager<Index>,
    #[serde(default, with = "as_list", skip_serializing_if = "Manager::is_empty")]
    pub relations: Manager<Relation>,
    #[serde(default, with = "as_list", skip_serializing_if = "Manager::is_empty")]
    pub notes: Manager<Note>,
    #[serde(default, alias = "mysql_options", skip_serializing_if = "Option::is_none")]
    pub mysql_options: Option<MySqlTableOptions>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table_name: name.into(),
            display_name: String::new(),
            columns: Manager::new(),
            indexes: Manager::new(),
            relations: Manager::new(),
            notes: Manager::new(),
            mysql_options: None,
        }
    }

    /// Primary-key columns ordered by their ordinal.
    pub fn primary_key(&self) -> Vec<&Column> {
        let mut keys: Vec<&Column> = self
            .columns
            .iter()
            .filter(|column| column.primary_key.is_some())
            .collect();
        keys.sort_by_key(|column| column.primary_key);
        keys
    }

    /// Columns that may appear in an INSERT column list.
    pub fn insertable_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|column| column.is_insertable())
    }

    /// Add a column, rejecting it when its primary-key ordinal would break
    /// the `1..=k` sequence.
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        let name = column.column_name.clone();
        self.columns.add(column)?;
        self.checked(|table| table.columns.remove(&name).map(drop))
    }

    /// Add an index whose columns must already exist.
    pub fn add_index(&mut self, index: Index) -> Result<()> {
        let name = index.key().into_owned();
        self.indexes.add(index)?;
        self.checked(|table| table.indexes.remove(&name).map(drop))
    }

    /// Add a relation whose source columns must already exist.
    pub fn add_relation(&mut self, relation: Relation) -> Result<()> {
        let name = relation.key().into_owned();
        self.relations.add(relation)?;
        self.checked(|table| table.relations.remove(&name).map(drop))
    }

    fn checked(&mut self, undo: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        let qualified = self.table_name.clone();
        if let Err(err) = self.check(&qualified) {
            undo(self)?;
            return Err(err);
        }
        Ok(())
    }

    /// Check the column-level invariants of this table.
    ///
    /// Primary-key ordinals must form `1..=k`; index columns and relation
    /// source columns must exist. Relation targets are checked by the schema.
    pub fn validate(&self, schema_name: &str) -> Result<()> {
        self.check(&format!("{schema_name}.{}", self.table_name))
    }

    fn check(&self, qualified: &str) -> Result<()> {

        let mut ordinals: Vec<u32> = self
            .columns
            .iter()
            .filter_map(|column| column.primary_key)
            .collect();
        ordinals.sort_unstable();
        for (expected, ordinal) in (1u32..).zip(&ordinals) {
            if *ordinal != expected {
                return Err(Error::Validation(format!(
                    "primary key ordinals of {qualified} must be 1..={} without gaps or duplicates, found {ordinals:?}",
                    ordinals.len()
                )));
            }
        }

        let columns: BTreeSet<&str> = self.columns.names().collect();
        for index in &self.indexes {
            if index.columns.is_empty() {
                return Err(Error::Validation(format!(
                    "index {} on {qualified} has no columns",
                    index.key()
                )));
            }
            for column in index.columns.iter().chain(&index.include_columns) {
                if !columns.contains(column.as_str()) {
                    return Err(Error::Validation(format!(
                        "index column not found: {qualified}.{column}"
                    )));
                }
            }
        }

        for relation in &self.relations {
            if relation.bind_columns.is_empty() {
                return Err(Error::Validation(format!(
                    "relation {} on {qualified} binds no columns",
                    relation.key()
                )));
            }
            for bind in &relation.bind_columns {
                if !columns.contains(bind.source_column.as_str()) {
                    return Err(Error::Validation(format!(
                        "relation source column not found: {qualified}.{}",
                        bind.source_column
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Named for Table {
    const KIND: &'static str = "table";

    fn key(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.table_name)
    }

    fn assign_key(&mut self, key: &str) {
        if self.table_name.is_empty() {
            self.table_name = key.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::column_type::ColumnType;
    use crate::model::relation::{BindColumn, EntityInfo};

    fn column(name: &str, pk: Option<u32>) -> Column {
        let mut column = Column::new(name, ColumnType::parse("INT").expect("type"));
        column.primary_key = pk;
        column
    }

    fn table(columns: Vec<Column>) -> Table {
        let mut table = Table::new("orders");
        table.columns = Manager::from_items(columns).expect("columns");
        table
    }

    #[test]
    fn dense_primary_key_is_valid() {
        let table = table(vec![
            column("b", Some(2)),
            column("a", Some(1)),
            column("c", None),
        ]);
        table.validate("main").expect("valid");
        let names: Vec<&str> = table
            .primary_key()
            .iter()
            .map(|column| column.column_name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn gaps_and_duplicates_in_primary_key_are_rejected() {
        for ordinals in [vec![1, 3], vec![1, 1], vec![2]] {
            let columns = ordinals
                .iter()
                .enumerate()
                .map(|(idx, ordinal)| column(&format!("c{idx}"), Some(*ordinal)))
                .collect();
            let err = table(columns).validate("main").expect_err("invalid");
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[test]
    fn index_and_relation_columns_must_exist() {
        let mut with_index = table(vec![column("id", Some(1))]);
        with_index
            .indexes
            .add(Index::new("ix_missing", vec!["missing".to_string()]))
            .expect("add index");
        assert!(with_index.validate("main").is_err());

        let mut with_relation = table(vec![column("id", Some(1))]);
        with_relation
            .relations
            .add(Relation::new(
                EntityInfo::new("main", "users"),
                vec![BindColumn {
                    source_column: "user_id".to_string(),
                    target_column: "id".to_string(),
                }],
            ))
            .expect("add relation");
        let err = with_relation.validate("main").expect_err("missing source");
        assert!(err.to_string().contains("main.orders.user_id"));
    }

    #[test]
    fn adders_reject_broken_invariants_and_leave_the_table_unchanged() {
        let mut orders = table(vec![column("id", Some(1))]);

        let err = orders
            .add_column(column("code", Some(1)))
            .expect_err("duplicate ordinal");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!orders.columns.contains("code"));
        orders.add_column(column("code", Some(2))).expect("next ordinal");

        let err = orders
            .add_index(Index::new("ix_missing", vec!["missing".to_string()]))
            .expect_err("dangling index column");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(orders.indexes.is_empty());

        let relation = Relation::new(
            EntityInfo::new("main", "users"),
            vec![BindColumn {
                source_column: "user_id".to_string(),
                target_column: "id".to_string(),
            }],
        );
        assert!(orders.add_relation(relation).is_err());
        assert!(orders.relations.is_empty());
        orders.validate("main").expect("still valid");
    }

    #[test]
    fn generated_columns_are_not_insertable() {
        let mut total = column("total", None);
        total.expression = Some("price * qty".to_string());
        let table = table(vec![column("price", None), total, column("qty", None)]);
        let names: Vec<&str> = table
            .insertable_columns()
            .map(|column| column.column_name.as_str())
            .collect();
        assert_eq!(names, vec!["price", "qty"]);
    }
}
