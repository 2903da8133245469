use serde_json::Value;

use dbgear_core::Result;

use crate::session::{Record, Session, params};

const DATABASE_EXISTS: &str = "SELECT SCHEMA_NAME AS name
FROM information_schema.schemata
WHERE schema_name = :database";

const TABLE_EXISTS: &str = "SELECT TABLE_NAME AS name
FROM information_schema.tables
WHERE table_schema = :database AND table_name = :table_name";

const LIST_COLUMN_NAMES: &str = "SELECT COLUMN_NAME AS name
FROM information_schema.columns
WHERE table_schema = :database AND table_name = :table_name
ORDER BY ORDINAL_POSITION";

const LIST_TABLES: &str = "SELECT
  TABLE_NAME AS name,
  ENGINE AS engine,
  TABLE_COLLATION AS collation,
  ROW_FORMAT AS row_format,
  TABLE_COMMENT AS comment
FROM information_schema.tables
WHERE table_schema = :database AND table_type = 'BASE TABLE'
ORDER BY TABLE_NAME";

const LIST_COLUMNS: &str = "SELECT
  COLUMN_NAME AS name,
  COLUMN_TYPE AS column_type,
  IS_NULLABLE AS is_nullable,
  COLUMN_DEFAULT AS default_value,
  EXTRA AS extra,
  GENERATION_EXPRESSION AS expression,
  CHARACTER_SET_NAME AS charset,
  COLLATION_NAME AS collation,
  COLUMN_COMMENT AS comment
FROM information_schema.columns
WHERE table_schema = :database AND table_name = :table_name
ORDER BY ORDINAL_POSITION";

const LIST_INDEXES: &str = "SELECT
  INDEX_NAME AS name,
  NON_UNIQUE AS non_unique,
  SEQ_IN_INDEX AS seq,
  COLUMN_NAME AS column_name,
  INDEX_TYPE AS index_type
FROM information_schema.statistics
WHERE table_schema = :database AND table_name = :table_name
ORDER BY INDEX_NAME, SEQ_IN_INDEX";

const LIST_FOREIGN_KEYS: &str = "SELECT
  k.CONSTRAINT_NAME AS name,
  k.COLUMN_NAME AS column_name,
  k.REFERENCED_TABLE_SCHEMA AS target_schema,
  k.REFERENCED_TABLE_NAME AS target_table,
  k.REFERENCED_COLUMN_NAME AS target_column,
  r.UPDATE_RULE AS on_update,
  r.DELETE_RULE AS on_delete
FROM information_schema.key_column_usage k
JOIN information_schema.referential_constraints r
  ON r.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME
WHERE k.TABLE_SCHEMA = :database
  AND k.TABLE_NAME = :table_name
  AND k.REFERENCED_TABLE_NAME IS NOT NULL
ORDER BY k.CONSTRAINT_NAME, k.ORDINAL_POSITION";

const LIST_VIEWS: &str = "SELECT TABLE_NAME AS name, VIEW_DEFINITION AS definition
FROM information_schema.views
WHERE table_schema = :database
ORDER BY TABLE_NAME";

const LIST_TRIGGERS: &str = "SELECT
  TRIGGER_NAME AS name,
  EVENT_OBJECT_TABLE AS table_name,
  ACTION_TIMING AS timing,
  EVENT_MANIPULATION AS event,
  ACTION_STATEMENT AS body
FROM information_schema.triggers
WHERE trigger_schema = :database
ORDER BY TRIGGER_NAME";

pub async fn database_exists(session: &mut dyn Session, database: &str) -> Result<bool> {
    let found = session
        .select_one(DATABASE_EXISTS, &params([("database", database)]))
        .await?;
    Ok(found.is_some())
}

pub async fn table_exists(session: &mut dyn Session, database: &str, table: &str) -> Result<bool> {
    let found = session
        .select_one(
            TABLE_EXISTS,
            &params([("database", database), ("table_name", table)]),
        )
        .await?;
    Ok(found.is_some())
}

pub async fn list_column_names(
    session: &mut dyn Session,
    database: &str,
    table: &str,
) -> Result<Vec<String>> {
    let rows = session
        .select_all(
            LIST_COLUMN_NAMES,
            &params([("database", database), ("table_name", table)]),
        )
        .await?;
    Ok(rows.iter().filter_map(|row| text(row, "name")).collect())
}

pub struct RawTable {
    pub name: String,
    pub engine: Option<String>,
    pub collation: Option<String>,
    pub row_format: Option<String>,
    pub comment: Option<String>,
}

pub async fn list_tables(session: &mut dyn Session, database: &str) -> Result<Vec<RawTable>> {
    let rows = session
        .select_all(LIST_TABLES, &params([("database", database)]))
        .await?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            Some(RawTable {
                name: text(row, "name")?,
                engine: text(row, "engine"),
                collation: text(row, "collation"),
                row_format: text(row, "row_format"),
                comment: text(row, "comment"),
            })
        })
        .collect())
}

pub struct RawColumn {
    pub name: String,
    pub column_type: String,
    pub is_nullable: bool,
    pub default_value: Option<String>,
    pub extra: String,
    pub expression: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub comment: Option<String>,
}

pub async fn list_columns(
    session: &mut dyn Session,
    database: &str,
    table: &str,
) -> Result<Vec<RawColumn>> {
    let rows = session
        .select_all(
            LIST_COLUMNS,
            &params([("database", database), ("table_name", table)]),
        )
        .await?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            Some(RawColumn {
                name: text(row, "name")?,
                column_type: text(row, "column_type")?,
                is_nullable: text(row, "is_nullable").is_some_and(|flag| flag == "YES"),
                default_value: text(row, "default_value"),
                extra: text(row, "extra").unwrap_or_default(),
                expression: text(row, "expression"),
                charset: text(row, "charset"),
                collation: text(row, "collation"),
                comment: text(row, "comment"),
            })
        })
        .collect())
}

pub struct RawIndexColumn {
    pub name: String,
    pub unique: bool,
    pub seq: i64,
    pub column_name: String,
    pub index_type: String,
}

pub async fn list_indexes(
    session: &mut dyn Session,
    database: &str,
    table: &str,
) -> Result<Vec<RawIndexColumn>> {
    let rows = session
        .select_all(
            LIST_INDEXES,
            &params([("database", database), ("table_name", table)]),
        )
        .await?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            Some(RawIndexColumn {
                name: text(row, "name")?,
                unique: number(row, "non_unique") == Some(0),
                seq: number(row, "seq").unwrap_or_default(),
                column_name: text(row, "column_name")?,
                index_type: text(row, "index_type").unwrap_or_default(),
            })
        })
        .collect())
}

pub struct RawForeignKeyColumn {
    pub name: String,
    pub column_name: String,
    pub target_schema: String,
    pub target_table: String,
    pub target_column: String,
    pub on_update: String,
    pub on_delete: String,
}

pub async fn list_foreign_keys(
    session: &mut dyn Session,
    database: &str,
    table: &str,
) -> Result<Vec<RawForeignKeyColumn>> {
    let rows = session
        .select_all(
            LIST_FOREIGN_KEYS,
            &params([("database", database), ("table_name", table)]),
        )
        .await?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            Some(RawForeignKeyColumn {
                name: text(row, "name")?,
                column_name: text(row, "column_name")?,
                target_schema: text(row, "target_schema")?,
                target_table: text(row, "target_table")?,
                target_column: text(row, "target_column")?,
                on_update: text(row, "on_update").unwrap_or_default(),
                on_delete: text(row, "on_delete").unwrap_or_default(),
            })
        })
        .collect())
}

pub struct RawView {
    pub name: String,
    pub definition: String,
}

pub async fn list_views(session: &mut dyn Session, database: &str) -> Result<Vec<RawView>> {
    let rows = session
        .select_all(LIST_VIEWS, &params([("database", database)]))
        .await?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            Some(RawView {
                name: text(row, "name")?,
                definition: text(row, "definition").unwrap_or_default(),
            })
        })
        .collect())
}

pub struct RawTrigger {
    pub name: String,
    pub table_name: String,
    pub timing: String,
    pub event: String,
    pub body: String,
}

pub async fn list_triggers(session: &mut dyn Session, database: &str) -> Result<Vec<RawTrigger>> {
    let rows = session
        .select_all(LIST_TRIGGERS, &params([("database", database)]))
        .await?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            Some(RawTrigger {
                name: text(row, "name")?,
                table_name: text(row, "table_name")?,
                timing: text(row, "timing")?,
                event: text(row, "event")?,
                body: text(row, "body").unwrap_or_default(),
            })
        })
        .collect())
}

fn text(row: &Record, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn number(row: &Record, key: &str) -> Option<i64> {
    match row.get(key)? {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => Record::new(),
        }
    }

    #[test]
    fn reads_text_and_numbers_leniently() {
        let row = record(json!({
            "name": "users",
            "seq": "2",
            "non_unique": 0,
            "comment": null,
        }));
        assert_eq!(text(&row, "name").as_deref(), Some("users"));
        assert_eq!(text(&row, "comment"), None);
        assert_eq!(text(&row, "missing"), None);
        assert_eq!(number(&row, "seq"), Some(2));
        assert_eq!(number(&row, "non_unique"), Some(0));
    }
}
