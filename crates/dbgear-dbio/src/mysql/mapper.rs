use indexmap::IndexMap;

use dbgear_core::model::{
    BindColumn, Column, ColumnType, EntityInfo, FkAction, Index, IndexType, MySqlTableOptions,
    Note, Relation, Table, Trigger, TriggerEvent, TriggerTiming, View,
};
use dbgear_core::{Error, Result};

use super::queries::{RawColumn, RawForeignKeyColumn, RawIndexColumn, RawTable, RawTrigger, RawView};

const PRIMARY: &str = "PRIMARY";
const COMMENT_TITLE: &str = "Comment";

pub fn map_table(
    raw: RawTable,
    columns: Vec<RawColumn>,
    indexes: Vec<RawIndexColumn>,
    foreign_keys: Vec<RawForeignKeyColumn>,
) -> Result<Table> {
    let charset = raw.collation.as_deref().and_then(charset_of);
    let mut table = Table::new(raw.name);

    for raw_column in columns {
        let column = map_column(raw_column, raw.collation.as_deref(), charset.as_deref())?;
        table.columns.add(column)?;
    }

    let (primary_key, indexes) = map_indexes(indexes);
    for (position, column_name) in primary_key.iter().enumerate() {
        if let Some(column) = table.columns.get_mut(column_name) {
            column.primary_key = Some(position as u32 + 1);
        }
    }
    for index in indexes {
        table.indexes.add(index)?;
    }
    for relation in map_foreign_keys(foreign_keys) {
        table.relations.add(relation)?;
    }

    if let Some(comment) = non_empty(raw.comment) {
        table.notes.add(Note::new(COMMENT_TITLE, comment))?;
    }
    table.mysql_options = Some(MySqlTableOptions {
        engine: raw.engine,
        charset,
        collation: raw.collation,
        auto_increment: None,
        row_format: raw.row_format,
    });
    Ok(table)
}

fn map_column(
    raw: RawColumn,
    table_collation: Option<&str>,
    table_charset: Option<&str>,
) -> Result<Column> {
    let extra = raw.extra.to_ascii_uppercase();
    let mut column = Column::new(raw.name, ColumnType::parse(&raw.column_type)?);
    column.nullable = raw.is_nullable;
    column.auto_increment = extra.contains("AUTO_INCREMENT");
    if extra.contains("GENERATED") && !extra.contains("DEFAULT_GENERATED") {
        column.expression = non_empty(raw.expression);
        column.stored = extra.contains("STORED");
    } else {
        column.default_value = raw
            .default_value
            .map(|value| default_literal(&value, &column.column_type, &extra));
    }
    column.charset = raw.charset.filter(|charset| Some(charset.as_str()) != table_charset);
    column.collation = raw
        .collation
        .filter(|collation| Some(collation.as_str()) != table_collation);
    if let Some(comment) = non_empty(raw.comment) {
        column.notes.add(Note::new(COMMENT_TITLE, comment))?;
    }
    Ok(column)
}

/// `COLUMN_DEFAULT` holds the bare value; string defaults need quoting to be
/// written back into DDL.
fn default_literal(value: &str, column_type: &ColumnType, extra: &str) -> String {
    let numeric = matches!(
        column_type.base_type.as_str(),
        "TINYINT"
            | "SMALLINT"
            | "MEDIUMINT"
            | "INT"
            | "INTEGER"
            | "BIGINT"
            | "DECIMAL"
            | "NUMERIC"
            | "DEC"
            | "FLOAT"
            | "DOUBLE"
            | "REAL"
            | "BIT"
    );
    let expression = extra.contains("DEFAULT_GENERATED")
        || value.eq_ignore_ascii_case("CURRENT_TIMESTAMP")
        || value.to_ascii_uppercase().starts_with("CURRENT_TIMESTAMP(");
    if expression || (numeric && value.parse::<f64>().is_ok()) || value.eq_ignore_ascii_case("NULL") {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }
}

/// Split `information_schema.statistics` rows into the primary-key column
/// order and the secondary indexes.
fn map_indexes(raw: Vec<RawIndexColumn>) -> (Vec<String>, Vec<Index>) {
    let mut primary: Vec<(i64, String)> = Vec::new();
    let mut grouped: IndexMap<String, Index> = IndexMap::new();

    for row in raw {
        if row.name == PRIMARY {
            primary.push((row.seq, row.column_name));
            continue;
        }
        let index = grouped
            .entry(row.name.clone())
            .or_insert_with(|| Index::new(row.name.clone(), Vec::new()));
        index.columns.push(row.column_name);
        index.unique = row.unique;
        index.index_type = index_type(&row.index_type);
    }

    primary.sort_by_key(|(seq, _)| *seq);
    (
        primary.into_iter().map(|(_, column)| column).collect(),
        grouped.into_values().collect(),
    )
}

fn index_type(text: &str) -> IndexType {
    match text.to_ascii_uppercase().as_str() {
        "HASH" => IndexType::Hash,
        "FULLTEXT" => IndexType::Fulltext,
        "SPATIAL" => IndexType::Spatial,
        _ => IndexType::Btree,
    }
}

fn map_foreign_keys(raw: Vec<RawForeignKeyColumn>) -> Vec<Relation> {
    let mut grouped: IndexMap<String, Relation> = IndexMap::new();
    for row in raw {
        let relation = grouped.entry(row.name.clone()).or_insert_with(|| {
            let mut relation = Relation::new(
                EntityInfo::new(row.target_schema.clone(), row.target_table.clone()),
                Vec::new(),
            );
            relation.constraint_name = Some(row.name.clone());
            relation.on_delete = fk_action(&row.on_delete);
            relation.on_update = fk_action(&row.on_update);
            relation
        });
        relation.bind_columns.push(BindColumn {
            source_column: row.column_name,
            target_column: row.target_column,
        });
    }
    grouped.into_values().collect()
}

fn fk_action(rule: &str) -> FkAction {
    match rule.to_ascii_uppercase().as_str() {
        "CASCADE" => FkAction::Cascade,
        "SET NULL" => FkAction::SetNull,
        "SET DEFAULT" => FkAction::SetDefault,
        "NO ACTION" => FkAction::NoAction,
        _ => FkAction::Restrict,
    }
}

pub fn map_view(raw: RawView) -> View {
    View::new(raw.name, raw.definition)
}

pub fn map_trigger(raw: RawTrigger) -> Result<Trigger> {
    let timing = match raw.timing.to_ascii_uppercase().as_str() {
        "BEFORE" => TriggerTiming::Before,
        "AFTER" => TriggerTiming::After,
        other => return Err(Error::Validation(format!("unknown trigger timing {other}"))),
    };
    let event = match raw.event.to_ascii_uppercase().as_str() {
        "INSERT" => TriggerEvent::Insert,
        "UPDATE" => TriggerEvent::Update,
        "DELETE" => TriggerEvent::Delete,
        other => return Err(Error::Validation(format!("unknown trigger event {other}"))),
    };
    Ok(Trigger {
        trigger_name: raw.name,
        display_name: String::new(),
        table_name: raw.table_name,
        timing,
        event,
        condition: None,
        body: raw.body,
        notes: Default::default(),
    })
}

/// `utf8mb4_unicode_ci` -> `utf8mb4`.
fn charset_of(collation: &str) -> Option<String> {
    collation
        .split_once('_')
        .map(|(charset, _)| charset.to_string())
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|text| !text.trim().is_empty())
}
