use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::manager::Named;
use crate::model::SchemaManager;

/// Validate internal consistency of every schema.
///
/// This checks:
/// - primary key ordinals, index columns and relation source columns (per table)
/// - relation target columns, when the target table is known
/// - trigger tables exist in their schema
///
/// Relation targets that do not resolve are tolerated here; see
/// [`validate_relation_targets`].
pub fn validate_schemas(schemas: &SchemaManager) -> Result<()> {
    let mut catalog: BTreeMap<(&str, &str), BTreeSet<&str>> = BTreeMap::new();

    for schema in schemas.iter() {
        for table in &schema.tables {
            table.validate(&schema.name)?;
            catalog.insert(
                (schema.name.as_str(), table.table_name.as_str()),
                table.columns.names().collect(),
            );
        }
    }

    for schema in schemas.iter() {
        for table in &schema.tables {
            for relation in &table.relations {
                let key = (
                    relation.target.schema_name.as_str(),
                    relation.target.table_name.as_str(),
                );
                let Some(target_columns) = catalog.get(&key) else {
                    continue;
                };
                for bind in &relation.bind_columns {
                    if !target_columns.contains(bind.target_column.as_str()) {
                        return Err(Error::Validation(format!(
                            "relation target column not found: {}.{}",
                            relation.target, bind.target_column
                        )));
                    }
                }
            }
        }

        for trigger in &schema.triggers {
            if !schema.tables.contains(&trigger.table_name) {
                return Err(Error::Validation(format!(
                    "trigger {} refers to unknown table {}.{}",
                    trigger.key(),
                    schema.name,
                    trigger.table_name
                )));
            }
        }
    }

    Ok(())
}

/// Require every relation declared in `schema_names` to point at an existing table.
///
/// Run before any DDL is issued for those schemas.
pub fn validate_relation_targets<'a>(
    schemas: &SchemaManager,
    schema_names: impl IntoIterator<Item = &'a str>,
) -> Result<()> {
    for schema_name in schema_names {
        let schema = schemas.require(schema_name)?;
        for table in &schema.tables {
            for relation in &table.relations {
                if schemas.find_table(&relation.target).is_none() {
                    return Err(Error::Validation(format!(
                        "relation {} on {}.{} targets unknown table {}",
                        relation.key(),
                        schema.name,
                        table.table_name,
                        relation.target
                    )));
                }
            }
        }
    }
    Ok(())
}
