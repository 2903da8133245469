//! Apply engine: reconcile a live MySQL server with a project's schema and
//! seed data.
//!
//! One [`Session`] is used for the whole run. Each deployed mapping
//! instance becomes a database of the same name. Tables are rebuilt one at a
//! time; seed rows go in per table inside `BEGIN ... COMMIT`, in the order
//! produced by [`resolve_insertion_order`].

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use dbgear_core::model::{Schema, Table};
use dbgear_core::{
    DataModel, Environ, Error, Mapping, Project, ProjectOptions, Result, Row, SyncMode, Warning,
    resolve_insertion_order, validate_relation_targets,
};

use crate::mysql::{InsertValue, MySqlTemplates, ObjectKind, backup_table_name, queries};
use crate::session::{Params, Session};

const DISABLE_FK_CHECKS: &str = "SET FOREIGN_KEY_CHECKS = 0";
const ENABLE_FK_CHECKS: &str = "SET FOREIGN_KEY_CHECKS = 1";

/// How far an apply reaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyMode {
    /// Drop and recreate every database.
    Drop,
    /// Keep databases, rebuild every table with backups.
    Delta,
    /// Like [`ApplyMode::Delta`] for the single object with this name.
    Target(String),
}

impl ApplyMode {
    /// Mode selected by the CLI flags `--all drop|delta` and `--target T`.
    pub fn from_flags(all: Option<&str>, target: Option<&str>) -> Result<Self> {
        match (all, target) {
            (Some("drop"), _) => Ok(ApplyMode::Drop),
            (Some("delta"), _) => Ok(ApplyMode::Delta),
            (Some(other), _) => Err(Error::InvalidArgument(format!(
                "--all must be drop or delta, got {other}"
            ))),
            (None, Some(target)) => Ok(ApplyMode::Target(target.to_string())),
            (None, None) => Ok(ApplyMode::Delta),
        }
    }

    fn includes(&self, name: &str) -> bool {
        match self {
            ApplyMode::Target(target) => target == name,
            ApplyMode::Drop | ApplyMode::Delta => true,
        }
    }
}

impl fmt::Display for ApplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyMode::Drop => f.write_str("drop"),
            ApplyMode::Delta => f.write_str("delta"),
            ApplyMode::Target(target) => write!(f, "target:{target}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableReport {
    pub table: String,
    pub created: bool,
    /// Backup table taken before the table was dropped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
    pub rows_inserted: u64,
    /// Rows copied back from the backup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restored: Option<u64>,
    /// Mapping the seed rows were read from, when inherited or local.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_mapping: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstanceReport {
    pub database: String,
    pub mapping: String,
    pub database_created: bool,
    pub tables: Vec<TableReport>,
    pub views: Vec<String>,
    pub procedures: Vec<String>,
    pub triggers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyReport {
    pub environ: String,
    pub deployment: String,
    pub mode: String,
    pub instances: Vec<InstanceReport>,
    pub warnings: Vec<Warning>,
}

impl ApplyReport {
    pub fn rows_inserted(&self) -> u64 {
        self.instances
            .iter()
            .flat_map(|instance| &instance.tables)
            .map(|table| table.rows_inserted)
            .sum()
    }
}

/// Mappings an apply covers: `only` when given, else those flagged
/// `deployment: true`, else all of them.
pub fn select_mappings(environ: &Environ, only: Option<&str>) -> Result<Vec<Mapping>> {
    let manager = environ.mappings();
    if let Some(name) = only {
        return Ok(vec![manager.get(name)?]);
    }
    let all = manager.list()?;
    let flagged: Vec<Mapping> = all.iter().filter(|mapping| mapping.deployment).cloned().collect();
    Ok(if flagged.is_empty() { all } else { flagged })
}

pub struct ApplyEngine<'a> {
    project: &'a Project,
    environ: &'a Environ,
    options: ProjectOptions,
    templates: MySqlTemplates,
    timestamp: String,
}

impl<'a> ApplyEngine<'a> {
    pub fn new(project: &'a Project, environ: &'a Environ) -> Result<Self> {
        Ok(Self {
            project,
            environ,
            options: environ.effective_options(&project.options),
            templates: MySqlTemplates::new()?,
            timestamp: chrono::Local::now().format("%Y%m%d%H%M%S").to_string(),
        })
    }

    /// Override the `%Y%m%d%H%M%S` suffix used for backup tables.
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub async fn apply(
        &self,
        session: &mut dyn Session,
        deployment: &str,
        mappings: &[Mapping],
        mode: &ApplyMode,
    ) -> Result<ApplyReport> {
        let instances: Vec<&str> = mappings
            .iter()
            .flat_map(|mapping| mapping.instances.iter().map(String::as_str))
            .collect();
        validate_relation_targets(&self.project.schemas, instances.iter().copied())?;
        if let ApplyMode::Target(target) = mode {
            self.check_target(&instances, target)?;
        }

        tracing::info!(
            event = "apply_started",
            environ = %self.environ.name,
            deployment,
            mode = %mode,
            mappings = mappings.len(),
            foreign_keys = self.options.create_foreign_key_constraints
        );

        let mut report = ApplyReport {
            environ: self.environ.name.clone(),
            deployment: deployment.to_string(),
            mode: mode.to_string(),
            instances: Vec::new(),
            warnings: Vec::new(),
        };

        run(session, DISABLE_FK_CHECKS).await?;
        for mapping in mappings {
            for instance in &mapping.instances {
                let instance_report = self
                    .apply_instance(session, mapping, instance, mode, &mut report.warnings)
                    .await?;
                report.instances.push(instance_report);
            }
        }
        run(session, ENABLE_FK_CHECKS).await?;

        tracing::info!(
            event = "apply_finished",
            environ = %self.environ.name,
            deployment,
            instances = report.instances.len(),
            rows_inserted = report.rows_inserted(),
            warnings = report.warnings.len()
        );
        Ok(report)
    }

    fn check_target(&self, instances: &[&str], target: &str) -> Result<()> {
        let found = instances.iter().any(|instance| {
            self.project.schemas.get(instance).is_some_and(|schema| {
                schema.tables.contains(target)
                    || schema.views.contains(target)
                    || schema.procedures.contains(target)
                    || schema.triggers.contains(target)
            })
        });
        if found {
            Ok(())
        } else {
            Err(Error::not_found("object", target))
        }
    }

    async fn apply_instance(
        &self,
        session: &mut dyn Session,
        mapping: &Mapping,
        instance: &str,
        mode: &ApplyMode,
        warnings: &mut Vec<Warning>,
    ) -> Result<InstanceReport> {
        let schema = self.project.schemas.require(instance)?;
        let database = instance;
        let database_created = self.prepare_database(session, database, mode).await?;
        run(session, &self.templates.use_database(database)?).await?;

        let mut report = InstanceReport {
            database: database.to_string(),
            mapping: mapping.name.clone(),
            database_created,
            ..InstanceReport::default()
        };

        let mut tables: IndexMap<String, TableReport> = IndexMap::new();
        for table in schema.tables.iter().filter(|table| mode.includes(&table.table_name)) {
            let table_report = self
                .rebuild_table(session, database, table, database_created)
                .await?;
            tables.insert(table.table_name.clone(), table_report);
        }

        let models: Vec<DataModel> = mapping
            .effective_datamodels()?
            .into_iter()
            .filter(|model| model.schema_name == instance)
            .collect();
        let resolved = resolve_insertion_order(&models, &self.project.schemas)?;
        warnings.extend(resolved.warnings.iter().cloned());

        for model in &resolved.models {
            let Some(table_report) = tables.get_mut(&model.table_name) else {
                if !schema.tables.contains(&model.table_name) {
                    warnings.push(Warning::new(
                        "unknown_table",
                        model.key(),
                        "data model has no table in the schema; skipped",
                    ));
                }
                continue;
            };
            let table = schema.tables.require(&model.table_name)?;
            self.load_table(session, database, mapping, model, table, table_report, warnings)
                .await?;
        }
        report.tables = tables.into_values().collect();

        self.rebuild_objects(session, database, schema, mode, &mut report)
            .await?;
        Ok(report)
    }

    /// Returns whether the database was (re)created.
    async fn prepare_database(
        &self,
        session: &mut dyn Session,
        database: &str,
        mode: &ApplyMode,
    ) -> Result<bool> {
        let exists = queries::database_exists(session, database).await?;
        if *mode == ApplyMode::Drop {
            if exists {
                run(session, &self.templates.drop_database(database)?).await?;
                tracing::info!(event = "database_dropped", database);
            }
        } else if exists {
            return Ok(false);
        }
        run(session, &self.templates.create_database(database)?).await?;
        tracing::info!(event = "database_created", database);
        Ok(true)
    }

    async fn rebuild_table(
        &self,
        session: &mut dyn Session,
        database: &str,
        table: &Table,
        fresh_database: bool,
    ) -> Result<TableReport> {
        let name = table.table_name.as_str();
        let mut report = TableReport {
            table: name.to_string(),
            ..TableReport::default()
        };

        if !fresh_database && queries::table_exists(session, database, name).await? {
            let backup = backup_table_name(name, &self.timestamp);
            run(session, &self.templates.backup_table(database, name, &backup)?).await?;
            run(
                session,
                &self.templates.drop_object(ObjectKind::Table, database, name, false)?,
            )
            .await?;
            tracing::info!(event = "table_backed_up", database, table = name, backup = %backup);
            report.backup = Some(backup);
        }

        let create = self.templates.create_table(
            database,
            table,
            self.options.create_foreign_key_constraints,
        )?;
        run(session, &create).await?;
        for index in self.templates.create_indexes(database, table)? {
            run(session, &index).await?;
        }
        report.created = true;
        tracing::info!(event = "table_created", database, table = name);
        Ok(report)
    }

    /// Insert seed rows and, for `update-diff` models, restore the backup.
    #[allow(clippy::too_many_arguments)]
    async fn load_table(
        &self,
        session: &mut dyn Session,
        database: &str,
        mapping: &Mapping,
        model: &DataModel,
        table: &Table,
        report: &mut TableReport,
        warnings: &mut Vec<Warning>,
    ) -> Result<()> {
        let inherited = mapping.find_rows(&model.schema_name, &model.table_name)?;
        let restore_from = match (&model.sync_mode, &report.backup) {
            (SyncMode::UpdateDiff, Some(backup)) => Some(backup.clone()),
            _ => None,
        };
        if inherited.is_none() && restore_from.is_none() {
            return Ok(());
        }

        session.begin().await?;
        let filled = async {
            if let Some(inherited) = &inherited {
                report.source_mapping = Some(inherited.mapping.clone());
                report.rows_inserted =
                    self.insert_rows(session, database, table, &inherited.rows, warnings)
                        .await?;
            }
            if let Some(backup) = &restore_from {
                report.restored = self.restore(session, database, table, backup).await?;
            }
            Ok::<(), Error>(())
        }
        .await;

        match filled {
            Ok(()) => {
                session.commit().await?;
                tracing::info!(
                    event = "table_loaded",
                    database,
                    table = %table.table_name,
                    rows = report.rows_inserted,
                    restored = report.restored.unwrap_or_default()
                );
                Ok(())
            }
            Err(err) => {
                if let Err(rollback) = session.rollback().await {
                    tracing::warn!(event = "rollback_failed", table = %table.table_name, error = %rollback);
                }
                Err(err)
            }
        }
    }

    async fn insert_rows(
        &self,
        session: &mut dyn Session,
        database: &str,
        table: &Table,
        rows: &[Row],
        warnings: &mut Vec<Warning>,
    ) -> Result<u64> {
        let mut ignored: BTreeSet<String> = BTreeSet::new();
        let mut inserted = 0;
        for row in rows {
            let (sql, params) = self.insert_statement(database, table, row, &mut ignored)?;
            inserted += session.execute(&sql, &params).await?;
        }
        if !ignored.is_empty() {
            let keys: Vec<String> = ignored.into_iter().collect();
            tracing::warn!(
                event = "row_keys_ignored",
                database,
                table = %table.table_name,
                keys = %keys.join(",")
            );
            warnings.push(Warning::new(
                "unknown_column",
                format!("{database}@{}", table.table_name),
                format!("row keys without an insertable column: {}", keys.join(", ")),
            ));
        }
        Ok(inserted)
    }

    /// One INSERT for `row`. Keys that are absent from the row are left to the
    /// column default; keys that name no insertable column land in `ignored`.
    fn insert_statement(
        &self,
        database: &str,
        table: &Table,
        row: &Row,
        ignored: &mut BTreeSet<String>,
    ) -> Result<(String, Params)> {
        let mut columns = Vec::new();
        let mut values = Vec::new();
        let mut params = Params::new();

        for column in table.insertable_columns() {
            let Some(value) = row.get(&column.column_name) else {
                continue;
            };
            match value {
                Value::String(text) if text.contains('(') => {
                    values.push(InsertValue::Sql(text.clone()));
                }
                other => {
                    let name = format!("v{}", columns.len());
                    params.insert(name.clone(), other.clone());
                    values.push(InsertValue::Param(name));
                }
            }
            columns.push(column.column_name.as_str());
        }

        for key in row.keys() {
            let known = table
                .columns
                .get(key)
                .is_some_and(|column| column.is_insertable());
            if !known {
                ignored.insert(key.clone());
            }
        }

        let sql = self
            .templates
            .insert(database, &table.table_name, &columns, &values)?;
        Ok((sql, params))
    }

    async fn restore(
        &self,
        session: &mut dyn Session,
        database: &str,
        table: &Table,
        backup: &str,
    ) -> Result<Option<u64>> {
        if !queries::table_exists(session, database, backup).await? {
            return Ok(None);
        }
        let backup_columns = queries::list_column_names(session, database, backup).await?;
        let columns: Vec<&str> = table
            .insertable_columns()
            .map(|column| column.column_name.as_str())
            .filter(|name| backup_columns.iter().any(|backup| backup == name))
            .collect();
        if columns.is_empty() {
            return Ok(None);
        }
        let sql = self
            .templates
            .restore_table(database, &table.table_name, backup, &columns)?;
        let restored = session.execute(&sql, &Params::new()).await?;
        tracing::info!(event = "table_restored", database, table = %table.table_name, rows = restored);
        Ok(Some(restored))
    }

    async fn rebuild_objects(
        &self,
        session: &mut dyn Session,
        database: &str,
        schema: &Schema,
        mode: &ApplyMode,
        report: &mut InstanceReport,
    ) -> Result<()> {
        for view in schema.views.iter().filter(|view| mode.includes(&view.view_name)) {
            let drop = self
                .templates
                .drop_object(ObjectKind::View, database, &view.view_name, true)?;
            run(session, &drop).await?;
            run(session, &self.templates.create_view(database, view)?).await?;
            report.views.push(view.view_name.clone());
        }

        for procedure in schema
            .procedures
            .iter()
            .filter(|procedure| mode.includes(&procedure.procedure_name))
        {
            let kind = if procedure.is_function() {
                ObjectKind::Function
            } else {
                ObjectKind::Procedure
            };
            let drop = self
                .templates
                .drop_object(kind, database, &procedure.procedure_name, true)?;
            run(session, &drop).await?;
            run(session, &self.templates.create_routine(database, procedure)?).await?;
            report.procedures.push(procedure.procedure_name.clone());
        }

        for trigger in schema
            .triggers
            .iter()
            .filter(|trigger| mode.includes(&trigger.trigger_name))
        {
            let create = self.templates.create_trigger(database, trigger)?;
            let drop = self
                .templates
                .drop_object(ObjectKind::Trigger, database, &trigger.trigger_name, true)?;
            run(session, &drop).await?;
            run(session, &create).await?;
            report.triggers.push(trigger.trigger_name.clone());
        }
        Ok(())
    }
}

async fn run(session: &mut dyn Session, sql: &str) -> Result<u64> {
    session.execute(sql, &Params::new()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_select_the_mode() {
        assert_eq!(ApplyMode::from_flags(Some("drop"), None).expect("drop"), ApplyMode::Drop);
        assert_eq!(
            ApplyMode::from_flags(Some("delta"), Some("users")).expect("delta"),
            ApplyMode::Delta
        );
        assert_eq!(
            ApplyMode::from_flags(None, Some("users")).expect("target"),
            ApplyMode::Target("users".to_string())
        );
        assert_eq!(ApplyMode::from_flags(None, None).expect("default"), ApplyMode::Delta);
        assert_eq!(
            ApplyMode::from_flags(Some("all"), None).expect_err("bad").kind(),
            dbgear_core::ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn target_mode_only_includes_its_object() {
        let mode = ApplyMode::Target("users".to_string());
        assert!(mode.includes("users"));
        assert!(!mode.includes("orders"));
        assert!(ApplyMode::Delta.includes("orders"));
        assert_eq!(mode.to_string(), "target:users");
    }
}
