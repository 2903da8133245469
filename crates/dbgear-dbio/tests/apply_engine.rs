use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use serde_json::{Value, json};

use dbgear_core::{ErrorKind, Project, Result};
use dbgear_dbio::{
    ApplyEngine, ApplyMode, DryRunSession, Params, Record, Session, select_mappings,
};

const SCHEMA: &str = r#"
schemas:
  main:
    tables:
      users:
        columns:
          - columnName: id
            columnType: BIGINT
            nullable: false
            primaryKey: 1
          - columnName: name
            columnType: VARCHAR(50)
          - columnName: name_upper
            columnType: VARCHAR(50)
            expression: UPPER(name)
          - columnName: created_at
            columnType: DATETIME
      orders:
        columns:
          - columnName: id
            columnType: BIGINT
            nullable: false
            primaryKey: 1
          - columnName: user_id
            columnType: BIGINT
          - columnName: note
            columnType: VARCHAR(200)
        relations:
          - target:
              schemaName: main
              tableName: users
            bindColumns:
              - sourceColumn: user_id
                targetColumn: id
            constraintName: fk_orders_users
    views:
      v_users:
        selectStatement: SELECT id, name FROM users
    triggers:
      audit_users:
        tableName: users
        timing: AFTER
        event: INSERT
        body: SET @last_user = NEW.id
"#;

const TIMESTAMP: &str = "20240101000000";

fn write(path: &Path, text: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, text).expect("write");
}

fn seed_project(root: &Path, environ_options: &str) {
    write(&root.join("project.yaml"), "projectName: shop\n");
    write(&root.join("schema.yaml"), SCHEMA);
    write(
        &root.join("dev/environ.yaml"),
        &format!("deployment:\n  localhost: mysql://root:pw@localhost\n{environ_options}"),
    );
    write(
        &root.join("dev/base/mapping.yaml"),
        "instances: [main]\ndeployment: true\n",
    );
    write(&root.join("dev/base/main@users.yaml"), "syncMode: update-diff\n");
    write(
        &root.join("dev/base/main@users.dat"),
        "- id: 1\n  name: alice\n  name_upper: ALICE\n  created_at: NOW()\n",
    );
    write(&root.join("dev/base/main@orders.yaml"), "dependencies: [main@users]\n");
    write(&root.join("dev/base/main@orders.dat"), "- id: 10\n  user_id: 1\n");
}

/// Answers existence queries from in-memory state and records every statement.
#[derive(Default)]
struct RecordingSession {
    statements: Vec<(String, Params)>,
    databases: BTreeSet<String>,
    tables: BTreeSet<String>,
    backup_columns: Vec<String>,
}

impl RecordingSession {
    fn with_table(mut self, database: &str, table: &str) -> Self {
        self.databases.insert(database.to_string());
        self.tables.insert(format!("{database}.{table}"));
        self
    }

    fn heads(&self) -> Vec<&str> {
        self.statements
            .iter()
            .map(|(sql, _)| sql.lines().next().unwrap_or_default())
            .collect()
    }

    fn find(&self, prefix: &str) -> &(String, Params) {
        self.statements
            .iter()
            .find(|(sql, _)| sql.starts_with(prefix))
            .unwrap_or_else(|| panic!("no statement starting with {prefix}"))
    }
}

fn object_name(rest: &str) -> String {
    rest.split_whitespace()
        .next()
        .unwrap_or_default()
        .replace('`', "")
}

fn name_row(name: &str) -> Record {
    let mut record = Record::new();
    record.insert("name".to_string(), Value::from(name));
    record
}

#[async_trait]
impl Session for RecordingSession {
    async fn execute(&mut self, sql: &str, params: &Params) -> Result<u64> {
        if let Some(rest) = sql.strip_prefix("CREATE TABLE ") {
            self.tables.insert(object_name(rest));
        } else if let Some(rest) = sql.strip_prefix("DROP TABLE ") {
            self.tables.remove(&object_name(rest));
        }
        self.statements.push((sql.to_string(), params.clone()));
        Ok(1)
    }

    async fn select_all(&mut self, sql: &str, params: &Params) -> Result<Vec<Record>> {
        let database = params
            .get("database")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let table = params
            .get("table_name")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let rows = if sql.contains("information_schema.schemata") {
            if self.databases.contains(database) {
                vec![name_row(database)]
            } else {
                Vec::new()
            }
        } else if sql.contains("information_schema.columns") {
            self.backup_columns.iter().map(|column| name_row(column)).collect()
        } else if sql.contains("information_schema.tables") {
            if self.tables.contains(&format!("{database}.{table}")) {
                vec![name_row(table)]
            } else {
                Vec::new()
            }
        } else {
            Vec::new()
        };
        Ok(rows)
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn delta_backs_up_rebuilds_and_restores_update_diff_tables() {
    let dir = tempfile::tempdir().expect("tempdir");
    seed_project(dir.path(), "");
    let project = Project::load(dir.path()).expect("project");
    let environ = project.environs().get("dev").expect("environ");
    let mappings = select_mappings(&environ, None).expect("mappings");

    let mut session = RecordingSession::default().with_table("main", "users");
    session.backup_columns = vec!["id".to_string(), "name".to_string(), "name_upper".to_string()];

    let engine = ApplyEngine::new(&project, &environ)
        .expect("engine")
        .with_timestamp(TIMESTAMP);
    let report = engine
        .apply(&mut session, "localhost", &mappings, &ApplyMode::Delta)
        .await
        .expect("apply");

    assert_eq!(
        session.heads(),
        vec![
            "SET FOREIGN_KEY_CHECKS = 0",
            "USE `main`",
            "CREATE TABLE `main`.`bak_users_20240101000000` AS",
            "DROP TABLE `main`.`users`",
            "CREATE TABLE `main`.`users` (",
            "CREATE TABLE `main`.`orders` (",
            "BEGIN",
            "INSERT INTO `main`.`users` (`id`, `name`, `created_at`)",
            "INSERT IGNORE INTO `main`.`users` (`id`, `name`)",
            "COMMIT",
            "BEGIN",
            "INSERT INTO `main`.`orders` (`id`, `user_id`)",
            "COMMIT",
            "DROP VIEW IF EXISTS `main`.`v_users`",
            "CREATE VIEW `main`.`v_users` AS",
            "DROP TRIGGER IF EXISTS `main`.`audit_users`",
            "CREATE TRIGGER `main`.`audit_users` AFTER INSERT ON `main`.`users`",
            "SET FOREIGN_KEY_CHECKS = 1",
        ]
    );

    let (insert, params) = session.find("INSERT INTO `main`.`users`");
    assert!(insert.ends_with("VALUES (:v0, :v1, NOW())"));
    assert_eq!(params.get("v0"), Some(&json!(1)));
    assert_eq!(params.get("v1"), Some(&json!("alice")));
    assert!(
        session
            .statements
            .iter()
            .filter(|(sql, _)| sql.starts_with("INSERT"))
            .all(|(sql, _)| !sql.contains("name_upper"))
    );

    let (orders, _) = session.find("CREATE TABLE `main`.`orders`");
    assert!(orders.contains("CONSTRAINT `fk_orders_users` FOREIGN KEY (`user_id`)"));

    let instance = &report.instances[0];
    assert!(!instance.database_created);
    let users = &instance.tables[0];
    assert_eq!(users.backup.as_deref(), Some("bak_users_20240101000000"));
    assert_eq!(users.rows_inserted, 1);
    assert_eq!(users.restored, Some(1));
    assert_eq!(users.source_mapping.as_deref(), Some("base"));
    assert_eq!(instance.tables[1].restored, None);
    assert_eq!(report.rows_inserted(), 2);
    assert_eq!(instance.views, vec!["v_users".to_string()]);
    assert!(report.warnings.iter().any(|warning| warning.code == "unknown_column"));
}

#[tokio::test]
async fn drop_mode_recreates_the_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    seed_project(dir.path(), "");
    let project = Project::load(dir.path()).expect("project");
    let environ = project.environs().get("dev").expect("environ");
    let mappings = select_mappings(&environ, Some("base")).expect("mappings");

    let mut session = RecordingSession::default().with_table("main", "users");
    let report = ApplyEngine::new(&project, &environ)
        .expect("engine")
        .apply(&mut session, "localhost", &mappings, &ApplyMode::Drop)
        .await
        .expect("apply");

    let heads = session.heads();
    assert_eq!(
        &heads[..5],
        &[
            "SET FOREIGN_KEY_CHECKS = 0",
            "DROP DATABASE `main`",
            "CREATE DATABASE `main` DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci",
            "USE `main`",
            "CREATE TABLE `main`.`users` (",
        ]
    );
    assert!(!heads.iter().any(|head| head.contains("bak_")));
    assert!(report.instances[0].database_created);
}

#[tokio::test]
async fn target_mode_touches_only_the_named_table() {
    let dir = tempfile::tempdir().expect("tempdir");
    seed_project(dir.path(), "");
    let project = Project::load(dir.path()).expect("project");
    let environ = project.environs().get("dev").expect("environ");
    let mappings = select_mappings(&environ, None).expect("mappings");
    let engine = ApplyEngine::new(&project, &environ).expect("engine");

    let mut session = RecordingSession::default().with_table("main", "users");
    engine
        .apply(
            &mut session,
            "localhost",
            &mappings,
            &ApplyMode::Target("orders".to_string()),
        )
        .await
        .expect("apply");
    assert_eq!(
        session.heads(),
        vec![
            "SET FOREIGN_KEY_CHECKS = 0",
            "USE `main`",
            "CREATE TABLE `main`.`orders` (",
            "BEGIN",
            "INSERT INTO `main`.`orders` (`id`, `user_id`)",
            "COMMIT",
            "SET FOREIGN_KEY_CHECKS = 1",
        ]
    );

    let mut session = RecordingSession::default();
    let err = engine
        .apply(
            &mut session,
            "localhost",
            &mappings,
            &ApplyMode::Target("missing".to_string()),
        )
        .await
        .expect_err("unknown target");
    assert_eq!(err.kind(), ErrorKind::EntityNotFound);
    assert!(session.statements.is_empty());
}

#[tokio::test]
async fn environment_can_switch_off_foreign_keys() {
    let dir = tempfile::tempdir().expect("tempdir");
    seed_project(
        dir.path(),
        "options:\n  createForeignKeyConstraints: false\n",
    );
    let project = Project::load(dir.path()).expect("project");
    let environ = project.environs().get("dev").expect("environ");
    let mappings = select_mappings(&environ, None).expect("mappings");

    let mut session = DryRunSession::new();
    let report = ApplyEngine::new(&project, &environ)
        .expect("engine")
        .apply(&mut session, "localhost", &mappings, &ApplyMode::Delta)
        .await
        .expect("apply");

    let statements = session.into_statements();
    assert!(statements.iter().all(|statement| !statement.sql.contains("FOREIGN KEY")));
    assert!(
        statements
            .iter()
            .any(|statement| statement.sql.starts_with("CREATE DATABASE `main`"))
    );
    // Dry runs see no existing tables, so nothing is backed up or restored.
    assert!(statements.iter().all(|statement| !statement.sql.contains("bak_")));
    assert!(report.instances[0].tables.iter().all(|table| table.restored.is_none()));
}
