use std::fs;
use std::path::Path;

use dbgear_core::{
    DependencyAnalyzer, DependencyKind, ErrorKind, Project, SyncMode, resolve_insertion_order,
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
      orders:
        columns:
          - columnName: id
            columnType: BIGINT
            nullable: false
            primaryKey: 1
          - columnName: user_id
            columnType: BIGINT
          - columnName: total_with_tax
            columnType: DECIMAL(10,2)
            expression: total * 1.1
        relations:
          - target:
              schemaName: main
              tableName: users
            bindColumns:
              - sourceColumn: user_id
                targetColumn: id
"#;

fn write(path: &Path, text: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, text).expect("write");
}

fn seed_project(root: &Path) {
    write(
        &root.join("project.yaml"),
        "projectName: shop\ndescription: demo\noptions:\n  createForeignKeyConstraints: false\n",
    );
    write(&root.join("schema.yaml"), SCHEMA);
    write(
        &root.join("dev/environ.yaml"),
        "description: local\ndeployment:\n  localhost: mysql://root:pw@localhost\noptions:\n  createForeignKeyConstraints: true\n",
    );
    write(
        &root.join("dev/base/mapping.yaml"),
        "instances: [main]\ndeployment: false\n",
    );
    write(&root.join("dev/base/main@users.yaml"), "layout: table\n");
    write(&root.join("dev/base/main@users.dat"), "- id: 1\n  name: alice\n");
    write(&root.join("dev/base/main@orders.yaml"), "syncMode: drop-create\n");
    write(
        &root.join("dev/child/_mapping.yaml"),
        "base: base\ninstances: [main]\ndeployment: true\n",
    );
    write(
        &root.join("dev/child/main@orders.yaml"),
        "sync_mode: update-diff\n",
    );
}

#[test]
fn loads_a_layered_project() {
    let dir = tempfile::tempdir().expect("tempdir");
    seed_project(dir.path());

    let project = Project::load(dir.path()).expect("load project");
    assert_eq!(project.name, "shop");
    assert!(!project.options.create_foreign_key_constraints);

    let environ = project.environs().get("dev").expect("environ");
    assert!(environ.effective_options(&project.options).create_foreign_key_constraints);
    assert_eq!(
        environ.connection_string("localhost").expect("conn"),
        "mysql://root:pw@localhost"
    );
    assert_eq!(
        environ.connection_string("missing").expect_err("alias").kind(),
        ErrorKind::EntityNotFound
    );

    let child = environ.mappings().get("child").expect("mapping");
    assert!(child.deployment);
    let models = child.effective_datamodels().expect("models");
    let keys: Vec<String> = models.iter().map(|model| model.key()).collect();
    assert_eq!(keys, vec!["main@orders", "main@users"]);
    assert_eq!(models[0].sync_mode, SyncMode::UpdateDiff);

    let inherited = child
        .find_rows("main", "users")
        .expect("rows")
        .expect("inherited rows");
    assert_eq!(inherited.mapping, "base");
    assert_eq!(inherited.rows.len(), 1);

    let order = resolve_insertion_order(&models, &project.schemas).expect("order");
    assert_eq!(order.keys(), vec!["main@users", "main@orders"]);
    assert!(order.warnings.is_empty());
}

#[test]
fn saved_projects_load_back_unchanged() {
    let dir = tempfile::tempdir().expect("tempdir");
    seed_project(dir.path());
    let project = Project::load(dir.path()).expect("load");

    let copy = tempfile::tempdir().expect("tempdir");
    let mut moved = project.clone();
    moved.folder = copy.path().to_path_buf();
    moved.save().expect("save");

    let reloaded = Project::load(copy.path()).expect("reload");
    assert_eq!(reloaded.schemas, project.schemas);
    assert_eq!(reloaded.name, project.name);
    assert_eq!(reloaded.options, project.options);

    let orders = reloaded.schemas.table("main", "orders").expect("orders");
    assert!(orders.columns.require("total_with_tax").expect("column").is_generated());
}

#[test]
fn analyzer_reports_seed_files_of_every_environment() {
    let dir = tempfile::tempdir().expect("tempdir");
    seed_project(dir.path());
    let project = Project::load(dir.path()).expect("load");

    let report = DependencyAnalyzer::new(&project.schemas)
        .with_project_dir(&project.folder)
        .analyze("main", "users", 2, 1)
        .expect("analyze");

    let left = report.left_level(1);
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].object_name, "fk_orders_users");

    let data: Vec<_> = report
        .right_level(1)
        .iter()
        .filter(|item| item.kind == DependencyKind::Data)
        .collect();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0].details["mapping"], "base");
    assert_eq!(data[0].details["record_count"], 1);
}
