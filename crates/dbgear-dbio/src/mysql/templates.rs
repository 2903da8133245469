//! MySQL statement templates rendered with MiniJinja.
//!
//! Identifiers always pass through the `ident` filter and string literals
//! through `quote`; templates never splice raw user text into a literal.

use minijinja::{Environment, context};
use serde::Serialize;

use dbgear_core::model::{Index, IndexType, Procedure, Table, Trigger, TriggerTiming, View};
use dbgear_core::{Error, Result};

pub const DEFAULT_CHARSET: &str = "utf8mb4";
pub const DEFAULT_COLLATION: &str = "utf8mb4_unicode_ci";

const CREATE_DATABASE: &str = "CREATE DATABASE {{ name | ident }}
{%- if charset %} DEFAULT CHARACTER SET {{ charset }}{% endif %}
{%- if collation %} COLLATE {{ collation }}{% endif %}";

const DROP_DATABASE: &str = "DROP DATABASE {{ name | ident }}";

const USE_DATABASE: &str = "USE {{ name | ident }}";

const CREATE_TABLE: &str = "CREATE TABLE {{ database | ident }}.{{ table.name | ident }} (
{% for column in table.columns %}
  {{ column.name | ident }} {{ column.sql_type }}
  {%- if column.charset %} CHARACTER SET {{ column.charset }}{% endif %}
  {%- if column.collation %} COLLATE {{ column.collation }}{% endif %}
  {%- if column.expression %} GENERATED ALWAYS AS ({{ column.expression }}) {% if column.stored %}STORED{% else %}VIRTUAL{% endif %}{% endif %}
  {%- if not column.nullable %} NOT NULL{% endif %}
  {%- if column.default_value and not column.expression %} DEFAULT {{ column.default_value }}{% endif %}
  {%- if column.auto_increment %} AUTO_INCREMENT{% endif %}
  {%- if column.comment %} COMMENT {{ column.comment | quote }}{% endif %}
  {%- if not loop.last or table.primary_key or table.foreign_keys %},{% endif %}

{% endfor %}
{% if table.primary_key %}
  CONSTRAINT {{ table.primary_key_name | ident }} PRIMARY KEY ({{ table.primary_key | join_idents }})
  {%- if table.foreign_keys %},{% endif %}

{% endif %}
{% for fk in table.foreign_keys %}
  CONSTRAINT {{ fk.name | ident }} FOREIGN KEY ({{ fk.columns | join_idents }}) REFERENCES {{ fk.target_schema | ident }}.{{ fk.target_table | ident }} ({{ fk.target_columns | join_idents }})
  {%- if fk.on_delete %} ON DELETE {{ fk.on_delete }}{% endif %}
  {%- if fk.on_update %} ON UPDATE {{ fk.on_update }}{% endif %}
  {%- if not loop.last %},{% endif %}

{% endfor %}
)
{%- if table.options.engine %} ENGINE={{ table.options.engine }}{% endif %}
{%- if table.options.charset %} DEFAULT CHARSET={{ table.options.charset }}{% endif %}
{%- if table.options.collation %} COLLATE={{ table.options.collation }}{% endif %}
{%- if table.options.auto_increment %} AUTO_INCREMENT={{ table.options.auto_increment }}{% endif %}
{%- if table.options.row_format %} ROW_FORMAT={{ table.options.row_format }}{% endif %}
{%- if table.comment %} COMMENT={{ table.comment | quote }}{% endif %}";

const CREATE_INDEX: &str = "CREATE {% if index.unique %}UNIQUE {% elif index.kind %}{{ index.kind }} {% endif %}INDEX {{ index.name | ident }} ON {{ database | ident }}.{{ table | ident }} ({{ index.columns | join_idents }})
{%- if index.using %} USING {{ index.using }}{% endif %}";

const CREATE_VIEW: &str = "CREATE VIEW {{ database | ident }}.{{ name | ident }} AS
{{ select_statement }}";

const CREATE_PROCEDURE: &str = "CREATE PROCEDURE {{ database | ident }}.{{ routine.name | ident }}(
{%- for param in routine.parameters %}
{{ param.mode }} {{ param.name | ident }} {{ param.data_type }}{% if not loop.last %}, {% endif %}
{%- endfor %}
)
{%- if routine.deterministic %} DETERMINISTIC{% else %} NOT DETERMINISTIC{% endif %}
{%- if routine.modifies_sql_data %} MODIFIES SQL DATA{% elif routine.reads_sql_data %} READS SQL DATA{% endif %}
 SQL SECURITY {{ routine.security_type }}
BEGIN
{{ routine.body }}
END";

const CREATE_FUNCTION: &str = "CREATE FUNCTION {{ database | ident }}.{{ routine.name | ident }}(
{%- for param in routine.parameters %}
{{ param.name | ident }} {{ param.data_type }}{% if not loop.last %}, {% endif %}
{%- endfor %}
) RETURNS {{ routine.return_type }}
{%- if routine.deterministic %} DETERMINISTIC{% else %} NOT DETERMINISTIC{% endif %}
{%- if routine.modifies_sql_data %} MODIFIES SQL DATA{% elif routine.reads_sql_data %} READS SQL DATA{% endif %}
 SQL SECURITY {{ routine.security_type }}
BEGIN
{{ routine.body }}
END";

const CREATE_TRIGGER: &str = "CREATE TRIGGER {{ database | ident }}.{{ trigger.name | ident }} {{ trigger.timing }} {{ trigger.event }} ON {{ database | ident }}.{{ trigger.table | ident }}
FOR EACH ROW
{% if trigger.condition %}
BEGIN
  IF {{ trigger.condition }} THEN
    {{ trigger.body }}
  END IF;
END
{% else %}
{{ trigger.body }}
{% endif %}";

const DROP_OBJECT: &str =
    "DROP {{ kind }}{% if if_exists %} IF EXISTS{% endif %} {{ database | ident }}.{{ name | ident }}";

const INSERT_INTO: &str = "INSERT INTO {{ database | ident }}.{{ table | ident }} ({{ columns | join_idents }})
VALUES ({{ values | join(\", \") }})";

const BACKUP_TABLE: &str = "CREATE TABLE {{ database | ident }}.{{ backup | ident }} AS
SELECT * FROM {{ database | ident }}.{{ table | ident }}";

const RESTORE_TABLE: &str = "INSERT IGNORE INTO {{ database | ident }}.{{ table | ident }} ({{ columns | join_idents }})
SELECT {{ columns | join_idents }} FROM {{ database | ident }}.{{ backup | ident }}";

const TEMPLATES: &[(&str, &str)] = &[
    ("mysql_create_database", CREATE_DATABASE),
    ("mysql_drop_database", DROP_DATABASE),
    ("mysql_use_database", USE_DATABASE),
    ("mysql_create_table", CREATE_TABLE),
    ("mysql_create_index", CREATE_INDEX),
    ("mysql_create_view", CREATE_VIEW),
    ("mysql_create_procedure", CREATE_PROCEDURE),
    ("mysql_create_function", CREATE_FUNCTION),
    ("mysql_create_trigger", CREATE_TRIGGER),
    ("mysql_drop_object", DROP_OBJECT),
    ("mysql_insert_into", INSERT_INTO),
    ("mysql_backup_table", BACKUP_TABLE),
    ("mysql_restore_table", RESTORE_TABLE),
];

/// Objects removed through `DROP <kind> <database>.<name>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    View,
    Procedure,
    Function,
    Trigger,
}

impl ObjectKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::View => "VIEW",
            ObjectKind::Procedure => "PROCEDURE",
            ObjectKind::Function => "FUNCTION",
            ObjectKind::Trigger => "TRIGGER",
        }
    }
}

/// One entry of an INSERT value list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertValue {
    /// Bound as `:name`.
    Param(String),
    /// Emitted verbatim, e.g. `NOW()`.
    Sql(String),
}

impl InsertValue {
    fn fragment(&self) -> String {
        match self {
            InsertValue::Param(name) => format!(":{name}"),
            InsertValue::Sql(sql) => sql.clone(),
        }
    }
}

#[derive(Serialize)]
struct ColumnContext<'a> {
    name: &'a str,
    sql_type: String,
    nullable: bool,
    auto_increment: bool,
    expression: Option<&'a str>,
    stored: bool,
    default_value: Option<&'a str>,
    charset: Option<&'a str>,
    collation: Option<&'a str>,
    comment: Option<&'a str>,
}

#[derive(Serialize)]
struct ForeignKeyContext<'a> {
    name: &'a str,
    columns: Vec<String>,
    target_schema: &'a str,
    target_table: &'a str,
    target_columns: Vec<String>,
    on_delete: Option<&'static str>,
    on_update: Option<&'static str>,
}

#[derive(Serialize, Default)]
struct TableOptionsContext<'a> {
    engine: Option<&'a str>,
    charset: Option<&'a str>,
    collation: Option<&'a str>,
    auto_increment: Option<u64>,
    row_format: Option<&'a str>,
}

#[derive(Serialize)]
struct TableContext<'a> {
    name: &'a str,
    columns: Vec<ColumnContext<'a>>,
    primary_key_name: String,
    primary_key: Vec<&'a str>,
    foreign_keys: Vec<ForeignKeyContext<'a>>,
    options: TableOptionsContext<'a>,
    comment: Option<&'a str>,
}

#[derive(Serialize)]
struct IndexContext<'a> {
    name: String,
    columns: &'a [String],
    unique: bool,
    kind: Option<&'static str>,
    using: Option<&'static str>,
}

#[derive(Serialize)]
struct ParameterContext<'a> {
    mode: &'static str,
    name: &'a str,
    data_type: &'a str,
}

#[derive(Serialize)]
struct RoutineContext<'a> {
    name: &'a str,
    parameters: Vec<ParameterContext<'a>>,
    return_type: Option<&'a str>,
    deterministic: bool,
    reads_sql_data: bool,
    modifies_sql_data: bool,
    security_type: &'static str,
    body: &'a str,
}

#[derive(Serialize)]
struct TriggerContext<'a> {
    name: &'a str,
    table: &'a str,
    timing: &'static str,
    event: &'static str,
    condition: Option<&'a str>,
    body: String,
}

/// Registry of the MySQL templates.
pub struct MySqlTemplates {
    env: Environment<'static>,
}

impl MySqlTemplates {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_filter("ident", ident);
        env.add_filter("quote", quote);
        env.add_filter("join_idents", join_idents);
        for (name, source) in TEMPLATES {
            env.add_template(name, source).map_err(template_error)?;
        }
        Ok(Self { env })
    }

    fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String> {
        let template = self.env.get_template(name).map_err(template_error)?;
        let sql = template.render(ctx).map_err(template_error)?;
        Ok(sql.trim().to_string())
    }

    pub fn create_database(&self, name: &str) -> Result<String> {
        self.render(
            "mysql_create_database",
            context! { name, charset => DEFAULT_CHARSET, collation => DEFAULT_COLLATION },
        )
    }

    pub fn drop_database(&self, name: &str) -> Result<String> {
        self.render("mysql_drop_database", context! { name })
    }

    pub fn use_database(&self, name: &str) -> Result<String> {
        self.render("mysql_use_database", context! { name })
    }

    /// `CREATE TABLE` with inline FOREIGN KEY clauses for named relations
    /// when `foreign_keys` is set.
    pub fn create_table(&self, database: &str, table: &Table, foreign_keys: bool) -> Result<String> {
        let columns = table
            .columns
            .iter()
            .map(|column| ColumnContext {
                name: &column.column_name,
                sql_type: column.column_type.to_sql(),
                nullable: column.nullable,
                auto_increment: column.auto_increment,
                expression: column.expression.as_deref(),
                stored: column.stored,
                default_value: column.default_value.as_deref(),
                charset: column.charset.as_deref(),
                collation: column.collation.as_deref(),
                comment: column.notes.first().map(|note| note.comment_text()),
            })
            .collect();

        let foreign_keys = if foreign_keys {
            table
                .relations
                .iter()
                .filter_map(|relation| {
                    let name = relation.constraint_name.as_deref()?;
                    Some(ForeignKeyContext {
                        name,
                        columns: relation.source_columns(),
                        target_schema: &relation.target.schema_name,
                        target_table: &relation.target.table_name,
                        target_columns: relation.target_columns(),
                        on_delete: (!relation.on_delete.is_default())
                            .then(|| relation.on_delete.as_sql()),
                        on_update: (!relation.on_update.is_default())
                            .then(|| relation.on_update.as_sql()),
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        let options = table
            .mysql_options
            .as_ref()
            .map(|options| TableOptionsContext {
                engine: options.engine.as_deref(),
                charset: options.charset.as_deref(),
                collation: options.collation.as_deref(),
                auto_increment: options.auto_increment,
                row_format: options.row_format.as_deref(),
            })
            .unwrap_or_default();

        let table_ctx = TableContext {
            name: &table.table_name,
            columns,
            primary_key_name: format!("{}_PKC", table.table_name),
            primary_key: table
                .primary_key()
                .iter()
                .map(|column| column.column_name.as_str())
                .collect(),
            foreign_keys,
            options,
            comment: table.notes.first().map(|note| note.comment_text()),
        };
        self.render("mysql_create_table", context! { database, table => table_ctx })
    }

    /// One `CREATE INDEX` per index; unnamed indexes become `{table}_IX{n}`.
    ///
    /// MySQL has no partial or covering indexes, so predicates and include
    /// columns are not rendered.
    pub fn create_indexes(&self, database: &str, table: &Table) -> Result<Vec<String>> {
        table
            .indexes
            .iter()
            .enumerate()
            .map(|(position, index)| {
                self.create_index(database, &table.table_name, index, position)
            })
            .collect()
    }

    fn create_index(
        &self,
        database: &str,
        table: &str,
        index: &Index,
        position: usize,
    ) -> Result<String> {
        let name = if index.index_name.is_empty() {
            format!("{table}_IX{position}")
        } else {
            index.index_name.clone()
        };
        let (kind, using) = match index.index_type {
            IndexType::Btree => (None, None),
            IndexType::Hash => (None, Some("HASH")),
            IndexType::Fulltext => (Some("FULLTEXT"), None),
            IndexType::Spatial => (Some("SPATIAL"), None),
        };
        let index_ctx = IndexContext {
            name,
            columns: &index.columns,
            unique: index.unique,
            kind,
            using,
        };
        self.render(
            "mysql_create_index",
            context! { database, table, index => index_ctx },
        )
    }

    pub fn create_view(&self, database: &str, view: &View) -> Result<String> {
        self.render(
            "mysql_create_view",
            context! {
                database,
                name => view.view_name,
                select_statement => view.select_statement.trim(),
            },
        )
    }

    /// `CREATE PROCEDURE`, or `CREATE FUNCTION` when a return type is set.
    ///
    /// MySQL routine parameters take no defaults; `defaultValue` is ignored.
    pub fn create_routine(&self, database: &str, procedure: &Procedure) -> Result<String> {
        let routine = RoutineContext {
            name: &procedure.procedure_name,
            parameters: procedure
                .parameters
                .iter()
                .map(|param| ParameterContext {
                    mode: param.parameter_type.as_sql(),
                    name: &param.parameter_name,
                    data_type: &param.data_type,
                })
                .collect(),
            return_type: procedure.return_type.as_deref(),
            deterministic: procedure.deterministic,
            reads_sql_data: procedure.reads_sql_data,
            modifies_sql_data: procedure.modifies_sql_data,
            security_type: procedure.security_type.as_sql(),
            body: procedure.body.trim(),
        };
        let template = if procedure.is_function() {
            "mysql_create_function"
        } else {
            "mysql_create_procedure"
        };
        self.render(template, context! { database, routine })
    }

    /// A conditional trigger wraps its body in `IF <condition> THEN ... END IF`.
    pub fn create_trigger(&self, database: &str, trigger: &Trigger) -> Result<String> {
        if trigger.timing == TriggerTiming::InsteadOf {
            return Err(Error::Unsupported(format!(
                "MySQL has no INSTEAD OF triggers ({})",
                trigger.trigger_name
            )));
        }
        let condition = trigger
            .condition
            .as_deref()
            .map(str::trim)
            .filter(|condition| !condition.is_empty());
        let mut body = trigger.body.trim().to_string();
        if condition.is_some() && !body.ends_with(';') {
            body.push(';');
        }
        let trigger_ctx = TriggerContext {
            name: &trigger.trigger_name,
            table: &trigger.table_name,
            timing: trigger.timing.as_sql(),
            event: trigger.event.as_sql(),
            condition,
            body,
        };
        self.render("mysql_create_trigger", context! { database, trigger => trigger_ctx })
    }

    pub fn drop_object(
        &self,
        kind: ObjectKind,
        database: &str,
        name: &str,
        if_exists: bool,
    ) -> Result<String> {
        self.render(
            "mysql_drop_object",
            context! { kind => kind.as_sql(), database, name, if_exists },
        )
    }

    pub fn insert(
        &self,
        database: &str,
        table: &str,
        columns: &[&str],
        values: &[InsertValue],
    ) -> Result<String> {
        let values: Vec<String> = values.iter().map(InsertValue::fragment).collect();
        self.render(
            "mysql_insert_into",
            context! { database, table, columns, values },
        )
    }

    pub fn backup_table(&self, database: &str, table: &str, backup: &str) -> Result<String> {
        self.render("mysql_backup_table", context! { database, table, backup })
    }

    /// `INSERT IGNORE ... SELECT` of `columns` from the backup table.
    pub fn restore_table(
        &self,
        database: &str,
        table: &str,
        backup: &str,
        columns: &[&str],
    ) -> Result<String> {
        self.render(
            "mysql_restore_table",
            context! { database, table, backup, columns },
        )
    }
}

/// Name of the backup copy of `table` taken at `timestamp` (`%Y%m%d%H%M%S`).
pub fn backup_table_name(table: &str, timestamp: &str) -> String {
    format!("bak_{table}_{timestamp}")
}

fn template_error(err: minijinja::Error) -> Error {
    Error::Template(err.to_string())
}

fn ident(value: String) -> String {
    format!("`{}`", value.replace('`', "``"))
}

fn quote(value: Option<String>) -> String {
    match value {
        Some(text) => format!("'{}'", text.replace('\\', "\\\\").replace('\'', "''")),
        None => "NULL".to_string(),
    }
}

fn join_idents(values: Vec<String>) -> String {
    values.into_iter().map(ident).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbgear_core::model::SchemaManager;

    const SCHEMA: &str = r#"
schemas:
  main:
    tables:
      users:
        columns:
          - columnName: id
            columnType: BIGINT UNSIGNED
            nullable: false
            primaryKey: 1
            autoIncrement: true
          - columnName: status
            columnType: ENUM('on:Active','off')
            defaultValue: "'on'"
            notes:
              - title: Status
                content: It's the state
          - columnName: name_upper
            columnType: VARCHAR(50)
            expression: UPPER(name)
            stored: true
        indexes:
          - columns: [status]
          - indexName: ix_users_ft
            columns: [status]
            indexType: FULLTEXT
        mysqlOptions:
          engine: InnoDB
          charset: utf8mb4
      orders:
        columns:
          - columnName: id
            columnType: BIGINT
            nullable: false
            primaryKey: 1
          - columnName: user_id
            columnType: BIGINT
        relations:
          - target:
              schemaName: main
              tableName: users
            bindColumns:
              - sourceColumn: user_id
                targetColumn: id
            constraintName: fk_orders_users
            onDelete: CASCADE
          - target:
              schemaName: main
              tableName: users
            bindColumns:
              - sourceColumn: user_id
                targetColumn: id
    procedures:
      touch_user:
        parameters:
          - parameterName: user_id
            dataType: BIGINT
          - parameterName: touched
            parameterType: OUT
            dataType: INT
        body: "UPDATE users SET id = id WHERE id = user_id;"
        modifiesSqlData: true
      user_count:
        returnType: INT
        deterministic: true
        body: "RETURN (SELECT COUNT(*) FROM users);"
    triggers:
      audit_users:
        tableName: users
        timing: AFTER
        event: INSERT
        condition: NEW.id > 0
        body: INSERT INTO audit VALUES (NEW.id)
"#;

    fn schemas() -> SchemaManager {
        SchemaManager::from_yaml_str(SCHEMA).expect("schema")
    }

    #[test]
    fn renders_create_table() {
        let schemas = schemas();
        let templates = MySqlTemplates::new().expect("templates");
        let users = schemas.table("main", "users").expect("users");
        let sql = templates.create_table("main", users, true).expect("render");

        assert_eq!(
            sql,
            "CREATE TABLE `main`.`users` (\n  \
             `id` BIGINT UNSIGNED NOT NULL AUTO_INCREMENT,\n  \
             `status` ENUM('on','off') DEFAULT 'on' COMMENT 'It''s the state',\n  \
             `name_upper` VARCHAR(50) GENERATED ALWAYS AS (UPPER(name)) STORED,\n  \
             CONSTRAINT `users_PKC` PRIMARY KEY (`id`)\n\
             ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
        );
    }

    #[test]
    fn foreign_keys_follow_the_option_and_constraint_names() {
        let schemas = schemas();
        let templates = MySqlTemplates::new().expect("templates");
        let orders = schemas.table("main", "orders").expect("orders");

        let with_fk = templates.create_table("main", orders, true).expect("render");
        assert!(with_fk.contains(
            "  CONSTRAINT `orders_PKC` PRIMARY KEY (`id`),\n  CONSTRAINT `fk_orders_users` FOREIGN KEY (`user_id`) REFERENCES `main`.`users` (`id`) ON DELETE CASCADE\n)"
        ));
        assert_eq!(with_fk.matches("FOREIGN KEY").count(), 1);

        let without_fk = templates.create_table("main", orders, false).expect("render");
        assert!(!without_fk.contains("FOREIGN KEY"));
        assert!(without_fk.ends_with("PRIMARY KEY (`id`)\n)"));
    }

    #[test]
    fn renders_indexes_with_default_names() {
        let schemas = schemas();
        let templates = MySqlTemplates::new().expect("templates");
        let users = schemas.table("main", "users").expect("users");
        let sql = templates.create_indexes("main", users).expect("render");
        assert_eq!(
            sql,
            vec![
                "CREATE INDEX `users_IX0` ON `main`.`users` (`status`)".to_string(),
                "CREATE FULLTEXT INDEX `ix_users_ft` ON `main`.`users` (`status`)".to_string(),
            ]
        );
    }

    #[test]
    fn renders_routines() {
        let schemas = schemas();
        let templates = MySqlTemplates::new().expect("templates");
        let schema = schemas.require("main").expect("schema");

        let procedure = templates
            .create_routine("main", schema.procedures.require("touch_user").expect("proc"))
            .expect("render");
        assert_eq!(
            procedure,
            "CREATE PROCEDURE `main`.`touch_user`(IN `user_id` BIGINT, OUT `touched` INT) \
             NOT DETERMINISTIC MODIFIES SQL DATA SQL SECURITY DEFINER\n\
             BEGIN\nUPDATE users SET id = id WHERE id = user_id;\nEND"
        );

        let function = templates
            .create_routine("main", schema.procedures.require("user_count").expect("func"))
            .expect("render");
        assert!(function.starts_with(
            "CREATE FUNCTION `main`.`user_count`() RETURNS INT DETERMINISTIC READS SQL DATA SQL SECURITY DEFINER\nBEGIN\n"
        ));
    }

    #[test]
    fn conditional_trigger_wraps_body() {
        let schemas = schemas();
        let templates = MySqlTemplates::new().expect("templates");
        let schema = schemas.require("main").expect("schema");
        let mut trigger = schema.triggers.require("audit_users").expect("trigger").clone();

        let sql = templates.create_trigger("main", &trigger).expect("render");
        assert_eq!(
            sql,
            "CREATE TRIGGER `main`.`audit_users` AFTER INSERT ON `main`.`users`\n\
             FOR EACH ROW\n\
             BEGIN\n  IF NEW.id > 0 THEN\n    INSERT INTO audit VALUES (NEW.id);\n  END IF;\nEND"
        );

        trigger.timing = TriggerTiming::InsteadOf;
        let err = templates.create_trigger("main", &trigger).expect_err("instead of");
        assert_eq!(err.kind(), dbgear_core::ErrorKind::Unsupported);
    }

    #[test]
    fn renders_data_statements() {
        let templates = MySqlTemplates::new().expect("templates");
        let insert = templates
            .insert(
                "main",
                "users",
                &["id", "created_at"],
                &[
                    InsertValue::Param("v0".to_string()),
                    InsertValue::Sql("NOW()".to_string()),
                ],
            )
            .expect("insert");
        assert_eq!(
            insert,
            "INSERT INTO `main`.`users` (`id`, `created_at`)\nVALUES (:v0, NOW())"
        );

        let backup = backup_table_name("users", "20240102030405");
        assert_eq!(backup, "bak_users_20240102030405");
        let restore = templates
            .restore_table("main", "users", &backup, &["id", "name"])
            .expect("restore");
        assert_eq!(
            restore,
            "INSERT IGNORE INTO `main`.`users` (`id`, `name`)\nSELECT `id`, `name` FROM `main`.`bak_users_20240102030405`"
        );

        let drop = templates
            .drop_object(ObjectKind::View, "main", "v`x", true)
            .expect("drop");
        assert_eq!(drop, "DROP VIEW IF EXISTS `main`.`v``x`");

        assert_eq!(
            templates.create_database("shop").expect("create"),
            "CREATE DATABASE `shop` DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci"
        );
    }
}
