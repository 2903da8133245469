mod logging;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use dbgear_core::model::SchemaManager;
use dbgear_core::{DependencyAnalyzer, Error as CoreError, Project, resolve_insertion_order};
use dbgear_dbio::{
    ApplyEngine, ApplyMode, DryRunSession, MySqlSession, Session, introspect, select_mappings,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("cannot write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("logging setup failed: {0}")]
    Logging(String),
    #[error("interrupted")]
    Interrupted,
}

#[derive(Parser, Debug)]
#[command(name = "dbgear", version, about = "Deploy declarative MySQL schemas and seed data")]
struct Cli {
    /// Project directory holding project.yaml and schema.yaml.
    #[arg(long, global = true, env = "DBGEAR_PROJECT", default_value = "database")]
    project: PathBuf,
    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Append JSON log lines to this file.
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply schema and seed data to a deployment.
    Apply(ApplyArgs),
    /// Print the dependencies of a table as JSON.
    Deps(DepsArgs),
    /// Print the insertion order of a mapping as JSON.
    Order(OrderArgs),
    /// Read a live database back into schema.yaml form.
    Introspect(IntrospectArgs),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Apply(_) => "apply",
            Command::Deps(_) => "deps",
            Command::Order(_) => "order",
            Command::Introspect(_) => "introspect",
        }
    }
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// Deployment alias from environ.yaml.
    deploy: String,
    /// Environment directory name.
    env: String,
    /// Rebuild only the table (or view, routine, trigger) with this name.
    #[arg(long)]
    target: Option<String>,
    /// Rebuild everything: `drop` recreates databases, `delta` keeps them.
    #[arg(long, value_parser = ["drop", "delta"])]
    all: Option<String>,
    /// Apply only this mapping.
    #[arg(long)]
    mapping: Option<String>,
    /// Print the statements instead of running them.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct DepsArgs {
    schema: String,
    table: String,
    #[arg(long, default_value_t = 1)]
    left: u8,
    #[arg(long, default_value_t = 1)]
    right: u8,
}

#[derive(Args, Debug)]
struct OrderArgs {
    env: String,
    mapping: String,
}

#[derive(Args, Debug)]
struct IntrospectArgs {
    /// MySQL connection string.
    #[arg(value_name = "CONNECTION_STRING")]
    conn: String,
    database: String,
    /// Write the schema here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = logging::init_logging(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    let run_id = Uuid::new_v4().to_string();
    let timer = Instant::now();
    tracing::info!(event = "run_started", run_id = %run_id, command = cli.command.name());

    let result = run(cli).await;
    let duration_ms = timer.elapsed().as_millis();
    match result {
        Ok(()) => {
            tracing::info!(event = "run_finished", run_id = %run_id, status = "success", duration_ms);
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::info!(event = "run_finished", run_id = %run_id, status = "failure", duration_ms);
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Apply(args) => run_apply(cli.project, args).await,
        Command::Deps(args) => run_deps(cli.project, args),
        Command::Order(args) => run_order(cli.project, args),
        Command::Introspect(args) => run_introspect(args).await,
    }
}

async fn run_apply(project_dir: PathBuf, args: ApplyArgs) -> Result<(), CliError> {
    let project = Project::load(&project_dir)?;
    let environ = project.environs().get(&args.env)?;
    let conn = environ.connection_string(&args.deploy)?;
    let mode = ApplyMode::from_flags(args.all.as_deref(), args.target.as_deref())?;
    let mappings = select_mappings(&environ, args.mapping.as_deref())?;
    let engine = ApplyEngine::new(&project, &environ)?;

    if args.dry_run {
        let mut session = DryRunSession::new();
        engine
            .apply(&mut session, &args.deploy, &mappings, &mode)
            .await?;
        for statement in session.statements() {
            println!("{};", statement.sql);
            if !statement.params.is_empty() {
                println!("-- params: {}", serde_json::to_string(&statement.params)?);
            }
        }
        return Ok(());
    }

    let mut session = MySqlSession::connect(conn).await?;
    let outcome = tokio::select! {
        result = engine.apply(&mut session, &args.deploy, &mappings, &mode) => {
            result.map_err(CliError::from)
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!(event = "apply_interrupted");
            Err(CliError::Interrupted)
        }
    };
    if let Err(err) = session.close().await {
        tracing::warn!(event = "connection_close_failed", error = %err);
    }
    print_json(&outcome?)
}

fn run_deps(project_dir: PathBuf, args: DepsArgs) -> Result<(), CliError> {
    let project = Project::load(&project_dir)?;
    let report = DependencyAnalyzer::new(&project.schemas)
        .with_project_dir(&project.folder)
        .analyze(&args.schema, &args.table, args.left, args.right)?;
    print_json(&report)
}

fn run_order(project_dir: PathBuf, args: OrderArgs) -> Result<(), CliError> {
    let project = Project::load(&project_dir)?;
    let environ = project.environs().get(&args.env)?;
    let mapping = environ.mappings().get(&args.mapping)?;
    let models = mapping.effective_datamodels()?;
    let resolved = resolve_insertion_order(&models, &project.schemas)?;
    for warning in &resolved.warnings {
        tracing::warn!(event = "order_warning", code = %warning.code, path = %warning.path, message = %warning.message);
    }
    print_json(&resolved.report())
}

async fn run_introspect(args: IntrospectArgs) -> Result<(), CliError> {
    let mut session = MySqlSession::connect(&args.conn).await?;
    let result = introspect(&mut session, &args.database).await;
    if let Err(err) = session.close().await {
        tracing::warn!(event = "connection_close_failed", error = %err);
    }

    let mut schemas = SchemaManager::new();
    schemas.add(result?)?;
    let yaml = schemas.to_yaml_string()?;
    match args.out {
        Some(path) => {
            std::fs::write(&path, yaml).map_err(|source| CliError::Output {
                path: path.clone(),
                source,
            })?;
            tracing::info!(event = "schema_written", path = %path.display());
        }
        None => print!("{yaml}"),
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
