//! dbcompare CLI Entry Point
//!
//! Subcommands:
//! - `equal` / `contains` - Compare an expected dataset with an actual one
//! - `dump` - Write database tables as a dataset file
//! - `query` - Write a query result as a one-table dataset file
//! - `execute` - Run a SQL script
//! - `load` / `delete` - Apply a dataset to a database
//!
//! A dataset source is a flat XML file (`*.xml`), a CSV dataset directory or
//! `sqlite:PATH`. Dataset outputs follow the same extension rule.
//! All output to stdout is JSON-only. Logs go to stderr.
//! Exit codes: 0 on success, 1 on a failed assertion, 2 on any other error.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use dbcompare::config::{load_compare_config, load_filter_config, load_pseudo_keys};
use dbcompare::io::{read_dataset, write_dataset};
use dbcompare::{
    CompareMode, ConnectionConfig, DatabaseOperation, DatabaseType, Dataset, DatasetAssertion,
    DatasetResource, DbCompareError, ErrorEnvelope, FilterPipeline, Metadata, PseudoKeys,
    SuccessEnvelope,
};

#[cfg(feature = "sqlite")]
use dbcompare::{DatasetTarget, SqliteTarget};

/// dbcompare - database dataset assertions
#[derive(Parser)]
#[command(name = "dbcompare")]
#[command(about = "Compare, dump and load tabular datasets with detailed diff reports")]
#[command(version)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assert that the actual dataset equals the expected one
    Equal(CompareArgs),

    /// Assert that the actual dataset contains the expected one
    Contains(CompareArgs),

    /// Dump database tables to a CSV dataset directory or flat XML file
    Dump {
        #[arg(long)]
        db: PathBuf,

        #[arg(long)]
        out: PathBuf,

        /// Tables to dump (all when omitted)
        #[arg(long = "table")]
        tables: Vec<String>,
    },

    /// Write the result of a read-only query as a CSV dataset directory or flat XML file
    Query {
        #[arg(long)]
        db: PathBuf,

        #[arg(long)]
        sql: String,

        #[arg(long)]
        out: PathBuf,

        /// Name of the resulting table
        #[arg(long, default_value = dbcompare::engine::DEFAULT_QUERY_TABLE)]
        name: String,
    },

    /// Execute a SQL script file
    Execute {
        #[arg(long)]
        db: PathBuf,

        #[arg(long)]
        script: PathBuf,
    },

    /// Apply a dataset to a database
    Load(ApplyArgs),

    /// Delete the rows of a dataset from a database (DELETE or DELETE_ALL)
    Delete(ApplyArgs),
}

#[derive(Args)]
struct CompareArgs {
    /// Expected dataset source
    #[arg(long)]
    expected: String,

    /// Actual dataset source
    #[arg(long)]
    actual: String,

    /// Comparison configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pseudo primary key properties file
    #[arg(long)]
    ppk: Option<PathBuf>,

    /// Filter configuration files, applied in order
    #[arg(long = "filter")]
    filters: Vec<PathBuf>,

    /// Directory receiving the diff report of a failed comparison
    #[arg(long)]
    report_dir: Option<PathBuf>,
}

#[derive(Args)]
struct ApplyArgs {
    #[arg(long)]
    db: PathBuf,

    /// CSV dataset directory or flat XML file
    #[arg(long)]
    dataset: PathBuf,

    /// Database operation (defaults to CLEAN_INSERT for load, DELETE_ALL for delete)
    #[arg(long)]
    operation: Option<String>,

    /// Pseudo primary key properties file, for tables without primary key
    #[arg(long)]
    ppk: Option<PathBuf>,
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Equal(_) => "equal",
            Self::Contains(_) => "contains",
            Self::Dump { .. } => "dump",
            Self::Query { .. } => "query",
            Self::Execute { .. } => "execute",
            Self::Load(_) => "load",
            Self::Delete(_) => "delete",
        }
    }
}

type Outcome = (serde_json::Value, Option<usize>);

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install logger")?;

    let command = cli.command.name();
    let start = Instant::now();

    match run(cli.command) {
        Ok((data, rows)) => {
            let elapsed = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            let meta = rows.map_or_else(|| Metadata::new(elapsed), |r| Metadata::with_rows(elapsed, r));
            let envelope = SuccessEnvelope::new(command, data, meta);
            println!("{}", serde_json::to_string(&envelope).context("Failed to serialize output")?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            let envelope = ErrorEnvelope::from_error(command, &err);
            println!("{}", serde_json::to_string(&envelope).context("Failed to serialize output")?);
            Ok(match err {
                DbCompareError::AssertionFailed(_) => ExitCode::from(1),
                _ => ExitCode::from(2),
            })
        }
    }
}

fn run(command: Commands) -> dbcompare::Result<Outcome> {
    match command {
        Commands::Equal(args) => compare(CompareMode::Equal, &args),
        Commands::Contains(args) => compare(CompareMode::Contain, &args),
        Commands::Dump { db, out, tables } => {
            let tables = (!tables.is_empty()).then_some(tables.as_slice());
            let dataset = dump(&ConnectionConfig::sqlite(db), tables)?;
            write_dataset(&out, &dataset)?;
            Ok((json!({ "tables": dataset.table_names(), "out": out }), Some(row_count(&dataset))))
        }
        Commands::Query { db, sql, out, name } => {
            let dataset = query(&ConnectionConfig::sqlite(db), &sql, &name)?;
            write_dataset(&out, &dataset)?;
            Ok((json!({ "table": name, "out": out }), Some(row_count(&dataset))))
        }
        Commands::Execute { db, script } => {
            let sql = std::fs::read_to_string(&script).map_err(|e| {
                DbCompareError::invalid_input(format!(
                    "Could not read script {}: {e}",
                    script.display()
                ))
            })?;
            execute_script(&ConnectionConfig::sqlite(db), &sql)?;
            Ok((json!({ "script": script }), None))
        }
        Commands::Load(args) => {
            let operation = match &args.operation {
                Some(name) => DatabaseOperation::parse(name)?,
                None => DatabaseOperation::CleanInsert,
            };
            apply_dataset(&args, operation)
        }
        Commands::Delete(args) => {
            let operation = match &args.operation {
                Some(name) => DatabaseOperation::parse(name)?.for_delete()?,
                None => DatabaseOperation::DeleteAll,
            };
            apply_dataset(&args, operation)
        }
    }
}

fn compare(mode: CompareMode, args: &CompareArgs) -> dbcompare::Result<Outcome> {
    let mut assertion = match &args.config {
        Some(path) => DatasetAssertion::from_config(mode, &load_compare_config(path)?)?,
        None => DatasetAssertion::new(mode),
    };
    if let Some(path) = &args.ppk {
        assertion = assertion.with_pseudo_keys(load_pseudo_keys(path)?);
    }
    for path in &args.filters {
        let filter = FilterPipeline::from_config(&load_filter_config(path)?, assertion.pseudo_keys())?;
        assertion = assertion.with_filter(filter);
    }
    if let Some(dir) = &args.report_dir {
        assertion = assertion.with_report_dir(dir);
    }

    let expected = load_source(&args.expected)?;
    let actual = load_source(&args.actual)?;
    assertion.test(&expected, &actual)?;

    Ok((
        json!({
            "mode": mode,
            "expected": expected.name,
            "actual": actual.name,
            "passed": true,
        }),
        Some(row_count(&expected.dataset)),
    ))
}

fn apply_dataset(args: &ApplyArgs, operation: DatabaseOperation) -> dbcompare::Result<Outcome> {
    let dataset = read_dataset(&args.dataset)?;
    let pseudo_keys = args.ppk.as_deref().map(load_pseudo_keys).transpose()?;
    let affected = apply(&ConnectionConfig::sqlite(args.db.clone()), &dataset, operation, pseudo_keys.as_ref())?;
    Ok((json!({ "operation": operation, "tables": dataset.table_names() }), Some(affected)))
}

fn load_source(source: &str) -> dbcompare::Result<DatasetResource> {
    match ConnectionConfig::from_source(source) {
        Some(config) => {
            debug!(source, "Dumping database dataset");
            Ok(DatasetResource::new(source, dump(&config, None)?).with_metadata(true))
        }
        None => Ok(DatasetResource::new(source, read_dataset(Path::new(source))?)),
    }
}

fn row_count(dataset: &Dataset) -> usize {
    dataset.tables().iter().map(dbcompare::Table::row_count).sum()
}

fn dump(config: &ConnectionConfig, tables: Option<&[String]>) -> dbcompare::Result<Dataset> {
    match config.engine {
        #[cfg(feature = "sqlite")]
        DatabaseType::SQLite => SqliteTarget::dump(config, tables),
        #[cfg(not(feature = "sqlite"))]
        DatabaseType::SQLite => {
            let _ = tables;
            Err(engine_disabled())
        }
    }
}

fn query(config: &ConnectionConfig, sql: &str, name: &str) -> dbcompare::Result<Dataset> {
    match config.engine {
        #[cfg(feature = "sqlite")]
        DatabaseType::SQLite => SqliteTarget::query(config, sql, name),
        #[cfg(not(feature = "sqlite"))]
        DatabaseType::SQLite => {
            let _ = (sql, name);
            Err(engine_disabled())
        }
    }
}

fn execute_script(config: &ConnectionConfig, script: &str) -> dbcompare::Result<()> {
    match config.engine {
        #[cfg(feature = "sqlite")]
        DatabaseType::SQLite => SqliteTarget::execute_script(config, script),
        #[cfg(not(feature = "sqlite"))]
        DatabaseType::SQLite => {
            let _ = script;
            Err(engine_disabled())
        }
    }
}

fn apply(
    config: &ConnectionConfig,
    dataset: &Dataset,
    operation: DatabaseOperation,
    pseudo_keys: Option<&PseudoKeys>,
) -> dbcompare::Result<usize> {
    match config.engine {
        #[cfg(feature = "sqlite")]
        DatabaseType::SQLite => SqliteTarget::apply(config, dataset, operation, pseudo_keys),
        #[cfg(not(feature = "sqlite"))]
        DatabaseType::SQLite => {
            let _ = (dataset, operation, pseudo_keys);
            Err(engine_disabled())
        }
    }
}

#[cfg(not(feature = "sqlite"))]
fn engine_disabled() -> DbCompareError {
    DbCompareError::invalid_input("SQLite engine not enabled. Build with --features sqlite")
}
