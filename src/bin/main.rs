//! Metrica CLI - Compile query intents to SQL
//!
//! Usage:
//!   metrica compile --catalog <catalog.toml> --intent <intent.json> [--now <date>] [--dialect <dialect>]
//!   metrica explain --catalog <catalog.toml> --intent <intent.json>
//!   metrica catalog --catalog <catalog.toml>
//!   metrica check --catalog <catalog.toml> [--intent <intent.json>]
//!
//! Examples:
//!   metrica compile --catalog demos/sample_catalog.toml --intent demos/intents/revenue_by_country.json
//!   metrica compile --catalog demos/sample_catalog.toml --intent - --dialect tsql --format json
//!   metrica catalog --catalog demos/sample_catalog.toml

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use metrica::catalog::Catalog;
use metrica::compile::{compile, explain, CompileOptions};
use metrica::config::Settings;
use metrica::intent::QueryIntent;
use metrica::sql::{Dialect, IdentQuoting};
use metrica::validation::{self, ValidationResult};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "metrica")]
#[command(about = "Metrica - A semantic metric catalog that compiles query intents to SQL")]
#[command(version)]
struct Cli {
    /// Path to a metrica.toml settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter (e.g. "debug", "metrica=trace")
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a query intent to SQL
    Compile(CompileArgs),

    /// Preview the SQL, tables and join plan for a query intent
    Explain(CompileArgs),

    /// List the metrics, dimensions, tables and joins in a catalog
    Catalog {
        /// Path to the catalog file (defaults to [catalog] path in settings)
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: ListFormat,
    },

    /// Validate a catalog, and optionally an intent against it
    Check {
        /// Path to the catalog file (defaults to [catalog] path in settings)
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Intent JSON file to validate ("-" for stdin)
        #[arg(short, long)]
        intent: Option<PathBuf>,

        /// Reference date for time ranges (defaults to today)
        #[arg(long)]
        now: Option<NaiveDate>,
    },
}

#[derive(Args)]
struct CompileArgs {
    /// Path to the catalog file (defaults to [catalog] path in settings)
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Intent JSON file ("-" for stdin)
    #[arg(short, long)]
    intent: PathBuf,

    /// Reference date for time ranges (defaults to today)
    #[arg(long)]
    now: Option<NaiveDate>,

    /// SQL dialect to generate (defaults to settings)
    #[arg(short, long)]
    dialect: Option<DialectArg>,

    /// Identifier quoting (defaults to settings)
    #[arg(short, long)]
    quoting: Option<QuotingArg>,

    /// Bind filter values as placeholders
    #[arg(short, long)]
    parameterize: bool,

    /// Sort rows by every requested dimension
    #[arg(long)]
    order_by_dimensions: bool,

    /// Output format
    #[arg(short, long, default_value = "sql")]
    format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Postgres,
    Mysql,
    Tsql,
    Duckdb,
    Snowflake,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Mysql => Dialect::MySql,
            DialectArg::Tsql => Dialect::TSql,
            DialectArg::Duckdb => Dialect::DuckDb,
            DialectArg::Snowflake => Dialect::Snowflake,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum QuotingArg {
    Always,
    AsNeeded,
}

impl From<QuotingArg> for IdentQuoting {
    fn from(arg: QuotingArg) -> Self {
        match arg {
            QuotingArg::Always => IdentQuoting::Always,
            QuotingArg::AsNeeded => IdentQuoting::AsNeeded,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Output SQL only
    Sql,
    /// Output SQL with comments
    Verbose,
    /// Output the full result as JSON
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum ListFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(cli.log_level.as_deref(), &settings.logging.level);

    match cli.command {
        Commands::Compile(args) => cmd_compile(&settings, args, false),
        Commands::Explain(args) => cmd_compile(&settings, args, true),
        Commands::Catalog { catalog, format } => cmd_catalog(&settings, catalog, format),
        Commands::Check {
            catalog,
            intent,
            now,
        } => cmd_check(&settings, catalog, intent, now),
    }
}

/// `--log-level` wins, then `RUST_LOG`, then the settings file.
fn init_tracing(cli_level: Option<&str>, settings_level: &str) {
    let filter = match cli_level {
        Some(level) => EnvFilter::try_new(level),
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(settings_level)),
    }
    .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn cmd_compile(settings: &Settings, args: CompileArgs, explain_only: bool) -> ExitCode {
    let catalog = match load_catalog(settings, args.catalog.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let intent = match read_intent(&args.intent) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut options: CompileOptions = settings.compiler.to_compile_options();
    if let Some(dialect) = args.dialect {
        options = options.with_dialect(dialect.into());
    }
    if let Some(quoting) = args.quoting {
        options = options.with_quoting(quoting.into());
    }
    if args.parameterize {
        options = options.with_parameterize(true);
    }
    if args.order_by_dimensions {
        options = options.with_order_by_dimensions(true);
    }
    let now = args.now.unwrap_or_else(today);

    if explain_only {
        return match explain(&catalog, &intent, now, &options) {
            Ok(explanation) => match args.format {
                OutputFormat::Json => print_json(&explanation),
                OutputFormat::Sql | OutputFormat::Verbose => {
                    println!("-- Tables:");
                    for table in &explanation.tables_used {
                        println!("--   {} (database: {})", table, table.catalog_id);
                    }
                    println!("-- Join plan:");
                    if explanation.join_plan.is_empty() {
                        println!("--   (single table)");
                    }
                    for edge in explanation.join_plan.edges() {
                        println!("--   {}", edge);
                    }
                    if let Some(window) = &explanation.resolved_time_window {
                        println!("-- Time window: [{}, {})", window.start, window.end);
                    }
                    println!();
                    println!("{}", explanation.sql);
                    ExitCode::SUCCESS
                }
            },
            Err(e) => {
                eprintln!("Compilation error: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    match compile(&catalog, &intent, now, &options) {
        Ok(resolved) => match args.format {
            OutputFormat::Sql => {
                println!("{}", resolved.sql);
                ExitCode::SUCCESS
            }
            OutputFormat::Verbose => {
                println!("-- Metrica Compiled SQL");
                println!("-- Intent: {}", args.intent.display());
                println!("-- Metric: {}", resolved.metric);
                println!("-- Dialect: {}", resolved.dialect);
                println!("-- Reference date: {}", now);
                if resolved.is_cross_database() {
                    println!("-- Databases: {}", resolved.databases().join(", "));
                }
                if !resolved.params.is_empty() {
                    let params: Vec<String> = resolved
                        .params
                        .iter()
                        .map(|p| serde_json::to_string(p).unwrap_or_default())
                        .collect();
                    println!("-- Params: {}", params.join(", "));
                }
                println!();
                println!("{}", resolved.sql);
                ExitCode::SUCCESS
            }
            OutputFormat::Json => print_json(&resolved),
        },
        Err(e) => {
            eprintln!("Compilation error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_catalog(settings: &Settings, catalog: Option<PathBuf>, format: ListFormat) -> ExitCode {
    let catalog = match load_catalog(settings, catalog.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let ListFormat::Json = format {
        #[derive(Serialize)]
        struct Listing<'a> {
            tables: &'a [metrica::catalog::Table],
            metrics: &'a [metrica::catalog::Metric],
            dimensions: &'a [metrica::catalog::Dimension],
            joins: &'a [metrica::catalog::JoinEdge],
        }
        return print_json(&Listing {
            tables: catalog.all_tables(),
            metrics: catalog.all_metrics(),
            dimensions: catalog.all_dimensions(),
            joins: catalog.all_join_edges(),
        });
    }

    // List tables
    if !catalog.all_tables().is_empty() {
        println!("Tables:");
        for table in catalog.all_tables() {
            match &table.date_column {
                Some(column) => println!(
                    "  - {} (database: {}, date column: {})",
                    table.table_ref, table.table_ref.catalog_id, column
                ),
                None => println!(
                    "  - {} (database: {})",
                    table.table_ref, table.table_ref.catalog_id
                ),
            }
        }
        println!();
    }

    // List metrics
    if !catalog.all_metrics().is_empty() {
        println!("Metrics:");
        for metric in catalog.all_metrics() {
            println!(
                "  - {} = {}({}) on {}",
                metric.name, metric.aggregation, metric.expression, metric.table
            );
            if !metric.description.is_empty() {
                println!("      {}", metric.description);
            }
        }
        println!();
    }

    // List dimensions
    if !catalog.all_dimensions().is_empty() {
        println!("Dimensions:");
        for dimension in catalog.all_dimensions() {
            println!(
                "  - {} = {} on {}",
                dimension.name,
                dimension.sql_text(),
                dimension.table
            );
            if !dimension.description.is_empty() {
                println!("      {}", dimension.description);
            }
        }
        println!();
    }

    // List joins
    if catalog.all_join_edges().is_empty() {
        println!("No joins defined.");
    } else {
        println!("Joins:");
        for edge in catalog.all_join_edges() {
            println!("  - {}", edge);
        }
    }

    ExitCode::SUCCESS
}

fn cmd_check(
    settings: &Settings,
    catalog_path: Option<PathBuf>,
    intent_path: Option<PathBuf>,
    now: Option<NaiveDate>,
) -> ExitCode {
    let catalog = match load_catalog(settings, catalog_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Validation errors:");
            eprintln!("  {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "OK: catalog is valid ({} tables, {} metrics, {} dimensions, {} joins)",
        catalog.all_tables().len(),
        catalog.all_metrics().len(),
        catalog.all_dimensions().len(),
        catalog.all_join_edges().len()
    );

    let Some(intent_path) = intent_path else {
        return ExitCode::SUCCESS;
    };

    let intent = match read_intent(&intent_path) {
        Ok(i) => i,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let now = now.unwrap_or_else(today);
    match validation::validate_with_max_limit(
        &intent,
        &catalog,
        now,
        settings.compiler.max_limit,
    ) {
        ValidationResult::Valid(Some(_))
            if catalog
                .lookup_metric(&intent.metric)
                .map(|m| catalog.time_column_for(m).is_none())
                .unwrap_or(false) =>
        {
            eprintln!("Validation errors:");
            eprintln!(
                "  time_range: metric '{}' has no date column to filter on",
                intent.metric
            );
            ExitCode::FAILURE
        }
        ValidationResult::Valid(_) => {
            println!("OK: {} is valid", intent_path.display());
            ExitCode::SUCCESS
        }
        ValidationResult::Invalid(errors) => {
            eprintln!("Validation errors:");
            for error in errors.iter() {
                eprintln!("  {}", error);
            }
            ExitCode::FAILURE
        }
    }
}

fn load_catalog(settings: &Settings, path: Option<&Path>) -> Result<Catalog, String> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => settings
            .catalog
            .resolved_path()
            .map_err(|e| e.to_string())?
            .ok_or_else(|| {
                "no catalog given: pass --catalog or set [catalog] path in metrica.toml"
                    .to_string()
            })?,
    };
    Catalog::from_file(&path).map_err(|e| e.to_string())
}

fn read_intent(path: &Path) -> Result<QueryIntent, String> {
    let source = if path == Path::new("-") {
        io::read_to_string(io::stdin()).map_err(|e| format!("Error reading stdin: {}", e))?
    } else {
        fs::read_to_string(path)
            .map_err(|e| format!("Error reading file '{}': {}", path.display(), e))?
    };
    serde_json::from_str(&source).map_err(|e| format!("Invalid intent JSON: {}", e))
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
