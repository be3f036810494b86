//! reqclean CLI - clean customer request extracts
//!
//! # Commands
//!
//! ```bash
//! reqclean run                        # Clean the newest file in the source folder
//! reqclean run --input raw.csv        # Clean a specific file
//! reqclean check --input raw.csv      # Dry run, print the report
//! reqclean locate                     # Show which file a run would pick
//! reqclean example-config             # Print the built-in configuration
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use reqclean::config::CONFIG_ENV;
use reqclean::logs::{init_logging, LogFormat};
use reqclean::{customer_requests_config, dry_run_at, locate_latest, run_at, PipelineConfig, RunReport};

#[derive(Parser)]
#[command(name = "reqclean")]
#[command(about = "Validate and normalize customer request CSV extracts", long_about = None)]
struct Cli {
    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline and write the cleaned file
    Run {
        #[command(flatten)]
        source: SourceArgs,

        /// Override the output folder
        #[arg(long)]
        processed_dir: Option<PathBuf>,

        /// Also write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Run every stage without writing, print the report
    Check {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print the file a run would pick
    Locate {
        /// Config file (JSON or TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the built-in configuration as JSON
    ExampleConfig,
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Config file (JSON or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Source CSV (default: newest match in the source folder)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Capture instant stamped on every row, RFC 3339 (default: now)
    #[arg(long, value_parser = parse_ingested_at)]
    ingested_at: Option<DateTime<Utc>>,
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_format);

    let result = match cli.command {
        Commands::Run {
            source,
            processed_dir,
            report,
        } => cmd_run(&source, processed_dir, report.as_deref()),

        Commands::Check { source } => cmd_check(&source),

        Commands::Locate { config } => cmd_locate(config.as_deref()),

        Commands::ExampleConfig => cmd_example_config(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_run(args: &SourceArgs, processed_dir: Option<PathBuf>, report_path: Option<&Path>) -> CliResult<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(dir) = processed_dir {
        config.output.processed_dir = dir;
    }

    let source = resolve_source(args.input.as_deref(), &config)?;
    let report = run_at(&source, &config, args.ingested_at.unwrap_or_else(Utc::now))?;
    print_summary(&report);
    if let Some(ref output) = report.output_path {
        println!("{}", output.display());
    }

    if let Some(path) = report_path {
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
        eprintln!("   Report: {}", path.display());
    }
    Ok(())
}

fn cmd_check(args: &SourceArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref())?;
    let source = resolve_source(args.input.as_deref(), &config)?;
    let report = dry_run_at(&source, &config, args.ingested_at.unwrap_or_else(Utc::now))?;
    print_summary(&report);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_locate(config_path: Option<&Path>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let path = locate_latest(&config.source.path, &config.source.file_pattern)?;
    println!("{}", path.display());
    Ok(())
}

fn cmd_example_config() -> CliResult<()> {
    println!("{}", customer_requests_config().to_json()?);
    Ok(())
}

/// `--config`, then `$REQCLEAN_CONFIG`, then the built-in job; environment
/// overrides apply last.
fn load_config(path: Option<&Path>) -> CliResult<PipelineConfig> {
    let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    let config = match path.map(Path::to_path_buf).or(from_env) {
        Some(p) => PipelineConfig::from_file(&p)?,
        None => customer_requests_config(),
    };
    Ok(config.with_env_overrides())
}

fn resolve_source(input: Option<&Path>, config: &PipelineConfig) -> CliResult<PathBuf> {
    match input {
        Some(p) => Ok(p.to_path_buf()),
        None => Ok(locate_latest(&config.source.path, &config.source.file_pattern)?),
    }
}

fn parse_ingested_at(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("'{}' is not an RFC 3339 instant: {}", s, e))
}

fn print_summary(report: &RunReport) {
    eprintln!("Source: {}", report.source_path.display());
    eprintln!("   Encoding: {}", report.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(report.delimiter));
    eprintln!("   Rows read: {}", report.rows_read);
    for (column, n) in &report.filter.dropped_null {
        eprintln!("   Dropped (null {}): {}", column, n);
    }
    if report.filter.dropped_temporal > 0 {
        eprintln!("   Dropped (bad timestamp): {}", report.filter.dropped_temporal);
    }
    for (column, n) in &report.filter.dropped_not_allowed {
        eprintln!("   Dropped (disallowed {}): {}", column, n);
    }
    if report.dropped_hash > 0 {
        eprintln!("   Dropped (missing hash column): {}", report.dropped_hash);
    }
    eprintln!("   Rows kept: {}", report.rows_written);
    match report.output_path {
        Some(ref path) => eprintln!("   Output: {}", path.display()),
        None => eprintln!("   Output: none (dry run)"),
    }
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}
