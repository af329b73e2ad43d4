use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::{info, warn};

use npm_age_filter::config::{AgeFilterConfig, QuarantineDays, config_path, log_path};
use npm_age_filter::filter::metadata::is_package_metadata;
use npm_age_filter::filter::publish_time::parse_timestamp;
use npm_age_filter::filter::{AgeFilter, FilterReport};
use npm_age_filter::logging::{LogOptions, init_logging};

#[derive(Parser)]
#[command(name = "npm-age-filter")]
#[command(version, about = "Hide recently published versions from npm package metadata")]
struct Cli {
    /// Write logs to a file (defaults to the data directory when no path is given)
    #[arg(long, global = true, value_name = "PATH", num_args = 0..=1)]
    log_file: Option<Option<PathBuf>>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Filter a package metadata document read from a file or stdin
    Filter(FilterArgs),
    /// Print the effective configuration
    Config {
        /// Config file to read instead of the default location
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Metadata document to filter; reads stdin when omitted
    input: Option<PathBuf>,

    /// Quarantine window in days, overriding the config file
    #[arg(long)]
    days: Option<f64>,

    /// Config file to read instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Evaluate ages relative to this ISO-8601 instant instead of now
    #[arg(long, value_name = "TIMESTAMP")]
    now: Option<String>,

    /// Print what was removed and repaired to stderr
    #[arg(long)]
    report: bool,

    /// Write compact JSON instead of pretty-printed output
    #[arg(long)]
    compact: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _guard = init_logging(&LogOptions {
        file: cli.log_file.map(|path| path.unwrap_or_else(log_path)),
        json: cli.json_logs,
    })?;

    match cli.command {
        Command::Filter(args) => run_filter(args),
        Command::Config { config } => show_config(config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<(PathBuf, AgeFilterConfig)> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
    let config = AgeFilterConfig::load(&path)?;
    Ok((path, config))
}

fn show_config(path: Option<&Path>) -> anyhow::Result<()> {
    let (path, config) = load_config(path)?;

    println!("config file:     {}", path.display());
    println!("log file:        {}", log_path().display());
    println!("quarantine days: {}", config.quarantine_days.days());

    Ok(())
}

fn run_filter(args: FilterArgs) -> anyhow::Result<()> {
    let days = resolve_days(args.config.as_deref(), args.days)?;
    let now = resolve_now(args.now.as_deref())?;

    let input = read_input(args.input.as_deref())?;
    let (document, report) = filter_document(&input, days, now)?;

    write_output(&document, args.compact)?;

    if args.report {
        let mut stderr = std::io::stderr().lock();
        serde_json::to_writer_pretty(&mut stderr, &report)?;
        writeln!(stderr)?;
    }

    Ok(())
}

/// Quarantine window from `--days`, falling back to the config file
fn resolve_days(config: Option<&Path>, days: Option<f64>) -> anyhow::Result<QuarantineDays> {
    match days {
        Some(days) => Ok(QuarantineDays::new(days)),
        None => {
            let (_, config) = load_config(config)?;
            Ok(config.quarantine_days)
        }
    }
}

fn resolve_now(raw: Option<&str>) -> anyhow::Result<DateTime<Utc>> {
    match raw {
        Some(raw) => {
            parse_timestamp(raw).with_context(|| format!("Invalid --now timestamp: {raw}"))
        }
        None => Ok(Utc::now()),
    }
}

/// Parse and filter a metadata document. Non-metadata JSON is returned as is.
fn filter_document(
    input: &str,
    days: QuarantineDays,
    now: DateTime<Utc>,
) -> anyhow::Result<(Value, FilterReport)> {
    let mut document: Value = serde_json::from_str(input).context("Input is not valid JSON")?;

    if !is_package_metadata(&document) {
        warn!("Input is not package metadata, writing it unchanged");
    }

    info!(quarantine_days = days.days(), now = %now, "Filtering metadata");
    let filter = AgeFilter::from_config(&AgeFilterConfig {
        quarantine_days: days,
    });
    let report = filter.filter_report_at(&mut document, now);

    Ok((document, report))
}

fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read stdin")?;
            Ok(input)
        }
    }
}

fn write_output(document: &Value, compact: bool) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    if compact {
        serde_json::to_writer(&mut stdout, document)?;
    } else {
        serde_json::to_writer_pretty(&mut stdout, document)?;
    }
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
