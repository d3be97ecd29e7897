//! SectorPulse CLI: daily sector summaries and turnover momentum.
//!
//! Commands:
//! - `process`: summarize one trading date (latest raw file by default)
//! - `backfill`: process every raw date not yet summarized
//! - `views`: rebuild the sector_ranking and momentum_flow sheets
//! - `digest`: print the top/bottom sectors of the latest ledger date
//! - `ledger status`: row counts and date coverage per ledger
//! - `config`: print the effective configuration as TOML

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sectorpulse_core::domain::parse_flexible_date;
use sectorpulse_runner::config::PathsConfig;
use sectorpulse_runner::{
    CsvLedgerStore, DayReport, Pipeline, PipelineConfig, StageStatus,
};

#[derive(Parser)]
#[command(
    name = "sectorpulse",
    about = "SectorPulse: sector/tier aggregation and turnover momentum"
)]
struct Cli {
    /// Pipeline config (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Re-root every data directory under this path.
    #[arg(long, global = true)]
    data_root: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize one trading date.
    Process {
        /// Trading date (YYYY-MM-DD or YYYYMMDD). Defaults to the latest raw file.
        #[arg(long)]
        date: Option<String>,

        /// Print the day report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Process every raw date in range, oldest first.
    Backfill {
        /// First date to consider.
        #[arg(long)]
        from: Option<String>,

        /// Last date to consider.
        #[arg(long)]
        to: Option<String>,

        /// Reprocess dates whose artifacts already exist.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Rebuild the pivot view sheets from the ledgers.
    Views,
    /// Print the digest for the latest ledger date.
    Digest {
        /// Sectors per top/bottom table.
        #[arg(long)]
        top: Option<usize>,

        /// Print as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Ledger inspection commands.
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },
    /// Print the effective configuration.
    Config,
}

#[derive(Subcommand)]
enum LedgerAction {
    /// Row counts and date coverage per ledger.
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "sectorpulse={lvl},sectorpulse_core={lvl},sectorpulse_runner={lvl}",
                    lvl = cli.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(cli.config.as_ref(), cli.data_root.as_ref())?;

    match cli.command {
        Commands::Process { date, json } => run_process(config, date.as_deref(), json),
        Commands::Backfill { from, to, force } => {
            run_backfill(config, from.as_deref(), to.as_deref(), force)
        }
        Commands::Views => run_views(config),
        Commands::Digest { top, json } => run_digest(config, top, json),
        Commands::Ledger { action } => match action {
            LedgerAction::Status => run_ledger_status(config),
        },
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&PathBuf>, data_root: Option<&PathBuf>) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(p) => PipelineConfig::from_file(p)
            .with_context(|| format!("failed to load config {}", p.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(root) = data_root {
        let PathsConfig {
            stock_prefix,
            index_prefix,
            ..
        } = config.paths;
        config.paths = PathsConfig {
            stock_prefix,
            index_prefix,
            ..PathsConfig::rooted_at(root)
        };
    }
    tracing::debug!(ledger_dir = %config.paths.ledger_dir.display(), "config loaded");
    Ok(config)
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    match parse_flexible_date(s) {
        Some(d) => Ok(d),
        None => bail!("invalid date '{s}' (expected YYYY-MM-DD or YYYYMMDD)"),
    }
}

fn open_pipeline(config: PipelineConfig) -> Result<Pipeline<CsvLedgerStore>> {
    let store = CsvLedgerStore::new(config.paths.ledger_dir.clone());
    Ok(Pipeline::new(config, store)?)
}

fn run_process(config: PipelineConfig, date: Option<&str>, json: bool) -> Result<()> {
    let date = date.map(parse_date).transpose()?;
    let mut pipeline = open_pipeline(config)?;
    let report = pipeline.run_day(date)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_day(&report);
    }
    Ok(())
}

fn print_stage(name: &str, stage: &StageStatus) {
    match stage {
        StageStatus::Written { rows, artifact } => {
            println!("  {name:<10} {rows:>4} rows  → {}", artifact.display())
        }
        StageStatus::Skipped { reason } => println!("  {name:<10} skipped ({reason})"),
    }
}

fn print_day(report: &DayReport) {
    println!("=== {} ===", report.date);
    println!(
        "  raw rows   {:>4} in, {} kept, {} index rows dropped",
        report.sanitize.rows_in, report.sanitize.rows_kept, report.sanitize.index_rows_dropped
    );
    if report.sanitize.degraded_cells() > 0 {
        println!(
            "  degraded   {:>4} cells replaced by defaults",
            report.sanitize.degraded_cells()
        );
    }
    print_stage("sector", &report.sector);
    print_stage("momentum", &report.momentum);
    for m in &report.ledgers {
        println!(
            "  {:<13} +{} added, {} skipped, {} dropped, {} total",
            m.sheet, m.added, m.skipped, m.dropped, m.total
        );
    }
    println!("  manifest   {}", report.manifest.display());
}

fn run_backfill(
    config: PipelineConfig,
    from: Option<&str>,
    to: Option<&str>,
    force: bool,
) -> Result<()> {
    let from = from.map(parse_date).transpose()?;
    let to = to.map(parse_date).transpose()?;
    let mut pipeline = open_pipeline(config)?;
    let report = pipeline.backfill(from, to, force)?;

    println!(
        "Backfill: {} processed, {} skipped, {} failed",
        report.processed.len(),
        report.skipped.len(),
        report.failed.len()
    );
    for (date, err) in &report.failed {
        eprintln!("  {date}: {err}");
    }
    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_views(config: PipelineConfig) -> Result<()> {
    let mut pipeline = open_pipeline(config)?;
    let report = pipeline.refresh_views()?;
    for (sheet, rows) in [
        ("sector_ranking", report.sector_ranking_rows),
        ("momentum_flow", report.momentum_flow_rows),
    ] {
        match rows {
            Some(n) => println!("{sheet}: {n} rows written"),
            None => println!("{sheet}: ledger empty, not written"),
        }
    }
    Ok(())
}

fn run_digest(mut config: PipelineConfig, top: Option<usize>, json: bool) -> Result<()> {
    if let Some(n) = top {
        config.run.digest_top_n = n;
    }
    let pipeline = open_pipeline(config)?;
    let Some(digest) = pipeline.digest()? else {
        bail!("sector ledger is empty; run `sectorpulse process` first");
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&digest)?);
    } else {
        print!("{}", digest.render());
    }
    Ok(())
}

fn run_ledger_status(config: PipelineConfig) -> Result<()> {
    let ledger_dir = config.paths.ledger_dir.clone();
    let pipeline = open_pipeline(config)?;
    println!("Ledger directory: {}", ledger_dir.display());
    println!();
    println!(
        "{:<14} {:>7} {:>7}  {:<12} {:<12}",
        "Sheet", "Rows", "Dates", "First", "Last"
    );
    println!("{}", "-".repeat(58));
    for s in pipeline.ledger_status()? {
        let fmt = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
        println!(
            "{:<14} {:>7} {:>7}  {:<12} {:<12}",
            s.sheet,
            s.stats.rows,
            s.stats.distinct_dates,
            fmt(s.stats.first_date),
            fmt(s.stats.last_date)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["sectorpulse", "process", "--date", "2024-10-01"]).unwrap();
        assert!(matches!(cli.command, Commands::Process { date: Some(_), json: false }));

        let cli = Cli::try_parse_from(["sectorpulse", "--log-level", "debug", "ledger", "status"])
            .unwrap();
        assert_eq!(cli.log_level, "debug");
        assert!(matches!(cli.command, Commands::Ledger { action: LedgerAction::Status }));

        let cli = Cli::try_parse_from(["sectorpulse", "backfill", "--force"]).unwrap();
        assert!(matches!(cli.command, Commands::Backfill { force: true, .. }));
    }

    #[test]
    fn dates_accept_both_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
        assert_eq!(parse_date("2024-10-01").unwrap(), expected);
        assert_eq!(parse_date("20241001").unwrap(), expected);
        assert!(parse_date("yesterday").is_err());
    }

    #[test]
    fn data_root_keeps_file_prefixes() {
        let dir = PathBuf::from("/srv/sectorpulse");
        let config = load_config(None, Some(&dir)).unwrap();
        assert_eq!(config.paths.ledger_dir, dir.join("data/ledgers"));
        assert_eq!(config.paths.stock_prefix, "japan-all-stock-prices_");
    }
}
