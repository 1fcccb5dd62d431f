//! CLI definition and dispatch.
//!
//! Each subcommand runs a single cycle and prints its result as JSON on
//! stdout. Diagnostics go to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::memory_history_adapter::MemoryHistoryAdapter;
use crate::domain::config_validation::{
    build_history_retention, build_monitor_settings, build_scan_settings, build_sizing_settings,
    validate_config,
};
use crate::domain::error::TrendscanError;
use crate::domain::exit::ExitDecision;
use crate::domain::monitor::PositionMonitor;
use crate::domain::scanner::{MomentumOpportunity, MomentumScanner};
use crate::domain::sizing::{size_position, PositionSize};
use crate::ports::config_port::ConfigPort;
use crate::ports::price_history_port::PriceHistoryPort;

#[derive(Parser, Debug)]
#[command(name = "trendscan", about = "Momentum scanner and trend position monitor")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one scan cycle over a snapshot file
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        snapshots: PathBuf,
        /// Seed price history (CSV) loaded before scanning
        #[arg(long)]
        history: Option<PathBuf>,
        /// Evaluation time (RFC 3339), defaults to now
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
    /// Run one monitor cycle over open positions
    Monitor {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        positions: PathBuf,
        #[arg(long)]
        history: Option<PathBuf>,
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Opportunity together with the size the sizer suggests for it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizedOpportunity {
    #[serde(flatten)]
    pub opportunity: MomentumOpportunity,
    pub suggested_size: PositionSize,
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Scan {
            config,
            snapshots,
            history,
            now,
        } => run_scan(&config, &snapshots, history.as_deref(), now.unwrap_or_else(Utc::now)),
        Command::Monitor {
            config,
            positions,
            history,
            now,
        } => run_monitor(&config, &positions, history.as_deref(), now.unwrap_or_else(Utc::now)),
        Command::Validate { config } => run_validate(&config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, TrendscanError> {
    info!(file = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

/// History store for a cycle: SQLite when `[sqlite] path` is configured,
/// otherwise an in-process store. `[history] retention_hours` bounds both.
pub fn open_history_store(
    config: &dyn ConfigPort,
    now: DateTime<Utc>,
) -> Result<Box<dyn PriceHistoryPort>, TrendscanError> {
    let retention = build_history_retention(config)?;

    #[cfg(feature = "sqlite")]
    {
        if config.get_string("sqlite", "path").is_some() {
            use crate::adapters::sqlite_adapter::SqliteHistoryAdapter;

            let store = SqliteHistoryAdapter::from_config(config)?;
            store.initialize_schema()?;
            if let Some(retention) = retention {
                let removed = store.prune(retention, now)?;
                info!(removed, "pruned price history");
            }
            return Ok(Box::new(store));
        }
    }
    #[cfg(not(feature = "sqlite"))]
    let _ = now;

    Ok(match retention {
        Some(retention) => Box::new(MemoryHistoryAdapter::with_retention(retention)),
        None => Box::new(MemoryHistoryAdapter::new()),
    })
}

pub fn run_scan_pipeline(
    config: &dyn ConfigPort,
    snapshots: &Path,
    history: Option<&Path>,
    now: DateTime<Utc>,
) -> Result<Vec<SizedOpportunity>, TrendscanError> {
    let settings = build_scan_settings(config)?;
    let sizing = build_sizing_settings(config)?;

    let store = open_history_store(config, now)?;
    if let Some(path) = history {
        CsvAdapter::seed_history(path, store.as_ref())?;
    }

    let provider = CsvAdapter::new(snapshots.to_path_buf());
    let scanner = MomentumScanner::new(store.as_ref(), settings);
    let report = scanner.scan_from(&provider, now);

    Ok(report
        .opportunities
        .into_iter()
        .map(|opportunity| SizedOpportunity {
            suggested_size: size_position(&opportunity.indicators, &sizing),
            opportunity,
        })
        .collect())
}

pub fn run_monitor_pipeline(
    config: &dyn ConfigPort,
    positions: &Path,
    history: Option<&Path>,
    now: DateTime<Utc>,
) -> Result<Vec<ExitDecision>, TrendscanError> {
    let settings = build_monitor_settings(config)?;
    let mut positions = CsvAdapter::load_positions(positions)?;

    let store = open_history_store(config, now)?;
    if let Some(path) = history {
        CsvAdapter::seed_history(path, store.as_ref())?;
    }

    let monitor = PositionMonitor::new(store.as_ref(), settings);
    Ok(monitor.monitor(&mut positions, now))
}

fn run_scan(
    config_path: &Path,
    snapshots: &Path,
    history: Option<&Path>,
    now: DateTime<Utc>,
) -> Result<(), TrendscanError> {
    let config = load_config(config_path)?;
    let opportunities = run_scan_pipeline(&config, snapshots, history, now)?;
    print_json(&opportunities)
}

fn run_monitor(
    config_path: &Path,
    positions: &Path,
    history: Option<&Path>,
    now: DateTime<Utc>,
) -> Result<(), TrendscanError> {
    let config = load_config(config_path)?;
    let decisions = run_monitor_pipeline(&config, positions, history, now)?;
    print_json(&decisions)
}

fn run_validate(config_path: &Path) -> Result<(), TrendscanError> {
    let config = load_config(config_path)?;
    validate_config(&config)?;
    eprintln!("Configuration is valid.");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), TrendscanError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| TrendscanError::Io(std::io::Error::other(e)))?;
    println!("{json}");
    Ok(())
}
