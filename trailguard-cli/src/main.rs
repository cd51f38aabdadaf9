//! Trailguard CLI - replay recorded ticks through the drawdown monitor.
//!
//! Commands:
//! - `replay` - run a tick CSV through the configured risk model; liquidation
//!   instructions are written to stdout as JSON lines
//! - `check-config` - validate a config file and print it with its hash
//!
//! Logs go to stderr, filtered by `RUST_LOG` (default `info`).

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use trailguard_core::{
    build_risk_model, run_session, CsvTickFeed, JsonLinesExecutor, MonitorConfig, SessionSummary,
};

#[derive(Parser)]
#[command(
    name = "trailguard",
    about = "Trailguard CLI - trailing-high drawdown monitor"
)]
struct Cli {
    /// Emit logs as JSON instead of human-readable text.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a tick CSV (time,symbol,invested,high,low) through the monitor.
    Replay {
        /// Path to the tick CSV.
        #[arg(long)]
        ticks: PathBuf,

        /// Path to a TOML config file. Defaults to a single 5% trailing stop.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override maximum_drawdown_fraction on every trailing-stop model.
        #[arg(long, allow_negative_numbers = true)]
        max_drawdown: Option<f64>,
    },
    /// Validate a config file and print the normalized result.
    CheckConfig {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Override maximum_drawdown_fraction on every trailing-stop model.
        #[arg(long, allow_negative_numbers = true)]
        max_drawdown: Option<f64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Commands::Replay {
            ticks,
            config,
            max_drawdown,
        } => run_replay(ticks, config, max_drawdown),
        Commands::CheckConfig {
            config,
            max_drawdown,
        } => run_check_config(config, max_drawdown),
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&PathBuf>, max_drawdown: Option<f64>) -> Result<MonitorConfig> {
    let mut config = match path {
        Some(path) => MonitorConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => MonitorConfig::default(),
    };
    if let Some(fraction) = max_drawdown {
        config.override_fraction(fraction);
        config.validate()?;
    }
    Ok(config)
}

fn run_replay(
    ticks: PathBuf,
    config_path: Option<PathBuf>,
    max_drawdown: Option<f64>,
) -> Result<()> {
    let config = load_config(config_path.as_ref(), max_drawdown)?;
    info!(config_hash = %config.config_hash()?, "configuration loaded");

    let mut feed = CsvTickFeed::from_path(&ticks)
        .with_context(|| format!("opening ticks {}", ticks.display()))?;
    let mut model = build_risk_model(&config)?;
    let mut executor = JsonLinesExecutor::new(io::stdout().lock());

    let summary = run_session(&mut feed, model.as_mut(), &mut executor, &config.session)?;
    print_summary(&summary);
    Ok(())
}

fn run_check_config(config_path: PathBuf, max_drawdown: Option<f64>) -> Result<()> {
    let config = load_config(Some(&config_path), max_drawdown)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    println!("config_hash: {}", config.config_hash()?);
    Ok(())
}

fn print_summary(summary: &SessionSummary) {
    eprintln!();
    eprintln!("=== Replay Summary ===");
    match (summary.first_tick, summary.last_tick) {
        (Some(first), Some(last)) => eprintln!("Period:            {first} to {last}"),
        _ => eprintln!("Period:            (no ticks)"),
    }
    eprintln!("Ticks:             {}", summary.ticks);
    eprintln!("Instructions:      {}", summary.instructions);
    eprintln!("Rejected ticks:    {}", summary.rejected_ticks);
    eprintln!("Executor failures: {}", summary.executor_failures);
    eprintln!();
}
