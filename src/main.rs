use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Table};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use ev_dynamic_pricing::config::{Config, DEFAULT_CONFIG_PATH};
use ev_dynamic_pricing::forecast::evaluate_split;
use ev_dynamic_pricing::ingest::{
    load_sessions_csv, load_status_events_jsonl, write_hourly_csv, write_sessions_csv,
    write_status_sessions_csv, StatusLog,
};
use ev_dynamic_pricing::series::{hourly_energy, hourly_session_counts, HourlySeries};
use ev_dynamic_pricing::simulation::{simulate, RiskScenario, SessionGenerator, SynthConfig};
use ev_dynamic_pricing::telemetry::{init_tracing, shutdown_signal};

#[derive(Parser)]
#[command(name = "ev-pricing")]
#[command(author, version, about = "EV charger demand forecasting and dynamic pricing simulator")]
#[command(
    long_about = "Derive hourly charging demand from operator exports, evaluate demand\n\
    forecasters and simulate a day-ahead dynamic tariff against the flat price.\n\
    \nExamples:\n  \
    ev-pricing synth --output data/sessions.csv\n  \
    ev-pricing simulate\n  \
    ev-pricing evaluate --split 2024-08-01\n  \
    ev-pricing sessions --input data/status.jsonl --read-first 100000"
)]
struct Cli {
    /// Configuration file (EVPRICE__* env vars override it)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk-forward dynamic pricing simulation over the configured window
    Simulate(SimulateArgs),

    /// Train/test evaluation of the configured forecaster
    Evaluate(EvaluateArgs),

    /// Extract charging sessions from a status-event stream
    Sessions(SessionsArgs),

    /// Write a synthetic sessions CSV
    Synth(SynthArgs),
}

#[derive(Args)]
struct SimulateArgs {
    /// Sessions CSV (defaults to data.sessions_csv)
    #[arg(long)]
    sessions: Option<PathBuf>,

    /// Output directory (defaults to output.directory)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Run only the single 0.6-1.4 baseline scenario
    #[arg(long)]
    baseline: bool,
}

#[derive(Args)]
struct EvaluateArgs {
    #[arg(long)]
    sessions: Option<PathBuf>,

    /// Train on data up to this date (defaults to forecast.evaluation_split)
    #[arg(long)]
    split: Option<NaiveDate>,
}

#[derive(Args)]
struct SessionsArgs {
    /// Status-event JSONL (defaults to data.status_jsonl)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Stop after this many lines
    #[arg(long)]
    read_first: Option<usize>,

    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Args)]
struct SynthArgs {
    #[arg(long, default_value = "data/sessions.csv")]
    output: PathBuf,

    #[arg(long, default_value_t = 270)]
    days: u32,

    #[arg(long)]
    start: Option<NaiveDate>,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let cfg = Config::load_from(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    match cli.command {
        Commands::Simulate(args) => run_simulate(&cfg, args).await,
        Commands::Evaluate(args) => run_evaluate(&cfg, args),
        Commands::Sessions(args) => run_sessions(&cfg, args),
        Commands::Synth(args) => run_synth(args),
    }
}

fn load_hourly_demand(path: &Path) -> Result<HourlySeries> {
    let (sessions, stats) = load_sessions_csv(path)
        .with_context(|| format!("loading sessions from {}", path.display()))?;
    info!(
        rows = stats.rows,
        kept = stats.kept,
        bad_timestamp = stats.bad_timestamp,
        bad_energy = stats.bad_energy,
        bad_row = stats.bad_row,
        "loaded sessions"
    );
    hourly_energy(&sessions).context("deriving hourly demand")
}

async fn run_simulate(cfg: &Config, args: SimulateArgs) -> Result<()> {
    let path = args.sessions.unwrap_or_else(|| cfg.data.sessions_csv.clone());
    let series = Arc::new(load_hourly_demand(&path)?);

    let scenarios = if args.baseline {
        vec![RiskScenario::baseline()]
    } else {
        cfg.simulation.scenarios.clone()
    };

    let settings = cfg.settings();
    let run = simulate(
        series,
        cfg.forecast.build(),
        cfg.window(),
        &scenarios,
        &settings,
    );
    let report = tokio::select! {
        report = run => report.context("simulation failed")?,
        _ = shutdown_signal() => {
            warn!("simulation aborted, no outputs written");
            return Ok(());
        }
    };

    if !report.skipped_days.is_empty() {
        warn!(
            skipped = report.skipped_days.len(),
            first = %report.skipped_days[0],
            "days skipped for lack of history"
        );
    }

    let dir = args.output_dir.unwrap_or_else(|| cfg.output.directory.clone());
    let written = report
        .write_outputs(&dir)
        .with_context(|| format!("writing outputs to {}", dir.display()))?;
    for path in &written {
        info!(path = %path.display(), "written");
    }

    println!("{}", report.totals_table());
    Ok(())
}

fn run_evaluate(cfg: &Config, args: EvaluateArgs) -> Result<()> {
    let path = args.sessions.unwrap_or_else(|| cfg.data.sessions_csv.clone());
    let series = load_hourly_demand(&path)?;

    let split = args
        .split
        .map(|d| d.and_time(NaiveTime::MIN))
        .unwrap_or_else(|| cfg.forecast.split_at());
    let forecaster = cfg.forecast.build();
    let report = evaluate_split(&series, split, forecaster.as_ref())
        .with_context(|| format!("evaluating {} at {split}", forecaster.name()))?;

    println!("{} ({} train / {} test hours)", report.forecaster, report.train_points, report.test_points);
    println!("{}", report.metrics);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Season").add_attribute(Attribute::Bold),
        Cell::new("MAE (Wh)").add_attribute(Attribute::Bold),
    ]);
    for (season, mae) in &report.mae_by_season {
        table.add_row(vec![Cell::new(season), Cell::new(format!("{mae:.1}"))]);
    }
    println!("{table}");
    Ok(())
}

fn run_sessions(cfg: &Config, args: SessionsArgs) -> Result<()> {
    let input = args.input.unwrap_or_else(|| cfg.data.status_jsonl.clone());
    let read_first = args.read_first.or(cfg.data.read_first);

    let events = load_status_events_jsonl(&input, read_first)
        .with_context(|| format!("reading status events from {}", input.display()))?;
    let log = StatusLog::from_events(events);

    let statuses: Vec<String> = log.unique_statuses().iter().map(|s| s.to_string()).collect();
    println!("Unique statuses: {}", statuses.join(", "));

    let sessions = log.extract_sessions();
    info!(chargers = log.charger_count(), sessions = sessions.len(), "extracted sessions");

    let dir = args.output_dir.unwrap_or_else(|| cfg.output.directory.clone());
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    write_status_sessions_csv(&dir.join("status_sessions.csv"), &sessions)
        .context("writing status sessions")?;
    let counts = hourly_session_counts(&sessions).context("counting sessions per hour")?;
    write_hourly_csv(&dir.join("hourly_session_counts.csv"), &counts, "sessions")
        .context("writing hourly counts")?;
    Ok(())
}

fn run_synth(args: SynthArgs) -> Result<()> {
    let defaults = SynthConfig::default();
    let config = SynthConfig {
        start: args.start.unwrap_or(defaults.start),
        days: args.days,
        random_seed: Some(args.seed),
        ..defaults
    };
    let sessions = SessionGenerator::new(config)?.generate();

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    write_sessions_csv(&args.output, &sessions)
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!(path = %args.output.display(), sessions = sessions.len(), "synthetic sessions written");
    Ok(())
}
