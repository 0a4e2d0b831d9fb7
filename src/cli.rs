//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::adapters::console_progress::ConsoleProgress;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{replay_book, BacktestConfig, BacktestEngine, RunSummary};
use crate::domain::config_validation::{
    optional_date, required_date, validate_config, validate_data_config,
};
use crate::domain::error::MomtraderError;
use crate::domain::execution::{TradeCosts, UnitPolicy};
use crate::domain::momentum::{
    build_signals, rank_relative_momentum, MonthlyRanking, RankingConfig,
};
use crate::domain::position_tracker::{self, TrackerOutcome};
use crate::domain::price_table::{PriceTable, DEFAULT_BENCHMARK};
use crate::domain::trade_book::TradeBook;
use crate::domain::universe::resolve_universe;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::progress_port::ProgressPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "momtrader", about = "Momentum signal backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the momentum pipeline and replay every instrument
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Write the trade book as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Log every order, overriding [backtest] verbose
        #[arg(long)]
        verbose: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the loaded price table
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            output,
            verbose,
        } => run_backtest(&config, output.as_deref(), verbose),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config } => run_info(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, MomtraderError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

/// Log filter from `RUST_LOG`-style directives. INFO applies only when
/// `directives` names no level of its own.
pub fn log_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives)
}

/// Where prices come from and how the universe is picked.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub prices_path: PathBuf,
    pub benchmark: String,
    pub codes: Option<String>,
    pub start_date: Option<NaiveDate>,
}

pub fn build_data_settings(adapter: &dyn ConfigPort) -> Result<DataSettings, MomtraderError> {
    let prices_path = adapter
        .get_string("data", "prices_path")
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| MomtraderError::ConfigMissing {
            section: "data".into(),
            key: "prices_path".into(),
        })?;

    Ok(DataSettings {
        prices_path: PathBuf::from(prices_path.trim()),
        benchmark: adapter
            .get_string("data", "benchmark")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_BENCHMARK.to_string()),
        codes: adapter
            .get_string("data", "codes")
            .filter(|s| !s.trim().is_empty()),
        start_date: optional_date(adapter, "data", "start_date")?,
    })
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, MomtraderError> {
    let unit_policy = match adapter.get_string("backtest", "unit_policy") {
        Some(s) => UnitPolicy::parse(&s).ok_or_else(|| MomtraderError::ConfigInvalid {
            section: "backtest".into(),
            key: "unit_policy".into(),
            reason: format!("unknown policy {s:?}"),
        })?,
        None => UnitPolicy::default(),
    };

    Ok(BacktestConfig {
        initial_amount: adapter.get_double("backtest", "initial_amount", 10_000_000.0),
        costs: TradeCosts::new(
            adapter.get_double("backtest", "ftc", 0.0),
            adapter.get_double("backtest", "ptc", 0.0),
        ),
        unit_policy,
        verbose: adapter.get_bool("backtest", "verbose", false),
    })
}

pub fn build_ranking_config(adapter: &dyn ConfigPort) -> RankingConfig {
    let defaults = RankingConfig::default();
    RankingConfig {
        lookback_months: adapter
            .get_int("momentum", "lookback_months", defaults.lookback_months as i64)
            .max(1) as usize,
        top_n: adapter
            .get_int("momentum", "top_n", defaults.top_n as i64)
            .max(1) as usize,
        absolute_filter: adapter.get_bool("momentum", "absolute_filter", defaults.absolute_filter),
    }
}

/// Resolve the universe against the source and build the price table.
/// Returns the table with the universe in table column order.
pub fn load_table(
    data_port: &dyn DataPort,
    settings: &DataSettings,
) -> Result<(PriceTable, Vec<String>), MomtraderError> {
    let available = data_port.list_instruments()?;
    if !available.contains(&settings.benchmark) {
        return Err(MomtraderError::UnknownColumn {
            column: settings.benchmark.clone(),
        });
    }

    let universe = resolve_universe(settings.codes.as_deref(), &available, &settings.benchmark)
        .map_err(|e| MomtraderError::ConfigInvalid {
            section: "data".into(),
            key: "codes".into(),
            reason: e.to_string(),
        })?;

    let mut columns = universe.clone();
    columns.push(settings.benchmark.clone());
    let raw = data_port.fetch_prices(&columns, settings.start_date)?;
    let table = PriceTable::build(raw, &settings.benchmark)?;

    let ordered = table
        .constituents()
        .map(|inst| inst.name.clone())
        .filter(|name| universe.contains(name))
        .collect();
    Ok((table, ordered))
}

pub struct PipelineOutcome {
    pub table: PriceTable,
    pub universe: Vec<String>,
    pub rankings: Vec<MonthlyRanking>,
    pub book: TradeBook,
    pub tracker: TrackerOutcome,
    pub replays: Vec<(String, RunSummary)>,
    /// Instruments whose replay failed, with the reason.
    pub skipped: Vec<(String, String)>,
}

/// Load, rank, track and replay. Replay failures skip the instrument
/// instead of aborting the run.
pub fn run_pipeline(
    data_port: &dyn DataPort,
    settings: &DataSettings,
    bt_config: &BacktestConfig,
    ranking: &RankingConfig,
    base_date: NaiveDate,
    progress: Option<&dyn ProgressPort>,
) -> Result<PipelineOutcome, MomtraderError> {
    let (table, universe) = load_table(data_port, settings)?;
    eprintln!(
        "Loaded {} bars for {} instruments (benchmark {})",
        table.len(),
        universe.len(),
        table.benchmark().name
    );

    let signals = build_signals(&table, &universe, base_date)?;
    let rankings = rank_relative_momentum(&table, &signals, ranking);
    eprintln!(
        "Ranked {} months from {} (lookback {}, top {})",
        rankings.len(),
        base_date,
        ranking.lookback_months,
        ranking.top_n
    );

    let mut book = TradeBook::from_signals(&signals);
    book.seed_ready(&rankings);
    let tracker = position_tracker::run(&mut book);

    let mut replays = Vec::with_capacity(universe.len());
    let mut skipped = Vec::new();
    for code in &universe {
        let mut engine = BacktestEngine::new(&table, bt_config.clone());
        if let Some(progress) = progress {
            engine = engine.with_progress(progress);
        }
        match replay_book(&mut engine, &book, code) {
            Ok(summary) => replays.push((code.clone(), summary)),
            Err(e) => {
                tracing::warn!(code = %code, error = %e, "skipping replay");
                skipped.push((code.clone(), e.to_string()));
            }
        }
    }

    Ok(PipelineOutcome {
        table,
        universe,
        rankings,
        book,
        tracker,
        replays,
        skipped,
    })
}

fn run_backtest(
    config_path: &Path,
    output_path: Option<&Path>,
    verbose: bool,
) -> Result<(), MomtraderError> {
    let adapter = load_config(config_path)?;
    validate_config(&adapter)?;

    let settings = build_data_settings(&adapter)?;
    let mut bt_config = build_backtest_config(&adapter)?;
    bt_config.verbose |= verbose;
    let ranking = build_ranking_config(&adapter);
    let base_date = required_date(&adapter, "momentum", "base_date")?;

    eprintln!("Reading prices from {}", settings.prices_path.display());
    let data_port = CsvAdapter::new(settings.prices_path.clone());
    let progress = ConsoleProgress::new();
    let outcome = run_pipeline(
        &data_port,
        &settings,
        &bt_config,
        &ranking,
        base_date,
        Some(&progress),
    )?;

    print_summary(&outcome);

    if let Some(path) = output_path {
        CsvReportAdapter::new().write(&outcome.book, path)?;
        eprintln!("\nTrade book written to: {}", path.display());
    }
    Ok(())
}

fn print_summary(outcome: &PipelineOutcome) {
    eprintln!("\n=== Momentum ===");
    eprintln!("Cumulative Return:  {:.4}", outcome.tracker.acc_rtn);
    eprintln!("Realized Trades:    {}", outcome.tracker.trades.len());
    for trade in &outcome.tracker.trades {
        let entry = trade
            .entry_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        eprintln!(
            "  {}  {} -> {}  {:+.2}%",
            trade.code,
            entry,
            trade.exit_date,
            trade.return_pct * 100.0
        );
    }

    eprintln!("\n=== Replay ===");
    for (code, summary) in &outcome.replays {
        eprintln!("{code}");
        eprintln!("  Final balance   [$] {:.2}", summary.final_balance);
        eprintln!("  Performance     [%] {:.2}", summary.performance_pct);
        eprintln!("  Trades Executed [#] {}", summary.trades);
    }
    for (code, reason) in &outcome.skipped {
        eprintln!("warning: skipped {code} ({reason})");
    }
}

fn run_validate(config_path: &Path) -> Result<(), MomtraderError> {
    let adapter = load_config(config_path)?;
    validate_config(&adapter)?;

    let settings = build_data_settings(&adapter)?;
    let bt_config = build_backtest_config(&adapter)?;
    let ranking = build_ranking_config(&adapter);

    eprintln!("\nData:");
    eprintln!("  prices:    {}", settings.prices_path.display());
    eprintln!("  benchmark: {}", settings.benchmark);
    eprintln!(
        "  codes:     {}",
        settings.codes.as_deref().unwrap_or("(all non-benchmark columns)")
    );
    eprintln!("\nBacktest:");
    eprintln!("  initial amount: {:.2}", bt_config.initial_amount);
    eprintln!(
        "  costs:          ftc {} / ptc {}",
        bt_config.costs.fixed, bt_config.costs.proportional
    );
    eprintln!("  unit policy:    {:?}", bt_config.unit_policy);
    eprintln!("\nMomentum:");
    eprintln!("  lookback months: {}", ranking.lookback_months);
    eprintln!("  top n:           {}", ranking.top_n);
    eprintln!("  absolute filter: {}", ranking.absolute_filter);

    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_info(config_path: &Path) -> Result<(), MomtraderError> {
    let adapter = load_config(config_path)?;
    validate_data_config(&adapter)?;
    let settings = build_data_settings(&adapter)?;

    let data_port = CsvAdapter::new(settings.prices_path.clone());
    let (table, _) = load_table(&data_port, &settings)?;
    print!("{}", describe_table(&table));
    Ok(())
}

/// Plain-text table overview: bar count, date range and the final
/// cumulative returns of every instrument.
pub fn describe_table(table: &PriceTable) -> String {
    let mut out = String::new();
    let dates = table.dates();
    if let (Some(first), Some(last)) = (dates.first(), dates.last()) {
        out.push_str(&format!("{} bars, {} to {}\n", table.len(), first, last));
    }
    for inst in table.instruments() {
        let acc = inst.derived.acc.last().copied().unwrap_or(0.0);
        let log_acc = inst.derived.log_acc.last().copied().unwrap_or(0.0);
        let tag = if inst.is_benchmark() { " (benchmark)" } else { "" };
        out.push_str(&format!(
            "{}{}: acc {:.4}, log_acc {:.4}\n",
            inst.name, tag, acc, log_acc
        ));
    }
    out
}
