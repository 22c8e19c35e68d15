//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::paper_execution_adapter::PaperExecutionAdapter;
use crate::domain::config_validation::{load_app_config, load_data_dir, load_pass_config};
use crate::domain::distribution::Selection;
use crate::domain::error::EquiscoreError;
use crate::domain::execution::{ExecutionGate, FillReport};
use crate::domain::orchestrator::{AnalysisOrchestrator, PassConfig, PassPhase, PassSummary};
use crate::domain::scored::ScoredResult;
use crate::domain::universe::Universe;
use crate::ports::execution_port::ExecutionPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "equiscore", about = "Equitable scoring and diversified selection of equities")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score the configured universe and select the top K
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        top: Option<usize>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Hand the top result to the paper execution adapter
        #[arg(long)]
        execute: bool,
    },
    /// Score a single symbol against an empty tally
    Score {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            data_dir,
            top,
            output,
            execute,
        } => run_pass(&config, data_dir.as_deref(), top, output.as_deref(), execute),
        Command::Score {
            config,
            symbol,
            data_dir,
        } => run_score(&config, &symbol, data_dir.as_deref()),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn report_failure(err: EquiscoreError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

fn runtime() -> Result<tokio::runtime::Runtime, EquiscoreError> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

/// A completed pass and its selection.
#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub summary: PassSummary,
    pub selection: Selection,
}

/// Start a pass, wait for it and fetch the selection of `config.top_k`.
pub async fn execute_pass<P: MarketDataPort + 'static>(
    orchestrator: &AnalysisOrchestrator<P>,
    universe: Universe,
    config: PassConfig,
) -> Result<PassOutcome, EquiscoreError> {
    let handle = orchestrator.start_pass(universe, config)?;
    let phase = handle.wait().await;
    let summary = orchestrator
        .summary()
        .ok_or_else(|| EquiscoreError::PassFailed {
            reason: format!("pass ended in phase {phase} without a summary"),
        })?;
    match phase {
        PassPhase::Completed => {}
        PassPhase::Stopped => {
            return Err(EquiscoreError::PassFailed {
                reason: "pass stopped before any symbol was scored".to_string(),
            });
        }
        _ => {
            return Err(EquiscoreError::PassFailed {
                reason: format!(
                    "no symbol could be scored ({} of {} failed)",
                    summary.errors, summary.total
                ),
            });
        }
    }
    let selection = orchestrator.selection(config.top_k)?;
    Ok(PassOutcome { summary, selection })
}

/// Submit the top selected result when it clears the gate.
pub fn hand_off(
    gate: &ExecutionGate,
    selection: &Selection,
    port: &dyn ExecutionPort,
) -> Result<Option<FillReport>, EquiscoreError> {
    let Some(top) = selection.top() else {
        return Ok(None);
    };
    match gate.plan(top) {
        Some(request) => port.submit(&request).map(Some),
        None => {
            info!(
                symbol = %top.symbol,
                score = top.equitable_score,
                threshold = gate.score_threshold,
                "top result below execution threshold"
            );
            Ok(None)
        }
    }
}

fn run_pass(
    config_path: &Path,
    data_dir: Option<&Path>,
    top: Option<usize>,
    output_path: Option<&Path>,
    execute: bool,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let mut app = match load_app_config(&adapter) {
        Ok(app) => app,
        Err(e) => return report_failure(e),
    };
    if let Some(k) = top {
        app.pass.top_k = k;
    }
    let data_dir = data_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&app.data_dir));

    let rt = match runtime() {
        Ok(rt) => rt,
        Err(e) => return report_failure(e),
    };

    eprintln!(
        "Scoring {} symbols from {} (batch size {}, {} diversity)",
        app.universe.count(),
        data_dir.display(),
        app.pass.batch_size,
        app.pass.diversity_mode
    );
    let orchestrator = AnalysisOrchestrator::with_config(CsvAdapter::new(data_dir), app.pass);
    let outcome = match rt.block_on(execute_pass(&orchestrator, app.universe, app.pass)) {
        Ok(outcome) => outcome,
        Err(e) => return report_failure(e),
    };

    print_summary(&outcome.summary);
    print_selection(&outcome.selection);

    if let Some(path) = output_path {
        let path_str = path.to_string_lossy();
        if let Err(e) = CsvReportAdapter::new().write(&outcome.summary, &outcome.selection, &path_str) {
            return report_failure(e);
        }
        eprintln!("\nReport written to: {}", path.display());
    }

    if execute {
        let executor = PaperExecutionAdapter::new();
        match hand_off(&app.execution, &outcome.selection, &executor) {
            Ok(Some(fill)) => eprintln!("\nExecution: {}", fill.message),
            Ok(None) => eprintln!(
                "\nExecution: no result at or above {:.1}",
                app.execution.score_threshold
            ),
            Err(e) => return report_failure(e),
        }
    }

    ExitCode::SUCCESS
}

fn run_score(config_path: &Path, symbol: &str, data_dir: Option<&Path>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let pass = match load_pass_config(&adapter) {
        Ok(pass) => pass,
        Err(e) => return report_failure(e),
    };
    let data_dir = data_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(load_data_dir(&adapter)));

    let rt = match runtime() {
        Ok(rt) => rt,
        Err(e) => return report_failure(e),
    };
    let orchestrator = AnalysisOrchestrator::with_config(CsvAdapter::new(data_dir), pass);
    match rt.block_on(orchestrator.score_single(&symbol.trim().to_uppercase(), None)) {
        Ok(result) => {
            print!("{}", format_result(&result));
            ExitCode::SUCCESS
        }
        Err(e) => report_failure(e),
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let app = match load_app_config(&adapter) {
        Ok(app) => app,
        Err(e) => return report_failure(e),
    };

    eprintln!("\nUniverse:");
    eprintln!("  symbols:  {}", app.universe.symbols.join(", "));
    eprintln!("  data_dir: {}", app.data_dir);
    eprintln!("\nPass:");
    eprintln!(
        "  batch {} / concurrency {} / lookback {} / top {} / {} diversity",
        app.pass.batch_size,
        app.pass.concurrency,
        app.pass.lookback_bars,
        app.pass.top_k,
        app.pass.diversity_mode
    );
    eprintln!("\nWeights:");
    for (name, weight) in app.pass.weights.named() {
        eprintln!("  {name:<10} {weight:.2}");
    }
    let k = app.pass.top_k;
    eprintln!(
        "\nCeilings for K={k}: {} per sector, {} per quintile",
        app.pass.distribution.sector_ceiling(k),
        app.pass.distribution.quintile_ceiling(k)
    );
    eprintln!(
        "Execution threshold: {:.1} ({:.0}% allocation)",
        app.execution.score_threshold,
        app.execution.allocation_fraction * 100.0
    );

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn print_summary(summary: &PassSummary) {
    eprintln!("\n=== Pass Summary ===");
    eprintln!("Phase:            {}", summary.phase);
    eprintln!("Scored:           {}/{}", summary.scored, summary.total);
    eprintln!("Errors:           {}", summary.errors);
    eprintln!("Batches:          {}", summary.batches);
    eprintln!("Average score:    {:.1}", summary.average_score);
    eprintln!("Elapsed:          {:.2}s", summary.elapsed.as_secs_f64());
    if summary.cancelled {
        eprintln!("Stopped early:    yes");
    }
    for (label, count) in &summary.distribution {
        eprintln!("  {:<12} {count}", label.to_string());
    }
}

fn print_selection(selection: &Selection) {
    let m = &selection.metrics;
    eprintln!("\n=== Selection (K={}) ===", selection.k);
    for entry in &selection.entries {
        let r = &entry.result;
        println!(
            "{:>3}  {:<8} {:<24} {}  {:>5.1}  {:<11} {}",
            entry.rank,
            r.symbol,
            r.sector,
            r.quintile.to_string(),
            r.equitable_score,
            r.recommendation.to_string(),
            entry.phase
        );
    }
    eprintln!(
        "\nSectors: {}  Quintiles: {}  Herfindahl: {:.3}  Gini: {:.3}",
        m.sectors_represented, m.quintiles_represented, m.herfindahl_index, m.gini_coefficient
    );
    eprintln!(
        "Diversity: {:.1}  Balance: {:.1}  Cap mix: {:.1}% small / {:.1}% mid / {:.1}% large",
        m.diversity_score, m.balance_score, m.small_cap_pct, m.mid_cap_pct, m.large_cap_pct
    );
    if selection.relaxed {
        eprintln!("Sector ceiling ({}) relaxed to fill K", selection.sector_ceiling);
    }
    for shortfall in &selection.shortfalls {
        eprintln!("warning: {shortfall}");
    }
}

/// Multi-line description of one scored symbol.
pub fn format_result(result: &ScoredResult) -> String {
    let s = &result.sub_scores;
    let mut out = format!(
        "{} ({}, {}, {})\n",
        result.symbol,
        result.sector,
        result.industry,
        result.quintile.label()
    );
    out.push_str(&format!(
        "  equitable {:.1}  overall {:.1}  diversity bonus {:+.1}\n",
        result.equitable_score, result.overall_score, result.diversity_bonus
    ));
    out.push_str(&format!(
        "  {} (confidence {:.0}%)\n",
        result.recommendation,
        result.confidence * 100.0
    ));
    out.push_str(&format!(
        "  rsi {:.1}  macd {:.1}  bollinger {:.1}  ma {:.1}  volume {:.1}  pattern {:.1}  risk {:.1}",
        s.rsi, s.macd, s.bollinger, s.ma, s.volume, s.pattern, s.risk
    ));
    if let Some(momentum) = s.momentum {
        out.push_str(&format!("  momentum {momentum:.1}"));
    }
    out.push('\n');
    for signal in &result.signals.buy {
        out.push_str(&format!("  + {signal}\n"));
    }
    for signal in &result.signals.sell {
        out.push_str(&format!("  - {signal}\n"));
    }
    for line in &result.reasoning {
        out.push_str(&format!("  * {line}\n"));
    }
    out
}
