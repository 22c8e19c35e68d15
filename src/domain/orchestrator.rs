//! Full-universe scoring passes.
//!
//! A pass walks the universe in fixed-size batches. Symbols inside a batch
//! are fetched and scored concurrently; the diversity tally is only updated
//! once the whole batch has come back, so every symbol in a batch sees the
//! same snapshot. A stop request is honoured between batches. After the last
//! batch the accumulated results are handed to the distribution selector.
//!
//! Phase changes are published on a `watch` channel so callers can wait
//! for a pass to finish without polling.

use crate::domain::distribution::{rank_order, DistributionSelector, DistributionSettings, Selection};
use crate::domain::equitable::{DiversityMode, DiversityTally};
use crate::domain::error::EquiscoreError;
use crate::domain::indicator::round_to;
use crate::domain::pipeline::{evaluate_symbol, Evaluation};
use crate::domain::recommendation::{Recommendation, RecommendationMode};
use crate::domain::scored::ScoredResult;
use crate::domain::scoring::ScoreWeights;
use crate::domain::universe::{ensure_history, Universe};
use crate::ports::market_data_port::MarketDataPort;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Tunables for one pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassConfig {
    pub batch_size: usize,
    /// Symbols in flight at once inside a batch.
    pub concurrency: usize,
    pub lookback_bars: usize,
    pub top_k: usize,
    pub weights: ScoreWeights,
    pub distribution: DistributionSettings,
    pub diversity_mode: DiversityMode,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            concurrency: 8,
            lookback_bars: 250,
            top_k: 10,
            weights: ScoreWeights::default(),
            distribution: DistributionSettings::default(),
            diversity_mode: DiversityMode::default(),
        }
    }
}

impl PassConfig {
    pub fn validated(self) -> Result<Self, EquiscoreError> {
        let invalid = |key: &str, reason: &str| EquiscoreError::ConfigInvalid {
            section: "pass".to_string(),
            key: key.to_string(),
            reason: reason.to_string(),
        };
        if !(1..=500).contains(&self.batch_size) {
            return Err(invalid("batch_size", "batch_size must be between 1 and 500"));
        }
        if !(1..=256).contains(&self.concurrency) {
            return Err(invalid("concurrency", "concurrency must be between 1 and 256"));
        }
        if self.concurrency > self.batch_size {
            return Err(invalid(
                "concurrency",
                "concurrency must not exceed batch_size",
            ));
        }
        if !(30..=5000).contains(&self.lookback_bars) {
            return Err(invalid(
                "lookback_bars",
                "lookback_bars must be between 30 and 5000",
            ));
        }
        if self.top_k == 0 {
            return Err(invalid("top_k", "top_k must be at least 1"));
        }
        Ok(Self {
            weights: self.weights.validated()?,
            distribution: self.distribution.validated()?,
            ..self
        })
    }
}

/// Lifecycle of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassPhase {
    #[default]
    Idle,
    Running,
    Scoring,
    Accumulating,
    Selecting,
    Completed,
    Stopped,
    Error,
}

impl PassPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PassPhase::Completed | PassPhase::Stopped | PassPhase::Error
        )
    }

    pub fn is_active(self) -> bool {
        matches!(
            self,
            PassPhase::Running | PassPhase::Scoring | PassPhase::Accumulating | PassPhase::Selecting
        )
    }
}

impl fmt::Display for PassPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PassPhase::Idle => "idle",
            PassPhase::Running => "running",
            PassPhase::Scoring => "scoring",
            PassPhase::Accumulating => "accumulating",
            PassPhase::Selecting => "selecting",
            PassPhase::Completed => "completed",
            PassPhase::Stopped => "stopped",
            PassPhase::Error => "error",
        })
    }
}

/// Point-in-time view of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub phase: PassPhase,
    pub scored_count: usize,
    pub total_count: usize,
    pub error_count: usize,
    pub batches_done: usize,
    pub batches_total: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolFailure {
    pub symbol: String,
    pub reason: String,
}

/// Outcome of a finished pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PassSummary {
    pub phase: PassPhase,
    pub total: usize,
    pub scored: usize,
    pub errors: usize,
    pub batches: usize,
    /// Set when a stop request cut the pass short.
    pub cancelled: bool,
    pub average_score: f64,
    pub elapsed: Duration,
    pub distribution: BTreeMap<Recommendation, usize>,
    pub failures: Vec<SymbolFailure>,
}

/// Returned by [`AnalysisOrchestrator::start_pass`].
#[derive(Debug)]
pub struct PassHandle {
    pub total: usize,
    phase_rx: watch::Receiver<PassPhase>,
}

impl PassHandle {
    /// Wait for the pass to reach a terminal phase.
    pub async fn wait(mut self) -> PassPhase {
        self.phase_rx
            .wait_for(|phase| phase.is_terminal())
            .await
            .map(|phase| *phase)
            .unwrap_or(PassPhase::Error)
    }
}

#[derive(Debug, Default)]
struct PassState {
    phase: PassPhase,
    total: usize,
    scored: usize,
    errors: usize,
    batches_done: usize,
    batches_total: usize,
    settings: DistributionSettings,
    results: Vec<ScoredResult>,
    selection: Option<Selection>,
    summary: Option<PassSummary>,
}

struct Shared {
    state: Mutex<PassState>,
    stop: AtomicBool,
    phase_tx: watch::Sender<PassPhase>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PassState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, phase: PassPhase) {
        self.lock().phase = phase;
        self.phase_tx.send_replace(phase);
    }
}

/// Owns the pass state: the diversity tally, the scored results and the
/// last selection. Nothing else mutates them.
pub struct AnalysisOrchestrator<P: MarketDataPort + 'static> {
    port: Arc<P>,
    shared: Arc<Shared>,
    config: PassConfig,
}

impl<P: MarketDataPort + 'static> AnalysisOrchestrator<P> {
    pub fn new(port: P) -> Self {
        Self::with_config(port, PassConfig::default())
    }

    /// `config` supplies the weights and lookback for ad-hoc scoring.
    pub fn with_config(port: P, config: PassConfig) -> Self {
        let (phase_tx, _) = watch::channel(PassPhase::Idle);
        Self {
            port: Arc::new(port),
            shared: Arc::new(Shared {
                state: Mutex::new(PassState::default()),
                stop: AtomicBool::new(false),
                phase_tx,
            }),
            config,
        }
    }

    pub fn config(&self) -> &PassConfig {
        &self.config
    }

    /// Start a pass on the current tokio runtime. Rejected while another
    /// pass is active.
    pub fn start_pass(
        &self,
        universe: Universe,
        config: PassConfig,
    ) -> Result<PassHandle, EquiscoreError> {
        let config = config.validated()?;
        if universe.symbols.is_empty() {
            return Err(EquiscoreError::ConfigInvalid {
                section: "universe".to_string(),
                key: "symbols".to_string(),
                reason: "universe is empty".to_string(),
            });
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            EquiscoreError::PassFailed {
                reason: format!("no async runtime: {e}"),
            }
        })?;

        let total = universe.count();
        {
            let mut state = self.shared.lock();
            if state.phase.is_active() {
                return Err(EquiscoreError::PassAlreadyRunning);
            }
            *state = PassState {
                phase: PassPhase::Running,
                total,
                batches_total: total.div_ceil(config.batch_size),
                settings: config.distribution,
                ..PassState::default()
            };
        }
        self.shared.stop.store(false, Ordering::SeqCst);
        self.shared.phase_tx.send_replace(PassPhase::Running);
        let phase_rx = self.shared.phase_tx.subscribe();

        info!(
            symbols = total,
            batch_size = config.batch_size,
            concurrency = config.concurrency,
            mode = %config.diversity_mode,
            "starting analysis pass"
        );

        let runner = PassRunner {
            port: Arc::clone(&self.port),
            shared: Arc::clone(&self.shared),
            config,
        };
        runtime.spawn(runner.run(universe.symbols));

        Ok(PassHandle { total, phase_rx })
    }

    /// Ask the running pass to stop after its current batch.
    pub fn stop(&self) {
        if self.shared.lock().phase.is_active() {
            info!("stop requested");
        }
        self.shared.stop.store(true, Ordering::SeqCst);
    }

    pub fn progress(&self) -> Progress {
        let state = self.shared.lock();
        Progress {
            phase: state.phase,
            scored_count: state.scored,
            total_count: state.total,
            error_count: state.errors,
            batches_done: state.batches_done,
            batches_total: state.batches_total,
        }
    }

    pub fn summary(&self) -> Option<PassSummary> {
        self.shared.lock().summary.clone()
    }

    /// Diversity-constrained top `k` of the completed pass.
    pub fn selection(&self, k: usize) -> Result<Selection, EquiscoreError> {
        let state = self.shared.lock();
        ensure_completed(&state)?;
        if let Some(selection) = state.selection.as_ref().filter(|s| s.k == k) {
            return Ok(selection.clone());
        }
        Ok(DistributionSelector::new(state.settings).select_top_k(&state.results, k))
    }

    /// Results whose equitable score falls in `[min, max]`, best first.
    pub fn results_in_range(&self, min: f64, max: f64) -> Result<Vec<ScoredResult>, EquiscoreError> {
        let state = self.shared.lock();
        ensure_completed(&state)?;
        Ok(rank_order(&state.results)
            .into_iter()
            .map(|i| &state.results[i])
            .filter(|r| r.equitable_score >= min && r.equitable_score <= max)
            .cloned()
            .collect())
    }

    /// Best `n` by equitable score, without diversity constraints.
    pub fn top_ranked(&self, n: usize) -> Result<Vec<ScoredResult>, EquiscoreError> {
        let state = self.shared.lock();
        ensure_completed(&state)?;
        Ok(rank_order(&state.results)
            .into_iter()
            .take(n)
            .map(|i| state.results[i].clone())
            .collect())
    }

    pub fn recommendation_distribution(
        &self,
    ) -> Result<BTreeMap<Recommendation, usize>, EquiscoreError> {
        let state = self.shared.lock();
        ensure_completed(&state)?;
        Ok(count_recommendations(&state.results))
    }

    /// Score one symbol outside any pass. Without a tally the diversity
    /// bonus is computed as if nothing had been scored yet.
    pub async fn score_single(
        &self,
        symbol: &str,
        tally: Option<&DiversityTally>,
    ) -> Result<ScoredResult, EquiscoreError> {
        let evaluation = fetch_and_evaluate(
            self.port.as_ref(),
            symbol,
            self.config.lookback_bars,
            &self.config.weights,
        )
        .await?;
        Ok(match tally {
            Some(tally) => evaluation.adjust(tally),
            None => evaluation.adjust(&DiversityTally::new()),
        })
    }

    /// Top selected result of the last pass. With `AwaitExternalSignal`
    /// the call first waits for the current pass to finish.
    pub async fn final_recommendation(
        &self,
        mode: RecommendationMode,
    ) -> Result<ScoredResult, EquiscoreError> {
        if let RecommendationMode::AwaitExternalSignal(timeout) = mode {
            let mut phase_rx = self.shared.phase_tx.subscribe();
            let current = *phase_rx.borrow();
            if current == PassPhase::Idle {
                return Err(EquiscoreError::NotReady {
                    phase: current.to_string(),
                });
            }
            tokio::time::timeout(timeout, phase_rx.wait_for(|phase| phase.is_terminal()))
                .await
                .map_err(|_| EquiscoreError::Timeout)?
                .map_err(|_| EquiscoreError::PassFailed {
                    reason: "phase channel closed".to_string(),
                })?;
        }

        let state = self.shared.lock();
        ensure_completed(&state)?;
        state
            .selection
            .as_ref()
            .and_then(Selection::top)
            .cloned()
            .ok_or_else(|| EquiscoreError::NotReady {
                phase: state.phase.to_string(),
            })
    }
}

fn ensure_completed(state: &PassState) -> Result<(), EquiscoreError> {
    if state.phase != PassPhase::Completed {
        return Err(EquiscoreError::NotReady {
            phase: state.phase.to_string(),
        });
    }
    Ok(())
}

fn count_recommendations(results: &[ScoredResult]) -> BTreeMap<Recommendation, usize> {
    let mut counts = BTreeMap::new();
    for result in results {
        *counts.entry(result.recommendation).or_insert(0) += 1;
    }
    counts
}

/// Retrieve and score one symbol, up to but excluding the diversity
/// adjustment.
pub async fn fetch_and_evaluate<P: MarketDataPort + ?Sized>(
    port: &P,
    symbol: &str,
    lookback: usize,
    weights: &ScoreWeights,
) -> Result<Evaluation, EquiscoreError> {
    let reference = port.get_reference(symbol).await?;
    let bars = port.get_history(symbol, lookback).await?;
    ensure_history(symbol, &bars)?;
    evaluate_symbol(&bars, reference, weights)
}

/// Drives one pass on a spawned task.
struct PassRunner<P: MarketDataPort + 'static> {
    port: Arc<P>,
    shared: Arc<Shared>,
    config: PassConfig,
}

impl<P: MarketDataPort + 'static> PassRunner<P> {
    async fn run(self, symbols: Vec<String>) {
        let started = Instant::now();
        let batches: Vec<&[String]> = symbols.chunks(self.config.batch_size).collect();
        let batches_total = batches.len();

        let mut tally = DiversityTally::new();
        let mut results: Vec<ScoredResult> = Vec::new();
        let mut deferred: Vec<Evaluation> = Vec::new();
        let mut failures: Vec<SymbolFailure> = Vec::new();
        let mut cancelled = false;

        for (batch_index, batch) in batches.iter().enumerate() {
            if batch_index > 0 && self.shared.stop.load(Ordering::SeqCst) {
                info!(
                    batch = batch_index + 1,
                    batches_total, "stop flag set, skipping remaining batches"
                );
                cancelled = true;
                break;
            }

            self.shared.set_phase(PassPhase::Scoring);
            let outcomes = self.score_batch(batch).await;

            self.shared.set_phase(PassPhase::Accumulating);
            let mut succeeded = Vec::new();
            for (symbol, outcome) in outcomes {
                match outcome {
                    Ok(evaluation) => succeeded.push(evaluation),
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "symbol dropped from pass");
                        failures.push(SymbolFailure {
                            symbol,
                            reason: e.to_string(),
                        });
                    }
                }
            }
            let batch_scored = succeeded.len();

            match self.config.diversity_mode {
                DiversityMode::Streaming => {
                    let adjusted: Vec<ScoredResult> =
                        succeeded.into_iter().map(|e| e.adjust(&tally)).collect();
                    for result in &adjusted {
                        tally.record(&result.sector, result.quintile);
                    }
                    results.extend(adjusted);
                }
                DiversityMode::Global => {
                    for evaluation in &succeeded {
                        tally.record(&evaluation.reference.sector, evaluation.reference.quintile());
                    }
                    deferred.extend(succeeded);
                }
            }

            {
                let mut state = self.shared.lock();
                state.scored += batch_scored;
                state.errors = failures.len();
                state.batches_done = batch_index + 1;
            }
            info!(
                batch = batch_index + 1,
                batches_total,
                scored = batch_scored,
                errors = batch.len() - batch_scored,
                "batch complete"
            );
        }

        if !deferred.is_empty() {
            results = deferred
                .into_iter()
                .map(|evaluation| {
                    let others = tally.without(
                        &evaluation.reference.sector,
                        evaluation.reference.quintile(),
                    );
                    evaluation.adjust(&others)
                })
                .collect();
        }

        let batches_run = self.shared.lock().batches_done;
        let mut summary = PassSummary {
            phase: PassPhase::Completed,
            total: symbols.len(),
            scored: results.len(),
            errors: failures.len(),
            batches: batches_run,
            cancelled,
            average_score: average_score(&results),
            elapsed: started.elapsed(),
            distribution: count_recommendations(&results),
            failures,
        };

        if results.is_empty() {
            let phase = if cancelled {
                PassPhase::Stopped
            } else {
                PassPhase::Error
            };
            summary.phase = phase;
            if phase == PassPhase::Error {
                warn!(errors = summary.errors, "no symbol could be scored");
            } else {
                info!("pass stopped before any symbol was scored");
            }
            self.finish(summary, Vec::new(), None);
            return;
        }

        self.shared.set_phase(PassPhase::Selecting);
        let selection = DistributionSelector::new(self.config.distribution)
            .select_top_k(&results, self.config.top_k);
        info!(
            scored = summary.scored,
            errors = summary.errors,
            selected = selection.len(),
            relaxed = selection.relaxed,
            cancelled,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "pass complete"
        );
        self.finish(summary, results, Some(selection));
    }

    fn finish(&self, summary: PassSummary, results: Vec<ScoredResult>, selection: Option<Selection>) {
        let phase = summary.phase;
        {
            let mut state = self.shared.lock();
            state.results = results;
            state.selection = selection;
            state.summary = Some(summary);
        }
        self.shared.set_phase(phase);
    }

    /// Score a batch with at most `concurrency` symbols in flight. Outcomes
    /// come back in scan order.
    async fn score_batch(
        &self,
        batch: &[String],
    ) -> Vec<(String, Result<Evaluation, EquiscoreError>)> {
        let lookback = self.config.lookback_bars;
        let weights = self.config.weights;

        let mut outcomes: Vec<(usize, String, Result<Evaluation, EquiscoreError>)> =
            stream::iter(batch.iter().cloned().enumerate())
                .map(|(index, symbol)| {
                    let port = Arc::clone(&self.port);
                    let task_symbol = symbol.clone();
                    async move {
                        let outcome = tokio::spawn(async move {
                            fetch_and_evaluate(port.as_ref(), &task_symbol, lookback, &weights)
                                .await
                        })
                        .await
                        .unwrap_or_else(|e| {
                            Err(EquiscoreError::Computation {
                                symbol: symbol.clone(),
                                reason: format!("scoring task failed: {e}"),
                            })
                        });
                        if outcome.is_ok() {
                            debug!(symbol = %symbol, "scored");
                        }
                        (index, symbol, outcome)
                    }
                })
                .buffer_unordered(self.config.concurrency)
                .collect()
                .await;

        outcomes.sort_by_key(|(index, _, _)| *index);
        outcomes
            .into_iter()
            .map(|(_, symbol, outcome)| (symbol, outcome))
            .collect()
    }
}

fn average_score(results: &[ScoredResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let sum: f64 = results.iter().map(|r| r.equitable_score).sum();
    round_to(sum / results.len() as f64, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::MarketReference;
    use crate::domain::ohlcv::OhlcvBar;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::{HashMap, HashSet};

    #[derive(Default)]
    struct StubPort {
        references: HashMap<String, MarketReference>,
        failing: HashSet<String>,
        delay: Option<Duration>,
    }

    impl StubPort {
        fn with_symbol(mut self, symbol: &str, sector: &str, market_cap: f64) -> Self {
            self.references.insert(
                symbol.to_string(),
                MarketReference {
                    symbol: symbol.to_string(),
                    price: 100.0,
                    change_percent: 1.5,
                    volume: 1_000_000,
                    market_cap,
                    sector: sector.to_string(),
                    industry: "Test".to_string(),
                    beta: 1.0,
                    pe_ratio: None,
                    dividend_yield: None,
                    price_to_book: None,
                    debt_to_equity: None,
                },
            );
            self
        }

        fn with_error(mut self, symbol: &str) -> Self {
            self.failing.insert(symbol.to_string());
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl MarketDataPort for StubPort {
        async fn get_history(
            &self,
            symbol: &str,
            lookback: usize,
        ) -> Result<Vec<OhlcvBar>, EquiscoreError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            Ok((0..lookback.min(80))
                .map(|i| {
                    let close = 100.0 + (i as f64 * 0.2).sin() * 4.0 + i as f64 * 0.1;
                    OhlcvBar {
                        symbol: symbol.to_string(),
                        date: start + chrono::Duration::days(i as i64),
                        open: close,
                        high: close + 1.0,
                        low: close - 1.0,
                        close,
                        volume: 1_000_000 + (i as i64 % 5) * 100_000,
                    }
                })
                .collect())
        }

        async fn get_reference(&self, symbol: &str) -> Result<MarketReference, EquiscoreError> {
            if self.failing.contains(symbol) {
                return Err(EquiscoreError::Retrieval {
                    symbol: symbol.to_string(),
                    reason: "unavailable".to_string(),
                });
            }
            self.references
                .get(symbol)
                .cloned()
                .ok_or_else(|| EquiscoreError::Retrieval {
                    symbol: symbol.to_string(),
                    reason: "unknown symbol".to_string(),
                })
        }
    }

    fn universe(symbols: &[&str]) -> Universe {
        Universe {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn small_config(batch_size: usize) -> PassConfig {
        PassConfig {
            batch_size,
            concurrency: batch_size.min(4),
            top_k: 3,
            ..PassConfig::default()
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(PassConfig::default().validated().is_ok());
    }

    #[test]
    fn config_rejects_concurrency_above_batch_size() {
        let config = PassConfig {
            batch_size: 4,
            concurrency: 8,
            ..PassConfig::default()
        };
        match config.validated() {
            Err(EquiscoreError::ConfigInvalid { section, key, .. }) => {
                assert_eq!(section, "pass");
                assert_eq!(key, "concurrency");
            }
            other => panic!("expected ConfigInvalid, got {:?}", other),
        }
    }

    #[test]
    fn config_rejects_bad_weights() {
        let mut config = PassConfig::default();
        config.weights.rsi = 0.5;
        match config.validated() {
            Err(EquiscoreError::ConfigInvalid { section, .. }) => assert_eq!(section, "weights"),
            other => panic!("expected ConfigInvalid, got {:?}", other),
        }
    }

    #[test]
    fn phase_classification() {
        assert!(PassPhase::Scoring.is_active());
        assert!(!PassPhase::Scoring.is_terminal());
        assert!(PassPhase::Stopped.is_terminal());
        assert!(!PassPhase::Idle.is_active());
        assert_eq!(PassPhase::Accumulating.to_string(), "accumulating");
    }

    #[tokio::test]
    async fn pass_completes_and_selects() {
        let port = StubPort::default()
            .with_symbol("AAA", "Technology", 150.0e9)
            .with_symbol("BBB", "Energy", 20.0e9)
            .with_symbol("CCC", "Utilities", 1.0e9)
            .with_symbol("DDD", "Healthcare", 60.0e9)
            .with_error("EEE");
        let orchestrator = AnalysisOrchestrator::new(port);

        let handle = orchestrator
            .start_pass(universe(&["AAA", "BBB", "CCC", "DDD", "EEE"]), small_config(2))
            .unwrap();
        assert_eq!(handle.total, 5);
        assert_eq!(handle.wait().await, PassPhase::Completed);

        let progress = orchestrator.progress();
        assert_eq!(progress.phase, PassPhase::Completed);
        assert_eq!(progress.scored_count, 4);
        assert_eq!(progress.error_count, 1);
        assert_eq!(progress.total_count, 5);
        assert_eq!(progress.batches_done, 3);
        assert_eq!(progress.batches_total, 3);

        let summary = orchestrator.summary().unwrap();
        assert!(!summary.cancelled);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].symbol, "EEE");
        assert_eq!(summary.distribution.values().sum::<usize>(), 4);

        let selection = orchestrator.selection(3).unwrap();
        assert_eq!(selection.len(), 3);
        assert_eq!(orchestrator.top_ranked(10).unwrap().len(), 4);
    }

    #[tokio::test]
    async fn second_start_is_rejected_while_running() {
        let port = StubPort::default()
            .with_symbol("AAA", "Technology", 150.0e9)
            .with_symbol("BBB", "Energy", 20.0e9)
            .with_delay(Duration::from_millis(50));
        let orchestrator = AnalysisOrchestrator::new(port);

        let handle = orchestrator
            .start_pass(universe(&["AAA", "BBB"]), small_config(2))
            .unwrap();
        let second = orchestrator.start_pass(universe(&["AAA"]), small_config(2));
        assert!(matches!(second, Err(EquiscoreError::PassAlreadyRunning)));

        assert_eq!(handle.wait().await, PassPhase::Completed);
        let again = orchestrator
            .start_pass(universe(&["AAA"]), small_config(1))
            .unwrap();
        assert_eq!(again.wait().await, PassPhase::Completed);
    }

    #[tokio::test]
    async fn stop_finishes_in_flight_batch() {
        let port = StubPort::default()
            .with_symbol("AAA", "Technology", 150.0e9)
            .with_symbol("BBB", "Energy", 20.0e9)
            .with_symbol("CCC", "Utilities", 1.0e9)
            .with_symbol("DDD", "Healthcare", 60.0e9);
        let orchestrator = AnalysisOrchestrator::new(port);

        let handle = orchestrator
            .start_pass(universe(&["AAA", "BBB", "CCC", "DDD"]), small_config(2))
            .unwrap();
        orchestrator.stop();
        assert_eq!(handle.wait().await, PassPhase::Completed);

        let summary = orchestrator.summary().unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.scored, 2);
        assert_eq!(summary.batches, 1);
    }

    #[tokio::test]
    async fn stop_without_results_ends_stopped() {
        let port = StubPort::default().with_error("AAA").with_error("BBB");
        let orchestrator = AnalysisOrchestrator::new(port);

        let handle = orchestrator
            .start_pass(universe(&["AAA", "BBB"]), small_config(1))
            .unwrap();
        orchestrator.stop();
        assert_eq!(handle.wait().await, PassPhase::Stopped);
        assert!(matches!(
            orchestrator.selection(5),
            Err(EquiscoreError::NotReady { .. })
        ));
    }

    #[tokio::test]
    async fn all_failures_end_in_error() {
        let port = StubPort::default().with_error("AAA").with_error("BBB");
        let orchestrator = AnalysisOrchestrator::new(port);

        let handle = orchestrator
            .start_pass(universe(&["AAA", "BBB"]), small_config(2))
            .unwrap();
        assert_eq!(handle.wait().await, PassPhase::Error);
        assert_eq!(orchestrator.progress().error_count, 2);
        match orchestrator.selection(1) {
            Err(EquiscoreError::NotReady { phase }) => assert_eq!(phase, "error"),
            other => panic!("expected NotReady, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn streaming_mode_depends_on_scan_order() {
        let port = StubPort::default()
            .with_symbol("AAA", "Technology", 20.0e9)
            .with_symbol("BBB", "Technology", 20.0e9);
        let orchestrator = AnalysisOrchestrator::new(port);
        let handle = orchestrator
            .start_pass(universe(&["AAA", "BBB"]), small_config(1))
            .unwrap();
        handle.wait().await;

        let ranked = orchestrator.top_ranked(2).unwrap();
        assert_eq!(ranked[0].symbol, "AAA");
        assert!(ranked[0].diversity_bonus > ranked[1].diversity_bonus);
    }

    #[tokio::test]
    async fn global_mode_is_order_independent() {
        let port = StubPort::default()
            .with_symbol("AAA", "Technology", 20.0e9)
            .with_symbol("BBB", "Technology", 20.0e9);
        let orchestrator = AnalysisOrchestrator::new(port);
        let config = PassConfig {
            diversity_mode: DiversityMode::Global,
            ..small_config(1)
        };
        let handle = orchestrator
            .start_pass(universe(&["AAA", "BBB"]), config)
            .unwrap();
        handle.wait().await;

        let ranked = orchestrator.top_ranked(2).unwrap();
        assert_eq!(ranked[0].equitable_score, ranked[1].equitable_score);
        assert_eq!(ranked[0].diversity_bonus, ranked[1].diversity_bonus);
    }

    #[tokio::test]
    async fn results_in_range_is_sorted_and_bounded() {
        let port = StubPort::default()
            .with_symbol("AAA", "Technology", 150.0e9)
            .with_symbol("BBB", "Energy", 20.0e9)
            .with_symbol("CCC", "Utilities", 1.0e9);
        let orchestrator = AnalysisOrchestrator::new(port);
        orchestrator
            .start_pass(universe(&["AAA", "BBB", "CCC"]), small_config(3))
            .unwrap()
            .wait()
            .await;

        let all = orchestrator.results_in_range(0.0, 100.0).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].equitable_score >= w[1].equitable_score));
        assert!(orchestrator.results_in_range(101.0, 200.0).unwrap().is_empty());
    }

    #[tokio::test]
    async fn score_single_uses_empty_tally_by_default() {
        let port = StubPort::default().with_symbol("AAA", "Technology", 20.0e9);
        let orchestrator = AnalysisOrchestrator::new(port);

        let fresh = orchestrator.score_single("AAA", None).await.unwrap();
        let mut crowded = DiversityTally::new();
        for _ in 0..4 {
            crowded.record("Technology", crate::domain::market::CapQuintile::Q3);
        }
        let late = orchestrator.score_single("AAA", Some(&crowded)).await.unwrap();

        assert_eq!(fresh.overall_score, late.overall_score);
        assert!(fresh.equitable_score >= late.equitable_score);
        assert!(fresh.diversity_bonus > late.diversity_bonus);
    }

    #[tokio::test]
    async fn score_single_reports_retrieval_failure() {
        let orchestrator = AnalysisOrchestrator::new(StubPort::default().with_error("BAD"));
        let err = orchestrator.score_single("BAD", None).await.unwrap_err();
        assert!(err.is_symbol_local());
    }

    #[tokio::test]
    async fn final_recommendation_modes() {
        let port = StubPort::default()
            .with_symbol("AAA", "Technology", 150.0e9)
            .with_symbol("BBB", "Energy", 20.0e9)
            .with_delay(Duration::from_millis(20));
        let orchestrator = AnalysisOrchestrator::new(port);

        assert!(matches!(
            orchestrator
                .final_recommendation(RecommendationMode::Immediate)
                .await,
            Err(EquiscoreError::NotReady { .. })
        ));
        assert!(matches!(
            orchestrator
                .final_recommendation(RecommendationMode::AwaitExternalSignal(
                    Duration::from_millis(10)
                ))
                .await,
            Err(EquiscoreError::NotReady { .. })
        ));

        orchestrator
            .start_pass(universe(&["AAA", "BBB"]), small_config(2))
            .unwrap();
        let best = orchestrator
            .final_recommendation(RecommendationMode::AwaitExternalSignal(
                Duration::from_secs(5),
            ))
            .await
            .unwrap();
        let top = orchestrator.top_ranked(1).unwrap();
        assert_eq!(best.symbol, top[0].symbol);

        let immediate = orchestrator
            .final_recommendation(RecommendationMode::Immediate)
            .await
            .unwrap();
        assert_eq!(immediate.symbol, best.symbol);
    }

    #[tokio::test]
    async fn await_times_out_on_slow_pass() {
        let port = StubPort::default()
            .with_symbol("AAA", "Technology", 150.0e9)
            .with_delay(Duration::from_millis(500));
        let orchestrator = AnalysisOrchestrator::new(port);
        let handle = orchestrator
            .start_pass(universe(&["AAA"]), small_config(1))
            .unwrap();

        let result = orchestrator
            .final_recommendation(RecommendationMode::AwaitExternalSignal(
                Duration::from_millis(20),
            ))
            .await;
        assert!(matches!(result, Err(EquiscoreError::Timeout)));
        assert_eq!(handle.wait().await, PassPhase::Completed);
    }

    #[tokio::test]
    async fn empty_universe_is_rejected() {
        let orchestrator = AnalysisOrchestrator::new(StubPort::default());
        let result = orchestrator.start_pass(Universe { symbols: Vec::new() }, PassConfig::default());
        assert!(matches!(result, Err(EquiscoreError::ConfigInvalid { .. })));
        assert_eq!(orchestrator.progress().phase, PassPhase::Idle);
    }
}
