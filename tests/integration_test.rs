//! End-to-end tests: scoring, adjustment, passes and selection.

mod common;

use common::*;
use equiscore::domain::distribution::{DistributionSelector, DistributionSettings, SelectionPhase};
use equiscore::domain::equitable::{DiversityMode, DiversityTally};
use equiscore::domain::error::EquiscoreError;
use equiscore::domain::indicator::{IndicatorBundle, ObvTrend};
use equiscore::domain::market::{CapQuintile, MarketReference};
use equiscore::domain::metrics::DiversityMetrics;
use equiscore::domain::orchestrator::{AnalysisOrchestrator, PassConfig, PassPhase};
use equiscore::domain::pipeline::{evaluate_bundle, Evaluation};
use equiscore::domain::recommendation::Recommendation;
use equiscore::domain::scored::ScoredResult;
use equiscore::domain::scoring::ScoreWeights;
use equiscore::domain::universe::Universe;

fn bullish_bundle() -> IndicatorBundle {
    IndicatorBundle {
        rsi_7: 18.0,
        rsi_14: 18.0,
        rsi_21: 18.0,
        macd_short: 0.6,
        macd: 0.5,
        macd_signal: 0.42,
        macd_histogram: 0.08,
        bollinger_position: 0.05,
        bollinger_width: 0.05,
        ema_5: 112.0,
        ema_10: 110.0,
        ema_20: 106.0,
        ema_50: 102.0,
        sma_200: 100.0,
        volume_ratio: 2.2,
        obv_trend: ObvTrend::Up,
        volume_price_trend: 1500.0,
        volatility_percentile: 25.0,
        ..IndicatorBundle::default()
    }
}

fn tech_reference() -> MarketReference {
    MarketReference {
        price: 112.0,
        change_percent: 3.2,
        ..make_reference("NVDA", "Technology", 20.0e9)
    }
}

fn bullish_evaluation() -> Evaluation {
    evaluate_bundle(bullish_bundle(), tech_reference(), &ScoreWeights::default()).unwrap()
}

/// A neutral result re-labelled with a chosen sector and score.
fn ranked_result(symbol: &str, sector: &str, score: f64) -> ScoredResult {
    let mut result = evaluate_bundle(
        IndicatorBundle::default(),
        make_reference(symbol, sector, 20.0e9),
        &ScoreWeights::default(),
    )
    .unwrap()
    .adjust(&DiversityTally::new());
    result.equitable_score = score;
    result
}

fn universe_of(symbols: &[String]) -> Universe {
    Universe {
        symbols: symbols.to_vec(),
    }
}

mod scoring_scenarios {
    use super::*;

    #[test]
    fn first_symbol_of_sector_is_strong_buy() {
        let result = bullish_evaluation().adjust(&DiversityTally::new());

        assert_eq!(result.quintile, CapQuintile::Q3);
        assert!(
            (85.0..=92.0).contains(&result.overall_score),
            "overall {}",
            result.overall_score
        );
        assert!(result.equitable_score >= 90.0);
        assert_eq!(result.recommendation, Recommendation::StrongBuy);
        assert_eq!(result.diversity.scarcity, 12.7);
        assert_eq!(result.diversity.concentration, 0.0);
    }

    #[test]
    fn crowded_sector_is_penalised() {
        let mut tally = DiversityTally::new();
        for _ in 0..4 {
            tally.record("Technology", CapQuintile::Q3);
        }
        for sector in ["Energy", "Utilities", "Healthcare", "Materials", "Industrials"] {
            tally.record(sector, CapQuintile::Q2);
        }
        assert!(tally.sector_count("Technology") as f64 / tally.total() as f64 > 0.25);

        let first = bullish_evaluation().adjust(&DiversityTally::new());
        let crowded = bullish_evaluation().adjust(&tally);

        assert_eq!(first.overall_score, crowded.overall_score);
        assert_eq!(crowded.diversity.scarcity, 0.0);
        assert_eq!(crowded.diversity.concentration, -8.5);
        assert!(crowded.diversity_bonus < first.diversity_bonus);
        assert!(crowded.equitable_score < first.equitable_score);
    }

    #[test]
    fn scoring_is_idempotent() {
        let a = bullish_evaluation();
        let b = bullish_evaluation();
        assert_eq!(a.sub_scores, b.sub_scores);
        assert_eq!(a.overall.to_bits(), b.overall.to_bits());
        assert_eq!(
            a.adjust(&DiversityTally::new()),
            b.adjust(&DiversityTally::new())
        );
    }

    #[test]
    fn earlier_symbols_reduce_the_bonus_of_later_ones() {
        let mut seen = DiversityTally::new();
        seen.record("Technology", CapQuintile::Q1);
        seen.record("Technology", CapQuintile::Q2);

        let alone = bullish_evaluation().adjust(&DiversityTally::new());
        let after_two = bullish_evaluation().adjust(&seen);
        assert!(after_two.diversity_bonus < alone.diversity_bonus);
    }

    #[test]
    fn weights_without_momentum_skip_that_sub_score() {
        let weights = ScoreWeights {
            momentum: 0.0,
            rsi: 0.33,
            ..ScoreWeights::default()
        }
        .validated()
        .unwrap();
        let evaluation = evaluate_bundle(bullish_bundle(), tech_reference(), &weights).unwrap();
        assert_eq!(evaluation.sub_scores.momentum, None);
    }
}

mod selection_scenarios {
    use super::*;

    #[test]
    fn two_sector_universe_relaxes_to_top_scores() {
        let results: Vec<ScoredResult> = (0..30)
            .map(|i| {
                let sector = if i % 2 == 0 { "Technology" } else { "Energy" };
                ranked_result(&format!("S{i:02}"), sector, 90.0 - i as f64)
            })
            .collect();

        let selection =
            DistributionSelector::new(DistributionSettings::default()).select_top_k(&results, 10);

        assert_eq!(selection.len(), 10);
        assert_eq!(selection.sector_ceiling, 2);
        assert!(selection.relaxed);
        let expected: Vec<String> = (0..10).map(|i| format!("S{i:02}")).collect();
        assert_eq!(selection.symbols(), expected);
        assert!(selection
            .entries
            .iter()
            .any(|e| e.phase == SelectionPhase::Relaxed));
        assert!(!selection.sector_excess.is_empty());
    }

    #[test]
    fn broad_universe_respects_ceiling_without_relaxing() {
        let results: Vec<ScoredResult> = (0..45)
            .map(|i| {
                ranked_result(
                    &format!("S{i:02}"),
                    SECTORS[i % SECTORS.len()],
                    95.0 - i as f64,
                )
            })
            .collect();

        let selection =
            DistributionSelector::new(DistributionSettings::default()).select_top_k(&results, 10);

        assert_eq!(selection.len(), 10);
        assert!(!selection.relaxed);
        assert!(selection.sector_excess.is_empty());
        assert!(selection.metrics.sectors_represented >= 7);
        for count in selection.metrics.sector_distribution.values() {
            assert!(*count <= selection.sector_ceiling);
        }
    }

    #[test]
    fn metrics_over_single_sector() {
        let results: Vec<ScoredResult> = (0..4)
            .map(|i| ranked_result(&format!("T{i}"), "Technology", 70.0))
            .collect();
        let metrics = DiversityMetrics::compute(&results);
        assert_eq!(metrics.herfindahl_index, 1.0);
        assert_eq!(metrics.gini_coefficient, 0.0);
        assert_eq!(metrics.max_sector_concentration, 100.0);
    }
}

mod pass_scenarios {
    use super::*;

    fn symbols(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("SYM{i:03}")).collect()
    }

    #[tokio::test]
    async fn mostly_failing_universe_still_completes() {
        let all = symbols(500);
        let mut port = MockMarketDataPort::new();
        for (i, symbol) in all.iter().enumerate() {
            port = if i % 10 == 0 {
                port.with_symbol(symbol, SECTORS[(i / 10) % SECTORS.len()], 5.0e9 * (i + 1) as f64)
            } else {
                port.with_error(symbol, "upstream timeout")
            };
        }
        let orchestrator = AnalysisOrchestrator::new(port);

        let handle = orchestrator
            .start_pass(universe_of(&all), PassConfig::default())
            .unwrap();
        assert_eq!(handle.wait().await, PassPhase::Completed);

        let progress = orchestrator.progress();
        assert_eq!(progress.phase, PassPhase::Completed);
        assert_eq!(progress.scored_count, 50);
        assert_eq!(progress.error_count, 450);
        assert_eq!(progress.batches_total, 25);

        let summary = orchestrator.summary().unwrap();
        assert_eq!(summary.failures.len(), 450);
        assert!(summary.failures.iter().all(|f| f.reason.contains("upstream timeout")));

        let selection = orchestrator.selection(10).unwrap();
        assert_eq!(selection.len(), 10);
    }

    #[tokio::test]
    async fn short_history_is_counted_as_error() {
        let reference = make_reference("SHORT", "Energy", 5.0e9);
        let port = MockMarketDataPort::new()
            .with_history(reference, generate_bars("SHORT", 20, 50.0))
            .with_symbol("LONG", "Utilities", 5.0e9);
        let orchestrator = AnalysisOrchestrator::new(port);

        let handle = orchestrator
            .start_pass(
                universe_of(&["SHORT".to_string(), "LONG".to_string()]),
                PassConfig::default(),
            )
            .unwrap();
        assert_eq!(handle.wait().await, PassPhase::Completed);

        let summary = orchestrator.summary().unwrap();
        assert_eq!(summary.scored, 1);
        assert_eq!(summary.errors, 1);
        assert!(summary.failures[0].reason.contains("insufficient data"));
    }

    #[tokio::test]
    async fn every_symbol_failing_ends_in_error() {
        let all = symbols(30);
        let mut port = MockMarketDataPort::new();
        for symbol in &all {
            port = port.with_error(symbol, "down");
        }
        let orchestrator = AnalysisOrchestrator::new(port);
        let handle = orchestrator
            .start_pass(universe_of(&all), PassConfig::default())
            .unwrap();

        assert_eq!(handle.wait().await, PassPhase::Error);
        assert_eq!(orchestrator.progress().error_count, 30);
        assert!(matches!(
            orchestrator.top_ranked(5),
            Err(EquiscoreError::NotReady { .. })
        ));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_synchronously() {
        let orchestrator = AnalysisOrchestrator::new(MockMarketDataPort::new());
        let mut config = PassConfig::default();
        config.distribution.max_sector_concentration_pct = 140.0;

        let result = orchestrator.start_pass(universe_of(&symbols(3)), config);
        assert!(matches!(result, Err(EquiscoreError::ConfigInvalid { .. })));
        assert_eq!(orchestrator.progress().phase, PassPhase::Idle);
    }

    #[tokio::test]
    async fn global_mode_matches_regardless_of_order() {
        let forward: Vec<String> = ["AAA", "BBB", "CCC", "DDD"].map(String::from).to_vec();
        let mut backward = forward.clone();
        backward.reverse();

        let mut scores = Vec::new();
        for order in [forward, backward] {
            let port = MockMarketDataPort::new()
                .with_symbol("AAA", "Technology", 150.0e9)
                .with_symbol("BBB", "Technology", 20.0e9)
                .with_symbol("CCC", "Energy", 20.0e9)
                .with_symbol("DDD", "Utilities", 1.0e9);
            let orchestrator = AnalysisOrchestrator::new(port);
            let config = PassConfig {
                batch_size: 1,
                concurrency: 1,
                diversity_mode: DiversityMode::Global,
                ..PassConfig::default()
            };
            orchestrator
                .start_pass(universe_of(&order), config)
                .unwrap()
                .wait()
                .await;

            let mut by_symbol: Vec<(String, f64)> = orchestrator
                .top_ranked(4)
                .unwrap()
                .into_iter()
                .map(|r| (r.symbol, r.equitable_score))
                .collect();
            by_symbol.sort_by(|a, b| a.0.cmp(&b.0));
            scores.push(by_symbol);
        }
        assert_eq!(scores[0], scores[1]);
    }

    #[tokio::test]
    async fn lookback_limits_requested_history() {
        let port = MockMarketDataPort::new().with_symbol("AAA", "Technology", 150.0e9);
        let orchestrator = AnalysisOrchestrator::with_config(
            port,
            PassConfig {
                lookback_bars: 60,
                ..PassConfig::default()
            },
        );
        let result = orchestrator.score_single("AAA", None).await.unwrap();
        assert_eq!(result.symbol, "AAA");
        assert!((0.0..=100.0).contains(&result.equitable_score));
    }
}
