//! Per-symbol scoring pipeline: indicators, sub-scores, adjustment.
//!
//! Scoring is split in two so a pass can defer the diversity adjustment
//! until the whole universe has been seen. [`evaluate_symbol`] does all the
//! tally-independent work; [`Evaluation::adjust`] applies a tally snapshot.

use crate::domain::equitable::{DiversityTally, EquitableAdjuster};
use crate::domain::error::EquiscoreError;
use crate::domain::indicator::{round_to, IndicatorBundle};
use crate::domain::market::MarketReference;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::recommendation::Recommendation;
use crate::domain::scored::ScoredResult;
use crate::domain::scoring::{score_components, ScoreWeights, SubScores};
use crate::domain::signals::{generate_reasoning, generate_signals};

/// Tally-independent part of a symbol's score.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub reference: MarketReference,
    pub indicators: IndicatorBundle,
    pub sub_scores: SubScores,
    /// Unrounded weighted score.
    pub overall: f64,
}

pub fn evaluate_symbol(
    bars: &[OhlcvBar],
    reference: MarketReference,
    weights: &ScoreWeights,
) -> Result<Evaluation, EquiscoreError> {
    let indicators = IndicatorBundle::compute(bars);
    evaluate_bundle(indicators, reference, weights)
}

/// Score a precomputed indicator bundle.
pub fn evaluate_bundle(
    indicators: IndicatorBundle,
    reference: MarketReference,
    weights: &ScoreWeights,
) -> Result<Evaluation, EquiscoreError> {
    let sub_scores = score_components(&indicators, &reference, weights)?;
    let overall = sub_scores.overall(weights);
    if !overall.is_finite() {
        return Err(EquiscoreError::Computation {
            symbol: reference.symbol.clone(),
            reason: "overall score is not finite".to_string(),
        });
    }
    Ok(Evaluation {
        reference,
        indicators,
        sub_scores,
        overall,
    })
}

impl Evaluation {
    pub fn adjust(self, tally: &DiversityTally) -> ScoredResult {
        let quintile = self.reference.quintile();
        let adjustment =
            EquitableAdjuster.adjust(self.overall, &self.reference.sector, quintile, tally);
        let equitable_score = adjustment.equitable_score;

        let signals = generate_signals(&self.indicators, &self.reference);
        let recommendation = Recommendation::derive(equitable_score, signals.balance());
        let reasoning = generate_reasoning(&self.indicators, &self.reference, equitable_score);

        let MarketReference {
            symbol,
            price,
            change_percent,
            market_cap,
            sector,
            industry,
            beta,
            ..
        } = self.reference;

        ScoredResult {
            symbol,
            sector,
            industry,
            quintile,
            price,
            change_percent,
            market_cap,
            beta,
            indicators: self.indicators,
            sub_scores: self.sub_scores,
            overall_score: round_to(self.overall, 1),
            equitable_score,
            sector_factor: adjustment.sector_factor,
            quintile_bonus_pct: adjustment.quintile_bonus_pct,
            diversity: adjustment.diversity,
            diversity_bonus: adjustment.diversity_bonus,
            signals,
            recommendation,
            confidence: recommendation.confidence(),
            reasoning,
        }
    }
}

/// Full pipeline against one tally snapshot.
pub fn score_symbol(
    bars: &[OhlcvBar],
    reference: MarketReference,
    tally: &DiversityTally,
    weights: &ScoreWeights,
) -> Result<ScoredResult, EquiscoreError> {
    Ok(evaluate_symbol(bars, reference, weights)?.adjust(tally))
}
