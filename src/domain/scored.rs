//! The per-symbol outcome of a scoring pass.

use crate::domain::equitable::DiversityBonus;
use crate::domain::indicator::IndicatorBundle;
use crate::domain::market::CapQuintile;
use crate::domain::recommendation::Recommendation;
use crate::domain::scoring::SubScores;
use crate::domain::signals::Signals;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredResult {
    pub symbol: String,
    pub sector: String,
    pub industry: String,
    pub quintile: CapQuintile,
    pub price: f64,
    pub change_percent: f64,
    pub market_cap: f64,
    pub beta: f64,
    pub indicators: IndicatorBundle,
    pub sub_scores: SubScores,
    /// Weighted score before any adjustment, one decimal.
    pub overall_score: f64,
    /// Ranking score after sector, size and diversity adjustment, one decimal.
    pub equitable_score: f64,
    pub sector_factor: f64,
    pub quintile_bonus_pct: f64,
    pub diversity: DiversityBonus,
    pub diversity_bonus: f64,
    pub signals: Signals,
    pub recommendation: Recommendation,
    pub confidence: f64,
    pub reasoning: Vec<String>,
}

impl ScoredResult {
    pub fn passes_threshold(&self, threshold: f64) -> bool {
        self.equitable_score >= threshold
    }

    pub fn signal_balance(&self) -> i32 {
        self.signals.balance()
    }
}
