//! Component sub-scores and the weighted overall score.
//!
//! Every sub-score is a piecewise tier lookup on one indicator followed by
//! small additive adjustments, clamped to [0, 100] and rounded to one
//! decimal. The overall score is the weighted sum of the sub-scores and is
//! left unrounded so the equitable adjustment works on the exact value.

use crate::domain::error::EquiscoreError;
use crate::domain::indicator::{round_to, ChartPattern, IndicatorBundle, ObvTrend};
use crate::domain::market::MarketReference;
use serde::Serialize;

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Upper bound (inclusive) of each RSI(14) tier and its base score.
const RSI_TIERS: [(f64, f64); 12] = [
    (20.0, 92.5),
    (25.0, 87.3),
    (30.0, 78.6),
    (35.0, 68.2),
    (40.0, 58.7),
    (45.0, 52.1),
    (55.0, 49.8),
    (60.0, 47.3),
    (65.0, 41.6),
    (70.0, 32.4),
    (75.0, 21.8),
    (80.0, 12.7),
];
const RSI_FLOOR_SCORE: f64 = 7.5;

const BOLLINGER_TIERS: [(f64, f64); 12] = [
    (0.05, 89.7),
    (0.10, 81.3),
    (0.15, 72.6),
    (0.20, 64.8),
    (0.30, 58.4),
    (0.40, 53.2),
    (0.60, 49.5),
    (0.70, 46.8),
    (0.80, 41.6),
    (0.85, 35.2),
    (0.90, 27.4),
    (0.95, 18.7),
];
const BOLLINGER_FLOOR_SCORE: f64 = 10.3;

/// Lower bound (inclusive) of each volume-ratio tier and its base score.
const VOLUME_TIERS: [(f64, f64); 10] = [
    (3.0, 91.8),
    (2.5, 84.3),
    (2.0, 76.9),
    (1.8, 69.4),
    (1.5, 62.7),
    (1.3, 57.1),
    (1.1, 52.8),
    (0.9, 48.5),
    (0.7, 42.3),
    (0.5, 34.6),
];
const VOLUME_FLOOR_SCORE: f64 = 25.2;

const MOMENTUM_TIERS: [(f64, f64); 11] = [
    (5.0, 94.2),
    (3.0, 83.6),
    (2.0, 72.8),
    (1.0, 63.4),
    (0.5, 56.7),
    (0.0, 51.3),
    (-0.5, 48.7),
    (-1.0, 43.3),
    (-2.0, 36.6),
    (-3.0, 27.2),
    (-5.0, 16.4),
];
const MOMENTUM_FLOOR_SCORE: f64 = 5.8;

/// Relative weight of each sub-score in the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreWeights {
    pub rsi: f64,
    pub macd: f64,
    pub bollinger: f64,
    pub ma: f64,
    pub volume: f64,
    pub momentum: f64,
    pub pattern: f64,
    pub risk: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            rsi: 0.18,
            macd: 0.17,
            bollinger: 0.14,
            ma: 0.13,
            volume: 0.12,
            momentum: 0.15,
            pattern: 0.08,
            risk: 0.03,
        }
    }
}

impl ScoreWeights {
    /// Check that every weight lies in [0, 1] and that they sum to 1.
    pub fn validated(self) -> Result<Self, EquiscoreError> {
        for (key, value) in self.named() {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(EquiscoreError::ConfigInvalid {
                    section: "weights".to_string(),
                    key: key.to_string(),
                    reason: format!("{key} must be between 0 and 1, got {value}"),
                });
            }
        }
        let total: f64 = self.named().iter().map(|(_, v)| v).sum();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(EquiscoreError::ConfigInvalid {
                section: "weights".to_string(),
                key: "*".to_string(),
                reason: format!("weights must sum to 1.0, got {total:.6}"),
            });
        }
        Ok(self)
    }

    /// The momentum sub-score is only computed when it carries weight.
    pub fn momentum_enabled(&self) -> bool {
        self.momentum > 0.0
    }

    pub fn named(&self) -> [(&'static str, f64); 8] {
        [
            ("rsi", self.rsi),
            ("macd", self.macd),
            ("bollinger", self.bollinger),
            ("ma", self.ma),
            ("volume", self.volume),
            ("momentum", self.momentum),
            ("pattern", self.pattern),
            ("risk", self.risk),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubScores {
    pub rsi: f64,
    pub macd: f64,
    pub bollinger: f64,
    pub ma: f64,
    pub volume: f64,
    pub pattern: f64,
    pub risk: f64,
    pub momentum: Option<f64>,
}

impl SubScores {
    /// Weighted sum of the sub-scores, unrounded. A missing momentum
    /// score contributes nothing.
    pub fn overall(&self, weights: &ScoreWeights) -> f64 {
        self.rsi * weights.rsi
            + self.macd * weights.macd
            + self.bollinger * weights.bollinger
            + self.ma * weights.ma
            + self.volume * weights.volume
            + self.momentum.unwrap_or(0.0) * weights.momentum
            + self.pattern * weights.pattern
            + self.risk * weights.risk
    }
}

/// Compute every sub-score for one symbol.
///
/// Non-finite inputs are rejected as a computation fault so a poisoned
/// value never reaches the overall score.
pub fn score_components(
    bundle: &IndicatorBundle,
    reference: &MarketReference,
    weights: &ScoreWeights,
) -> Result<SubScores, EquiscoreError> {
    if !bundle.is_finite() {
        return Err(EquiscoreError::Computation {
            symbol: reference.symbol.clone(),
            reason: "indicator bundle contains non-finite values".to_string(),
        });
    }
    if !reference.is_well_formed() {
        return Err(EquiscoreError::Computation {
            symbol: reference.symbol.clone(),
            reason: "market reference contains non-finite values".to_string(),
        });
    }

    Ok(SubScores {
        rsi: rsi_score(bundle),
        macd: macd_score(bundle),
        bollinger: bollinger_score(bundle),
        ma: ma_score(bundle, reference.price),
        volume: volume_score(bundle),
        pattern: pattern_score(bundle.pattern, bundle.pattern_confidence),
        risk: risk_score(bundle.volatility_percentile, reference.beta),
        momentum: weights
            .momentum_enabled()
            .then(|| momentum_score(bundle, reference.change_percent)),
    })
}

fn finish(score: f64) -> f64 {
    round_to(score.clamp(0.0, 100.0), 1)
}

fn tier_at_most(value: f64, tiers: &[(f64, f64)], floor: f64) -> f64 {
    tiers
        .iter()
        .find(|(bound, _)| value <= *bound)
        .map_or(floor, |(_, score)| *score)
}

fn tier_at_least(value: f64, tiers: &[(f64, f64)], floor: f64) -> f64 {
    tiers
        .iter()
        .find(|(bound, _)| value >= *bound)
        .map_or(floor, |(_, score)| *score)
}

pub fn rsi_score(bundle: &IndicatorBundle) -> f64 {
    let rsi = bundle.rsi_14;
    let mut score = tier_at_most(rsi, &RSI_TIERS, RSI_FLOOR_SCORE);

    if bundle.rsi_7 < rsi && rsi < bundle.rsi_21 {
        score += 3.2;
    } else if bundle.rsi_7 > rsi && rsi > bundle.rsi_21 {
        score -= 3.2;
    }

    // stochastic double confirmation
    if bundle.stochastic_rsi <= 20.0 && rsi <= 35.0 {
        score += 4.7;
    } else if bundle.stochastic_rsi >= 80.0 && rsi >= 65.0 {
        score -= 4.7;
    }

    finish(score)
}

pub fn macd_score(bundle: &IndicatorBundle) -> f64 {
    let (line, signal, histogram) = (bundle.macd, bundle.macd_signal, bundle.macd_histogram);

    let mut score = if line > signal {
        if histogram > 0.05 {
            82.4
        } else if histogram > 0.02 {
            74.6
        } else if histogram > 0.0 {
            63.8
        } else {
            55.2
        }
    } else if histogram < -0.05 {
        17.6
    } else if histogram < -0.02 {
        25.4
    } else if histogram < 0.0 {
        36.2
    } else {
        44.8
    };

    if line > 0.0 && signal > 0.0 {
        score += 5.3;
    } else if line < 0.0 && signal < 0.0 {
        score -= 5.3;
    }

    if bundle.macd_short.abs() > line.abs() {
        score += 2.1;
    }

    finish(score)
}

pub fn bollinger_score(bundle: &IndicatorBundle) -> f64 {
    let mut score = tier_at_most(
        bundle.bollinger_position,
        &BOLLINGER_TIERS,
        BOLLINGER_FLOOR_SCORE,
    );

    if bundle.bollinger_squeeze {
        score += 6.8;
    }
    if bundle.bollinger_width < 0.03 {
        score += 3.4;
    } else if bundle.bollinger_width > 0.08 {
        score -= 2.7;
    }

    finish(score)
}

pub fn ma_score(bundle: &IndicatorBundle, price: f64) -> f64 {
    let (e5, e10, e20, e50) = (bundle.ema_5, bundle.ema_10, bundle.ema_20, bundle.ema_50);

    let mut score = if e5 > e10 && e10 > e20 && e20 > e50 {
        87.9
    } else if e5 > e10 && e10 > e20 {
        76.4
    } else if e5 > e10 {
        64.7
    } else if e5 < e10 && e10 < e20 && e20 < e50 {
        12.1
    } else if e5 < e10 && e10 < e20 {
        23.6
    } else if e5 < e10 {
        35.3
    } else {
        50.0
    };

    // no long-term average yet
    let sma = bundle.sma_200;
    if sma > 0.0 {
        let distance = (price - sma).abs() / sma;
        let adjustment = if distance > 0.10 {
            8.2
        } else if distance > 0.05 {
            4.6
        } else {
            2.3
        };
        if price > sma {
            score += adjustment;
        } else {
            score -= adjustment;
        }
    }

    finish(score)
}

pub fn volume_score(bundle: &IndicatorBundle) -> f64 {
    let mut score = tier_at_least(bundle.volume_ratio, &VOLUME_TIERS, VOLUME_FLOOR_SCORE);

    match bundle.obv_trend {
        ObvTrend::Up => score += 7.4,
        ObvTrend::Down => score -= 7.4,
        ObvTrend::Neutral => {}
    }

    if bundle.volume_price_trend > 0.0 {
        score += 3.8;
    } else if bundle.volume_price_trend < 0.0 {
        score -= 3.8;
    }

    finish(score)
}

pub fn pattern_score(pattern: ChartPattern, confidence: f64) -> f64 {
    let swing = match pattern {
        ChartPattern::NoPattern => return 50.0,
        ChartPattern::DoubleBottom => 38.7,
        ChartPattern::AscendingTriangle => 32.4,
        ChartPattern::VolumeBreakout => 35.6,
        ChartPattern::DoubleTop => -38.7,
        ChartPattern::HeadAndShoulders => -42.1,
        ChartPattern::DescendingTriangle => -32.4,
    };
    finish(50.0 + confidence * swing)
}

/// Higher is safer.
pub fn risk_score(volatility_percentile: f64, beta: f64) -> f64 {
    let mut score = 50.0;

    if volatility_percentile <= 20.0 {
        score += 20.0;
    } else if volatility_percentile <= 40.0 {
        score += 10.0;
    } else if volatility_percentile >= 80.0 {
        score -= 20.0;
    } else if volatility_percentile >= 60.0 {
        score -= 10.0;
    }

    if (0.8..=1.2).contains(&beta) {
        score += 10.0;
    } else if beta > 1.5 {
        score -= 15.0;
    } else if beta < 0.5 {
        score -= 5.0;
    }

    finish(score)
}

pub fn momentum_score(bundle: &IndicatorBundle, change_percent: f64) -> f64 {
    let mut score = tier_at_least(change_percent, &MOMENTUM_TIERS, MOMENTUM_FLOOR_SCORE);

    if bundle.volume_ratio > 1.5 {
        if change_percent > 0.0 {
            score += 6.3;
        } else if change_percent < 0.0 {
            score -= 6.3;
        }
    }

    if bundle.rsi_7 > 70.0 && change_percent > 0.0 {
        score -= 4.2;
    } else if bundle.rsi_7 < 30.0 && change_percent < 0.0 {
        score += 4.2;
    }

    finish(score)
}
