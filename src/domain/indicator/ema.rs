//! Exponential Moving Average indicator.
//!
//! Bias-corrected exponential weighting with alpha = 2/(n+1):
//!
//! EMA[i] = sum((1-alpha)^j * C[i-j]) / sum((1-alpha)^j), j = 0..=i
//!
//! computed recursively as a running numerator over a running weight sum.
//! Early values are therefore not dragged toward a zero seed.
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_ema(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries {
            indicator_type: IndicatorType::Ema(period),
            values: Vec::new(),
        };
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ema = exponential_mean(&closes, period);

    let values = bars
        .iter()
        .zip(ema)
        .enumerate()
        .map(|(i, (bar, value))| IndicatorPoint {
            date: bar.date,
            valid: i + 1 >= period,
            value: IndicatorValue::Simple(value),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}

/// Bias-corrected exponential mean of `values` for a given span.
///
/// Every output position is defined; callers decide how much warmup to
/// discard.
pub fn exponential_mean(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span.max(1) as f64 + 1.0);
    let decay = 1.0 - alpha;
    let mut numerator = 0.0;
    let mut weight = 0.0;
    values
        .iter()
        .map(|&v| {
            numerator = v + decay * numerator;
            weight = 1.0 + decay * weight;
            numerator / weight
        })
        .collect()
}
