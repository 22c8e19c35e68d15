//! RSI (Relative Strength Index) and stochastic RSI.
//!
//! Average gain/loss are simple means over the trailing `n` price changes
//! (Cutler's variant), so each value depends only on its own window:
//!
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//!
//! A zero average loss is floored to `LOSS_FLOOR` so an all-gains window
//! reads just under 100 instead of dividing by zero. A window with no
//! movement at all reads as the neutral 50.
//!
//! Warmup: first n bars are invalid (need n price changes).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const LOSS_FLOOR: f64 = 0.0001;
pub const NEUTRAL_RSI: f64 = 50.0;

pub fn calculate_rsi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        let valid = period > 0 && i >= period;
        let rsi = if valid {
            let (gain_sum, loss_sum) = bars[i - period..=i]
                .windows(2)
                .fold((0.0, 0.0), |(g, l), w| {
                    let change = w[1].close - w[0].close;
                    if change > 0.0 {
                        (g + change, l)
                    } else {
                        (g, l - change)
                    }
                });
            rsi_from_sums(gain_sum, loss_sum, period)
        } else {
            0.0
        };

        values.push(IndicatorPoint {
            date: bar.date,
            valid,
            value: IndicatorValue::Simple(rsi),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

fn rsi_from_sums(gain_sum: f64, loss_sum: f64, period: usize) -> f64 {
    if gain_sum == 0.0 && loss_sum == 0.0 {
        return NEUTRAL_RSI;
    }
    let avg_gain = gain_sum / period as f64;
    let mut avg_loss = loss_sum / period as f64;
    if avg_loss == 0.0 {
        avg_loss = LOSS_FLOOR;
    }
    100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
}

/// Stochastic RSI: where the latest RSI sits inside the range of the last
/// `period` RSI values, scaled to 0-100.
///
/// RSI values are rounded to 2 decimals before ranging. A flat RSI range
/// reads 50. Warmup: first 2n-1 bars are invalid.
pub fn calculate_stoch_rsi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let rsi = calculate_rsi(bars, period);
    let mut values = Vec::with_capacity(bars.len());

    for (i, point) in rsi.values.iter().enumerate() {
        let valid = period > 0 && i + 1 >= 2 * period;
        let stoch = if valid {
            let window: Vec<f64> = rsi.values[i + 1 - period..=i]
                .iter()
                .map(|p| match p.value {
                    IndicatorValue::Simple(v) => super::round_to(v, 2),
                    _ => NEUTRAL_RSI,
                })
                .collect();
            let lowest = window.iter().cloned().fold(f64::INFINITY, f64::min);
            let highest = window.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let current = window[window.len() - 1];
            if highest == lowest {
                NEUTRAL_RSI
            } else {
                (current - lowest) / (highest - lowest) * 100.0
            }
        } else {
            0.0
        };

        values.push(IndicatorPoint {
            date: point.date,
            valid,
            value: IndicatorValue::Simple(stoch),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::StochRsi(period),
        values,
    }
}
