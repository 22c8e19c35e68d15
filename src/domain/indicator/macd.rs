//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! All three averages use the bias-corrected weighting from [`super::ema`].
//! Standard parameters: fast=12, slow=26, signal=9.
//! Short-horizon parameters: fast=5, slow=15, signal=9.
//! Warmup: first (slow + signal - 1) bars are invalid.

use crate::domain::indicator::ema::exponential_mean;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub const SHORT_FAST: usize = 5;
pub const SHORT_SLOW: usize = 15;
pub const SHORT_SIGNAL: usize = 9;

pub fn calculate_macd(
    bars: &[OhlcvBar],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    if bars.is_empty() || fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        };
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ema_fast = exponential_mean(&closes, fast);
    let ema_slow = exponential_mean(&closes, slow);

    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = exponential_mean(&macd_line, signal_period);

    let warmup = slow + signal_period - 1;
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorPoint {
            date: bar.date,
            valid: i >= warmup,
            value: IndicatorValue::Macd {
                line: macd_line[i],
                signal: signal_line[i],
                histogram: macd_line[i] - signal_line[i],
            },
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64]) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                symbol: "TEST".into(),
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect()
    }

    fn last_macd(series: &IndicatorSeries) -> (f64, f64, f64) {
        match series.last_valid() {
            Some(IndicatorValue::Macd {
                line,
                signal,
                histogram,
            }) => (*line, *signal, *histogram),
            other => panic!("Expected valid MACD value, got {:?}", other),
        }
    }

    #[test]
    fn macd_empty_bars() {
        let series = calculate_macd(&[], 12, 26, 9);
        assert!(series.values.is_empty());
    }

    #[test]
    fn macd_warmup_is_slow_plus_signal() {
        let prices: Vec<f64> = (0..34).map(|i| 100.0 + i as f64).collect();
        let series = calculate_macd(&make_bars(&prices), 12, 26, 9);
        assert!(series.last_valid().is_none());

        let prices: Vec<f64> = (0..35).map(|i| 100.0 + i as f64).collect();
        let series = calculate_macd(&make_bars(&prices), 12, 26, 9);
        assert!(series.last_valid().is_some());
    }

    #[test]
    fn macd_constant_prices_are_zero() {
        let series = calculate_macd(&make_bars(&[50.0; 60]), 12, 26, 9);
        let (line, signal, histogram) = last_macd(&series);
        assert!(line.abs() < 1e-12);
        assert!(signal.abs() < 1e-12);
        assert!(histogram.abs() < 1e-12);
    }

    #[test]
    fn macd_uptrend_is_positive() {
        let prices: Vec<f64> = (0..80).map(|i| 100.0 + i as f64 * 0.5).collect();
        let series = calculate_macd(&make_bars(&prices), 12, 26, 9);
        let (line, signal, _) = last_macd(&series);
        assert!(line > 0.0);
        assert!(signal > 0.0);
    }

    #[test]
    fn macd_histogram_is_line_minus_signal() {
        let prices: Vec<f64> = (0..60)
            .map(|i| 100.0 + (i as f64 * 0.3).sin() * 4.0)
            .collect();
        let series = calculate_macd(&make_bars(&prices), SHORT_FAST, SHORT_SLOW, SHORT_SIGNAL);
        let (line, signal, histogram) = last_macd(&series);
        assert!((histogram - (line - signal)).abs() < 1e-12);
    }

    #[test]
    fn macd_indicator_type() {
        let series = calculate_macd(&make_bars(&[1.0]), 5, 15, 9);
        assert_eq!(
            series.indicator_type,
            IndicatorType::Macd {
                fast: 5,
                slow: 15,
                signal: 9
            }
        );
    }
}
