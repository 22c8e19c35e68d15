//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is the sample standard deviation (divides by N-1).
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are invalid.

use crate::domain::indicator::stddev::sample_std;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULT_X100: u32 = 200;

/// Band width below which the bands count as squeezed.
pub const SQUEEZE_WIDTH: f64 = 0.05;

pub fn calculate_bollinger(
    bars: &[OhlcvBar],
    period: usize,
    stddev_mult_x100: u32,
) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let warmup = period.saturating_sub(1).max(1);
    let mult = stddev_mult_x100 as f64 / 100.0;

    for i in 0..bars.len() {
        let date = bars[i].date;
        let valid = period >= 2 && i >= warmup;

        let (upper, middle, lower) = if valid {
            let start = i + 1 - period;
            let window: Vec<f64> = bars[start..=i].iter().map(|b| b.close).collect();
            let middle_val = window.iter().sum::<f64>() / period as f64;
            let stddev = sample_std(&window).unwrap_or(0.0);
            (middle_val + mult * stddev, middle_val, middle_val - mult * stddev)
        } else {
            (0.0, 0.0, 0.0)
        };

        values.push(IndicatorPoint {
            date,
            valid,
            value: IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            },
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Bollinger {
            period,
            stddev_mult_x100,
        },
        values,
    }
}

/// Where `price` sits between the bands: 0 at the lower band, 1 at the
/// upper. Collapsed bands read 0.5.
pub fn band_position(price: f64, upper: f64, lower: f64) -> f64 {
    if upper == lower {
        0.5
    } else {
        (price - lower) / (upper - lower)
    }
}

/// Band width relative to the middle band. Zero when the middle is zero.
pub fn band_width(upper: f64, middle: f64, lower: f64) -> f64 {
    if middle == 0.0 {
        0.0
    } else {
        (upper - lower) / middle
    }
}
