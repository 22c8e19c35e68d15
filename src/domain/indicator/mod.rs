//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters
//! - `IndicatorSeries`: A time series of indicator values
//!
//! Series functions never fail: a history that is too short simply yields
//! points flagged `valid: false`. [`bundle::IndicatorBundle`] collapses the
//! series into the rounded per-symbol snapshot consumed by scoring.

pub mod atr;
pub mod bollinger;
pub mod bundle;
pub mod ema;
pub mod macd;
pub mod obv;
pub mod pattern;
pub mod rsi;
pub mod sma;
pub mod stddev;
pub mod volatility;
pub mod volume;

pub use bundle::{IndicatorBundle, ObvTrend};
pub use pattern::{ChartPattern, PatternMatch};

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    StochRsi(usize),
    Atr(usize),
    Obv,
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Value of the final point, if that point is valid.
    pub fn last_valid(&self) -> Option<&IndicatorValue> {
        self.values.last().filter(|p| p.valid).map(|p| &p.value)
    }

    /// Final point as a scalar, if valid and `Simple`.
    pub fn last_simple(&self) -> Option<f64> {
        match self.last_valid() {
            Some(IndicatorValue::Simple(v)) => Some(*v),
            _ => None,
        }
    }

    /// All valid `Simple` values in order.
    pub fn valid_simple_values(&self) -> Vec<f64> {
        self.values
            .iter()
            .filter(|p| p.valid)
            .filter_map(|p| match p.value {
                IndicatorValue::Simple(v) => Some(v),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::StochRsi(period) => write!(f, "STOCHRSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Obv => write!(f, "OBV"),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
        }
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Least-squares slope of `values` against their index.
///
/// Returns 0.0 for fewer than two points.
pub fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = values.iter().sum::<f64>() / n as f64;
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    if den == 0.0 { 0.0 } else { num / den }
}
