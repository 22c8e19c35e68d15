//! OBV (On-Balance Volume) indicator implementation.

use crate::domain::indicator::bundle::ObvTrend;
use crate::domain::indicator::{
    linear_slope, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::ohlcv::OhlcvBar;

/// Number of trailing OBV values the trend slope is fitted over.
pub const TREND_WINDOW: usize = 5;

/// Calculate OBV (On-Balance Volume) indicator.
///
/// OBV[0] = 0
/// If close[i] > close[i-1]: OBV[i] = OBV[i-1] + volume[i]
/// If close[i] < close[i-1]: OBV[i] = OBV[i-1] - volume[i]
/// If close[i] == close[i-1]: OBV[i] = OBV[i-1]
///
/// No warmup period; all bars are valid.
pub fn calculate_obv(bars: &[OhlcvBar]) -> IndicatorSeries {
    let mut values = Vec::with_capacity(bars.len());
    let mut obv: f64 = 0.0;
    let mut prev_close: Option<f64> = None;

    for bar in bars {
        if let Some(prev) = prev_close {
            if bar.close > prev {
                obv += bar.volume as f64;
            } else if bar.close < prev {
                obv -= bar.volume as f64;
            }
        }
        prev_close = Some(bar.close);

        values.push(IndicatorPoint {
            date: bar.date,
            valid: true,
            value: IndicatorValue::Simple(obv),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Obv,
        values,
    }
}

/// Direction of the least-squares slope over the last [`TREND_WINDOW`]
/// OBV values. Neutral when fewer values exist.
pub fn obv_trend(series: &IndicatorSeries) -> ObvTrend {
    let values = series.valid_simple_values();
    if values.len() < TREND_WINDOW {
        return ObvTrend::Neutral;
    }
    let slope = linear_slope(&values[values.len() - TREND_WINDOW..]);
    if slope > 0.0 {
        ObvTrend::Up
    } else if slope < 0.0 {
        ObvTrend::Down
    } else {
        ObvTrend::Neutral
    }
}
