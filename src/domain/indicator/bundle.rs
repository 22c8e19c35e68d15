//! Per-symbol indicator snapshot.
//!
//! [`IndicatorBundle::compute`] runs every indicator over one history and
//! keeps the latest value of each, rounded to its documented precision.
//! Any indicator without enough history keeps its neutral default, so the
//! bundle is always fully populated and never holds NaN or infinity.

use crate::domain::indicator::atr::{self, calculate_atr};
use crate::domain::indicator::bollinger::{
    self, band_position, band_width, calculate_bollinger, SQUEEZE_WIDTH,
};
use crate::domain::indicator::ema::calculate_ema;
use crate::domain::indicator::macd::{self, calculate_macd};
use crate::domain::indicator::obv::{calculate_obv, obv_trend};
use crate::domain::indicator::pattern::{detect_pattern, ChartPattern};
use crate::domain::indicator::rsi::{calculate_rsi, calculate_stoch_rsi};
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::volatility::volatility_percentile;
use crate::domain::indicator::volume::{volume_price_trend, volume_ratio, vwap};
use crate::domain::indicator::{round_to, IndicatorSeries, IndicatorValue};
use crate::domain::ohlcv::{closes, volumes, OhlcvBar};
use std::fmt;

/// Window for support and resistance levels.
pub const LEVEL_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ObvTrend {
    Up,
    Down,
    #[default]
    Neutral,
}

impl fmt::Display for ObvTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObvTrend::Up => "UP",
            ObvTrend::Down => "DOWN",
            ObvTrend::Neutral => "NEUTRAL",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorBundle {
    pub rsi_7: f64,
    pub rsi_14: f64,
    pub rsi_21: f64,
    pub stochastic_rsi: f64,

    pub macd_short: f64,
    pub macd_signal_short: f64,
    pub macd_histogram_short: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,

    pub bollinger_upper: f64,
    pub bollinger_middle: f64,
    pub bollinger_lower: f64,
    pub bollinger_position: f64,
    pub bollinger_width: f64,
    pub bollinger_squeeze: bool,

    pub ema_5: f64,
    pub ema_10: f64,
    pub ema_20: f64,
    pub ema_50: f64,
    pub sma_100: f64,
    pub sma_200: f64,

    pub volume_ratio: f64,
    pub obv: f64,
    pub obv_trend: ObvTrend,
    pub vwap: f64,
    pub volume_price_trend: f64,

    pub pattern: ChartPattern,
    pub pattern_confidence: f64,

    pub support_level: f64,
    pub resistance_level: f64,
    pub atr: f64,
    pub volatility_percentile: f64,
}

impl Default for IndicatorBundle {
    fn default() -> Self {
        Self {
            rsi_7: 50.0,
            rsi_14: 50.0,
            rsi_21: 50.0,
            stochastic_rsi: 50.0,
            macd_short: 0.0,
            macd_signal_short: 0.0,
            macd_histogram_short: 0.0,
            macd: 0.0,
            macd_signal: 0.0,
            macd_histogram: 0.0,
            bollinger_upper: 0.0,
            bollinger_middle: 0.0,
            bollinger_lower: 0.0,
            bollinger_position: 0.5,
            bollinger_width: 0.0,
            bollinger_squeeze: false,
            ema_5: 0.0,
            ema_10: 0.0,
            ema_20: 0.0,
            ema_50: 0.0,
            sma_100: 0.0,
            sma_200: 0.0,
            volume_ratio: 1.0,
            obv: 0.0,
            obv_trend: ObvTrend::Neutral,
            vwap: 0.0,
            volume_price_trend: 0.0,
            pattern: ChartPattern::NoPattern,
            pattern_confidence: 0.0,
            support_level: 0.0,
            resistance_level: 0.0,
            atr: 0.0,
            volatility_percentile: 50.0,
        }
    }
}

impl IndicatorBundle {
    /// Compute the full snapshot from a chronologically ordered history.
    pub fn compute(bars: &[OhlcvBar]) -> Self {
        let mut bundle = Self::default();
        let Some(last_bar) = bars.last() else {
            return bundle;
        };
        let close_series = closes(bars);
        let volume_series = volumes(bars);

        bundle.rsi_7 = latest(&calculate_rsi(bars, 7), 2).unwrap_or(bundle.rsi_7);
        bundle.rsi_14 = latest(&calculate_rsi(bars, 14), 2).unwrap_or(bundle.rsi_14);
        bundle.rsi_21 = latest(&calculate_rsi(bars, 21), 2).unwrap_or(bundle.rsi_21);
        bundle.stochastic_rsi =
            latest(&calculate_stoch_rsi(bars, 14), 2).unwrap_or(bundle.stochastic_rsi);

        if let Some((line, signal, histogram)) = latest_macd(&calculate_macd(
            bars,
            macd::SHORT_FAST,
            macd::SHORT_SLOW,
            macd::SHORT_SIGNAL,
        )) {
            bundle.macd_short = line;
            bundle.macd_signal_short = signal;
            bundle.macd_histogram_short = histogram;
        }
        if let Some((line, signal, histogram)) = latest_macd(&calculate_macd(
            bars,
            macd::DEFAULT_FAST,
            macd::DEFAULT_SLOW,
            macd::DEFAULT_SIGNAL,
        )) {
            bundle.macd = line;
            bundle.macd_signal = signal;
            bundle.macd_histogram = histogram;
        }

        if let Some(IndicatorValue::Bollinger {
            upper,
            middle,
            lower,
        }) = calculate_bollinger(bars, bollinger::DEFAULT_PERIOD, bollinger::DEFAULT_MULT_X100)
            .last_valid()
        {
            let width = round_to(band_width(*upper, *middle, *lower), 4);
            bundle.bollinger_upper = round_to(*upper, 2);
            bundle.bollinger_middle = round_to(*middle, 2);
            bundle.bollinger_lower = round_to(*lower, 2);
            bundle.bollinger_position = round_to(band_position(last_bar.close, *upper, *lower), 3);
            bundle.bollinger_width = width;
            bundle.bollinger_squeeze = width < SQUEEZE_WIDTH;
        }

        bundle.ema_5 = latest(&calculate_ema(bars, 5), 2).unwrap_or(0.0);
        bundle.ema_10 = latest(&calculate_ema(bars, 10), 2).unwrap_or(0.0);
        bundle.ema_20 = latest(&calculate_ema(bars, 20), 2).unwrap_or(0.0);
        bundle.ema_50 = latest(&calculate_ema(bars, 50), 2).unwrap_or(0.0);
        bundle.sma_100 = latest(&calculate_sma(bars, 100), 2).unwrap_or(0.0);
        bundle.sma_200 = latest(&calculate_sma(bars, 200), 2).unwrap_or(0.0);

        bundle.volume_ratio = volume_ratio(bars).map_or(1.0, |r| round_to(r, 2));
        let obv = calculate_obv(bars);
        bundle.obv = obv.last_simple().map_or(0.0, |v| round_to(v, 2));
        bundle.obv_trend = obv_trend(&obv);
        bundle.vwap = vwap(bars).map_or(0.0, |v| round_to(v, 2));
        bundle.volume_price_trend = volume_price_trend(bars).map_or(0.0, |v| round_to(v, 2));

        let pattern = detect_pattern(&close_series, &volume_series);
        bundle.pattern = pattern.pattern;
        bundle.pattern_confidence = pattern.confidence;

        if close_series.len() >= LEVEL_WINDOW {
            let window = &close_series[close_series.len() - LEVEL_WINDOW..];
            bundle.support_level =
                round_to(window.iter().cloned().fold(f64::INFINITY, f64::min), 2);
            bundle.resistance_level =
                round_to(window.iter().cloned().fold(f64::NEG_INFINITY, f64::max), 2);
        }

        bundle.atr = latest(&calculate_atr(bars, atr::DEFAULT_PERIOD), 4).unwrap_or(0.0);
        bundle.volatility_percentile = volatility_percentile(&close_series)
            .map_or(bundle.volatility_percentile, |p| round_to(p, 1));

        bundle.sanitized()
    }

    /// True when every numeric field is finite.
    pub fn is_finite(&self) -> bool {
        self.numeric_fields().iter().all(|v| v.is_finite())
    }

    fn numeric_fields(&self) -> [f64; 30] {
        [
            self.rsi_7,
            self.rsi_14,
            self.rsi_21,
            self.stochastic_rsi,
            self.macd_short,
            self.macd_signal_short,
            self.macd_histogram_short,
            self.macd,
            self.macd_signal,
            self.macd_histogram,
            self.bollinger_upper,
            self.bollinger_middle,
            self.bollinger_lower,
            self.bollinger_position,
            self.bollinger_width,
            self.ema_5,
            self.ema_10,
            self.ema_20,
            self.ema_50,
            self.sma_100,
            self.sma_200,
            self.volume_ratio,
            self.obv,
            self.vwap,
            self.volume_price_trend,
            self.pattern_confidence,
            self.support_level,
            self.resistance_level,
            self.atr,
            self.volatility_percentile,
        ]
    }

    /// Replace any non-finite field with its neutral default.
    fn sanitized(mut self) -> Self {
        if self.is_finite() {
            return self;
        }
        let neutral = Self::default();
        macro_rules! reset {
            ($($field:ident),*) => {
                $(if !self.$field.is_finite() { self.$field = neutral.$field; })*
            };
        }
        reset!(
            rsi_7,
            rsi_14,
            rsi_21,
            stochastic_rsi,
            macd_short,
            macd_signal_short,
            macd_histogram_short,
            macd,
            macd_signal,
            macd_histogram,
            bollinger_upper,
            bollinger_middle,
            bollinger_lower,
            bollinger_position,
            bollinger_width,
            ema_5,
            ema_10,
            ema_20,
            ema_50,
            sma_100,
            sma_200,
            volume_ratio,
            obv,
            vwap,
            volume_price_trend,
            pattern_confidence,
            support_level,
            resistance_level,
            atr,
            volatility_percentile
        );
        self
    }
}

fn latest(series: &IndicatorSeries, decimals: i32) -> Option<f64> {
    series.last_simple().map(|v| round_to(v, decimals))
}

fn latest_macd(series: &IndicatorSeries) -> Option<(f64, f64, f64)> {
    match series.last_valid() {
        Some(IndicatorValue::Macd {
            line,
            signal,
            histogram,
        }) => Some((round_to(*line, 4), round_to(*signal, 4), round_to(*histogram, 4))),
        _ => None,
    }
}
