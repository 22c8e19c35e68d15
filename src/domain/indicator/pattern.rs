//! Chart pattern detection over the tail of a price series.
//!
//! Detectors run in a fixed priority order and the first match wins:
//! double bottom, double top, head and shoulders, ascending triangle,
//! descending triangle, volume breakout. At most one pattern is reported.

use crate::domain::indicator::linear_slope;
use std::fmt;

/// Minimum history before any detector runs.
pub const MIN_BARS: usize = 20;

const DOUBLE_WINDOW: usize = 20;
const DOUBLE_TOLERANCE: f64 = 0.03;
const SHOULDERS_WINDOW: usize = 15;
const SHOULDERS_TOLERANCE: f64 = 0.05;
const TRIANGLE_WINDOW: usize = 10;
const TRIANGLE_ROLL: usize = 3;
const TRIANGLE_TAIL: usize = 5;
const BREAKOUT_WINDOW: usize = 10;
const BREAKOUT_VOLUME_MULT: f64 = 1.5;
const BREAKOUT_MIN_MOVE: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChartPattern {
    #[default]
    NoPattern,
    DoubleBottom,
    DoubleTop,
    HeadAndShoulders,
    AscendingTriangle,
    DescendingTriangle,
    VolumeBreakout,
}

impl ChartPattern {
    /// Fixed confidence reported when this pattern is detected.
    pub fn confidence(self) -> f64 {
        match self {
            ChartPattern::NoPattern => 0.0,
            ChartPattern::DoubleBottom | ChartPattern::DoubleTop => 0.75,
            ChartPattern::HeadAndShoulders => 0.80,
            ChartPattern::AscendingTriangle | ChartPattern::DescendingTriangle => 0.65,
            ChartPattern::VolumeBreakout => 0.70,
        }
    }

    pub fn is_bullish(self) -> bool {
        matches!(
            self,
            ChartPattern::DoubleBottom
                | ChartPattern::AscendingTriangle
                | ChartPattern::VolumeBreakout
        )
    }

    pub fn is_bearish(self) -> bool {
        matches!(
            self,
            ChartPattern::DoubleTop
                | ChartPattern::HeadAndShoulders
                | ChartPattern::DescendingTriangle
        )
    }
}

impl fmt::Display for ChartPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartPattern::NoPattern => "NO_PATTERN",
            ChartPattern::DoubleBottom => "DOUBLE_BOTTOM",
            ChartPattern::DoubleTop => "DOUBLE_TOP",
            ChartPattern::HeadAndShoulders => "HEAD_AND_SHOULDERS",
            ChartPattern::AscendingTriangle => "ASCENDING_TRIANGLE",
            ChartPattern::DescendingTriangle => "DESCENDING_TRIANGLE",
            ChartPattern::VolumeBreakout => "VOLUME_BREAKOUT",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PatternMatch {
    pub pattern: ChartPattern,
    pub confidence: f64,
}

impl PatternMatch {
    fn of(pattern: ChartPattern) -> Self {
        Self {
            pattern,
            confidence: pattern.confidence(),
        }
    }
}

pub fn detect_pattern(closes: &[f64], volumes: &[f64]) -> PatternMatch {
    if closes.len() < MIN_BARS {
        return PatternMatch::default();
    }

    let detected = if is_double_bottom(closes) {
        ChartPattern::DoubleBottom
    } else if is_double_top(closes) {
        ChartPattern::DoubleTop
    } else if is_head_and_shoulders(closes) {
        ChartPattern::HeadAndShoulders
    } else if is_ascending_triangle(closes) {
        ChartPattern::AscendingTriangle
    } else if is_descending_triangle(closes) {
        ChartPattern::DescendingTriangle
    } else if is_volume_breakout(closes, volumes) {
        ChartPattern::VolumeBreakout
    } else {
        ChartPattern::NoPattern
    };

    PatternMatch::of(detected)
}

fn tail(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}

/// Indices strictly below (or above, with `peaks`) both neighbours on
/// each side.
fn local_extrema(values: &[f64], peaks: bool) -> Vec<usize> {
    if values.len() < 5 {
        return Vec::new();
    }
    (2..values.len() - 2)
        .filter(|&i| {
            let v = values[i];
            let beats = |other: f64| if peaks { v > other } else { v < other };
            beats(values[i - 1]) && beats(values[i - 2]) && beats(values[i + 1]) && beats(values[i + 2])
        })
        .collect()
}

fn last_two_similar(values: &[f64], indices: &[usize]) -> bool {
    match indices {
        [.., a, b] => {
            let first = values[*a];
            let second = values[*b];
            first != 0.0 && ((first - second) / first).abs() < DOUBLE_TOLERANCE
        }
        _ => false,
    }
}

fn is_double_bottom(closes: &[f64]) -> bool {
    let recent = tail(closes, DOUBLE_WINDOW);
    last_two_similar(recent, &local_extrema(recent, false))
}

fn is_double_top(closes: &[f64]) -> bool {
    let recent = tail(closes, DOUBLE_WINDOW);
    last_two_similar(recent, &local_extrema(recent, true))
}

fn is_head_and_shoulders(closes: &[f64]) -> bool {
    let recent = tail(closes, SHOULDERS_WINDOW);
    match local_extrema(recent, true).as_slice() {
        [.., l, h, r] => {
            let (left, head, right) = (recent[*l], recent[*h], recent[*r]);
            head > left
                && head > right
                && left != 0.0
                && ((left - right) / left).abs() < SHOULDERS_TOLERANCE
        }
        _ => false,
    }
}

fn rolling_extreme(values: &[f64], window: usize, max: bool) -> Vec<f64> {
    values
        .windows(window)
        .map(|w| {
            if max {
                w.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
            } else {
                w.iter().cloned().fold(f64::INFINITY, f64::min)
            }
        })
        .collect()
}

fn triangle_slope(closes: &[f64], max: bool) -> Option<f64> {
    let recent = tail(closes, TRIANGLE_WINDOW);
    let rolled = rolling_extreme(recent, TRIANGLE_ROLL, max);
    if rolled.len() < TRIANGLE_TAIL {
        return None;
    }
    Some(linear_slope(tail(&rolled, TRIANGLE_TAIL)))
}

fn is_ascending_triangle(closes: &[f64]) -> bool {
    triangle_slope(closes, false).is_some_and(|s| s > 0.0)
}

fn is_descending_triangle(closes: &[f64]) -> bool {
    triangle_slope(closes, true).is_some_and(|s| s < 0.0)
}

fn is_volume_breakout(closes: &[f64], volumes: &[f64]) -> bool {
    if volumes.len() < BREAKOUT_WINDOW || closes.len() < 2 {
        return false;
    }
    let recent = tail(volumes, BREAKOUT_WINDOW);
    let avg = recent.iter().sum::<f64>() / recent.len() as f64;
    let current = recent[recent.len() - 1];
    if current <= avg * BREAKOUT_VOLUME_MULT {
        return false;
    }
    let prev = closes[closes.len() - 2];
    let last = closes[closes.len() - 1];
    prev != 0.0 && ((last - prev) / prev).abs() > BREAKOUT_MIN_MOVE
}
