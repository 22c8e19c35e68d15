//! Volatility percentile rank.
//!
//! Ranks the standard deviation of the latest 20 daily returns against
//! every rolling 20-return standard deviation in the history: the result
//! is the percentage of historical windows that were strictly calmer.

use crate::domain::indicator::stddev::{rolling_sample_std, sample_std};

pub const RETURN_WINDOW: usize = 20;
pub const MIN_RETURNS: usize = 50;

/// Percentile in [0, 100], or `None` when fewer than [`MIN_RETURNS`]
/// returns are available.
pub fn volatility_percentile(closes: &[f64]) -> Option<f64> {
    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    if returns.len() < MIN_RETURNS {
        return None;
    }

    let current = sample_std(&returns[returns.len() - RETURN_WINDOW..])?;
    let history = rolling_sample_std(&returns, RETURN_WINDOW);
    if history.is_empty() {
        return None;
    }
    let calmer = history.iter().filter(|&&s| s < current).count();
    Some(calmer as f64 / history.len() as f64 * 100.0)
}
