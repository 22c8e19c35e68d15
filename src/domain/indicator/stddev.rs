//! Standard deviation helpers.
//!
//! `sample_std` divides by N-1 and backs the Bollinger bands and the
//! volatility percentile. `population_std` divides by N and is used for
//! dispersion of share distributions.

/// Sample standard deviation (N-1). `None` for fewer than two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / (n - 1) as f64;
    Some(variance.sqrt())
}

/// Population standard deviation (N). Zero for an empty slice.
pub fn population_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / n as f64;
    variance.sqrt()
}

/// Sample standard deviation over every full trailing window of `window`
/// values, in order. Empty when there are fewer than `window` values.
pub fn rolling_sample_std(values: &[f64], window: usize) -> Vec<f64> {
    if window < 2 || values.len() < window {
        return Vec::new();
    }
    values
        .windows(window)
        .filter_map(sample_std)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_std_known_value() {
        // mean 5, squared deviations sum 32, /7 → sqrt(4.571)
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let expected = (32.0f64 / 7.0).sqrt();
        assert!((sample_std(&values).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn population_std_known_value() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_std(&values) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn sample_std_needs_two_values() {
        assert_eq!(sample_std(&[]), None);
        assert_eq!(sample_std(&[3.0]), None);
    }

    #[test]
    fn population_std_empty_and_constant() {
        assert_eq!(population_std(&[]), 0.0);
        assert_eq!(population_std(&[4.0, 4.0, 4.0]), 0.0);
    }

    #[test]
    fn rolling_sample_std_window_count() {
        let values: Vec<f64> = (0..25).map(|i| i as f64).collect();
        let rolling = rolling_sample_std(&values, 20);
        assert_eq!(rolling.len(), 6);
        // Each window is 20 consecutive integers, so all stds are equal.
        for pair in rolling.windows(2) {
            assert!((pair[0] - pair[1]).abs() < 1e-9);
        }
    }

    #[test]
    fn rolling_sample_std_too_short() {
        assert!(rolling_sample_std(&[1.0, 2.0], 20).is_empty());
    }
}
