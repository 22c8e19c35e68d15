//! Volume statistics: relative volume, VWAP and volume-price trend.

use crate::domain::ohlcv::OhlcvBar;

/// Trailing window for the average-volume baseline.
pub const VOLUME_AVG_WINDOW: usize = 20;

/// Latest volume over the mean of the last [`VOLUME_AVG_WINDOW`] volumes
/// (the latest included). `None` when the history is shorter than the
/// window or the baseline is zero.
pub fn volume_ratio(bars: &[OhlcvBar]) -> Option<f64> {
    if bars.len() < VOLUME_AVG_WINDOW {
        return None;
    }
    let window = &bars[bars.len() - VOLUME_AVG_WINDOW..];
    let mean = window.iter().map(|b| b.volume as f64).sum::<f64>() / VOLUME_AVG_WINDOW as f64;
    if mean <= 0.0 {
        return None;
    }
    let last = window[window.len() - 1].volume as f64;
    Some(last / mean)
}

/// Volume-weighted average of the typical price over the whole history.
pub fn vwap(bars: &[OhlcvBar]) -> Option<f64> {
    let total_volume: f64 = bars.iter().map(|b| b.volume as f64).sum();
    if total_volume <= 0.0 {
        return None;
    }
    let weighted: f64 = bars
        .iter()
        .map(|b| b.typical_price() * b.volume as f64)
        .sum();
    Some(weighted / total_volume)
}

/// Latest volume scaled by the latest fractional price change.
pub fn volume_price_trend(bars: &[OhlcvBar]) -> Option<f64> {
    let [.., prev, last] = bars else {
        return None;
    };
    if prev.close == 0.0 {
        return None;
    }
    let change = (last.close - prev.close) / prev.close;
    Some(last.volume as f64 * change)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(data: &[(f64, i64)]) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(close, volume))| OhlcvBar {
                symbol: "TEST".into(),
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume,
            })
            .collect()
    }

    #[test]
    fn volume_ratio_needs_full_window() {
        let bars = make_bars(&[(10.0, 100); 19]);
        assert_eq!(volume_ratio(&bars), None);
    }

    #[test]
    fn volume_ratio_spike() {
        let mut data = vec![(10.0, 100); 19];
        data.push((10.0, 290));
        // mean = (19*100 + 290) / 20 = 109.5
        let ratio = volume_ratio(&make_bars(&data)).unwrap();
        assert!((ratio - 290.0 / 109.5).abs() < 1e-12);
    }

    #[test]
    fn volume_ratio_zero_baseline() {
        let bars = make_bars(&[(10.0, 0); 25]);
        assert_eq!(volume_ratio(&bars), None);
    }

    #[test]
    fn vwap_weights_by_volume() {
        // typical prices equal closes here (high/low symmetric)
        let bars = make_bars(&[(10.0, 100), (20.0, 300)]);
        let v = vwap(&bars).unwrap();
        assert!((v - 17.5).abs() < 1e-12);
    }

    #[test]
    fn vwap_no_volume() {
        assert_eq!(vwap(&make_bars(&[(10.0, 0)])), None);
        assert_eq!(vwap(&[]), None);
    }

    #[test]
    fn volume_price_trend_sign_follows_price() {
        let up = make_bars(&[(100.0, 10), (102.0, 500)]);
        assert!((volume_price_trend(&up).unwrap() - 10.0).abs() < 1e-9);

        let down = make_bars(&[(100.0, 10), (99.0, 500)]);
        assert!(volume_price_trend(&down).unwrap() < 0.0);

        assert_eq!(volume_price_trend(&make_bars(&[(100.0, 10)])), None);
    }
}
