//! Human-readable buy/sell annotations and reasoning lines.
//!
//! Only the counts of the signal lists feed back into the recommendation
//! (as the signal balance). The text is for people.

use crate::domain::indicator::{ChartPattern, IndicatorBundle, ObvTrend};
use crate::domain::market::MarketReference;
use crate::domain::recommendation::Recommendation;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Signals {
    pub buy: Vec<String>,
    pub sell: Vec<String>,
}

impl Signals {
    /// Number of buy signals minus number of sell signals.
    pub fn balance(&self) -> i32 {
        self.buy.len() as i32 - self.sell.len() as i32
    }
}

pub fn generate_signals(bundle: &IndicatorBundle, reference: &MarketReference) -> Signals {
    let mut signals = Signals::default();
    let rsi = bundle.rsi_14;
    let change = reference.change_percent;
    let ratio = bundle.volume_ratio;

    if rsi <= 25.0 {
        signals.buy.push(format!("RSI deeply oversold ({rsi:.1})"));
    } else if rsi <= 30.0 {
        signals.buy.push(format!("RSI oversold ({rsi:.1})"));
    } else if rsi >= 75.0 {
        signals.sell.push(format!("RSI deeply overbought ({rsi:.1})"));
    } else if rsi >= 70.0 {
        signals.sell.push(format!("RSI overbought ({rsi:.1})"));
    }

    let histogram = bundle.macd_histogram;
    if bundle.macd > bundle.macd_signal {
        if histogram > 0.05 {
            signals.buy.push("MACD strong bullish crossover".to_string());
        } else if histogram > 0.0 {
            signals.buy.push("MACD bullish crossover".to_string());
        }
    } else if histogram < -0.05 {
        signals.sell.push("MACD strong bearish crossover".to_string());
    } else if histogram < 0.0 {
        signals.sell.push("MACD bearish crossover".to_string());
    }

    let position = bundle.bollinger_position;
    if position <= 0.1 {
        signals
            .buy
            .push(format!("Price near lower Bollinger band ({:.1}%)", position * 100.0));
    } else if position >= 0.9 {
        signals
            .sell
            .push(format!("Price near upper Bollinger band ({:.1}%)", position * 100.0));
    }

    if bundle.ema_5 > bundle.ema_10 && bundle.ema_10 > bundle.ema_20 {
        signals.buy.push("Bullish moving average alignment".to_string());
    } else if bundle.ema_5 < bundle.ema_10 && bundle.ema_10 < bundle.ema_20 {
        signals.sell.push("Bearish moving average alignment".to_string());
    }

    if ratio >= 2.0 {
        if change > 0.0 {
            signals
                .buy
                .push(format!("Exceptional volume on a rise ({ratio:.1}x)"));
        } else {
            signals
                .sell
                .push(format!("Exceptional volume on a decline ({ratio:.1}x)"));
        }
    } else if ratio >= 1.5 && bundle.obv_trend == ObvTrend::Up {
        signals.buy.push("Elevated volume with rising OBV".to_string());
    } else if ratio >= 1.5 && bundle.obv_trend == ObvTrend::Down {
        signals.sell.push("Elevated volume with falling OBV".to_string());
    }

    match bundle.pattern {
        ChartPattern::DoubleBottom | ChartPattern::AscendingTriangle => {
            signals.buy.push(format!("Bullish pattern: {}", bundle.pattern));
        }
        ChartPattern::DoubleTop | ChartPattern::HeadAndShoulders => {
            signals.sell.push(format!("Bearish pattern: {}", bundle.pattern));
        }
        _ => {}
    }

    if change >= 3.0 && ratio >= 1.5 {
        signals
            .buy
            .push(format!("Strong rise confirmed by volume (+{change:.1}%)"));
    } else if change <= -3.0 && ratio >= 1.5 {
        signals
            .sell
            .push(format!("Strong decline confirmed by volume ({change:.1}%)"));
    }

    signals
}

/// Explanation lines for a scored symbol, most important first.
pub fn generate_reasoning(
    bundle: &IndicatorBundle,
    reference: &MarketReference,
    equitable_score: f64,
) -> Vec<String> {
    let mut lines = Vec::new();

    let tier = Recommendation::score_tier(equitable_score);
    let quality = match tier {
        Recommendation::StrongBuy => "excellent",
        Recommendation::Buy => "very high",
        Recommendation::WeakBuy => "high",
        Recommendation::Hold => "neutral",
        Recommendation::WeakSell => "low",
        Recommendation::Sell => "weak",
        Recommendation::StrongSell => "very weak",
    };
    lines.push(format!(
        "Equitable score {quality} ({equitable_score:.1}/100), {tier} territory"
    ));

    let rsi = bundle.rsi_14;
    if rsi <= 30.0 {
        lines.push(format!("RSI in oversold zone ({rsi:.1}), potential buy"));
    } else if rsi >= 70.0 {
        lines.push(format!("RSI in overbought zone ({rsi:.1}), potential sell"));
    }

    if bundle.macd_histogram > 0.0 {
        lines.push("MACD histogram positive, bullish momentum".to_string());
    } else if bundle.macd_histogram < 0.0 {
        lines.push("MACD histogram negative, bearish momentum".to_string());
    }

    let ratio = bundle.volume_ratio;
    if ratio >= 2.0 {
        lines.push(format!("Exceptional volume ({ratio:.1}x) confirms the move"));
    } else if ratio >= 1.5 {
        lines.push(format!("Elevated volume ({ratio:.1}x) confirms the move"));
    }

    if bundle.pattern != ChartPattern::NoPattern {
        lines.push(format!(
            "Pattern detected: {} (confidence {:.0}%)",
            bundle.pattern,
            bundle.pattern_confidence * 100.0
        ));
    }

    lines.push(format!(
        "{} stock in sector {}",
        reference.quintile().label(),
        reference.sector
    ));

    lines
}
