//! Seven-tier recommendation labels.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Score and signal-balance thresholds, checked in table order. Both must
/// hold for the label to apply.
const BUY_TABLE: [(f64, i32, Recommendation); 3] = [
    (82.4, 2, Recommendation::StrongBuy),
    (76.9, 1, Recommendation::Buy),
    (63.7, 0, Recommendation::WeakBuy),
];
const SELL_TABLE: [(f64, i32, Recommendation); 3] = [
    (17.6, -2, Recommendation::StrongSell),
    (23.1, -1, Recommendation::Sell),
    (36.3, 0, Recommendation::WeakSell),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    StrongBuy,
    Buy,
    WeakBuy,
    Hold,
    WeakSell,
    Sell,
    StrongSell,
}

impl Recommendation {
    pub const ALL: [Recommendation; 7] = [
        Recommendation::StrongBuy,
        Recommendation::Buy,
        Recommendation::WeakBuy,
        Recommendation::Hold,
        Recommendation::WeakSell,
        Recommendation::Sell,
        Recommendation::StrongSell,
    ];

    /// Label for an equitable score and a signal balance.
    pub fn derive(score: f64, signal_balance: i32) -> Self {
        BUY_TABLE
            .iter()
            .find(|(threshold, balance, _)| score >= *threshold && signal_balance >= *balance)
            .or_else(|| {
                SELL_TABLE.iter().find(|(threshold, balance, _)| {
                    score <= *threshold && signal_balance <= *balance
                })
            })
            .map_or(Recommendation::Hold, |(_, _, label)| *label)
    }

    /// Label the score alone would earn, ignoring signal balance.
    pub fn score_tier(score: f64) -> Self {
        BUY_TABLE
            .iter()
            .find(|(threshold, _, _)| score >= *threshold)
            .or_else(|| SELL_TABLE.iter().find(|(threshold, _, _)| score <= *threshold))
            .map_or(Recommendation::Hold, |(_, _, label)| *label)
    }

    pub fn confidence(self) -> f64 {
        match self {
            Recommendation::StrongBuy | Recommendation::StrongSell => 0.92,
            Recommendation::Buy | Recommendation::Sell => 0.84,
            Recommendation::WeakBuy | Recommendation::WeakSell => 0.73,
            Recommendation::Hold => 0.65,
        }
    }

    pub fn is_buy(self) -> bool {
        matches!(
            self,
            Recommendation::StrongBuy | Recommendation::Buy | Recommendation::WeakBuy
        )
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Recommendation::StrongBuy => "STRONG_BUY",
            Recommendation::Buy => "BUY",
            Recommendation::WeakBuy => "WEAK_BUY",
            Recommendation::Hold => "HOLD",
            Recommendation::WeakSell => "WEAK_SELL",
            Recommendation::Sell => "SELL",
            Recommendation::StrongSell => "STRONG_SELL",
        })
    }
}

/// How a caller asks for the final recommendation of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationMode {
    /// Answer from the last completed pass, or fail if there is none.
    Immediate,
    /// Wait for the running pass to finish, up to the given duration.
    AwaitExternalSignal(Duration),
}
