//! Static market reference data, sector factors and market-cap quintiles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference fields for one symbol, fetched fresh for each evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketReference {
    pub symbol: String,
    pub price: f64,
    pub change_percent: f64,
    pub volume: i64,
    pub market_cap: f64,
    pub sector: String,
    pub industry: String,
    pub beta: f64,
    #[serde(default)]
    pub pe_ratio: Option<f64>,
    #[serde(default)]
    pub dividend_yield: Option<f64>,
    #[serde(default)]
    pub price_to_book: Option<f64>,
    #[serde(default)]
    pub debt_to_equity: Option<f64>,
}

impl MarketReference {
    pub fn quintile(&self) -> CapQuintile {
        CapQuintile::from_market_cap(self.market_cap)
    }

    /// True when the fields scoring depends on are finite.
    pub fn is_well_formed(&self) -> bool {
        self.price.is_finite()
            && self.change_percent.is_finite()
            && self.market_cap.is_finite()
            && self.beta.is_finite()
    }
}

/// Market-capitalisation band, 1 = largest through 5 = smallest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CapQuintile {
    Q1,
    Q2,
    Q3,
    Q4,
    Q5,
}

impl CapQuintile {
    pub const ALL: [CapQuintile; 5] = [
        CapQuintile::Q1,
        CapQuintile::Q2,
        CapQuintile::Q3,
        CapQuintile::Q4,
        CapQuintile::Q5,
    ];

    pub fn from_market_cap(market_cap: f64) -> Self {
        if market_cap >= 100_000_000_000.0 {
            CapQuintile::Q1
        } else if market_cap >= 50_000_000_000.0 {
            CapQuintile::Q2
        } else if market_cap >= 10_000_000_000.0 {
            CapQuintile::Q3
        } else if market_cap >= 2_000_000_000.0 {
            CapQuintile::Q4
        } else {
            CapQuintile::Q5
        }
    }

    pub fn rank(self) -> u8 {
        match self {
            CapQuintile::Q1 => 1,
            CapQuintile::Q2 => 2,
            CapQuintile::Q3 => 3,
            CapQuintile::Q4 => 4,
            CapQuintile::Q5 => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CapQuintile::Q1 => "Large Cap",
            CapQuintile::Q2 => "Large-Mid Cap",
            CapQuintile::Q3 => "Mid Cap",
            CapQuintile::Q4 => "Small-Mid Cap",
            CapQuintile::Q5 => "Small Cap",
        }
    }

    /// Percentage multiplier bonus applied to the overall score.
    pub fn score_bonus_pct(self) -> f64 {
        match self {
            CapQuintile::Q1 => 0.0,
            CapQuintile::Q2 => 5.0,
            CapQuintile::Q3 => 10.0,
            CapQuintile::Q4 => 15.0,
            CapQuintile::Q5 => 20.0,
        }
    }

    /// Additive component of the diversity bonus.
    pub fn diversity_component(self) -> f64 {
        match self {
            CapQuintile::Q1 => 0.0,
            CapQuintile::Q2 => 3.7,
            CapQuintile::Q3 => 7.2,
            CapQuintile::Q4 => 11.8,
            CapQuintile::Q5 => 16.4,
        }
    }

    pub fn size_class(self) -> SizeClass {
        match self {
            CapQuintile::Q1 | CapQuintile::Q2 => SizeClass::Large,
            CapQuintile::Q3 => SizeClass::Mid,
            CapQuintile::Q4 | CapQuintile::Q5 => SizeClass::Small,
        }
    }
}

impl fmt::Display for CapQuintile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.rank())
    }
}

/// Coarse size bucket used for cap-mix targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeClass {
    Large,
    Mid,
    Small,
}

/// Static per-sector multiplier. Unknown sectors get 1.0.
pub fn sector_factor(sector: &str) -> f64 {
    match sector {
        "Technology" => 1.05,
        "Healthcare" => 1.03,
        "Financial Services" => 1.02,
        "Consumer Cyclical" => 1.01,
        "Consumer Defensive" => 1.01,
        "Energy" => 1.02,
        "Industrials" => 1.01,
        "Materials" => 1.01,
        "Utilities" => 1.00,
        "Real Estate" => 1.00,
        "Communication Services" => 1.03,
        _ => 1.00,
    }
}
