//! Sector, size and diversity adjustment of the overall score.
//!
//! The diversity bonus reads a [`DiversityTally`] snapshot of the symbols
//! already counted in the current pass. The adjuster never mutates the
//! tally; the orchestrator owns it and records results between batches.

use crate::domain::indicator::round_to;
use crate::domain::market::{sector_factor, CapQuintile};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

const SCARCITY_BONUS: [f64; 3] = [12.7, 5.7, 3.1];
const HIGH_CONCENTRATION: f64 = 0.22;
const HIGH_CONCENTRATION_PENALTY: f64 = -8.5;
const LOW_CONCENTRATION: f64 = 0.15;
const LOW_CONCENTRATION_PENALTY: f64 = -4.2;

/// Running per-sector and per-quintile counts for one pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiversityTally {
    sectors: BTreeMap<String, usize>,
    quintiles: BTreeMap<CapQuintile, usize>,
}

impl DiversityTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, sector: &str, quintile: CapQuintile) {
        *self.sectors.entry(sector.to_string()).or_insert(0) += 1;
        *self.quintiles.entry(quintile).or_insert(0) += 1;
    }

    /// Undo one [`record`](Self::record). Used to build "everyone else"
    /// snapshots for order-independent adjustment.
    pub fn without(&self, sector: &str, quintile: CapQuintile) -> Self {
        let mut tally = self.clone();
        if let Some(count) = tally.sectors.get_mut(sector) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                tally.sectors.remove(sector);
            }
        }
        if let Some(count) = tally.quintiles.get_mut(&quintile) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                tally.quintiles.remove(&quintile);
            }
        }
        tally
    }

    pub fn sector_count(&self, sector: &str) -> usize {
        self.sectors.get(sector).copied().unwrap_or(0)
    }

    pub fn quintile_count(&self, quintile: CapQuintile) -> usize {
        self.quintiles.get(&quintile).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.sectors.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn sectors(&self) -> &BTreeMap<String, usize> {
        &self.sectors
    }

    pub fn quintiles(&self) -> &BTreeMap<CapQuintile, usize> {
        &self.quintiles
    }
}

/// How the diversity bonus sees the rest of the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum DiversityMode {
    /// Against the tally of earlier batches. Depends on scan order.
    #[default]
    Streaming,
    /// Against the final tally of every other scored symbol.
    Global,
}

impl fmt::Display for DiversityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiversityMode::Streaming => "streaming",
            DiversityMode::Global => "global",
        })
    }
}

impl FromStr for DiversityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "streaming" => Ok(DiversityMode::Streaming),
            "global" => Ok(DiversityMode::Global),
            other => Err(format!("unknown diversity mode '{other}' (expected streaming or global)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiversityBonus {
    pub quintile: f64,
    pub scarcity: f64,
    pub concentration: f64,
}

impl DiversityBonus {
    pub fn compute(sector: &str, quintile: CapQuintile, tally: &DiversityTally) -> Self {
        let count = tally.sector_count(sector);
        let scarcity = SCARCITY_BONUS.get(count).copied().unwrap_or(0.0);

        let total = tally.total();
        let concentration = if total == 0 {
            0.0
        } else {
            let share = count as f64 / total as f64;
            if share > HIGH_CONCENTRATION {
                HIGH_CONCENTRATION_PENALTY
            } else if share > LOW_CONCENTRATION {
                LOW_CONCENTRATION_PENALTY
            } else {
                0.0
            }
        };

        Self {
            quintile: quintile.diversity_component(),
            scarcity,
            concentration,
        }
    }

    /// Sum of the components, rounded to one decimal.
    pub fn total(&self) -> f64 {
        round_to(self.quintile + self.scarcity + self.concentration, 1)
    }
}

/// Breakdown of one equitable adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Adjustment {
    pub sector_factor: f64,
    pub quintile_bonus_pct: f64,
    pub diversity: DiversityBonus,
    pub diversity_bonus: f64,
    pub equitable_score: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EquitableAdjuster;

impl EquitableAdjuster {
    /// `clamp(overall * sector_factor * (1 + quintile_bonus / 100) + diversity_bonus, 0, 100)`,
    /// rounded to one decimal.
    pub fn adjust(
        &self,
        overall_score: f64,
        sector: &str,
        quintile: CapQuintile,
        tally: &DiversityTally,
    ) -> Adjustment {
        let factor = sector_factor(sector);
        let quintile_bonus_pct = quintile.score_bonus_pct();
        let diversity = DiversityBonus::compute(sector, quintile, tally);
        let diversity_bonus = diversity.total();

        let raw = overall_score * factor * (1.0 + quintile_bonus_pct / 100.0) + diversity_bonus;
        Adjustment {
            sector_factor: factor,
            quintile_bonus_pct,
            diversity,
            diversity_bonus,
            equitable_score: round_to(raw.clamp(0.0, 100.0), 1),
        }
    }
}
