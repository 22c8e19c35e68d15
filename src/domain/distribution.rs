//! Concentration-constrained Top-K selection.
//!
//! Selection walks the results in equitable-score order (ties keep scan
//! order) in up to three phases:
//!
//! 1. **Breadth**: admit the best result of each not-yet-seen sector until
//!    the minimum sector count is reached.
//! 2. **Greedy**: admit the best remaining results whose sector is still
//!    under its ceiling, `max(1, floor(K * max_sector_pct / 100))`.
//! 3. **Relaxed**: if K slots are still open, fill them in raw score order
//!    regardless of sector.

use crate::domain::error::EquiscoreError;
use crate::domain::market::CapQuintile;
use crate::domain::metrics::DiversityMetrics;
use crate::domain::scored::ScoredResult;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Concentration limits and cap-mix targets for a selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistributionSettings {
    pub max_sector_concentration_pct: f64,
    pub max_quintile_concentration_pct: f64,
    pub min_sectors_represented: usize,
    pub min_quintiles_represented: usize,
    pub small_cap_target_pct: f64,
    pub mid_cap_target_pct: f64,
    pub large_cap_max_pct: f64,
}

impl Default for DistributionSettings {
    fn default() -> Self {
        Self {
            max_sector_concentration_pct: 22.0,
            max_quintile_concentration_pct: 35.0,
            min_sectors_represented: 7,
            min_quintiles_represented: 4,
            small_cap_target_pct: 15.0,
            mid_cap_target_pct: 25.0,
            large_cap_max_pct: 60.0,
        }
    }
}

impl DistributionSettings {
    pub fn validated(self) -> Result<Self, EquiscoreError> {
        let percentages = [
            ("max_sector_concentration_pct", self.max_sector_concentration_pct),
            ("max_quintile_concentration_pct", self.max_quintile_concentration_pct),
            ("small_cap_target_pct", self.small_cap_target_pct),
            ("mid_cap_target_pct", self.mid_cap_target_pct),
            ("large_cap_max_pct", self.large_cap_max_pct),
        ];
        for (key, value) in percentages {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(invalid(key, format!("{key} must be between 0 and 100, got {value}")));
            }
        }
        if self.min_sectors_represented == 0 {
            return Err(invalid(
                "min_sectors_represented",
                "min_sectors_represented must be at least 1".to_string(),
            ));
        }
        if !(1..=CapQuintile::ALL.len()).contains(&self.min_quintiles_represented) {
            return Err(invalid(
                "min_quintiles_represented",
                "min_quintiles_represented must be between 1 and 5".to_string(),
            ));
        }
        Ok(self)
    }

    /// Most results one sector may hold in a selection of `k` before
    /// relaxation.
    pub fn sector_ceiling(&self, k: usize) -> usize {
        ceiling(k, self.max_sector_concentration_pct)
    }

    pub fn quintile_ceiling(&self, k: usize) -> usize {
        ceiling(k, self.max_quintile_concentration_pct)
    }

    /// Targets the metrics fall short of. Empty when every target is met.
    pub fn evaluate(&self, metrics: &DiversityMetrics) -> Vec<TargetShortfall> {
        let mut shortfalls = Vec::new();
        if metrics.sectors_represented < self.min_sectors_represented {
            shortfalls.push(TargetShortfall::TooFewSectors {
                have: metrics.sectors_represented,
                want: self.min_sectors_represented,
            });
        }
        if metrics.quintiles_represented < self.min_quintiles_represented {
            shortfalls.push(TargetShortfall::TooFewQuintiles {
                have: metrics.quintiles_represented,
                want: self.min_quintiles_represented,
            });
        }
        if metrics.max_sector_concentration > self.max_sector_concentration_pct {
            shortfalls.push(TargetShortfall::SectorConcentration {
                pct: metrics.max_sector_concentration,
                max: self.max_sector_concentration_pct,
            });
        }
        if metrics.max_quintile_concentration > self.max_quintile_concentration_pct {
            shortfalls.push(TargetShortfall::QuintileConcentration {
                pct: metrics.max_quintile_concentration,
                max: self.max_quintile_concentration_pct,
            });
        }
        if metrics.small_cap_pct < self.small_cap_target_pct {
            shortfalls.push(TargetShortfall::SmallCapShare {
                pct: metrics.small_cap_pct,
                target: self.small_cap_target_pct,
            });
        }
        if metrics.mid_cap_pct < self.mid_cap_target_pct {
            shortfalls.push(TargetShortfall::MidCapShare {
                pct: metrics.mid_cap_pct,
                target: self.mid_cap_target_pct,
            });
        }
        if metrics.large_cap_pct > self.large_cap_max_pct {
            shortfalls.push(TargetShortfall::LargeCapShare {
                pct: metrics.large_cap_pct,
                max: self.large_cap_max_pct,
            });
        }
        shortfalls
    }
}

fn invalid(key: &str, reason: String) -> EquiscoreError {
    EquiscoreError::ConfigInvalid {
        section: "distribution".to_string(),
        key: key.to_string(),
        reason,
    }
}

fn ceiling(k: usize, pct: f64) -> usize {
    ((k as f64 * pct / 100.0).floor() as usize).max(1)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TargetShortfall {
    TooFewSectors { have: usize, want: usize },
    TooFewQuintiles { have: usize, want: usize },
    SectorConcentration { pct: f64, max: f64 },
    QuintileConcentration { pct: f64, max: f64 },
    SmallCapShare { pct: f64, target: f64 },
    MidCapShare { pct: f64, target: f64 },
    LargeCapShare { pct: f64, max: f64 },
}

impl fmt::Display for TargetShortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetShortfall::TooFewSectors { have, want } => {
                write!(f, "{have} sectors represented, target {want}")
            }
            TargetShortfall::TooFewQuintiles { have, want } => {
                write!(f, "{have} quintiles represented, target {want}")
            }
            TargetShortfall::SectorConcentration { pct, max } => {
                write!(f, "largest sector holds {pct:.1}%, limit {max:.1}%")
            }
            TargetShortfall::QuintileConcentration { pct, max } => {
                write!(f, "largest quintile holds {pct:.1}%, limit {max:.1}%")
            }
            TargetShortfall::SmallCapShare { pct, target } => {
                write!(f, "small caps at {pct:.1}%, target {target:.1}%")
            }
            TargetShortfall::MidCapShare { pct, target } => {
                write!(f, "mid caps at {pct:.1}%, target {target:.1}%")
            }
            TargetShortfall::LargeCapShare { pct, max } => {
                write!(f, "large caps at {pct:.1}%, limit {max:.1}%")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SelectionPhase {
    Breadth,
    Greedy,
    Relaxed,
}

impl fmt::Display for SelectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SelectionPhase::Breadth => "breadth",
            SelectionPhase::Greedy => "greedy",
            SelectionPhase::Relaxed => "relaxed",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectedEntry {
    pub rank: usize,
    pub phase: SelectionPhase,
    pub result: ScoredResult,
}

/// A group whose admitted count exceeds its ceiling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CeilingExcess {
    pub group: String,
    pub count: usize,
    pub ceiling: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Ordered by equitable score, best first.
    pub entries: Vec<SelectedEntry>,
    pub k: usize,
    pub sector_ceiling: usize,
    pub quintile_ceiling: usize,
    pub relaxed: bool,
    pub sector_excess: Vec<CeilingExcess>,
    pub quintile_excess: Vec<CeilingExcess>,
    pub metrics: DiversityMetrics,
    pub shortfalls: Vec<TargetShortfall>,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top(&self) -> Option<&ScoredResult> {
        self.entries.first().map(|e| &e.result)
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.result.symbol.as_str()).collect()
    }
}

/// Indices of `results` ordered by equitable score, best first. Ties keep
/// their original order.
pub fn rank_order(results: &[ScoredResult]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..results.len()).collect();
    order.sort_by(|&a, &b| {
        results[b]
            .equitable_score
            .total_cmp(&results[a].equitable_score)
    });
    order
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DistributionSelector {
    pub settings: DistributionSettings,
}

impl DistributionSelector {
    pub fn new(settings: DistributionSettings) -> Self {
        Self { settings }
    }

    pub fn select_top_k(&self, results: &[ScoredResult], k: usize) -> Selection {
        let order = rank_order(results);
        let sector_ceiling = self.settings.sector_ceiling(k);
        let quintile_ceiling = self.settings.quintile_ceiling(k);

        let mut admitted: Vec<(usize, SelectionPhase)> = Vec::with_capacity(k);
        let mut taken: HashSet<usize> = HashSet::new();
        let mut sector_counts: BTreeMap<&str, usize> = BTreeMap::new();

        for &idx in &order {
            if sector_counts.len() >= self.settings.min_sectors_represented || admitted.len() >= k {
                break;
            }
            let sector = results[idx].sector.as_str();
            if !sector_counts.contains_key(sector) {
                sector_counts.insert(sector, 1);
                taken.insert(idx);
                admitted.push((idx, SelectionPhase::Breadth));
            }
        }

        for &idx in &order {
            if admitted.len() >= k {
                break;
            }
            if taken.contains(&idx) {
                continue;
            }
            let count = sector_counts.entry(results[idx].sector.as_str()).or_insert(0);
            if *count < sector_ceiling {
                *count += 1;
                taken.insert(idx);
                admitted.push((idx, SelectionPhase::Greedy));
            }
        }

        let mut relaxed = false;
        for &idx in &order {
            if admitted.len() >= k {
                break;
            }
            if taken.insert(idx) {
                relaxed = true;
                *sector_counts.entry(results[idx].sector.as_str()).or_insert(0) += 1;
                admitted.push((idx, SelectionPhase::Relaxed));
            }
        }

        // present in score order
        let position: BTreeMap<usize, usize> =
            order.iter().enumerate().map(|(pos, &idx)| (idx, pos)).collect();
        admitted.sort_by_key(|(idx, _)| position.get(idx).copied().unwrap_or(usize::MAX));

        let entries: Vec<SelectedEntry> = admitted
            .into_iter()
            .enumerate()
            .map(|(i, (idx, phase))| SelectedEntry {
                rank: i + 1,
                phase,
                result: results[idx].clone(),
            })
            .collect();

        let metrics = DiversityMetrics::compute(entries.iter().map(|e| &e.result));
        let sector_excess = excess(&metrics.sector_distribution, sector_ceiling, |s| s.clone());
        let quintile_excess =
            excess(&metrics.quintile_distribution, quintile_ceiling, |q| q.to_string());
        let shortfalls = self.settings.evaluate(&metrics);

        Selection {
            entries,
            k,
            sector_ceiling,
            quintile_ceiling,
            relaxed,
            sector_excess,
            quintile_excess,
            metrics,
            shortfalls,
        }
    }
}

fn excess<K>(
    distribution: &BTreeMap<K, usize>,
    ceiling: usize,
    name: impl Fn(&K) -> String,
) -> Vec<CeilingExcess> {
    distribution
        .iter()
        .filter(|(_, count)| **count > ceiling)
        .map(|(key, count)| CeilingExcess {
            group: name(key),
            count: *count,
            ceiling,
        })
        .collect()
}
