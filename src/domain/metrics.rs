//! Diversity metrics over a collection of scored results.

use crate::domain::indicator::round_to;
use crate::domain::indicator::stddev::population_std;
use crate::domain::market::{CapQuintile, SizeClass};
use crate::domain::scored::ScoredResult;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiversityMetrics {
    pub count: usize,
    pub sectors_represented: usize,
    pub quintiles_represented: usize,
    /// Largest single-sector share, percent.
    pub max_sector_concentration: f64,
    pub max_quintile_concentration: f64,
    pub sector_distribution: BTreeMap<String, usize>,
    pub quintile_distribution: BTreeMap<CapQuintile, usize>,
    /// Sum of squared sector shares.
    pub herfindahl_index: f64,
    /// Inequality of equitable scores.
    pub gini_coefficient: f64,
    pub diversity_score: f64,
    pub balance_score: f64,
    pub small_cap_pct: f64,
    pub mid_cap_pct: f64,
    pub large_cap_pct: f64,
}

impl DiversityMetrics {
    pub fn compute<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a ScoredResult>,
    {
        let mut sector_distribution: BTreeMap<String, usize> = BTreeMap::new();
        let mut quintile_distribution: BTreeMap<CapQuintile, usize> = BTreeMap::new();
        let mut scores = Vec::new();

        for result in results {
            *sector_distribution.entry(result.sector.clone()).or_insert(0) += 1;
            *quintile_distribution.entry(result.quintile).or_insert(0) += 1;
            scores.push(result.equitable_score);
        }

        let count = scores.len();
        if count == 0 {
            return Self::empty();
        }
        let total = count as f64;

        let max_share = |largest: Option<&usize>| largest.copied().unwrap_or(0) as f64 / total * 100.0;
        let max_sector_concentration = max_share(sector_distribution.values().max());
        let max_quintile_concentration = max_share(quintile_distribution.values().max());

        let herfindahl_index: f64 = sector_distribution
            .values()
            .map(|&c| (c as f64 / total).powi(2))
            .sum();

        let diversity_score = diversity_score(
            sector_distribution.len(),
            quintile_distribution.len(),
            max_sector_concentration,
            herfindahl_index,
        );
        let balance_score = balance_score(
            &percentages(sector_distribution.values(), total),
            &percentages(quintile_distribution.values(), total),
        );

        let size_pct = |class: SizeClass| {
            let n: usize = quintile_distribution
                .iter()
                .filter(|(q, _)| q.size_class() == class)
                .map(|(_, c)| c)
                .sum();
            round_to(n as f64 / total * 100.0, 1)
        };

        Self {
            count,
            sectors_represented: sector_distribution.len(),
            quintiles_represented: quintile_distribution.len(),
            max_sector_concentration: round_to(max_sector_concentration, 1),
            max_quintile_concentration: round_to(max_quintile_concentration, 1),
            herfindahl_index: round_to(herfindahl_index, 3),
            gini_coefficient: round_to(gini(&mut scores), 3),
            diversity_score: round_to(diversity_score, 1),
            balance_score: round_to(balance_score, 1),
            small_cap_pct: size_pct(SizeClass::Small),
            mid_cap_pct: size_pct(SizeClass::Mid),
            large_cap_pct: size_pct(SizeClass::Large),
            sector_distribution,
            quintile_distribution,
        }
    }

    fn empty() -> Self {
        Self {
            count: 0,
            sectors_represented: 0,
            quintiles_represented: 0,
            max_sector_concentration: 0.0,
            max_quintile_concentration: 0.0,
            sector_distribution: BTreeMap::new(),
            quintile_distribution: BTreeMap::new(),
            herfindahl_index: 1.0,
            gini_coefficient: 0.0,
            diversity_score: 0.0,
            balance_score: 0.0,
            small_cap_pct: 0.0,
            mid_cap_pct: 0.0,
            large_cap_pct: 0.0,
        }
    }
}

fn percentages<'a>(counts: impl Iterator<Item = &'a usize>, total: f64) -> Vec<f64> {
    counts.map(|&c| c as f64 / total * 100.0).collect()
}

/// Sector breadth (max 30) + quintile breadth (max 20) + concentration
/// term (max 25) + Herfindahl term (max 25).
fn diversity_score(sectors: usize, quintiles: usize, max_sector_pct: f64, herfindahl: f64) -> f64 {
    let sector_term = (sectors as f64 * 4.0).min(30.0);
    let quintile_term = (quintiles as f64 * 5.0).min(20.0);
    let concentration_term = (25.0 - max_sector_pct).max(0.0);
    let herfindahl_term = (25.0 * (1.0 - herfindahl)).max(0.0);
    sector_term + quintile_term + concentration_term + herfindahl_term
}

fn balance_score(sector_pcts: &[f64], quintile_pcts: &[f64]) -> f64 {
    let term = |pcts: &[f64]| {
        let sd = if pcts.len() > 1 { population_std(pcts) } else { 0.0 };
        (50.0 - 2.0 * sd).max(0.0)
    };
    (term(sector_pcts) + term(quintile_pcts)) / 2.0
}

/// Rank-weighted Gini over ascending scores, clamped to [0, 1].
fn gini(scores: &mut [f64]) -> f64 {
    let n = scores.len();
    if n <= 1 {
        return 0.0;
    }
    scores.sort_by(|a, b| a.total_cmp(b));
    let sum: f64 = scores.iter().sum();
    if sum <= 0.0 {
        return 0.0;
    }
    let nf = n as f64;
    let weighted: f64 = scores
        .iter()
        .enumerate()
        .map(|(i, s)| (nf - i as f64) * s)
        .sum();
    ((nf + 1.0 - 2.0 * weighted / sum) / nf).clamp(0.0, 1.0)
}
