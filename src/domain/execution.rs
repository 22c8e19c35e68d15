//! Buy-decision hand-off to the execution collaborator.
//!
//! The gate is a pure function of a scored result: a symbol is handed on
//! only when its equitable score reaches the configured threshold.

use crate::domain::error::EquiscoreError;
use crate::domain::scored::ScoredResult;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExecutionGate {
    pub score_threshold: f64,
    /// Fraction of available capital to allocate, in (0, 1].
    pub allocation_fraction: f64,
}

impl Default for ExecutionGate {
    fn default() -> Self {
        Self {
            score_threshold: 82.4,
            allocation_fraction: 0.10,
        }
    }
}

impl ExecutionGate {
    pub fn validated(self) -> Result<Self, EquiscoreError> {
        if !self.score_threshold.is_finite() || !(0.0..=100.0).contains(&self.score_threshold) {
            return Err(EquiscoreError::ConfigInvalid {
                section: "execution".to_string(),
                key: "score_threshold".to_string(),
                reason: "score_threshold must be between 0 and 100".to_string(),
            });
        }
        if !self.allocation_fraction.is_finite()
            || self.allocation_fraction <= 0.0
            || self.allocation_fraction > 1.0
        {
            return Err(EquiscoreError::ConfigInvalid {
                section: "execution".to_string(),
                key: "allocation_fraction".to_string(),
                reason: "allocation_fraction must be in (0, 1]".to_string(),
            });
        }
        Ok(self)
    }

    pub fn plan(&self, result: &ScoredResult) -> Option<ExecutionRequest> {
        result
            .passes_threshold(self.score_threshold)
            .then(|| ExecutionRequest {
                symbol: result.symbol.clone(),
                equitable_score: result.equitable_score,
                allocation_fraction: self.allocation_fraction,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRequest {
    pub symbol: String,
    pub equitable_score: f64,
    pub allocation_fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillReport {
    pub symbol: String,
    pub filled: bool,
    pub message: String,
}
