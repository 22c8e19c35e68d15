//! Paper execution adapter: records buy decisions without a broker.

use std::sync::Mutex;

use tracing::info;

use crate::domain::error::EquiscoreError;
use crate::domain::execution::{ExecutionRequest, FillReport};
use crate::ports::execution_port::ExecutionPort;

/// Accepts every well-formed request and keeps a log of what it filled.
#[derive(Debug, Default)]
pub struct PaperExecutionAdapter {
    fills: Mutex<Vec<ExecutionRequest>>,
}

impl PaperExecutionAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fills(&self) -> Vec<ExecutionRequest> {
        self.fills
            .lock()
            .map(|fills| fills.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl ExecutionPort for PaperExecutionAdapter {
    fn submit(&self, request: &ExecutionRequest) -> Result<FillReport, EquiscoreError> {
        if request.symbol.trim().is_empty() {
            return Err(EquiscoreError::Execution {
                symbol: request.symbol.clone(),
                reason: "empty symbol".to_string(),
            });
        }
        if !(request.allocation_fraction > 0.0 && request.allocation_fraction <= 1.0) {
            return Err(EquiscoreError::Execution {
                symbol: request.symbol.clone(),
                reason: format!(
                    "allocation fraction {} outside (0, 1]",
                    request.allocation_fraction
                ),
            });
        }

        info!(
            symbol = %request.symbol,
            score = request.equitable_score,
            allocation = request.allocation_fraction,
            "paper buy filled"
        );
        self.fills
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());

        Ok(FillReport {
            symbol: request.symbol.clone(),
            filled: true,
            message: format!(
                "paper buy {} at {:.0}% allocation",
                request.symbol,
                request.allocation_fraction * 100.0
            ),
        })
    }
}
