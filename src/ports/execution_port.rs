//! Order execution port trait.

use crate::domain::error::EquiscoreError;
use crate::domain::execution::{ExecutionRequest, FillReport};

/// Consumer of buy decisions. Implementations own order routing and
/// position monitoring.
pub trait ExecutionPort {
    fn submit(&self, request: &ExecutionRequest) -> Result<FillReport, EquiscoreError>;
}
