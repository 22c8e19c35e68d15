//! Report generation port trait.

use crate::domain::distribution::Selection;
use crate::domain::error::EquiscoreError;
use crate::domain::orchestrator::PassSummary;

/// Port for writing pass reports.
pub trait ReportPort {
    fn write(
        &self,
        summary: &PassSummary,
        selection: &Selection,
        output_path: &str,
    ) -> Result<(), EquiscoreError>;
}
