//! CSV report adapter implementing ReportPort.
//!
//! Writes the selection to `output_path`, one row per selected symbol, and
//! a `metric,value` table of pass and diversity figures next to it with a
//! `_summary` suffix.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::distribution::Selection;
use crate::domain::error::EquiscoreError;
use crate::domain::orchestrator::PassSummary;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Serialize)]
struct SelectionRow<'a> {
    rank: usize,
    symbol: &'a str,
    sector: &'a str,
    quintile: String,
    equitable_score: f64,
    overall_score: f64,
    recommendation: String,
    confidence: f64,
    phase: String,
}

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    /// `report.csv` -> `report_summary.csv`
    pub fn summary_path(output_path: &Path) -> PathBuf {
        let stem = output_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report".to_string());
        output_path.with_file_name(format!("{stem}_summary.csv"))
    }

    fn write_selection(selection: &Selection, path: &Path) -> Result<(), EquiscoreError> {
        let mut wtr = csv::Writer::from_path(path).map_err(|e| report_error(path, e))?;
        for entry in &selection.entries {
            let result = &entry.result;
            wtr.serialize(SelectionRow {
                rank: entry.rank,
                symbol: &result.symbol,
                sector: &result.sector,
                quintile: result.quintile.to_string(),
                equitable_score: result.equitable_score,
                overall_score: result.overall_score,
                recommendation: result.recommendation.to_string(),
                confidence: result.confidence,
                phase: entry.phase.to_string(),
            })
            .map_err(|e| report_error(path, e))?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_summary(
        summary: &PassSummary,
        selection: &Selection,
        path: &Path,
    ) -> Result<(), EquiscoreError> {
        let metrics = &selection.metrics;
        let mut rows: Vec<(String, String)> = vec![
            ("phase".into(), summary.phase.to_string()),
            ("total".into(), summary.total.to_string()),
            ("scored".into(), summary.scored.to_string()),
            ("errors".into(), summary.errors.to_string()),
            ("batches".into(), summary.batches.to_string()),
            ("cancelled".into(), summary.cancelled.to_string()),
            ("average_score".into(), format!("{:.1}", summary.average_score)),
            ("selected".into(), selection.len().to_string()),
            ("relaxed".into(), selection.relaxed.to_string()),
            ("sector_ceiling".into(), selection.sector_ceiling.to_string()),
            ("quintile_ceiling".into(), selection.quintile_ceiling.to_string()),
            ("sectors_represented".into(), metrics.sectors_represented.to_string()),
            ("quintiles_represented".into(), metrics.quintiles_represented.to_string()),
            ("herfindahl_index".into(), format!("{:.3}", metrics.herfindahl_index)),
            ("gini_coefficient".into(), format!("{:.3}", metrics.gini_coefficient)),
            ("diversity_score".into(), format!("{:.1}", metrics.diversity_score)),
            ("balance_score".into(), format!("{:.1}", metrics.balance_score)),
        ];
        for (label, count) in &summary.distribution {
            rows.push((format!("count_{label}"), count.to_string()));
        }
        for shortfall in &selection.shortfalls {
            rows.push(("shortfall".into(), shortfall.to_string()));
        }

        let mut wtr = csv::Writer::from_path(path).map_err(|e| report_error(path, e))?;
        wtr.write_record(["metric", "value"])
            .map_err(|e| report_error(path, e))?;
        for (metric, value) in &rows {
            wtr.write_record([metric.as_str(), value.as_str()])
                .map_err(|e| report_error(path, e))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn report_error(path: &Path, e: csv::Error) -> EquiscoreError {
    EquiscoreError::Report {
        reason: format!("failed to write {}: {}", path.display(), e),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        summary: &PassSummary,
        selection: &Selection,
        output_path: &str,
    ) -> Result<(), EquiscoreError> {
        let path = Path::new(output_path);
        Self::write_selection(selection, path)?;
        Self::write_summary(summary, selection, &Self::summary_path(path))?;
        tracing::info!(path = %path.display(), rows = selection.len(), "report written");
        Ok(())
    }
}
