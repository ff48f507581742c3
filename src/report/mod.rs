//! End-of-run reporting: JSON result files and SVG profit charts.

pub mod chart;
pub mod json;

pub use chart::{render_chart, write_charts, ProfitSeries};
pub use json::{date_key, write_status, write_trades, ReportError};

use std::path::Path;

use tracing::{info, warn};

use crate::sim::RunResult;

/// Write every report artifact under `dir`.
///
/// A failed artifact is logged and skipped; one bad write never discards the
/// rest of a finished run.
pub fn write_all(dir: &Path, result: &RunResult) -> Result<(), ReportError> {
    std::fs::create_dir_all(dir)?;

    let status_path = dir.join("status.json");
    match write_status(&status_path, &result.status) {
        Ok(()) => info!(path = %status_path.display(), "wrote status"),
        Err(err) => warn!(path = %status_path.display(), error = %err, "skipping status file"),
    }

    let trades_path = dir.join("trades.json");
    match write_trades(&trades_path, &result.trades) {
        Ok(()) => info!(path = %trades_path.display(), "wrote trades"),
        Err(err) => warn!(path = %trades_path.display(), error = %err, "skipping trades file"),
    }

    match write_charts(dir, &result.status) {
        Ok(paths) => info!(charts = paths.len(), "wrote charts"),
        Err(err) => warn!(error = %err, "skipping charts"),
    }

    Ok(())
}
