use std::path::Path;

use ixa::IxaError;
use serde::{Deserialize, Serialize};

use crate::optimizer::{BestFit, GridPointResult, ParameterConfiguration, RunSummary};

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
struct GridSummaryRow {
    shape: f64,
    prefix_length: usize,
    b0: f64,
    average_error: f64,
    average_deaths: f64,
    repetitions: usize,
    early_stopped: bool,
    retained_runs: usize,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
struct BestFitRow {
    shape: f64,
    prefix_length: usize,
    b0: f64,
    average_error: f64,
    average_deaths: f64,
}

impl GridSummaryRow {
    fn new(point: &GridPointResult) -> Self {
        let ParameterConfiguration {
            shape,
            prefix_length,
            b0,
        } = point.params;
        let RunSummary {
            average_error,
            average_deaths,
            repetitions,
            early_stopped,
        } = point.summary;
        GridSummaryRow {
            shape,
            prefix_length,
            b0,
            average_error,
            average_deaths,
            repetitions,
            early_stopped,
            retained_runs: point.runs.len(),
        }
    }
}

impl From<&BestFit> for BestFitRow {
    fn from(best_fit: &BestFit) -> Self {
        BestFitRow {
            shape: best_fit.params.shape,
            prefix_length: best_fit.params.prefix_length,
            b0: best_fit.params.b0,
            average_error: best_fit.summary.average_error,
            average_deaths: best_fit.summary.average_deaths,
        }
    }
}

fn write_rows<T: Serialize>(path: &Path, rows: impl Iterator<Item = T>) -> Result<(), IxaError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// One row per configuration in grid order. Early-stopped and non-finite configurations are
/// included; their error is written as `inf`.
///
/// # Errors
/// If the file cannot be created or written.
pub fn write_grid_summary(path: &Path, grid: &[GridPointResult]) -> Result<(), IxaError> {
    write_rows(path, grid.iter().map(GridSummaryRow::new))
}

/// One row per (shape, prefix length) pair.
///
/// # Errors
/// If the file cannot be created or written.
pub fn write_best_fits(path: &Path, best_fits: &[BestFit]) -> Result<(), IxaError> {
    write_rows(path, best_fits.iter().map(BestFitRow::from))
}
