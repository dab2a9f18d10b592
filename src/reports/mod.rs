use std::{fs, path::Path};

use ixa::{info, IxaError};

use crate::optimizer::GridSearchResults;

pub mod grid_results;
pub mod summary_report;

pub const GRID_RESULTS_FILE: &str = "grid_results.json";
pub const GRID_SUMMARY_FILE: &str = "grid_summary.csv";
pub const BEST_FITS_FILE: &str = "best_fits.csv";

/// Writes the full grid as JSON and the per-configuration and best-fit summaries as CSV into
/// `output_directory`, creating it if needed.
///
/// # Errors
/// If the directory or any of the files cannot be written.
pub fn write_reports(output_directory: &Path, results: &GridSearchResults) -> Result<(), IxaError> {
    fs::create_dir_all(output_directory)?;

    let grid_results_path = output_directory.join(GRID_RESULTS_FILE);
    grid_results::write_grid_results(&grid_results_path, results)?;
    let grid_summary_path = output_directory.join(GRID_SUMMARY_FILE);
    summary_report::write_grid_summary(&grid_summary_path, &results.grid)?;
    let best_fits_path = output_directory.join(BEST_FITS_FILE);
    summary_report::write_best_fits(&best_fits_path, &results.best_fits)?;

    info!(
        "Wrote {} configurations to {}",
        results.grid.len(),
        output_directory.display()
    );
    Ok(())
}
