use std::{fs::File, io::BufWriter, path::Path};

use ixa::IxaError;

use crate::optimizer::GridSearchResults;

/// Serializes every configuration with its deltas, retained runs and summary, followed by the
/// best fits. Non-finite errors are written as `null`.
///
/// # Errors
/// If the file cannot be created or written.
pub fn write_grid_results(path: &Path, results: &GridSearchResults) -> Result<(), IxaError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, results)?;
    Ok(())
}
