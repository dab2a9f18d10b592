use std::path::Path;

use ixa::IxaError;
#[cfg(feature = "profiling")]
use std::{
    fs::File,
    io::BufWriter,
    time::{Duration, SystemTime},
};

#[cfg(feature = "profiling")]
use serde::Serialize;

#[cfg(feature = "profiling")]
use super::{data::profiling_data, NAMED_COUNTS_HEADERS, NAMED_SPANS_HEADERS};

#[cfg(feature = "profiling")]
#[derive(Serialize)]
struct ProfilingData {
    date_time: SystemTime,
    named_counts_headers: Vec<String>,
    named_counts_data: Vec<(String, usize, f64)>,
    named_spans_headers: Vec<String>,
    named_spans_data: Vec<(String, usize, Duration, f64)>,
}

/// Writes the named counts and spans collected so far to a JSON file.
///
/// # Errors
/// If the file cannot be created or written.
#[cfg(feature = "profiling")]
pub fn write_profiling_data(file_path: &Path) -> Result<(), IxaError> {
    let profiling_data = {
        let container = profiling_data();
        ProfilingData {
            date_time: SystemTime::now(),
            named_counts_headers: NAMED_COUNTS_HEADERS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            named_counts_data: container.get_named_counts_table(),
            named_spans_headers: NAMED_SPANS_HEADERS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            named_spans_data: container.get_named_spans_table(),
        }
    };
    let writer = BufWriter::new(File::create(file_path)?);
    serde_json::to_writer_pretty(writer, &profiling_data)?;
    Ok(())
}

#[cfg(not(feature = "profiling"))]
pub fn write_profiling_data(_file_path: &Path) -> Result<(), IxaError> {
    Ok(())
}
