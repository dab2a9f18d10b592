//! Lightweight profiling for the grid search: named event counts and timed spans, collected in a
//! process-wide container so that every worker thread reports into the same tables.
//!
//! The functionality is gated behind the `profiling` feature, which is enabled by default.
//! Without it the public API stays defined but does nothing.
//!
//! ## Example Output
//!
//! ```ignore
//! Span Label        Count            Duration  % runtime
//! -------------------------------------------------------
//! grid cell            18   41s 102ms 633us    812.40%
//! simulation       14,626   40s 998ms 120us    810.34%
//! Total Measured        1    5s 421ms 907us    107.16%
//!
//! Event Label                Count  Rate (per sec)
//! -------------------------------------------------
//! repetition                14,626        2,890.53
//! early stop                   901          178.06
//! retained configuration        37            7.31
//!
//! Early stops: 85.96% (901 of 1,048 configurations)
//! ```
//!
//! Spans from different threads overlap, so their durations can add up to more than the
//! elapsed time. `"Total Measured"` is open while any span is open.
//!
//! ## How to Use
//!
//! ```rust,ignore
//! increment_named_count("repetition");
//!
//! let span = open_span("simulation");
//! // timed code
//! close_span(span);
//! ```
//!
//! A span that is not closed explicitly is closed when it is dropped.

mod data;
mod display;
mod file;

pub use data::*;
pub use display::*;
pub use file::write_profiling_data;
#[cfg(feature = "profiling")]
use std::time::Instant;

#[cfg(feature = "profiling")]
const TOTAL_MEASURED: &str = "Total Measured";
pub const REPETITION_LABEL: &str = "repetition";
pub const EARLY_STOP_LABEL: &str = "early stop";
pub const RETAINED_CONFIGURATION_LABEL: &str = "retained configuration";
pub const CONFIGURATION_LABEL: &str = "configuration";
pub const GRID_CELL_SPAN: &str = "grid cell";
pub const SIMULATION_SPAN: &str = "simulation";
#[cfg(feature = "profiling")]
const NAMED_SPANS_HEADERS: &[&str] = &["Span Label", "Count", "Duration", "% runtime"];
#[cfg(feature = "profiling")]
const NAMED_COUNTS_HEADERS: &[&str] = &["Event Label", "Count", "Rate (per sec)"];

pub struct Span {
    #[cfg(feature = "profiling")]
    label: &'static str,
    #[cfg(feature = "profiling")]
    start_time: Instant,
}

impl Span {
    fn new(#[allow(unused_variables)] label: &'static str) -> Self {
        Self {
            #[cfg(feature = "profiling")]
            label,
            #[cfg(feature = "profiling")]
            start_time: Instant::now(),
        }
    }
}

#[cfg(feature = "profiling")]
impl Drop for Span {
    fn drop(&mut self) {
        let mut container = data::profiling_data();
        container.close_span(self);
    }
}
