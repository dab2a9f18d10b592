// Re-export commonly used types at the crate root
pub use observations::Observations;
pub use optimizer::{run_grid_search, GridSearchResults};
pub use parameters::{GlobalParams, GrowthModel, Params};
pub use simulator::SimulationRun;
pub mod growth_curve;
pub mod observations;
pub mod optimizer;
pub mod parameters;
pub mod person;
pub mod population_model;
pub mod profiling;
pub mod reports;
pub mod simulator;
pub mod utils;

// Re-export common macros
pub use ixa::assert_almost_eq;
