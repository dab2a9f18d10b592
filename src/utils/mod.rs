pub mod beta;
pub use beta::{beta_quantile, exceedance_shape};

pub mod log_factorials;
pub use log_factorials::LogFactorials;
