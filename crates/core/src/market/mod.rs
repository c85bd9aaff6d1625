//! Externally supplied market snapshot and historical series.

mod history_model;
mod market_model;

pub use history_model::*;
pub use market_model::*;
