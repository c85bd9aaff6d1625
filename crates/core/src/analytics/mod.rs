//! Advanced analytics.
//!
//! Sharpe-ratio optimization (simulated annealing, reported under the
//! "quantum-inspired" label), behavioral bias detection from prior feedback,
//! asset-location and loss-harvesting tax analysis, and multi-horizon growth
//! trajectories. Works from current holdings alone when history is empty.

mod analytics_engine;
mod analytics_model;
mod behavioral;
mod optimizer;
mod tax_location;

pub use analytics_engine::*;
pub use analytics_model::*;
pub use behavioral::*;
pub use optimizer::*;
pub use tax_location::*;

#[cfg(test)]
mod behavioral_tests;
