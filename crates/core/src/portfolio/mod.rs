//! Portfolio snapshot module.
//!
//! Holdings are supplied by the surrounding application; every aggregate
//! (total value, weights, income) is derived on demand from the snapshot.

mod portfolio_model;
mod return_model;
mod sector_profile;

pub use portfolio_model::*;
pub use return_model::*;
pub use sector_profile::*;

#[cfg(test)]
mod portfolio_model_tests;
