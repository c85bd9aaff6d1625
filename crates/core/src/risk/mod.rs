//! Portfolio risk assessment.
//!
//! Combines five weighted sub-scores into an overall 0-100 score, projects
//! terminal values with a seeded Monte Carlo simulation and measures position
//! concentration with the Herfindahl-Hirschman index.

mod monte_carlo;
mod risk_engine;
mod risk_model;

pub use monte_carlo::*;
pub use risk_engine::*;
pub use risk_model::*;

#[cfg(test)]
mod risk_engine_tests;
