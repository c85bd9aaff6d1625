//! Margin intelligence.
//!
//! Measures how much of the margin line is in use, how far the account is
//! from a maintenance call, how it behaves under fixed market-drop scenarios,
//! and how the interest can be used against the user's tax bill.

mod margin_calculator;
mod margin_model;

pub use margin_calculator::*;
pub use margin_model::*;

#[cfg(test)]
mod margin_calculator_tests;
