//! Investor profile: tax situation, income goals and margin account state.

mod user_model;

pub use user_model::*;
