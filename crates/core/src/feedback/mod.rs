//! Prior user decisions and satisfaction, used for behavioral analysis.

mod feedback_model;

pub use feedback_model::*;
