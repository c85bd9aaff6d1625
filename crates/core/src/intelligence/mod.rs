//! Portfolio intelligence pipeline.
//!
//! Margin, risk and analytics are independent and run in parallel on one
//! immutable snapshot; recommendations run after all three complete.

mod intelligence_engine;
mod intelligence_model;
mod intelligence_service;
mod intelligence_traits;

pub use intelligence_engine::*;
pub use intelligence_model::*;
pub use intelligence_service::*;
pub use intelligence_traits::*;
