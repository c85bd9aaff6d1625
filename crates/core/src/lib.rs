//! Income Clarity Core - portfolio intelligence engine.
//!
//! Pure computation over an in-memory snapshot of holdings, user profile and
//! market conditions. Produces margin, risk, analytics and recommendation
//! reports as plain serializable data; performs no I/O.

pub mod analytics;
pub mod constants;
pub mod errors;
pub mod feedback;
pub mod intelligence;
pub mod margin;
pub mod market;
pub mod portfolio;
pub mod recommendations;
pub mod risk;
pub mod users;
pub mod utils;

// Re-export the pipeline entry points
pub use intelligence::{
    fingerprint, EngineConfig, EvaluationInputs, IntelligenceEngine, IntelligenceReport,
    IntelligenceService, IntelligenceServiceTrait,
};

// Re-export error types
pub use errors::Error;
pub use errors::Result;
