//! Personalized recommendations.
//!
//! Folds margin, risk, tax, behavioral, rebalancing and income suggestions
//! into one de-duplicated ranked list, and adds behavioral nudges, emergency
//! alerts and time-boxed opportunities.

mod candidate;
mod recommendation_generator;
mod recommendation_model;

pub use candidate::*;
pub use recommendation_generator::*;
pub use recommendation_model::*;
