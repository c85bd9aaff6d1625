//! Core error types for the portfolio intelligence engine.
//!
//! The engine performs no I/O, so failures are limited to malformed input,
//! invalid configuration and numerical problems that could not be mapped to
//! a sentinel value.

use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid configuration value: {0}")]
    InvalidConfigValue(String),

    #[error("Calculation failed: {0}")]
    Calculation(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Validation errors for portfolio, user and market snapshots.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Field '{field}' must not be negative (got {value})")]
    NegativeValue { field: String, value: f64 },

    #[error("Field '{field}' must be a finite number")]
    NonFinite { field: String },

    #[error("Required field '{0}' is missing")]
    MissingField(String),
}

impl ValidationError {
    /// Checks that `value` is finite and not negative.
    pub fn check_non_negative(field: impl Into<String>, value: f64) -> Result<()> {
        let field = field.into();
        if !value.is_finite() {
            return Err(ValidationError::NonFinite { field }.into());
        }
        if value < 0.0 {
            return Err(ValidationError::NegativeValue { field, value }.into());
        }
        Ok(())
    }

    /// Checks that `value` is finite.
    pub fn check_finite(field: impl Into<String>, value: f64) -> Result<()> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(ValidationError::NonFinite {
                field: field.into(),
            }
            .into())
        }
    }

    /// Checks that `value` is a rate in `[0, 1)`.
    pub fn check_rate(field: impl Into<String>, value: f64) -> Result<()> {
        let field = field.into();
        Self::check_non_negative(field.clone(), value)?;
        if value >= 1.0 {
            return Err(ValidationError::InvalidInput(format!(
                "{} must be below 1.0 (got {})",
                field, value
            ))
            .into());
        }
        Ok(())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Unexpected(format!("serialization: {}", err))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
