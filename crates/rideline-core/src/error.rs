//! Unified error types for the rideline core library.
//!
//! This module provides a unified error type [`RidelineError`] that covers all
//! failure modes across the crate. Each module also has its own specific error
//! type ([`ConfigError`], [`ValidationError`], [`ClockTimeError`]) for internal
//! use; all of them convert into [`RidelineError`].
//!
//! # Example
//!
//! ```rust
//! use rideline_core::error::{Result, RidelineError};
//! use rideline_core::{calculate_fare_at, ClockTime, RideRates};
//!
//! fn quote(distance_km: f64) -> Result<i64> {
//!     let at: ClockTime = "10:00".parse()?;
//!     let fare = calculate_fare_at(distance_km, 0.0, &RideRates::default(), at)?;
//!     Ok(fare.total)
//! }
//!
//! assert!(quote(3.0).is_ok());
//! assert!(matches!(quote(-3.0), Err(RidelineError::InvalidRideInput(_))));
//! ```

use thiserror::Error;

use crate::config::ConfigError;
use crate::fare::ValidationError;
use crate::time_window::ClockTimeError;

/// The unified error type for all rideline operations.
#[derive(Debug, Error)]
pub enum RidelineError {
    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {0}")]
    ConfigNotFound(String),

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    /// A wall-clock time string was malformed.
    #[error(transparent)]
    InvalidClockTime(#[from] ClockTimeError),

    // =========================================================================
    // PRICING ERRORS
    // =========================================================================
    /// Ride distance or waiting time cannot be priced.
    #[error("Invalid ride input: {0}")]
    InvalidRideInput(#[from] ValidationError),

    // =========================================================================
    // I/O ERRORS
    // =========================================================================
    /// An error occurred while writing data.
    #[error("Persistence error: {0}")]
    PersistenceError(String),
}

/// A specialized [`Result`] type for rideline operations.
pub type Result<T> = std::result::Result<T, RidelineError>;

impl RidelineError {
    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_)
                | Self::ConfigParseError(_)
                | Self::ConfigValidationError(_)
                | Self::InvalidClockTime(_)
        )
    }

    /// Returns `true` if this error was caused by caller-supplied input.
    #[inline]
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidRideInput(_) | Self::InvalidClockTime(_))
    }

    /// Returns a machine-readable error code.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::InvalidClockTime(_) => "INVALID_CLOCK_TIME",
            Self::InvalidRideInput(_) => "INVALID_RIDE_INPUT",
            Self::PersistenceError(_) => "PERSISTENCE_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<ConfigError> for RidelineError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path),
            ConfigError::WriteError { path, source } => {
                Self::PersistenceError(format!("Failed to write {path}: {source}"))
            }
            ConfigError::ParseError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::SerializeError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::ValidationError { field, message } => {
                Self::ConfigValidationError(format!("{field}: {message}"))
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_classification() {
        assert!(RidelineError::ConfigNotFound("/test".into()).is_config_error());
        assert!(RidelineError::ConfigParseError("syntax error".into()).is_config_error());
        assert!(RidelineError::ConfigValidationError("invalid value".into()).is_config_error());
        assert!(
            RidelineError::from(ClockTimeError::Malformed("7pm".into())).is_config_error()
        );

        assert!(!RidelineError::PersistenceError("disk full".into()).is_config_error());
    }

    #[test]
    fn test_input_error_classification() {
        let err = RidelineError::from(ValidationError::NegativeDistance(-2.0));
        assert!(err.is_input_error());
        assert!(!err.is_config_error());
        assert!(!RidelineError::ConfigNotFound("/x".into()).is_input_error());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            RidelineError::ConfigNotFound("/x".into()).error_code(),
            "CONFIG_NOT_FOUND"
        );
        assert_eq!(
            RidelineError::from(ValidationError::NegativeWait(-1.0)).error_code(),
            "INVALID_RIDE_INPUT"
        );
        assert_eq!(
            RidelineError::from(ClockTimeError::OutOfRange("25:00".into())).error_code(),
            "INVALID_CLOCK_TIME"
        );
    }

    #[test]
    fn test_from_config_validation_errors() {
        let err: RidelineError = ConfigError::MultipleValidationErrors(vec![
            ConfigError::ValidationError {
                field: "rates.insurance_percent".into(),
                message: "must be between 0 and 100 (got 120)".into(),
            },
            ConfigError::ValidationError {
                field: "rates.payouts".into(),
                message: "percentages must sum to 100 (got 90)".into(),
            },
        ])
        .into();

        assert!(matches!(err, RidelineError::ConfigValidationError(_)));
        let message = err.to_string();
        assert!(message.contains("rates.insurance_percent"));
        assert!(message.contains("; rates.payouts"));
    }

    #[test]
    fn test_from_config_not_found() {
        let err: RidelineError = ConfigError::NotFound("/etc/rideline/config.toml".into()).into();
        assert_eq!(err.error_code(), "CONFIG_NOT_FOUND");
        assert!(err.to_string().contains("/etc/rideline/config.toml"));
    }

    #[test]
    fn test_error_display_messages() {
        let err = RidelineError::from(ValidationError::NegativeDistance(-2.5));
        assert!(err.to_string().contains("-2.5 km"));

        let err = RidelineError::from(ClockTimeError::Malformed("7pm".into()));
        assert!(err.to_string().contains("'7pm'"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<RidelineError>();
        assert_sync::<RidelineError>();
    }
}
