//! # rideline-core
//!
//! Core business logic for the rideline driver platform.
//!
//! This crate provides:
//! - Ride fare computation from day/night rate bands, waiting time and distance
//! - Payout splitting between driver, company and pension fund
//! - Driver location tracking mode resolution
//! - The write-throttling and routing discipline for location samples
//! - Configuration loading and validation for rates and sampling
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`time_window`] - `"HH:mm"` clock times and midnight-aware time windows
//! - [`rates`] - Rate tables, payout splits and their validation
//! - [`fare`] - Fare calculation and rate band selection
//! - [`tracking`] - Tracking modes and their fixed sampling configurations
//! - [`sampling`] - Location write throttling, routing and retry backoff
//! - [`config`] - Application configuration loading, saving, and validation
//! - [`error`] - Unified error types for the crate
//!
//! Fare and tracking functions are pure: they take every input, including
//! the current time, as arguments and keep no state between calls.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod fare;
pub mod rates;
pub mod sampling;
pub mod time_window;
pub mod tracking;

// Re-export primary types for convenience
pub use config::{Config, ConfigError, ConfigResult};
pub use error::{Result, RidelineError};
pub use fare::{
    calculate_fare, calculate_fare_at, select_rate_band, FareBreakdown, FareResult, Payouts,
    RateBand, ValidationError,
};
pub use rates::{PayoutSplit, RateIssue, RateTable, RideRates};
pub use sampling::{
    ListenerAction, LocationSample, LocationSampler, LocationWrite, ModeTransition,
    RetryBackoff, SamplingSettings, WriteThrottle,
};
pub use time_window::{
    is_valid_clock_time, is_within_time_range, ClockTime, ClockTimeError, TimeWindow,
};
pub use tracking::{
    determine_tracking_mode, tracking_config_for, DriverState, LocationAccuracy, SamplingParams,
    TrackingConfig, TrackingMode, UpdateTarget,
};
