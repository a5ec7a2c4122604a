//! Location sampling discipline for the background location task.
//!
//! The task owning the GPS subscription feeds driver-state changes and raw
//! position samples into a [`LocationSampler`]. The sampler answers two
//! questions and performs no I/O itself:
//!
//! - when state changes, whether GPS listening must start, stop or be
//!   re-subscribed with new parameters ([`ModeTransition`]);
//! - for each sample, whether it is written at all and to which record
//!   ([`LocationWrite`]), honouring a minimum spacing between writes.
//!
//! [`RetryBackoff`] gives the delays the task waits between retries of a
//! failed write.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::tracking::{
    tracking_config_for, DriverState, SamplingParams, TrackingConfig, TrackingMode, UpdateTarget,
};

/// Default minimum spacing between two location writes, in seconds.
pub const DEFAULT_MIN_WRITE_SPACING_SECS: u32 = 5;

/// Tunables of the sampling discipline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingSettings {
    /// Minimum seconds between two admitted writes.
    pub min_write_spacing_secs: u32,

    /// Retry policy for failed writes.
    pub write_retry: RetryBackoff,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            min_write_spacing_secs: DEFAULT_MIN_WRITE_SPACING_SECS,
            write_retry: RetryBackoff::default(),
        }
    }
}

/// Admits writes no closer together than a minimum spacing.
#[derive(Debug, Clone)]
pub struct WriteThrottle {
    min_spacing: Duration,
    last_write: Option<DateTime<Utc>>,
}

impl WriteThrottle {
    /// Creates a throttle with the given minimum spacing.
    #[must_use]
    pub const fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            last_write: None,
        }
    }

    /// Minimum spacing between admitted writes.
    #[must_use]
    pub const fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    /// Time of the last admitted write.
    #[must_use]
    pub const fn last_write(&self) -> Option<DateTime<Utc>> {
        self.last_write
    }

    /// Returns `true` and records `at` if a write is allowed at `at`.
    ///
    /// Timestamps earlier than the last admitted write are rejected.
    pub fn admit(&mut self, at: DateTime<Utc>) -> bool {
        if let Some(previous) = self.last_write {
            if at.signed_duration_since(previous) < self.min_spacing {
                return false;
            }
        }
        self.last_write = Some(at);
        true
    }

    /// Forgets the last write so the next one is admitted immediately.
    pub fn reset(&mut self) {
        self.last_write = None;
    }
}

/// A raw position reading from the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Reported horizontal accuracy in meters.
    pub accuracy_m: Option<f64>,
    /// When the reading was taken.
    pub recorded_at: DateTime<Utc>,
}

/// Where an admitted sample must be written.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationWrite {
    /// Overwrite `field` on the driver record.
    DriverField {
        /// Field to overwrite.
        field: &'static str,
        /// Sample to store.
        sample: LocationSample,
    },
    /// Append to the path of ride `ride_id`.
    RidePath {
        /// Ride receiving the point.
        ride_id: String,
        /// Field holding the path.
        field: &'static str,
        /// Sample to append.
        sample: LocationSample,
    },
}

/// What the location task must do with its GPS listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerAction {
    /// Start listening with these parameters.
    Start(SamplingParams),
    /// Stop listening.
    Stop,
    /// Re-subscribe with these parameters.
    Restart(SamplingParams),
    /// Not listening before or after.
    Idle,
}

/// A change of effective tracking configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeTransition {
    /// Previous mode.
    pub from: TrackingMode,
    /// New mode.
    pub to: TrackingMode,
    /// Required listener change.
    pub action: ListenerAction,
}

/// Per-driver sampling state machine.
#[derive(Debug, Clone)]
pub struct LocationSampler {
    state: DriverState,
    mode: TrackingMode,
    throttle: WriteThrottle,
}

impl LocationSampler {
    /// Creates a sampler for an offline driver.
    #[must_use]
    pub fn new(settings: &SamplingSettings) -> Self {
        Self {
            state: DriverState::default(),
            mode: TrackingMode::Offline,
            throttle: WriteThrottle::new(Duration::seconds(i64::from(
                settings.min_write_spacing_secs,
            ))),
        }
    }

    /// Current tracking mode.
    #[must_use]
    pub const fn mode(&self) -> TrackingMode {
        self.mode
    }

    /// Configuration of the current mode.
    #[must_use]
    pub fn config(&self) -> &'static TrackingConfig {
        tracking_config_for(self.mode)
    }

    /// Driver state last applied.
    #[must_use]
    pub const fn state(&self) -> &DriverState {
        &self.state
    }

    /// Applies a new driver state.
    ///
    /// Returns a transition when the mode changed, or when the driver moved
    /// to a different ride while in [`TrackingMode::Ride`]. The write
    /// throttle is reset on every transition.
    pub fn update_state(&mut self, state: DriverState) -> Option<ModeTransition> {
        let from = self.mode;
        let to = state.tracking_mode();
        let ride_changed = to == TrackingMode::Ride && state.ride_id() != self.state.ride_id();

        self.state = state;
        if from == to && !ride_changed {
            return None;
        }

        self.mode = to;
        self.throttle.reset();

        let action = match (
            tracking_config_for(from).sampling,
            tracking_config_for(to).sampling,
        ) {
            (None, Some(params)) => ListenerAction::Start(params),
            (Some(_), None) => ListenerAction::Stop,
            (Some(_), Some(params)) => ListenerAction::Restart(params),
            (None, None) => ListenerAction::Idle,
        };

        info!(
            from = %from,
            to = %to,
            ride_id = self.state.ride_id(),
            ?action,
            "tracking mode changed"
        );

        Some(ModeTransition { from, to, action })
    }

    /// Decides whether and where `sample` is written.
    ///
    /// Returns `None` when the current mode does not sample or the throttle
    /// rejects the sample.
    pub fn route_sample(&mut self, sample: LocationSample) -> Option<LocationWrite> {
        let Some(params) = self.config().sampling else {
            debug!(mode = %self.mode, "dropping sample, mode does not sample");
            return None;
        };

        let ride_id = match params.update_target {
            UpdateTarget::DriverRecord => None,
            UpdateTarget::RidePathRecord => Some(self.state.ride_id()?.to_string()),
        };

        if !self.throttle.admit(sample.recorded_at) {
            debug!(
                recorded_at = %sample.recorded_at,
                "dropping sample, too close to previous write"
            );
            return None;
        }

        Some(match ride_id {
            Some(ride_id) => LocationWrite::RidePath {
                ride_id,
                field: params.field_name,
                sample,
            },
            None => LocationWrite::DriverField {
                field: params.field_name,
                sample,
            },
        })
    }
}

/// Exponential backoff for retrying failed location writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryBackoff {
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Multiplier applied per further retry.
    pub factor: u32,
    /// Upper bound on any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Number of retries before the write is abandoned.
    pub max_attempts: u32,
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self {
            base_delay_ms: 500,
            factor: 2,
            max_delay_ms: 30_000,
            max_attempts: 5,
        }
    }
}

impl RetryBackoff {
    /// Delay before retry number `attempt` (0-based), or `None` once the
    /// retries are exhausted.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Option<StdDuration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let multiplier = u64::from(self.factor).saturating_pow(attempt);
        let delay_ms = self
            .base_delay_ms
            .saturating_mul(multiplier)
            .min(self.max_delay_ms);
        Some(StdDuration::from_millis(delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn sample(secs: i64) -> LocationSample {
        LocationSample {
            latitude: 42.6977,
            longitude: 23.3219,
            accuracy_m: Some(8.0),
            recorded_at: at(secs),
        }
    }

    fn online(ride: Option<&str>, invisible: bool) -> DriverState {
        DriverState {
            is_online: true,
            is_invisible: invisible,
            active_ride_id: ride.map(str::to_string),
        }
    }

    #[test]
    fn test_throttle_enforces_min_spacing() {
        let mut throttle = WriteThrottle::new(Duration::seconds(5));

        assert!(throttle.admit(at(0)));
        assert!(!throttle.admit(at(1)));
        assert!(!throttle.admit(at(4)));
        assert!(throttle.admit(at(5)));
        assert!(!throttle.admit(at(9)));
        assert!(throttle.admit(at(11)));
        assert_eq!(throttle.last_write(), Some(at(11)));
    }

    #[test]
    fn test_throttle_rejects_out_of_order_samples() {
        let mut throttle = WriteThrottle::new(Duration::seconds(5));
        assert!(throttle.admit(at(20)));
        assert!(!throttle.admit(at(0)));
    }

    #[test]
    fn test_throttle_reset() {
        let mut throttle = WriteThrottle::new(Duration::seconds(5));
        assert!(throttle.admit(at(0)));
        throttle.reset();
        assert!(throttle.admit(at(1)));
    }

    #[test]
    fn test_new_sampler_is_offline_and_drops_samples() {
        let mut sampler = LocationSampler::new(&SamplingSettings::default());
        assert_eq!(sampler.mode(), TrackingMode::Offline);
        assert_eq!(sampler.route_sample(sample(0)), None);
    }

    #[test]
    fn test_going_online_starts_listener() {
        let mut sampler = LocationSampler::new(&SamplingSettings::default());

        let transition = sampler.update_state(online(None, false)).unwrap();
        assert_eq!(transition.from, TrackingMode::Offline);
        assert_eq!(transition.to, TrackingMode::Availability);
        match transition.action {
            ListenerAction::Start(params) => assert_eq!(params.time_interval_ms, 30_000),
            other => panic!("expected start, got {other:?}"),
        }

        assert_eq!(sampler.update_state(online(None, false)), None);
    }

    #[test]
    fn test_availability_writes_driver_field() {
        let mut sampler = LocationSampler::new(&SamplingSettings::default());
        sampler.update_state(online(None, false));

        match sampler.route_sample(sample(0)) {
            Some(LocationWrite::DriverField { field, sample }) => {
                assert_eq!(field, "currentLocation");
                assert_eq!(sample.recorded_at, at(0));
            }
            other => panic!("expected driver field write, got {other:?}"),
        }
        assert_eq!(sampler.route_sample(sample(3)), None);
        assert!(sampler.route_sample(sample(6)).is_some());
    }

    #[test]
    fn test_ride_writes_ride_path_even_when_invisible() {
        let mut sampler = LocationSampler::new(&SamplingSettings::default());
        sampler.update_state(online(None, true));
        assert_eq!(sampler.mode(), TrackingMode::Invisible);
        assert_eq!(sampler.route_sample(sample(0)), None);

        let transition = sampler.update_state(online(Some("ride-123"), true)).unwrap();
        assert_eq!(transition.to, TrackingMode::Ride);
        assert!(matches!(transition.action, ListenerAction::Start(_)));

        match sampler.route_sample(sample(1)) {
            Some(LocationWrite::RidePath { ride_id, field, .. }) => {
                assert_eq!(ride_id, "ride-123");
                assert_eq!(field, "path");
            }
            other => panic!("expected ride path write, got {other:?}"),
        }
    }

    #[test]
    fn test_transition_resets_throttle() {
        let mut sampler = LocationSampler::new(&SamplingSettings::default());
        sampler.update_state(online(None, false));
        assert!(sampler.route_sample(sample(0)).is_some());

        let transition = sampler.update_state(online(Some("ride-1"), false)).unwrap();
        assert!(matches!(transition.action, ListenerAction::Restart(_)));
        // Ride start point is written right away.
        assert!(sampler.route_sample(sample(1)).is_some());
    }

    #[test]
    fn test_switching_rides_is_a_transition() {
        let mut sampler = LocationSampler::new(&SamplingSettings::default());
        sampler.update_state(online(Some("ride-1"), false));

        let transition = sampler.update_state(online(Some("ride-2"), false)).unwrap();
        assert_eq!(transition.from, TrackingMode::Ride);
        assert_eq!(transition.to, TrackingMode::Ride);
        assert!(matches!(transition.action, ListenerAction::Restart(_)));

        match sampler.route_sample(sample(0)) {
            Some(LocationWrite::RidePath { ride_id, .. }) => assert_eq!(ride_id, "ride-2"),
            other => panic!("expected ride path write, got {other:?}"),
        }
    }

    #[test]
    fn test_going_offline_stops_listener() {
        let mut sampler = LocationSampler::new(&SamplingSettings::default());
        sampler.update_state(online(Some("ride-1"), false));

        let transition = sampler.update_state(DriverState::default()).unwrap();
        assert_eq!(transition.to, TrackingMode::Offline);
        assert_eq!(transition.action, ListenerAction::Stop);
        assert_eq!(sampler.route_sample(sample(10)), None);
    }

    #[test]
    fn test_offline_to_invisible_is_idle() {
        let mut sampler = LocationSampler::new(&SamplingSettings::default());
        let transition = sampler.update_state(online(None, true)).unwrap();
        assert_eq!(transition.action, ListenerAction::Idle);
    }

    #[test]
    fn test_custom_spacing() {
        let settings = SamplingSettings {
            min_write_spacing_secs: 30,
            ..SamplingSettings::default()
        };
        let mut sampler = LocationSampler::new(&settings);
        sampler.update_state(online(None, false));

        assert!(sampler.route_sample(sample(0)).is_some());
        assert!(sampler.route_sample(sample(29)).is_none());
        assert!(sampler.route_sample(sample(30)).is_some());
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let backoff = RetryBackoff {
            base_delay_ms: 500,
            factor: 2,
            max_delay_ms: 3_000,
            max_attempts: 5,
        };
        let delays: Vec<u128> = (0..5)
            .map(|n| backoff.delay_for(n).unwrap().as_millis())
            .collect();
        assert_eq!(delays, vec![500, 1_000, 2_000, 3_000, 3_000]);
        assert_eq!(backoff.delay_for(5), None);
    }

    #[test]
    fn test_backoff_does_not_overflow() {
        let backoff = RetryBackoff {
            max_attempts: u32::MAX,
            ..RetryBackoff::default()
        };
        assert_eq!(
            backoff.delay_for(200),
            Some(StdDuration::from_millis(30_000))
        );
    }
}
