//! Driver location tracking modes.
//!
//! The tracking mode is derived from three pieces of driver state: whether the
//! driver is online, whether they chose to be invisible, and whether they are
//! on a ride. Each mode maps to a fixed sampling configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Field on the driver record holding the latest position.
pub const DRIVER_LOCATION_FIELD: &str = "currentLocation";

/// Field on the ride record that accumulates the travelled path.
pub const RIDE_PATH_FIELD: &str = "path";

/// The driver's location-sampling regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackingMode {
    /// Driver is offline. Nothing is sampled.
    Offline,
    /// Online but hidden from dispatch. Nothing is sampled.
    Invisible,
    /// Online and available for rides.
    Availability,
    /// On an active ride.
    Ride,
}

impl TrackingMode {
    /// All modes, in table order.
    pub const ALL: [Self; 4] = [Self::Offline, Self::Invisible, Self::Availability, Self::Ride];

    /// Returns `true` if positions are sampled in this mode.
    #[must_use]
    pub const fn samples_location(self) -> bool {
        matches!(self, Self::Availability | Self::Ride)
    }

    const fn index(self) -> usize {
        match self {
            Self::Offline => 0,
            Self::Invisible => 1,
            Self::Availability => 2,
            Self::Ride => 3,
        }
    }
}

impl fmt::Display for TrackingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Offline => "OFFLINE",
            Self::Invisible => "INVISIBLE",
            Self::Availability => "AVAILABILITY",
            Self::Ride => "RIDE",
        };
        f.write_str(name)
    }
}

/// Requested GPS accuracy class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationAccuracy {
    /// Balanced power/accuracy.
    Balanced,
    /// Highest available accuracy.
    High,
}

/// Record a position sample is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateTarget {
    /// Overwrite a field on the driver record.
    DriverRecord,
    /// Append to the active ride's path.
    RidePathRecord,
}

/// Sampling parameters of a tracking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SamplingParams {
    /// Requested accuracy.
    pub accuracy: LocationAccuracy,
    /// Minimum time between samples, in milliseconds.
    pub time_interval_ms: u64,
    /// Minimum movement between samples, in meters.
    pub distance_interval_m: u32,
    /// Record receiving the samples.
    pub update_target: UpdateTarget,
    /// Field written on the target record.
    pub field_name: &'static str,
}

/// Tracking configuration selected for a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackingConfig {
    /// Mode this configuration belongs to.
    pub mode: TrackingMode,
    /// Sampling parameters, `None` when the mode does not sample.
    pub sampling: Option<SamplingParams>,
}

static TRACKING_CONFIGS: [TrackingConfig; 4] = [
    TrackingConfig {
        mode: TrackingMode::Offline,
        sampling: None,
    },
    TrackingConfig {
        mode: TrackingMode::Invisible,
        sampling: None,
    },
    TrackingConfig {
        mode: TrackingMode::Availability,
        sampling: Some(SamplingParams {
            accuracy: LocationAccuracy::Balanced,
            time_interval_ms: 30_000,
            distance_interval_m: 20,
            update_target: UpdateTarget::DriverRecord,
            field_name: DRIVER_LOCATION_FIELD,
        }),
    },
    TrackingConfig {
        mode: TrackingMode::Ride,
        sampling: Some(SamplingParams {
            accuracy: LocationAccuracy::High,
            time_interval_ms: 5_000,
            distance_interval_m: 5,
            update_target: UpdateTarget::RidePathRecord,
            field_name: RIDE_PATH_FIELD,
        }),
    },
];

/// Resolves the tracking mode for a driver.
///
/// Rules, first match wins:
/// 1. offline drivers are never tracked;
/// 2. an active ride is always tracked, even when the driver is invisible;
/// 3. invisible drivers are not tracked;
/// 4. everyone else is tracked for availability.
///
/// An empty ride id counts as no ride.
#[must_use]
pub fn determine_tracking_mode(
    is_online: bool,
    is_invisible: bool,
    active_ride_id: Option<&str>,
) -> TrackingMode {
    if !is_online {
        TrackingMode::Offline
    } else if active_ride_id.is_some_and(|id| !id.is_empty()) {
        TrackingMode::Ride
    } else if is_invisible {
        TrackingMode::Invisible
    } else {
        TrackingMode::Availability
    }
}

/// Looks up the fixed configuration for `mode`.
#[must_use]
pub fn tracking_config_for(mode: TrackingMode) -> &'static TrackingConfig {
    &TRACKING_CONFIGS[mode.index()]
}

/// Snapshot of the driver state that drives tracking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverState {
    /// Driver is signed in and online.
    pub is_online: bool,
    /// Driver asked to be hidden from dispatch.
    pub is_invisible: bool,
    /// Ride the driver is currently serving.
    pub active_ride_id: Option<String>,
}

impl DriverState {
    /// Resolves the tracking mode for this state.
    #[must_use]
    pub fn tracking_mode(&self) -> TrackingMode {
        determine_tracking_mode(
            self.is_online,
            self.is_invisible,
            self.active_ride_id.as_deref(),
        )
    }

    /// The ride id, if it is a usable one.
    #[must_use]
    pub fn ride_id(&self) -> Option<&str> {
        self.active_ride_id.as_deref().filter(|id| !id.is_empty())
    }
}
