//! Command line interface definition and command handlers.
//!
//! Every command renders a JSON document, which `main` prints to stdout.
//! Handlers take the current time as an argument so they can be tested with
//! a fixed clock.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use rideline_core::{
    calculate_fare, calculate_fare_at, determine_tracking_mode, tracking_config_for, ClockTime,
    Config, FareResult, TrackingConfig, TrackingMode,
};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(
    name = "rideline",
    version,
    about = "Prices rides and resolves driver tracking modes"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(long, env = "RIDELINE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Logging profile
    #[arg(long, env = "RIDELINE_ENV", value_enum, default_value_t = Profile::Development, global = true)]
    pub env: Profile,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Profile {
    Development,
    Production,
}

impl Profile {
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Price a ride with the configured rates
    Fare {
        /// Distance travelled, in kilometers
        #[arg(long, allow_negative_numbers = true)]
        distance_km: f64,
        /// Accumulated waiting time, in minutes
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        wait_minutes: f64,
        /// Wall-clock time to price at (HH:mm); defaults to now in the configured timezone
        #[arg(long)]
        at: Option<ClockTime>,
    },
    /// Resolve the tracking mode for a driver state
    Tracking {
        /// Driver is online
        #[arg(long)]
        online: bool,
        /// Driver is invisible to dispatch
        #[arg(long)]
        invisible: bool,
        /// Active ride identifier
        #[arg(long)]
        ride_id: Option<String>,
    },
    /// Validate the configuration file and report rate band gaps
    CheckConfig,
    /// Write the default configuration to the configuration path
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Serialize)]
pub struct FareQuote {
    pub priced_at: ClockTime,
    pub timezone: String,
    pub fare: FareResult,
}

#[derive(Debug, Serialize)]
pub struct TrackingReport {
    pub mode: TrackingMode,
    pub config: &'static TrackingConfig,
}

#[derive(Debug, Serialize)]
pub struct ConfigReport {
    pub path: PathBuf,
    pub valid: bool,
    pub timezone: String,
    pub coverage_gaps: Vec<String>,
}

impl Cli {
    /// Configuration path given on the command line, or the platform default.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }
}

/// Runs the selected command and renders its JSON output.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or the command
/// input is invalid.
pub fn run(cli: &Cli, now: DateTime<Utc>) -> anyhow::Result<String> {
    let path = cli.config_path();
    debug!(path = %path.display(), command = ?cli.command, "running command");

    let output = match &cli.command {
        Command::Fare {
            distance_km,
            wait_minutes,
            at,
        } => {
            let config = Config::load_or_default(&path)?;
            serde_json::to_string_pretty(&quote_fare(&config, *distance_km, *wait_minutes, *at, now)?)?
        }
        Command::Tracking {
            online,
            invisible,
            ride_id,
        } => serde_json::to_string_pretty(&resolve_tracking(*online, *invisible, ride_id.as_deref()))?,
        Command::CheckConfig => serde_json::to_string_pretty(&check_config(&path)?)?,
        Command::InitConfig { force } => {
            init_config(&path, *force)?;
            serde_json::to_string_pretty(&serde_json::json!({ "written": path }))?
        }
    };

    Ok(output)
}

/// Prices a ride at `at`, or at `now` converted to the configured timezone.
///
/// # Errors
///
/// Returns an error if the distance or waiting time is invalid.
pub fn quote_fare(
    config: &Config,
    distance_km: f64,
    wait_minutes: f64,
    at: Option<ClockTime>,
    now: DateTime<Utc>,
) -> anyhow::Result<FareQuote> {
    let (priced_at, fare) = match at {
        Some(at) => (at, calculate_fare_at(distance_km, wait_minutes, &config.rates, at)?),
        None => {
            let local = now.with_timezone(&config.timezone);
            (
                ClockTime::of(&local),
                calculate_fare(distance_km, wait_minutes, &config.rates, &local)?,
            )
        }
    };

    info!(%priced_at, total = fare.total, band = ?fare.band, "quoted fare");

    Ok(FareQuote {
        priced_at,
        timezone: config.timezone.name().to_string(),
        fare,
    })
}

#[must_use]
pub fn resolve_tracking(online: bool, invisible: bool, ride_id: Option<&str>) -> TrackingReport {
    let mode = determine_tracking_mode(online, invisible, ride_id);
    TrackingReport {
        mode,
        config: tracking_config_for(mode),
    }
}

/// Loads and validates the configuration at `path`.
///
/// # Errors
///
/// Returns an error if the file is missing, malformed or invalid.
pub fn check_config(path: &Path) -> anyhow::Result<ConfigReport> {
    let config = Config::load(path)
        .with_context(|| format!("configuration at {} is not usable", path.display()))?;

    Ok(ConfigReport {
        path: path.to_path_buf(),
        valid: true,
        timezone: config.timezone.name().to_string(),
        coverage_gaps: config
            .rates
            .coverage_gaps()
            .iter()
            .map(ToString::to_string)
            .collect(),
    })
}

/// Writes the default configuration to `path`.
///
/// # Errors
///
/// Returns an error if the file exists and `force` is not set, or the write
/// fails.
pub fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists, pass --force to overwrite it",
            path.display()
        );
    }
    Config::default().save(path)?;
    info!(path = %path.display(), "wrote default configuration");
    Ok(())
}
