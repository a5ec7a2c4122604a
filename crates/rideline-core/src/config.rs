//! Application configuration management.
//!
//! Handles loading, saving, and validating rideline configuration including:
//! - Day and night rate bands
//! - Insurance surcharge and payout split
//! - Operating timezone for rate band selection
//! - Location write spacing and retry policy
//!
//! Configuration is read from a TOML file and may be overridden from the
//! environment with variables prefixed `RIDELINE__`, using `__` between
//! nested keys (e.g. `RIDELINE__RATES__INSURANCE_PERCENT=3`).

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::rates::RideRates;
use crate::sampling::SamplingSettings;

/// Prefix of environment variables overriding file values.
pub const ENV_PREFIX: &str = "RIDELINE";

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// The configuration file could not be written.
    #[error("Failed to write {path}: {source}")]
    WriteError {
        /// File path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration could not be read or deserialized.
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] config::ConfigError),

    /// The configuration could not be serialized.
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A single field failed validation.
    #[error("{field}: {message}")]
    ValidationError {
        /// Dotted path of the field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields failed validation.
    #[error("Configuration has {} invalid fields", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Main application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Timezone in which rate bands are evaluated.
    #[serde(with = "timezone_serde", default = "default_timezone")]
    pub timezone: Tz,

    /// Ride pricing.
    pub rates: RideRates,

    /// Location sampling discipline.
    #[serde(default)]
    pub sampling: SamplingSettings,
}

const fn default_timezone() -> Tz {
    chrono_tz::UTC
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            rates: RideRates::default(),
            sampling: SamplingSettings::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`, applies environment overrides and
    /// validates the result.
    ///
    /// Rate band coverage gaps are logged as warnings, not rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if the file is missing, a parse error
    /// for malformed content (including bad `"HH:mm"` values), or validation
    /// errors for out-of-range values.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::load_layered(path.as_ref(), Self::env_source())
    }

    /// Overrides such as `RIDELINE__RATES__INSURANCE_PERCENT=3`.
    fn env_source() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    fn load_layered(path: &Path, env: config::Environment) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let config: Self = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml))
            .add_source(env)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        config.warn_on_coverage_gaps();

        info!(path = %path.display(), timezone = %config.timezone, "loaded configuration");
        Ok(config)
    }

    /// Loads configuration from `path`, or returns defaults if it does not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed or validated.
    pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<Self> {
        match Self::load(path) {
            Err(ConfigError::NotFound(missing)) => {
                info!(path = %missing, "configuration file not found, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Writes the configuration as TOML to `path`, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let write_error = |source| ConfigError::WriteError {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(write_error)
    }

    /// Validates every field, collecting all problems.
    ///
    /// # Errors
    ///
    /// Returns a single [`ConfigError::ValidationError`] or, when several
    /// fields are invalid, [`ConfigError::MultipleValidationErrors`].
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors: Vec<ConfigError> = self
            .rates
            .validation_errors()
            .into_iter()
            .map(|issue| ConfigError::ValidationError {
                field: format!("rates.{}", issue.field),
                message: issue.message,
            })
            .collect();

        if self.sampling.min_write_spacing_secs == 0 {
            errors.push(ConfigError::ValidationError {
                field: "sampling.min_write_spacing_secs".into(),
                message: "must be at least 1 second".into(),
            });
        }
        if self.sampling.write_retry.factor == 0 {
            errors.push(ConfigError::ValidationError {
                field: "sampling.write_retry.factor".into(),
                message: "must be at least 1".into(),
            });
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }

    fn warn_on_coverage_gaps(&self) {
        for gap in self.rates.coverage_gaps() {
            warn!(
                gap = %gap,
                minutes = gap.len_minutes(),
                "no rate band covers this window, night rates will apply"
            );
        }
    }

    /// Default configuration file path.
    ///
    /// On Linux: `/etc/rideline/config.toml`
    /// Elsewhere: the platform configuration directory.
    #[must_use]
    pub fn default_path() -> PathBuf {
        #[cfg(target_os = "linux")]
        {
            PathBuf::from("/etc/rideline/config.toml")
        }
        #[cfg(not(target_os = "linux"))]
        {
            directories::ProjectDirs::from("", "", "rideline").map_or_else(
                || PathBuf::from("config.toml"),
                |dirs| dirs.config_dir().join("config.toml"),
            )
        }
    }
}

mod timezone_serde {
    use chrono_tz::Tz;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(tz: &Tz, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(tz.name())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Tz, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
