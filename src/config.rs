//! Configuration management using Figment.
//!
//! Configuration is loaded from (in order of precedence):
//! 1. Environment variables prefixed with `CAMLINK_`
//! 2. TOML configuration file (default: `config/camlink.toml`)
//!
//! Nested keys are addressed in environment variables with a double
//! underscore:
//!
//! ```text
//! CAMLINK_DEVICE__POLL_INTERVAL=5ms
//! CAMLINK_TRANSFER__CHUNK_SIZE=256
//! CAMLINK_LOG__LEVEL=debug
//! ```
//!
//! Values that parse but are semantically invalid (zero chunk size, zero
//! poll interval) are rejected by [`Settings::validate`] with a
//! `Configuration` error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppResult, LinkError};

/// Default location of the base configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/camlink.toml";

/// Top-level application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Tracker device section.
    pub device: DeviceSettings,
    /// Blob transfer section.
    pub transfer: TransferSettings,
    /// Logging section.
    pub log: LogSettings,
}

/// Settings for the analog tracker device and its poll loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Name handed to the device manager when opening the channel set.
    pub name: String,
    /// Period of the repeating poll task.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Optional calibration file; the built-in tracker-head defaults are
    /// used when absent.
    pub calibration_file: Option<PathBuf>,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            name: "Analog0".to_string(),
            poll_interval: Duration::from_millis(10),
            calibration_file: None,
        }
    }
}

/// Settings for the large-blob transfer subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferSettings {
    /// Size of each inline chunk in bytes.
    pub chunk_size: usize,
    /// Directory used for disk-mode spool files.
    pub blob_dir: PathBuf,
    /// How long a transfer waits for its acknowledgment before expiring.
    #[serde(with = "humantime_serde")]
    pub ack_timeout: Duration,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            chunk_size: crate::transfer::DEFAULT_CHUNK_SIZE,
            blob_dir: PathBuf::from("blobs"),
            ack_timeout: Duration::from_secs(30),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Tracing env-filter directive, e.g. `info` or `camlink=debug`.
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the default file location plus environment
    /// overrides.
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load settings from a custom file location plus environment overrides.
    ///
    /// A missing file is not an error; defaults apply for every key the
    /// remaining providers leave unset.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let settings: Settings = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("CAMLINK_").split("__"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check semantic constraints that serde cannot express.
    pub fn validate(&self) -> AppResult<()> {
        if self.transfer.chunk_size == 0 {
            return Err(LinkError::Configuration(
                "transfer.chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.device.poll_interval.is_zero() {
            return Err(LinkError::Configuration(
                "device.poll_interval must be greater than zero".to_string(),
            ));
        }
        if self.transfer.ack_timeout.is_zero() {
            return Err(LinkError::Configuration(
                "transfer.ack_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
