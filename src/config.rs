//! Configuration document
//!
//! TOML file with the controller selection under `settings.deviceguid` and the
//! sampling parameters under `sampling`. Missing keys fall back to defaults so a
//! partial or empty file is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::controller::DeviceInfo;
use crate::link::LinkSettings;
use crate::sampling::ReleasePolicy;

const CONFIG_DIR: &str = "gamepad-lsl";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not read out config parameters from {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Could not prepare settings for saving: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Could not write to config file {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("The previously configured device {0} was not found. Is it plugged in?")]
    UnknownDevice(String),
}

/// Device selection
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct DeviceSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deviceguid: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SamplingConfig {
    /// Used when no device id is configured
    pub controller_index: usize,
    pub poll_interval_ms: u64,
    pub nominal_rate_hz: f64,
    pub stream_prefix: String,
    pub release_policy: ReleasePolicy,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            controller_index: 0,
            poll_interval_ms: 2,
            nominal_rate_hz: 500.0,
            stream_prefix: "xbox_controller_".to_string(),
            release_policy: ReleasePolicy::PerButton,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: DeviceSettings,
    #[serde(default)]
    pub sampling: SamplingConfig,
}

impl AppConfig {
    /// `<config dir>/gamepad-lsl/config.toml`, or the working directory when the
    /// platform has no config dir
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR))
            .unwrap_or_default()
            .join(CONFIG_FILE)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            warn!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        let write_error = |source| ConfigError::WriteError {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        fs::write(path, content).map_err(write_error)?;
        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Index of the configured device among `devices`
    ///
    /// `Ok(None)` when no device is configured.
    pub fn resolve_device(&self, devices: &[DeviceInfo]) -> Result<Option<usize>, ConfigError> {
        let guid = match self.settings.deviceguid.as_deref() {
            Some(guid) if !guid.is_empty() => guid,
            _ => return Ok(None),
        };

        match devices.iter().find(|d| d.guid.eq_ignore_ascii_case(guid)) {
            Some(device) => {
                debug!("Configured device {} is {} at index {}", guid, device.name, device.index);
                Ok(Some(device.index))
            }
            None => Err(ConfigError::UnknownDevice(guid.to_string())),
        }
    }

    pub fn remember_device(&mut self, device: &DeviceInfo) {
        self.settings.deviceguid = Some(device.guid.clone());
    }

    /// Session settings for a link controller on `host`
    pub fn link_settings(&self, host: &str) -> LinkSettings {
        LinkSettings {
            stream_prefix: self.sampling.stream_prefix.clone(),
            host: host.to_string(),
            nominal_rate: self.sampling.nominal_rate_hz,
            poll_interval: Duration::from_millis(self.sampling.poll_interval_ms.max(1)),
            release_policy: self.sampling.release_policy,
        }
    }
}
