//! Configuration management
//!
//! A configuration file is `.toml` or `.json`, chosen by extension. Every
//! section and field is optional in the file; missing values take their
//! defaults.
//!
//! ```toml
//! line_ending = "\r"
//!
//! [transport]
//! port = "/dev/ttyUSB0"
//! baud_rate = 19200
//! timeout_ms = 300
//!
//! [device]
//! vendor_id = 0x0403
//! product_id = 0x6001
//! serial_number = "*"
//! refresh_interval_ms = 1000
//! ```

use crate::error::{SettingsError, SettingsResult};
use labhal_communication::SerialSettings;
use labhal_device::{DeviceIdentity, SerialNumber};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Expected device identifiers and polling cadence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// USB vendor identifier
    pub vendor_id: u16,
    /// USB product identifier
    pub product_id: u16,
    /// Serial number pattern, `*` for any
    pub serial_number: String,
    /// Status polling interval in milliseconds
    pub refresh_interval_ms: u64,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            vendor_id: 0,
            product_id: 0,
            serial_number: "*".to_string(),
            refresh_interval_ms: 1000,
        }
    }
}

impl DeviceSettings {
    /// Identity of the expected device
    pub fn identity(&self) -> SettingsResult<DeviceIdentity> {
        let serial_number = SerialNumber::parse(&self.serial_number)
            .map_err(|e| SettingsError::invalid("device.serial_number", e.to_string()))?;
        Ok(DeviceIdentity::new(
            self.vendor_id,
            self.product_id,
            serial_number,
        ))
    }

    /// Status polling interval
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

/// Complete configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Terminator appended to text requests
    pub line_ending: String,
    /// Serial line settings
    pub transport: SerialSettings,
    /// Expected device
    pub device: DeviceSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            line_ending: "\r".to_string(),
            transport: SerialSettings::default(),
            device: DeviceSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn from_path(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            other => Err(SettingsError::UnsupportedFormat(
                other.unwrap_or("none").to_string(),
            )),
        }
    }
}

impl Config {
    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = Format::from_path(path)?;
        let content = std::fs::read_to_string(path)?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load config from `path`, or the defaults if the file does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::from_path(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        tracing::debug!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        if self.transport.baud_rate == 0 {
            return Err(SettingsError::invalid("transport.baud_rate", "must be > 0"));
        }

        if self.transport.timeout_ms == 0 {
            return Err(SettingsError::invalid("transport.timeout_ms", "must be > 0"));
        }

        if !(5..=8).contains(&self.transport.data_bits) {
            return Err(SettingsError::invalid(
                "transport.data_bits",
                format!("{} is not between 5 and 8", self.transport.data_bits),
            ));
        }

        if !matches!(self.transport.stop_bits, 1 | 2) {
            return Err(SettingsError::invalid(
                "transport.stop_bits",
                format!("{} is not 1 or 2", self.transport.stop_bits),
            ));
        }

        if self.device.refresh_interval_ms == 0 {
            return Err(SettingsError::invalid(
                "device.refresh_interval_ms",
                "must be > 0",
            ));
        }

        self.device.identity()?;
        Ok(())
    }
}

/// Default location of the configuration file
pub fn default_config_path() -> SettingsResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("labhal").join("config.toml"))
        .ok_or_else(|| {
            SettingsError::ConfigDirectory("no configuration directory on this platform".into())
        })
}
