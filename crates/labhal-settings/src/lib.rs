//! labhal Settings Crate
//!
//! Loads, validates and saves the configuration of a labhal setup: which
//! serial port to talk on, how requests are terminated, and which device is
//! expected behind it.

pub mod config;
pub mod error;

pub use config::{default_config_path, Config, DeviceSettings};
pub use error::{SettingsError, SettingsResult};
