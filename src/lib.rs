//! # labhal
//!
//! A hardware abstraction layer for laboratory instruments reached over
//! serial ports or USB devices exposing a serial interface.
//!
//! ## Architecture
//!
//! labhal is organized as a workspace with multiple crates:
//!
//! 1. **labhal-core** - Error taxonomy and the notification center
//! 2. **labhal-communication** - Byte links (serial, simulated) and the
//!    line-oriented request/reply port
//! 3. **labhal-device** - Device lifecycle, background status polling and
//!    the driver registry
//! 4. **labhal-settings** - TOML/JSON configuration files
//! 5. **labhal** - This crate: re-exports plus the `labhal` command line tool

pub use labhal_core::{
    BoxError, Cause, DeviceError, Error, NameKey, Notification, NotificationCenter,
    NotificationError, NotificationFilter, NotificationName, ObjectId, ObserverResult, Payload,
    Result, TransportError,
};

pub use labhal_communication::{
    CommandMatch, CommandPattern, CommunicationPort, Link, ReplyRule, SerialLink, SerialParity,
    SerialPort, SerialSettings, SimulatedLink, SimulatedPort, TransportResult,
};

pub use labhal_device::{
    DeviceDriver, DeviceIdentity, DeviceMatcher, DeviceNotification, DeviceRegistry, DeviceState,
    DriverConstructor, HookResult, PhysicalDevice, SerialNumber, DEFAULT_REFRESH_INTERVAL,
};

pub use labhal_settings::{default_config_path, Config, DeviceSettings, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Log lines go to stderr so command output on stdout stays clean. The
/// `RUST_LOG` environment variable refines the default `info` level.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_names(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
