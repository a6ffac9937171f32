//! # labhal Device
//!
//! The device layer of labhal: a [`PhysicalDevice`] wraps a
//! device-specific [`DeviceDriver`] with the shared lifecycle
//! (initialize, shutdown, background status polling) and announces every
//! transition on a [`NotificationCenter`](labhal_core::NotificationCenter).
//!
//! Drivers are matched to requested hardware identifiers through an explicit
//! [`DeviceRegistry`].

pub mod driver;
pub mod identity;
pub mod physical;
pub mod registry;
pub mod state;

pub use driver::{DeviceDriver, HookResult};
pub use identity::{DeviceIdentity, DeviceMatcher, SerialNumber};
pub use physical::{PhysicalDevice, DEFAULT_REFRESH_INTERVAL};
pub use registry::{DeviceRegistry, DriverConstructor};
pub use state::{DeviceNotification, DeviceState};
