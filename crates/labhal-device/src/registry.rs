//! Driver registry
//!
//! Maps hardware identifiers to driver constructors. Entries are scanned in
//! registration order and the first matching one wins.

use crate::driver::{DeviceDriver, HookResult};
use crate::identity::{DeviceIdentity, DeviceMatcher};
use crate::physical::PhysicalDevice;
use labhal_core::{Cause, DeviceError, NotificationCenter};
use std::sync::Arc;

/// Builds a driver for a matched identity
pub type DriverConstructor =
    Box<dyn Fn(&DeviceIdentity) -> HookResult<Box<dyn DeviceDriver>> + Send + Sync>;

struct RegistryEntry {
    name: String,
    matcher: DeviceMatcher,
    constructor: DriverConstructor,
}

/// Registered drivers, in registration order
#[derive(Default)]
pub struct DeviceRegistry {
    entries: Vec<RegistryEntry>,
}

impl DeviceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver under `name` for identities accepted by `matcher`
    pub fn register<F>(&mut self, name: impl Into<String>, matcher: DeviceMatcher, constructor: F)
    where
        F: Fn(&DeviceIdentity) -> HookResult<Box<dyn DeviceDriver>> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!("Registered driver '{}'", name);
        self.entries.push(RegistryEntry {
            name,
            matcher,
            constructor: Box::new(constructor),
        });
    }

    /// Names of the drivers accepting `vendor_id`/`product_id` with any serial number
    pub fn candidates(&self, vendor_id: u16, product_id: u16) -> Vec<&str> {
        let identity = DeviceIdentity::any_serial(vendor_id, product_id);
        self.entries
            .iter()
            .filter(|entry| entry.matcher.matches(&identity))
            .map(|entry| entry.name.as_str())
            .collect()
    }

    /// Build a device from the first driver accepting `identity`
    pub fn create(
        &self,
        identity: DeviceIdentity,
        center: Arc<NotificationCenter>,
    ) -> Result<PhysicalDevice<Box<dyn DeviceDriver>>, DeviceError> {
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.matcher.matches(&identity))
            .ok_or_else(|| DeviceError::IncompatibleDevice {
                vendor_id: identity.vendor_id,
                product_id: identity.product_id,
                serial_number: identity.serial_number.to_string(),
            })?;

        let driver =
            (entry.constructor)(&identity).map_err(|e| DeviceError::ConstructionFailed {
                driver: entry.name.clone(),
                cause: Cause::from(e),
            })?;
        tracing::debug!("Driver '{}' selected for {}", entry.name, identity);

        PhysicalDevice::new(driver, identity, center)
    }

    /// Registered driver names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Number of registered drivers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no driver is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
