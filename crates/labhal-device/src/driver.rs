//! Device driver hooks
//!
//! A driver supplies the device-specific half of a [`PhysicalDevice`]:
//! what it takes to bring the hardware up, take it down and report its
//! status. The lifecycle bookkeeping around those hooks lives in
//! [`PhysicalDevice`].
//!
//! [`PhysicalDevice`]: crate::PhysicalDevice

use crate::identity::DeviceMatcher;
use labhal_core::{BoxError, Payload};

/// Result of a driver hook
pub type HookResult<T = ()> = std::result::Result<T, BoxError>;

/// Device-specific behaviour plugged into a [`PhysicalDevice`](crate::PhysicalDevice)
///
/// Hooks run with exclusive access to the driver. `status` is called from
/// the background polling thread, so drivers must be `Send`.
pub trait DeviceDriver: Send {
    /// Bring the device up
    fn initialize(&mut self) -> HookResult;

    /// Take the device down
    fn shutdown(&mut self) -> HookResult;

    /// Current status, posted as the payload of each polling tick
    fn status(&mut self) -> HookResult<Option<Payload>> {
        Ok(None)
    }

    /// Hardware identifiers this driver can handle
    fn compatibility(&self) -> DeviceMatcher {
        DeviceMatcher::any()
    }
}

impl<D: DeviceDriver + ?Sized> DeviceDriver for Box<D> {
    fn initialize(&mut self) -> HookResult {
        (**self).initialize()
    }

    fn shutdown(&mut self) -> HookResult {
        (**self).shutdown()
    }

    fn status(&mut self) -> HookResult<Option<Payload>> {
        (**self).status()
    }

    fn compatibility(&self) -> DeviceMatcher {
        (**self).compatibility()
    }
}
