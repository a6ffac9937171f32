//! Device state and lifecycle notifications

use labhal_core::NotificationName;
use std::fmt;

/// Lifecycle state of a physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceState {
    /// Nothing is known about the device yet
    #[default]
    Unconfigured,
    /// Connected and initialized
    Ready,
    /// Initialization succeeded once, currently shut down
    Recognized,
    /// Initialization failed
    Unrecognized,
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconfigured => write!(f, "Unconfigured"),
            Self::Ready => write!(f, "Ready"),
            Self::Recognized => write!(f, "Recognized"),
            Self::Unrecognized => write!(f, "Unrecognized"),
        }
    }
}

/// Notifications posted by every physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceNotification {
    /// Posted before the initialize hook runs
    WillInitialize,
    /// Posted after initialization; carries the failure cause when it failed
    DidInitialize,
    /// Posted before the shutdown hook runs
    WillShutdown,
    /// Posted after shutdown; carries the failure cause when it failed
    DidShutdown,
    /// Periodic status from the background polling loop
    Status,
}

impl NotificationName for DeviceNotification {
    fn label(&self) -> &'static str {
        match self {
            Self::WillInitialize => "willInitializeDevice",
            Self::DidInitialize => "didInitializeDevice",
            Self::WillShutdown => "willShutdownDevice",
            Self::DidShutdown => "didShutdownDevice",
            Self::Status => "status",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_unconfigured() {
        assert_eq!(DeviceState::default(), DeviceState::Unconfigured);
        assert_eq!(DeviceState::Unrecognized.to_string(), "Unrecognized");
    }

    #[test]
    fn test_labels() {
        assert_eq!(DeviceNotification::WillInitialize.label(), "willInitializeDevice");
        assert_eq!(DeviceNotification::Status.label(), "status");
    }
}
