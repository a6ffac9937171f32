//! Error handling for labhal
//!
//! Provides the error types for every layer of the hardware library:
//! - Transport errors (link, framing, reply matching)
//! - Device errors (lifecycle, polling, registry)
//! - Notification errors (observer failures surfaced to the publisher)
//!
//! All error types use `thiserror` for ergonomic error handling.

use std::sync::Arc;
use thiserror::Error;

/// Boxed error returned by device hooks and observer callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Shared cause carried by lifecycle errors and notification payloads.
///
/// The same cause is posted to observers and returned to the caller, so it
/// is reference counted rather than boxed.
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Transport error type
///
/// Represents failures of a byte-oriented link and of the request/reply
/// protocol layered on top of it. Transport errors are never retried
/// internally.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// The underlying link could not be established
    #[error("Link unavailable on {port}: {reason}")]
    LinkUnavailable {
        /// The port path or identifier.
        port: String,
        /// Why the link could not be opened.
        reason: String,
    },

    /// The link is already open
    #[error("Port {port} is already open")]
    AlreadyOpen {
        /// The port path or identifier.
        port: String,
    },

    /// The link is not open
    #[error("Port {port} is not open")]
    NotOpen {
        /// The port path or identifier.
        port: String,
    },

    /// Fewer bytes than requested arrived before the deadline
    #[error("Read timed out: expected {expected} bytes, received {received}")]
    ReadTimeout {
        /// Number of bytes requested.
        expected: usize,
        /// Number of bytes available when the deadline passed.
        received: usize,
    },

    /// The link accepted fewer bytes than were written
    #[error("Incomplete write: {written} of {expected} bytes accepted")]
    WriteIncomplete {
        /// Number of bytes handed to the link.
        expected: usize,
        /// Number of bytes the link accepted.
        written: usize,
    },

    /// The reply did not match the expected pattern
    #[error("Reply {reply:?} does not match pattern '{pattern}'")]
    NoMatch {
        /// The expected pattern.
        pattern: String,
        /// The reply as received (hex for binary replies).
        reply: String,
    },

    /// The reply matched the alternate pattern (a device-reported error)
    #[error("Reply {reply:?} matches alternate pattern '{pattern}'")]
    AlternateMatch {
        /// The alternate pattern that matched.
        pattern: String,
        /// The reply as received (hex for binary replies).
        reply: String,
    },

    /// A reply pattern failed to compile
    #[error("Invalid reply pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Reply bytes were not valid UTF-8
    #[error("Reply is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] std::string::FromUtf8Error),

    /// A simulated device received a command it has no reply for
    #[error("Unrecognized command: {payload}")]
    UnrecognizedCommand {
        /// The payload that was written.
        payload: String,
    },

    /// I/O error reported by the link
    #[error("I/O error on {port}: {reason}")]
    Io {
        /// The port path or identifier.
        port: String,
        /// The reason for the I/O error.
        reason: String,
    },
}

impl TransportError {
    /// Check if this is a read timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::ReadTimeout { .. })
    }

    /// Check if the device replied with a recognized error
    pub fn is_alternate_match(&self) -> bool {
        matches!(self, TransportError::AlternateMatch { .. })
    }
}

/// Device error type
///
/// Represents lifecycle and polling failures of a physical device. Errors
/// wrapping a hook failure carry the original cause.
#[derive(Error, Debug, Clone)]
pub enum DeviceError {
    /// A background polling loop is already running
    #[error("Background polling already running")]
    AlreadyPolling,

    /// No background polling loop is running
    #[error("No background polling running")]
    NotPolling,

    /// The operation requires a device in the Ready state
    #[error("Device is not ready (state: {state})")]
    NotReady {
        /// The current state name.
        state: String,
    },

    /// The device-specific initialization failed
    #[error("Unable to initialize device: {cause}")]
    InitializationFailed {
        /// The underlying failure.
        #[source]
        cause: Cause,
    },

    /// The device-specific shutdown failed
    #[error("Unable to shut down device: {cause}")]
    ShutdownFailed {
        /// The underlying failure.
        #[source]
        cause: Cause,
    },

    /// The requested identifiers do not match a driver's declared compatibility
    #[error("No compatible device for vendor {vendor_id:#06x}, product {product_id:#06x}, serial '{serial_number}'")]
    IncompatibleDevice {
        /// Requested vendor identifier.
        vendor_id: u16,
        /// Requested product identifier.
        product_id: u16,
        /// Requested serial number pattern.
        serial_number: String,
    },

    /// A registered driver constructor failed
    #[error("Driver '{driver}' could not be constructed: {cause}")]
    ConstructionFailed {
        /// The registered driver name.
        driver: String,
        /// The underlying failure.
        #[source]
        cause: Cause,
    },

    /// The polling thread could not be spawned
    #[error("Background polling unavailable: {reason}")]
    PollingUnavailable {
        /// The reason the thread could not start.
        reason: String,
    },
}

impl DeviceError {
    /// Wrap a hook failure as an initialization error
    pub fn initialization(cause: impl Into<BoxError>) -> Self {
        DeviceError::InitializationFailed {
            cause: Arc::from(cause.into()),
        }
    }

    /// Wrap a hook failure as a shutdown error
    pub fn shutdown(cause: impl Into<BoxError>) -> Self {
        DeviceError::ShutdownFailed {
            cause: Arc::from(cause.into()),
        }
    }

    /// The wrapped hook failure, if any
    pub fn cause(&self) -> Option<&Cause> {
        match self {
            DeviceError::InitializationFailed { cause }
            | DeviceError::ShutdownFailed { cause }
            | DeviceError::ConstructionFailed { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Notification error type
#[derive(Error, Debug, Clone)]
pub enum NotificationError {
    /// An observer callback failed while a notification was being posted
    #[error("Observer failed while handling '{name}': {cause}")]
    ObserverFailed {
        /// Label of the notification being dispatched.
        name: &'static str,
        /// The failure returned by the callback.
        #[source]
        cause: Cause,
    },
}

/// Main error type for labhal
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Device error
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Notification error
    #[error(transparent)]
    Notification(#[from] NotificationError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a read timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport(e) if e.is_timeout())
    }

    /// Check if this is a transport error
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Check if this is a device error
    pub fn is_device_error(&self) -> bool {
        matches!(self, Error::Device(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialization_keeps_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no camera");
        let err = DeviceError::initialization(io);

        let cause = err.cause().expect("cause should be kept");
        assert_eq!(cause.to_string(), "no camera");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_umbrella_classification() {
        let err: Error = TransportError::ReadTimeout {
            expected: 4,
            received: 1,
        }
        .into();
        assert!(err.is_timeout());
        assert!(err.is_transport_error());
        assert!(!err.is_device_error());

        let err: Error = DeviceError::NotPolling.into();
        assert!(err.is_device_error());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_display_messages() {
        let err = TransportError::WriteIncomplete {
            expected: 8,
            written: 3,
        };
        assert_eq!(err.to_string(), "Incomplete write: 3 of 8 bytes accepted");

        let err = DeviceError::IncompatibleDevice {
            vendor_id: 0x05ac,
            product_id: 0x1112,
            serial_number: "*".to_string(),
        };
        assert!(err.to_string().contains("0x05ac"));
    }
}
