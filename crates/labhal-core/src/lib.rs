//! # labhal Core
//!
//! Core types for labhal: the error taxonomy shared by every layer and the
//! notification center that devices use to announce lifecycle changes.

pub mod error;
pub mod notification;

pub use error::{BoxError, Cause, DeviceError, Error, NotificationError, Result, TransportError};

pub use notification::{
    NameKey, Notification, NotificationCenter, NotificationFilter, NotificationName, ObjectId,
    ObserverResult, Payload,
};
