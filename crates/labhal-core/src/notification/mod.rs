//! # Notification Module
//!
//! Synchronous publish/subscribe between devices and their observers.
//!
//! ## Overview
//!
//! - Each domain declares a closed enum of notification names
//! - Observers register a callback with an optional name and object filter
//! - Posting invokes matching callbacks in registration order, on the
//!   posting thread, with no queue in between
//!
//! ## Usage
//!
//! ```rust,ignore
//! use labhal_core::notification::{NotificationCenter, NotificationFilter, ObjectId};
//!
//! let center = NotificationCenter::new();
//! let observer = ObjectId::new();
//!
//! center.add_observer(
//!     observer,
//!     NotificationFilter::named(DeviceNotification::Status).from_object(device.id()),
//!     |notification| {
//!         println!("status: {:?}", notification.user_info_as::<f64>());
//!         Ok(())
//!     },
//! );
//!
//! center.post(DeviceNotification::Status, Some(device.id()), None)?;
//! center.remove_observer(observer, NotificationFilter::any());
//! ```

mod center;
mod names;

pub use center::*;
pub use names::*;
