//! Physical device lifecycle and background status polling
//!
//! State transitions:
//!
//! ```text
//! Unconfigured --initialize ok--> Ready --shutdown--> Recognized
//!      |                            ^                     |
//!      +--initialize failed--> Unrecognized --------------+ (initialize again)
//! ```
//!
//! Every transition is announced on the device's notification center with
//! the device's [`ObjectId`] as the notifying object.

use crate::driver::{DeviceDriver, HookResult};
use crate::identity::DeviceIdentity;
use crate::state::{DeviceNotification, DeviceState};
use labhal_core::{Cause, DeviceError, NotificationCenter, NotificationError, ObjectId, Payload};
use parking_lot::Mutex;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Polling cadence used by [`PhysicalDevice::start_polling_at_refresh_interval`]
/// until another one is set
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// State shared with the polling thread
struct Shared<D> {
    id: ObjectId,
    identity: DeviceIdentity,
    state: Mutex<DeviceState>,
    driver: Mutex<D>,
    center: Arc<NotificationCenter>,
}

impl<D: DeviceDriver> Shared<D> {
    fn post(
        &self,
        name: DeviceNotification,
        payload: Option<Payload>,
    ) -> Result<usize, NotificationError> {
        self.center.post(name, Some(self.id), payload)
    }

    fn poll_until_stopped(&self, interval: Duration, stop: Receiver<()>) {
        tracing::debug!("Polling {} every {:?}", self.identity, interval);
        loop {
            let status = self.driver.lock().status();
            let payload = match status {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!("Status of {} unavailable: {}", self.identity, e);
                    Some(Arc::new(Cause::from(e)) as Payload)
                }
            };
            if let Err(e) = self.post(DeviceNotification::Status, payload) {
                tracing::warn!("Status observer of {} failed: {}", self.identity, e);
            }

            match stop.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        tracing::debug!("Stopped polling {}", self.identity);
    }
}

struct PollingTask {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl PollingTask {
    /// Signal the loop and wait for it to exit
    fn finish(self) {
        // The loop may be gone already; a closed channel is fine
        let _ = self.stop.send(());
        if self.handle.thread().id() == thread::current().id() {
            // Stopped from one of our own status observers
            return;
        }
        if self.handle.join().is_err() {
            tracing::error!("Polling thread panicked");
        }
    }
}

/// A device driven through the shared lifecycle
///
/// `PhysicalDevice` owns the driver and serializes lifecycle operations:
/// `initialize` and `shutdown` never run concurrently on the same device.
/// Device-specific commands reach the driver through
/// [`with_driver`](Self::with_driver).
///
/// Observers of the device's notifications must not call `initialize`,
/// `shutdown` or `start_background_polling` on the device that posted them.
/// A `Status` observer may stop the polling loop it runs on.
pub struct PhysicalDevice<D: DeviceDriver + 'static> {
    shared: Arc<Shared<D>>,
    lifecycle: Mutex<()>,
    polling: Mutex<Option<PollingTask>>,
    refresh_interval: Mutex<Duration>,
}

impl<D: DeviceDriver + 'static> PhysicalDevice<D> {
    /// Create an unconfigured device
    ///
    /// Fails with [`DeviceError::IncompatibleDevice`] if the driver does not
    /// declare itself compatible with `identity`.
    pub fn new(
        driver: D,
        identity: DeviceIdentity,
        center: Arc<NotificationCenter>,
    ) -> Result<Self, DeviceError> {
        if !driver.compatibility().matches(&identity) {
            return Err(DeviceError::IncompatibleDevice {
                vendor_id: identity.vendor_id,
                product_id: identity.product_id,
                serial_number: identity.serial_number.to_string(),
            });
        }

        Ok(Self {
            shared: Arc::new(Shared {
                id: ObjectId::new(),
                identity,
                state: Mutex::new(DeviceState::Unconfigured),
                driver: Mutex::new(driver),
                center,
            }),
            lifecycle: Mutex::new(()),
            polling: Mutex::new(None),
            refresh_interval: Mutex::new(DEFAULT_REFRESH_INTERVAL),
        })
    }

    /// Identity used as the notifying object of every notification
    pub fn id(&self) -> ObjectId {
        self.shared.id
    }

    /// Requested hardware identifiers
    pub fn identity(&self) -> &DeviceIdentity {
        &self.shared.identity
    }

    /// Current lifecycle state
    pub fn state(&self) -> DeviceState {
        *self.shared.state.lock()
    }

    /// Notification center this device posts to
    pub fn center(&self) -> &Arc<NotificationCenter> {
        &self.shared.center
    }

    /// Run `f` with exclusive access to the driver
    pub fn with_driver<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        f(&mut self.shared.driver.lock())
    }

    /// Polling cadence used by [`start_polling_at_refresh_interval`](Self::start_polling_at_refresh_interval)
    pub fn refresh_interval(&self) -> Duration {
        *self.refresh_interval.lock()
    }

    /// Set the polling cadence; a running loop keeps its own
    pub fn set_refresh_interval(&self, interval: Duration) {
        *self.refresh_interval.lock() = interval;
    }

    fn set_state(&self, state: DeviceState) {
        let mut current = self.shared.state.lock();
        tracing::debug!("{}: {} -> {}", self.shared.identity, *current, state);
        *current = state;
    }

    /// Post the closing notification of a failed transition
    fn post_failure(&self, name: DeviceNotification, cause: &Cause) {
        let payload: Payload = Arc::new(cause.clone());
        if let Err(e) = self.shared.post(name, Some(payload)) {
            tracing::warn!("Observer of {:?} failed after {}: {}", name, cause, e);
        }
    }

    /// Initialize the device
    ///
    /// Does nothing if the device is already `Ready`. On failure the device
    /// is left `Unrecognized`, `DidInitialize` is posted with the cause as
    /// payload and [`DeviceError::InitializationFailed`] is returned. A
    /// failing observer of the lifecycle notifications counts as a failed
    /// initialization.
    pub fn initialize(&self) -> Result<(), DeviceError> {
        let _lifecycle = self.lifecycle.lock();
        if self.state() == DeviceState::Ready {
            return Ok(());
        }

        match self.run_initialize() {
            Ok(()) => {
                tracing::info!("Initialized {}", self.shared.identity);
                Ok(())
            }
            Err(e) => {
                self.set_state(DeviceState::Unrecognized);
                let cause = Cause::from(e);
                tracing::warn!("Unable to initialize {}: {}", self.shared.identity, cause);
                self.post_failure(DeviceNotification::DidInitialize, &cause);
                Err(DeviceError::InitializationFailed { cause })
            }
        }
    }

    fn run_initialize(&self) -> HookResult {
        self.shared.post(DeviceNotification::WillInitialize, None)?;
        self.shared.driver.lock().initialize()?;
        self.set_state(DeviceState::Ready);
        self.shared.post(DeviceNotification::DidInitialize, None)?;
        Ok(())
    }

    /// Initialize only a device that was never configured
    pub fn initialize_if_needed(&self) -> Result<(), DeviceError> {
        if self.state() == DeviceState::Unconfigured {
            self.initialize()?;
        }
        Ok(())
    }

    /// Shut the device down
    ///
    /// Does nothing unless the device is `Ready`. Stops background polling
    /// before the shutdown hook runs. The device ends `Recognized` and not
    /// polling whether or not the hook succeeds; a failure is posted with
    /// `DidShutdown` and returned as [`DeviceError::ShutdownFailed`]. A
    /// failing `WillShutdown` observer does not keep the hook from running
    /// but is reported the same way.
    pub fn shutdown(&self) -> Result<(), DeviceError> {
        let _lifecycle = self.lifecycle.lock();
        if self.state() != DeviceState::Ready {
            return Ok(());
        }

        match self.run_shutdown() {
            Ok(()) => {
                tracing::info!("Shut down {}", self.shared.identity);
                Ok(())
            }
            Err(e) => {
                self.stop_polling_task();
                self.set_state(DeviceState::Recognized);
                let cause = Cause::from(e);
                tracing::warn!("Unable to shut down {}: {}", self.shared.identity, cause);
                self.post_failure(DeviceNotification::DidShutdown, &cause);
                Err(DeviceError::ShutdownFailed { cause })
            }
        }
    }

    fn run_shutdown(&self) -> HookResult {
        let announced = self.shared.post(DeviceNotification::WillShutdown, None);
        self.stop_polling_task();
        self.shared.driver.lock().shutdown()?;
        announced?;
        self.set_state(DeviceState::Recognized);
        self.shared.post(DeviceNotification::DidShutdown, None)?;
        Ok(())
    }

    /// Start posting `Status` every `interval` from a background thread
    ///
    /// The first status is posted immediately. Requires a `Ready` device;
    /// waits for an `initialize` or `shutdown` in progress to finish.
    pub fn start_background_polling(&self, interval: Duration) -> Result<(), DeviceError> {
        let _lifecycle = self.lifecycle.lock();
        let mut polling = self.polling.lock();
        if polling.is_some() {
            return Err(DeviceError::AlreadyPolling);
        }
        let state = self.state();
        if state != DeviceState::Ready {
            return Err(DeviceError::NotReady {
                state: state.to_string(),
            });
        }

        let (stop, stop_rx) = mpsc::channel();
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name(format!("labhal-status-{}", self.shared.id))
            .spawn(move || shared.poll_until_stopped(interval, stop_rx))
            .map_err(|e| DeviceError::PollingUnavailable {
                reason: e.to_string(),
            })?;

        *polling = Some(PollingTask { stop, handle });
        Ok(())
    }

    /// Start polling at the configured refresh interval
    pub fn start_polling_at_refresh_interval(&self) -> Result<(), DeviceError> {
        self.start_background_polling(self.refresh_interval())
    }

    /// Stop the polling loop and wait for its thread to exit
    ///
    /// No `Status` notification is posted once this returns.
    pub fn stop_background_polling(&self) -> Result<(), DeviceError> {
        let task = self.polling.lock().take().ok_or(DeviceError::NotPolling)?;
        task.finish();
        Ok(())
    }

    /// Stop the polling loop if one runs; the lock is released before joining
    fn stop_polling_task(&self) {
        let task = self.polling.lock().take();
        if let Some(task) = task {
            task.finish();
        }
    }

    /// Whether a polling loop is running
    pub fn is_polling(&self) -> bool {
        self.polling.lock().is_some()
    }
}

impl<D: DeviceDriver + 'static> Drop for PhysicalDevice<D> {
    fn drop(&mut self) {
        if let Some(task) = self.polling.get_mut().take() {
            task.finish();
        }
    }
}

impl<D: DeviceDriver + 'static> std::fmt::Debug for PhysicalDevice<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicalDevice")
            .field("id", &self.shared.id)
            .field("identity", &self.shared.identity)
            .field("state", &self.state())
            .field("polling", &self.is_polling())
            .finish()
    }
}
