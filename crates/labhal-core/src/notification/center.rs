//! Notification center implementation.
//!
//! Provides the `NotificationCenter` register and the lazily constructed
//! process-wide instance.

use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};

use super::names::{NameKey, Notification, NotificationName, ObjectId, Payload};
use crate::error::{BoxError, NotificationError};

/// Result returned by observer callbacks
pub type ObserverResult = std::result::Result<(), BoxError>;

type ObserverCallback = Arc<dyn Fn(&Notification) -> ObserverResult + Send + Sync>;

/// Filter restricting which notifications an observer receives
///
/// An absent name accepts every name; an absent object accepts every
/// notifying object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationFilter {
    name: Option<NameKey>,
    object: Option<ObjectId>,
}

impl NotificationFilter {
    /// Accept every notification
    pub fn any() -> Self {
        Self::default()
    }

    /// Accept only notifications with this name
    pub fn named<N: NotificationName>(name: N) -> Self {
        Self {
            name: Some(NameKey::of(name)),
            object: None,
        }
    }

    /// Restrict to notifications posted by `object`
    pub fn from_object(mut self, object: ObjectId) -> Self {
        self.object = Some(object);
        self
    }

    /// The name filter
    pub fn name(&self) -> Option<NameKey> {
        self.name
    }

    /// The object filter
    pub fn object(&self) -> Option<ObjectId> {
        self.object
    }

    /// Check if a posted notification passes this filter
    pub fn accepts(&self, notification: &Notification) -> bool {
        self.name.is_none_or(|name| name == notification.key())
            && self
                .object
                .is_none_or(|object| notification.object() == Some(object))
    }

    /// Two filters overlap when each field is absent on either side or equal
    fn overlaps(&self, other: &NotificationFilter) -> bool {
        let names = match (self.name, other.name) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        };
        let objects = match (self.object, other.object) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        };
        names && objects
    }
}

struct ObserverInfo {
    observer: ObjectId,
    filter: NotificationFilter,
    callback: ObserverCallback,
}

impl ObserverInfo {
    fn matches(&self, observer: ObjectId, filter: &NotificationFilter) -> bool {
        self.observer == observer && self.filter.overlaps(filter)
    }
}

/// Synchronous publish/subscribe register
///
/// Callbacks run on the posting thread, in registration order. A failing
/// callback stops dispatch and its error is returned to the poster.
/// Callbacks may post, add or remove observers re-entrantly: dispatch works
/// on a snapshot of the registrations taken before the first callback runs.
pub struct NotificationCenter {
    observers: RwLock<Vec<Arc<ObserverInfo>>>,
}

impl NotificationCenter {
    /// Create an empty notification center
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
        }
    }

    /// The process-wide notification center
    ///
    /// Constructed on first use and kept for the lifetime of the process.
    pub fn shared() -> Arc<NotificationCenter> {
        static SHARED: OnceLock<Arc<NotificationCenter>> = OnceLock::new();
        SHARED
            .get_or_init(|| Arc::new(NotificationCenter::new()))
            .clone()
    }

    /// Register `callback` for `observer`
    ///
    /// Returns false, leaving the existing registration in place, if an equal
    /// registration is already present.
    pub fn add_observer<F>(&self, observer: ObjectId, filter: NotificationFilter, callback: F) -> bool
    where
        F: Fn(&Notification) -> ObserverResult + Send + Sync + 'static,
    {
        let mut observers = self.observers.write();
        if observers.iter().any(|info| info.matches(observer, &filter)) {
            tracing::debug!("Observer {} already registered for {:?}", observer, filter);
            return false;
        }

        observers.push(Arc::new(ObserverInfo {
            observer,
            filter,
            callback: Arc::new(callback),
        }));
        tracing::debug!("Observer {} added", observer);
        true
    }

    /// Remove every registration of `observer` overlapping `filter`
    ///
    /// A filter without a name removes across all names. Returns the number
    /// of registrations removed.
    pub fn remove_observer(&self, observer: ObjectId, filter: NotificationFilter) -> usize {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|info| !info.matches(observer, &filter));
        let removed = before - observers.len();
        if removed > 0 {
            tracing::debug!("Observer {} removed from {} registrations", observer, removed);
        }
        removed
    }

    /// Post a notification
    ///
    /// Returns the number of observers that were invoked.
    pub fn post<N: NotificationName>(
        &self,
        name: N,
        object: Option<ObjectId>,
        user_info: Option<Payload>,
    ) -> Result<usize, NotificationError> {
        self.post_notification(&Notification::new(name, object, user_info))
    }

    /// Post an already constructed notification
    pub fn post_notification(&self, notification: &Notification) -> Result<usize, NotificationError> {
        let targets: Vec<Arc<ObserverInfo>> = self
            .observers
            .read()
            .iter()
            .filter(|info| info.filter.accepts(notification))
            .cloned()
            .collect();

        tracing::trace!(
            "Posting {} to {} observers",
            notification.key(),
            targets.len()
        );

        for info in &targets {
            (info.callback)(notification).map_err(|cause| NotificationError::ObserverFailed {
                name: notification.key().label(),
                cause: Arc::from(cause),
            })?;
        }
        Ok(targets.len())
    }

    /// Number of registrations
    pub fn observers_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Discard every registration
    pub fn clear(&self) {
        self.observers.write().clear();
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationCenter")
            .field("observers", &self.observers_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Motor {
        WillMove,
        DidMove,
    }

    impl NotificationName for Motor {
        fn label(&self) -> &'static str {
            match self {
                Motor::WillMove => "willMove",
                Motor::DidMove => "didMove",
            }
        }
    }

    fn counter() -> (
        Arc<AtomicUsize>,
        impl Fn(&Notification) -> ObserverResult + Send + Sync + 'static,
    ) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        (count, move |_: &Notification| {
            count_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_center_creation() {
        let center = NotificationCenter::new();
        assert_eq!(center.observers_count(), 0);
    }

    #[test]
    fn test_post_reaches_named_observer_once() {
        let center = NotificationCenter::new();
        let (count, callback) = counter();

        center.add_observer(ObjectId::new(), NotificationFilter::named(Motor::DidMove), callback);

        let invoked = center.post(Motor::DidMove, None, None).expect("Should post");
        assert_eq!(invoked, 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        center.post(Motor::WillMove, None, None).expect("Should post");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicate_registration_is_ignored() {
        let center = NotificationCenter::new();
        let observer = ObjectId::new();
        let (count, callback) = counter();
        let (_, other) = counter();

        assert!(center.add_observer(observer, NotificationFilter::named(Motor::DidMove), callback));
        // An unfiltered registration overlaps the named one
        assert!(!center.add_observer(observer, NotificationFilter::any(), other));
        assert_eq!(center.observers_count(), 1);

        center.post(Motor::DidMove, None, None).expect("Should post");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_distinct_names_register_separately() {
        let center = NotificationCenter::new();
        let observer = ObjectId::new();
        let (_, a) = counter();
        let (_, b) = counter();

        assert!(center.add_observer(observer, NotificationFilter::named(Motor::DidMove), a));
        assert!(center.add_observer(observer, NotificationFilter::named(Motor::WillMove), b));
        assert_eq!(center.observers_count(), 2);
    }

    #[test]
    fn test_remove_without_name_removes_all_names() {
        let center = NotificationCenter::new();
        let observer = ObjectId::new();
        let keeper = ObjectId::new();
        let (_, a) = counter();
        let (_, b) = counter();
        let (_, c) = counter();

        center.add_observer(observer, NotificationFilter::named(Motor::DidMove), a);
        center.add_observer(observer, NotificationFilter::named(Motor::WillMove), b);
        center.add_observer(keeper, NotificationFilter::named(Motor::WillMove), c);

        assert_eq!(center.remove_observer(observer, NotificationFilter::any()), 2);
        assert_eq!(center.observers_count(), 1);
    }

    #[test]
    fn test_remove_by_name_keeps_other_names() {
        let center = NotificationCenter::new();
        let observer = ObjectId::new();
        let (did, a) = counter();
        let (will, b) = counter();

        center.add_observer(observer, NotificationFilter::named(Motor::DidMove), a);
        center.add_observer(observer, NotificationFilter::named(Motor::WillMove), b);

        assert_eq!(
            center.remove_observer(observer, NotificationFilter::named(Motor::DidMove)),
            1
        );
        center.post(Motor::DidMove, None, None).expect("Should post");
        center.post(Motor::WillMove, None, None).expect("Should post");
        assert_eq!(did.load(Ordering::SeqCst), 0);
        assert_eq!(will.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_follows_registration_order() {
        let center = NotificationCenter::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for index in 0..3 {
            let order = order.clone();
            center.add_observer(ObjectId::new(), NotificationFilter::any(), move |_| {
                order.lock().push(index);
                Ok(())
            });
        }

        center.post(Motor::DidMove, None, None).expect("Should post");
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_failing_observer_stops_dispatch() {
        let center = NotificationCenter::new();
        let (count, callback) = counter();

        center.add_observer(ObjectId::new(), NotificationFilter::any(), |_| {
            Err("observer refused".into())
        });
        center.add_observer(ObjectId::new(), NotificationFilter::any(), callback);

        let err = center
            .post(Motor::DidMove, None, None)
            .expect_err("failure should reach the poster");
        assert!(err.to_string().contains("observer refused"));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reentrant_post_from_callback() {
        let center = Arc::new(NotificationCenter::new());
        let (count, callback) = counter();

        center.add_observer(ObjectId::new(), NotificationFilter::named(Motor::DidMove), callback);

        let inner = center.clone();
        center.add_observer(
            ObjectId::new(),
            NotificationFilter::named(Motor::WillMove),
            move |_| {
                inner.post(Motor::DidMove, None, None)?;
                Ok(())
            },
        );

        center.post(Motor::WillMove, None, None).expect("Should post");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear() {
        let center = NotificationCenter::new();
        let (_, callback) = counter();
        center.add_observer(ObjectId::new(), NotificationFilter::any(), callback);

        center.clear();
        assert_eq!(center.observers_count(), 0);
    }
}
