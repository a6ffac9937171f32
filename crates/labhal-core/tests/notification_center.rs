//! Tests for notification::NotificationCenter

use labhal_core::{
    NotificationCenter, NotificationFilter, NotificationName, ObjectId, Payload,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shutter {
    DidOpen,
    DidClose,
}

impl NotificationName for Shutter {
    fn label(&self) -> &'static str {
        match self {
            Shutter::DidOpen => "didOpen",
            Shutter::DidClose => "didClose",
        }
    }
}

#[test]
fn test_subscribe_then_post_invokes_once() {
    let center = NotificationCenter::new();
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();

    center.add_observer(
        ObjectId::new(),
        NotificationFilter::named(Shutter::DidOpen),
        move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
    );

    center.post(Shutter::DidOpen, None, None).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unsubscribe_before_post_invokes_zero_times() {
    let center = NotificationCenter::new();
    let observer = ObjectId::new();
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();

    center.add_observer(observer, NotificationFilter::named(Shutter::DidOpen), move |_| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    center.remove_observer(observer, NotificationFilter::named(Shutter::DidOpen));

    assert_eq!(center.post(Shutter::DidOpen, None, None).unwrap(), 0);
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_object_filter_rejects_other_sources() {
    let center = NotificationCenter::new();
    let shutter_x = ObjectId::new();
    let shutter_y = ObjectId::new();
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();

    center.add_observer(
        ObjectId::new(),
        NotificationFilter::named(Shutter::DidClose).from_object(shutter_x),
        move |notification| {
            assert_eq!(notification.object(), Some(shutter_x));
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
    );

    center.post(Shutter::DidClose, Some(shutter_y), None).unwrap();
    center.post(Shutter::DidClose, None, None).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);

    center.post(Shutter::DidClose, Some(shutter_x), None).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_payload_reaches_observer() {
    let center = NotificationCenter::new();
    let seen = Arc::new(parking_lot::Mutex::new(None));
    let s = seen.clone();

    center.add_observer(ObjectId::new(), NotificationFilter::any(), move |notification| {
        *s.lock() = notification.user_info_as::<String>().cloned();
        Ok(())
    });

    let payload: Payload = Arc::new("exposure 20 ms".to_string());
    center.post(Shutter::DidOpen, None, Some(payload)).unwrap();
    assert_eq!(seen.lock().as_deref(), Some("exposure 20 ms"));
}

#[test]
fn test_concurrent_registration_and_posting() {
    let center = Arc::new(NotificationCenter::new());
    let count = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let center = center.clone();
            let count = count.clone();
            thread::spawn(move || {
                let c = count.clone();
                center.add_observer(
                    ObjectId::new(),
                    NotificationFilter::named(Shutter::DidOpen),
                    move |_| {
                        c.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    },
                );
                for _ in 0..10 {
                    center.post(Shutter::DidClose, None, None).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(center.observers_count(), 8);
    assert_eq!(center.post(Shutter::DidOpen, None, None).unwrap(), 8);
    assert_eq!(count.load(Ordering::SeqCst), 8);
}

#[test]
fn test_shared_center_is_one_instance() {
    let a = NotificationCenter::shared();
    let b = NotificationCenter::shared();
    assert!(Arc::ptr_eq(&a, &b));

    let observer = ObjectId::new();
    a.add_observer(observer, NotificationFilter::named(Shutter::DidOpen), |_| Ok(()));
    assert!(b.observers_count() >= 1);

    b.remove_observer(observer, NotificationFilter::any());
}
