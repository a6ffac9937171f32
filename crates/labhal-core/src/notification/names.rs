//! Notification type definitions.
//!
//! Notification names are never free-form strings: each domain declares a
//! closed enum and implements [`NotificationName`] for it.

use std::any::{Any, TypeId};
use std::sync::Arc;
use uuid::Uuid;

/// Opaque payload attached to a notification
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Identity of an observer or of a notifying object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(Uuid);

impl ObjectId {
    /// Create a new unique object identity
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Obj({})", &self.0.to_string()[..8])
    }
}

/// A closed set of notification names for one domain
///
/// ```rust,ignore
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// enum StageNotification { WillMove, DidMove }
///
/// impl NotificationName for StageNotification {
///     fn label(&self) -> &'static str {
///         match self {
///             Self::WillMove => "willMove",
///             Self::DidMove => "didMove",
///         }
///     }
/// }
/// ```
pub trait NotificationName: Copy + Eq + std::fmt::Debug + Send + Sync + 'static {
    /// Stable label for logging
    fn label(&self) -> &'static str;
}

/// Type-erased notification name used as a registration filter
///
/// Two names are equal only if they come from the same enum and carry the
/// same label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameKey {
    domain: TypeId,
    label: &'static str,
}

impl NameKey {
    /// Key for a concrete notification name
    pub fn of<N: NotificationName>(name: N) -> Self {
        Self {
            domain: TypeId::of::<N>(),
            label: name.label(),
        }
    }

    /// Label of the name this key was built from
    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl std::fmt::Display for NameKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// A posted notification
///
/// Immutable once constructed; cloning shares the name and payload.
#[derive(Clone)]
pub struct Notification {
    key: NameKey,
    name: Arc<dyn Any + Send + Sync>,
    object: Option<ObjectId>,
    user_info: Option<Payload>,
}

impl Notification {
    /// Create a notification
    pub fn new<N: NotificationName>(
        name: N,
        object: Option<ObjectId>,
        user_info: Option<Payload>,
    ) -> Self {
        Self {
            key: NameKey::of(name),
            name: Arc::new(name),
            object,
            user_info,
        }
    }

    /// Type-erased key of the notification name
    pub fn key(&self) -> NameKey {
        self.key
    }

    /// The notification name, if it belongs to the domain `N`
    pub fn name<N: NotificationName>(&self) -> Option<N> {
        self.name.downcast_ref::<N>().copied()
    }

    /// Check the notification name
    pub fn is<N: NotificationName>(&self, name: N) -> bool {
        self.key == NameKey::of(name)
    }

    /// The notifying object
    pub fn object(&self) -> Option<ObjectId> {
        self.object
    }

    /// The raw payload
    pub fn user_info(&self) -> Option<&Payload> {
        self.user_info.as_ref()
    }

    /// The payload, if present and of type `T`
    pub fn user_info_as<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.user_info.as_ref()?.downcast_ref::<T>()
    }
}

impl std::fmt::Debug for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notification")
            .field("name", &self.key.label)
            .field("object", &self.object)
            .field("has_user_info", &self.user_info.is_some())
            .finish()
    }
}
