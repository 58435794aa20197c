//! Per-instance identity wrapper.

use crate::object::{Object, ObjectId};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Shared handle to a proxy. Proxies are owned exclusively by the object
/// store's identity map; everything else holds [`WeakProxyRef`]s.
pub type ProxyRef = Rc<RefCell<ObjectProxy>>;

/// Non-owning handle to a proxy, held by reference handles and object
/// back-pointers. Upgrading fails once the store has dropped the proxy.
pub type WeakProxyRef = Weak<RefCell<ObjectProxy>>;

/// Wraps exactly one persistent instance, or none yet.
///
/// A proxy with an empty object slot is a *stub*: it reserves an identity
/// for an id whose target has not been loaded. A stub is later populated in
/// place (never replaced) when the real object for that id is inserted, so
/// every handle obtained before the insert observes the populated object
/// afterwards.
pub struct ObjectProxy {
    id: ObjectId,
    object: Option<Box<dyn Object>>,
}

impl ObjectProxy {
    /// Create a stub proxy reserving `id`.
    pub(crate) fn stub(id: ObjectId) -> Self {
        Self { id, object: None }
    }

    /// The identity this proxy represents.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Does this proxy still await its backing object?
    pub fn is_stub(&self) -> bool {
        self.object.is_none()
    }

    /// Borrow the backing object, if loaded.
    pub fn object(&self) -> Option<&dyn Object> {
        self.object.as_deref()
    }

    /// Mutably borrow the backing object, if loaded.
    pub fn object_mut(&mut self) -> Option<&mut dyn Object> {
        self.object.as_deref_mut()
    }

    /// Populate the object slot in place.
    pub(crate) fn set_object(&mut self, object: Box<dyn Object>) {
        self.object = Some(object);
    }

    /// Take the backing object out, leaving a stub.
    pub(crate) fn take_object(&mut self) -> Option<Box<dyn Object>> {
        self.object.take()
    }
}

impl fmt::Debug for ObjectProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectProxy")
            .field("id", &self.id)
            .field(
                "object",
                &self.object.as_deref().map(Object::type_name),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Artist;

    #[test]
    fn stub_lifecycle() {
        let mut proxy = ObjectProxy::stub(7);
        assert_eq!(proxy.id(), 7);
        assert!(proxy.is_stub());
        assert!(proxy.object().is_none());

        proxy.set_object(Box::new(Artist::named("Coltrane")));
        assert!(!proxy.is_stub());
        assert_eq!(proxy.object().map(|o| o.type_name()), Some("Artist"));

        let taken = proxy.take_object();
        assert!(taken.is_some());
        assert!(proxy.is_stub());
    }
}
