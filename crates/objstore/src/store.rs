//! The object store: identity map plus type registry.

use crate::object::{Object, ObjectId, ObjectType};
use crate::handle::ObjectRef;
use crate::prototype::{ObjectFactory, PrototypeNode, PrototypeRegistry, RelationEdge};
use crate::proxy::{ObjectProxy, ProxyRef};
use objstore_core::{Error, Result, StoreError, StoreErrorKind};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Capability token proving store authority over object identity.
///
/// Only the store can construct one, so only the store (and code it calls
/// while holding the token) can bind or unbind an [`crate::object::ObjectCore`].
pub struct StoreKey {
    _priv: (),
}

impl StoreKey {
    fn new() -> Self {
        Self { _priv: () }
    }
}

/// Identity-mapped object store.
///
/// Owns at most one proxy per id. Inserting an object for an id whose stub
/// proxy already exists populates that proxy in place, so handles created
/// before the insert see the object afterwards.
#[derive(Default)]
pub struct ObjectStore {
    registry: PrototypeRegistry,
    proxies: HashMap<ObjectId, ProxyRef>,
    next_id: ObjectId,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self {
            registry: PrototypeRegistry::new(),
            proxies: HashMap::new(),
            next_id: 1,
        }
    }

    /// Attach `T` to the type registry.
    pub fn attach<T: ObjectType>(&mut self, parent: Option<&str>) -> Result<&PrototypeNode> {
        self.registry.attach::<T>(parent)
    }

    /// Attach a type by name with an explicit factory.
    pub fn attach_with(
        &mut self,
        type_name: &str,
        parent: Option<&str>,
        factory: ObjectFactory,
    ) -> Result<&PrototypeNode> {
        self.registry.attach_with(type_name, parent, factory)
    }

    /// Detach a leaf type from the registry.
    pub fn detach(&mut self, type_name: &str) -> Result<()> {
        self.registry.detach(type_name)
    }

    /// Look up a prototype node by type name.
    pub fn find_prototype(&self, type_name: &str) -> Option<&PrototypeNode> {
        self.registry.find(type_name)
    }

    /// The type registry.
    pub fn prototypes(&self) -> &PrototypeRegistry {
        &self.registry
    }

    /// Insert an object, assigning an id when it carries none, and return
    /// a typed handle to it.
    pub fn insert<T: ObjectType>(&mut self, object: T) -> Result<ObjectRef<T>> {
        let proxy = self.insert_boxed(Box::new(object))?;
        Ok(ObjectRef::bound(proxy.borrow().id(), Rc::downgrade(&proxy)))
    }

    /// Type-erased insert, shared with the row importer.
    pub(crate) fn insert_boxed(&mut self, mut object: Box<dyn Object>) -> Result<ProxyRef> {
        let type_name = object.type_name().to_string();
        if self.registry.find(&type_name).is_none() {
            return Err(Error::unknown_type(&type_name, None));
        }

        let requested = object.id();
        let id = if requested == 0 {
            self.allocate_id()
        } else {
            if let Some(existing) = self.proxies.get(&requested) {
                if !existing.borrow().is_stub() {
                    return Err(Error::Store(StoreError {
                        kind: StoreErrorKind::IdentityConflict,
                        id: requested,
                        type_name: Some(type_name),
                    }));
                }
            }
            self.bump_past(requested);
            requested
        };

        let proxy = self
            .proxies
            .entry(id)
            .or_insert_with(|| Rc::new(RefCell::new(ObjectProxy::stub(id))))
            .clone();

        object
            .core_mut()
            .bind(id, Rc::downgrade(&proxy), &StoreKey::new());
        proxy.borrow_mut().set_object(object);

        tracing::debug!(id, type_name = %type_name, "object inserted");
        Ok(proxy)
    }

    /// Remove the object with `id`, dropping its proxy from the identity
    /// map and returning ownership of the object to the caller.
    ///
    /// A stub proxy holds no object, so removing it is `NotFound` too.
    pub fn remove(&mut self, id: ObjectId) -> Result<Box<dyn Object>> {
        let not_found = || {
            Error::Store(StoreError {
                kind: StoreErrorKind::NotFound,
                id,
                type_name: None,
            })
        };

        let is_stub = self
            .proxies
            .get(&id)
            .ok_or_else(not_found)?
            .borrow()
            .is_stub();
        if is_stub {
            return Err(not_found());
        }

        let proxy = self.proxies.remove(&id).ok_or_else(not_found)?;
        let mut object = proxy
            .borrow_mut()
            .take_object()
            .ok_or_else(not_found)?;
        object.core_mut().unbind(&StoreKey::new());

        tracing::debug!(id, type_name = object.type_name(), "object removed");
        Ok(object)
    }

    /// Look up the proxy for `id`, stub or live.
    pub fn find_proxy(&self, id: ObjectId) -> Option<ProxyRef> {
        self.proxies.get(&id).cloned()
    }

    /// Get or create the proxy for `id`, reserving the identity with a
    /// stub when no object for it has been seen yet. Idempotent.
    pub fn create_proxy(&mut self, id: ObjectId) -> ProxyRef {
        debug_assert!(id > 0, "proxy ids start at 1");
        self.bump_past(id);
        self.proxies
            .entry(id)
            .or_insert_with(|| Rc::new(RefCell::new(ObjectProxy::stub(id))))
            .clone()
    }

    /// Typed lookup: a handle for `id`, whatever its load state.
    pub fn find<T: ObjectType>(&self, id: ObjectId) -> Option<ObjectRef<T>> {
        let proxy = self.find_proxy(id)?;
        Some(ObjectRef::bound(id, Rc::downgrade(&proxy)))
    }

    /// Number of identities (stubs included) in the map.
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Discard all staged relation data in the registry.
    pub fn clear_staging(&mut self) {
        self.registry.clear_staging();
    }

    pub(crate) fn relation_edge(
        &self,
        child_type: &str,
        referenced_type: &str,
    ) -> Option<RelationEdge> {
        self.registry
            .find(child_type)
            .and_then(|node| node.relation(referenced_type))
            .cloned()
    }

    pub(crate) fn stage_child(
        &mut self,
        owner_type: &str,
        field: &str,
        owner_id: ObjectId,
        child_id: ObjectId,
    ) {
        self.registry.stage_child(owner_type, field, owner_id, child_id);
    }

    pub(crate) fn drain_staged(
        &mut self,
        owner_type: &str,
        field: &str,
        owner_id: ObjectId,
    ) -> Vec<ObjectId> {
        self.registry.drain_staged(owner_type, field, owner_id)
    }

    fn allocate_id(&mut self) -> ObjectId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Keep the allocator ahead of every id observed explicitly.
    fn bump_past(&mut self, id: ObjectId) {
        if id >= self.next_id {
            self.next_id = id + 1;
        }
    }
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("objects", &self.proxies.len())
            .field("next_id", &self.next_id)
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Album, Artist, Track};
    use objstore_core::Error;

    fn store_with_models() -> ObjectStore {
        let mut store = ObjectStore::new();
        store.attach::<Artist>(None).unwrap();
        store.attach::<Album>(None).unwrap();
        store.attach::<Track>(None).unwrap();
        store
    }

    #[test]
    fn insert_assigns_sequential_ids() {
        let mut store = store_with_models();
        let a = store.insert(Artist::named("Dolphy")).unwrap();
        let b = store.insert(Artist::named("Shepp")).unwrap();
        assert_eq!(a.id(), 1);
        assert_eq!(b.id(), 2);
        assert!(a.is_loaded());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn insert_unregistered_type_rejected() {
        let mut store = ObjectStore::new();
        let err = store.insert(Artist::named("Sun Ra")).unwrap_err();
        assert!(matches!(err, Error::Type(_)));
    }

    #[test]
    fn explicit_id_conflicts_with_live_object() {
        let mut store = store_with_models();
        let mut artist = Artist::named("Taylor");
        artist.set_test_id(7);
        store.insert(artist).unwrap();

        let mut clash = Artist::named("Other");
        clash.set_test_id(7);
        let err = store.insert(clash).unwrap_err();
        match err {
            Error::Store(s) => {
                assert_eq!(s.kind, StoreErrorKind::IdentityConflict);
                assert_eq!(s.id, 7);
            }
            other => panic!("unexpected error: {other}"),
        }

        // allocator moved past the explicit id
        let next = store.insert(Artist::named("Braxton")).unwrap();
        assert_eq!(next.id(), 8);
    }

    #[test]
    fn stub_promotion_keeps_handle_valid() {
        let mut store = store_with_models();
        let stub = store.create_proxy(5);
        assert!(stub.borrow().is_stub());
        let handle = store.find::<Artist>(5).unwrap();
        assert!(!handle.is_loaded());

        let mut artist = Artist::named("Cherry");
        artist.set_test_id(5);
        store.insert(artist).unwrap();

        // same proxy, now populated; the pre-insert handle observes it
        assert!(Rc::ptr_eq(&stub, &store.find_proxy(5).unwrap()));
        assert!(handle.is_loaded());
        assert_eq!(handle.with(|a| a.name.clone()), Some("Cherry".to_string()));
    }

    #[test]
    fn create_proxy_is_idempotent() {
        let mut store = store_with_models();
        let a = store.create_proxy(3);
        let b = store.create_proxy(3);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_returns_ownership_and_invalidates_handles() {
        let mut store = store_with_models();
        let handle = store.insert(Artist::named("Blakey")).unwrap();
        let id = handle.id();

        let object = store.remove(id).unwrap();
        assert_eq!(object.type_name(), "Artist");
        assert_eq!(object.id(), id);
        assert!(!object.core().is_inserted());

        assert!(store.find_proxy(id).is_none());
        assert!(!handle.is_loaded());
        assert!(handle.with(|_| ()).is_none());
    }

    #[test]
    fn remove_absent_or_stub_is_not_found() {
        let mut store = store_with_models();
        let err = store.remove(42).unwrap_err();
        assert!(matches!(
            err,
            Error::Store(StoreError {
                kind: StoreErrorKind::NotFound,
                ..
            })
        ));

        store.create_proxy(42);
        let err = store.remove(42).unwrap_err();
        assert!(matches!(
            err,
            Error::Store(StoreError {
                kind: StoreErrorKind::NotFound,
                ..
            })
        ));
        // the stub identity is still reserved
        assert!(store.find_proxy(42).is_some());
    }
}
