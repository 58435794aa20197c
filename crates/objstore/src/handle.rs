//! Typed reference handles and relation containers.
//!
//! A handle is a weak, identity-based view onto a proxy: an id plus a
//! cached proxy pointer. It never owns the proxy or the object (ownership
//! belongs to the object store) and it never extends an object's
//! lifetime. Dereferencing a handle whose proxy is a stub (or gone) yields
//! an explicit "not loaded" outcome, never an invalid access.

use crate::object::{ObjectId, ObjectType};
use crate::proxy::{ProxyRef, WeakProxyRef};
use crate::visitor::{Link, LinkContainer, LinkSequence, LinkSlot};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// A typed, copyable reference to a persistent object.
///
/// Compared by id; `Default` is the unset reference (id 0).
pub struct ObjectRef<T: ObjectType> {
    id: ObjectId,
    proxy: Option<WeakProxyRef>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: ObjectType> ObjectRef<T> {
    /// An unset reference.
    pub fn new() -> Self {
        Self {
            id: 0,
            proxy: None,
            _marker: PhantomData,
        }
    }

    /// A reference bound to an existing proxy.
    pub fn from_proxy(proxy: &ProxyRef) -> Self {
        Self {
            id: proxy.borrow().id(),
            proxy: Some(Rc::downgrade(proxy)),
            _marker: PhantomData,
        }
    }

    pub(crate) fn bound(id: ObjectId, proxy: WeakProxyRef) -> Self {
        Self {
            id,
            proxy: Some(proxy),
            _marker: PhantomData,
        }
    }

    /// The cached id; 0 when unset.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Does this reference name an identity at all?
    pub fn is_set(&self) -> bool {
        self.id != 0
    }

    /// The proxy this handle points at, if it is still owned by a store.
    pub fn proxy(&self) -> Option<ProxyRef> {
        self.proxy.as_ref()?.upgrade()
    }

    /// Is the referenced object actually loaded (not a stub, not removed)?
    pub fn is_loaded(&self) -> bool {
        self.proxy()
            .is_some_and(|p| p.borrow().object().is_some())
    }

    /// Read through the proxy to the concrete object.
    ///
    /// Returns `None` for unset references, stubs, removed objects, and
    /// type mismatches.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let proxy = self.proxy()?;
        let borrow = proxy.borrow();
        let object = borrow.object()?;
        let concrete = object.as_any().downcast_ref::<T>()?;
        Some(f(concrete))
    }

    /// Mutable read-through; same resolution rules as [`with`](Self::with).
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let proxy = self.proxy()?;
        let mut borrow = proxy.borrow_mut();
        let object = borrow.object_mut()?;
        let concrete = object.as_any_mut().downcast_mut::<T>()?;
        Some(f(concrete))
    }

    /// The wire entry for this reference: id plus the concrete type name
    /// of the referenced object (falling back to the declared type for
    /// stubs and unset references).
    pub fn link(&self) -> Link {
        let type_name = self
            .proxy()
            .and_then(|p| p.borrow().object().map(|o| o.type_name().to_string()))
            .unwrap_or_else(|| T::TYPE.to_string());
        Link {
            id: self.id,
            type_name,
        }
    }
}

impl<T: ObjectType> Default for ObjectRef<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ObjectType> Clone for ObjectRef<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            proxy: self.proxy.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: ObjectType> PartialEq for ObjectRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T: ObjectType> Eq for ObjectRef<T> {}

impl<T: ObjectType> fmt::Debug for ObjectRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("type", &T::TYPE)
            .field("id", &self.id)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl<T: ObjectType> LinkSlot for ObjectRef<T> {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn type_name(&self) -> &'static str {
        T::TYPE
    }

    fn bind(&mut self, id: ObjectId, proxy: Option<WeakProxyRef>) {
        self.id = id;
        self.proxy = proxy;
    }

    fn wire_link(&self) -> Link {
        ObjectRef::link(self)
    }
}

/// An ordered relation container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectList<T: ObjectType> {
    items: Vec<ObjectRef<T>>,
}

impl<T: ObjectType> ObjectList<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, item: ObjectRef<T>) {
        self.items.push(item);
    }

    pub fn get(&self, index: usize) -> Option<&ObjectRef<T>> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ObjectRef<T>> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: ObjectType> Default for ObjectList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T: ObjectType> IntoIterator for &'a ObjectList<T> {
    type Item = &'a ObjectRef<T>;
    type IntoIter = std::slice::Iter<'a, ObjectRef<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: ObjectType> LinkSequence for ObjectList<T> {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn element_type(&self) -> &'static str {
        T::TYPE
    }

    fn links(&self) -> Box<dyn Iterator<Item = Link> + '_> {
        Box::new(self.items.iter().map(ObjectRef::link))
    }
}

impl<T: ObjectType> LinkContainer for ObjectList<T> {
    fn element_type(&self) -> &'static str {
        T::TYPE
    }

    fn clear(&mut self) {
        self.items.clear();
    }

    fn append(&mut self, id: ObjectId, proxy: Option<WeakProxyRef>) {
        let mut item = ObjectRef::new();
        item.bind(id, proxy);
        self.items.push(item);
    }
}

/// An indexed relation container: each element additionally carries its
/// position on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectVector<T: ObjectType> {
    items: Vec<ObjectRef<T>>,
}

impl<T: ObjectType> ObjectVector<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, item: ObjectRef<T>) {
        self.items.push(item);
    }

    pub fn get(&self, index: usize) -> Option<&ObjectRef<T>> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ObjectRef<T>> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: ObjectType> Default for ObjectVector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T: ObjectType> IntoIterator for &'a ObjectVector<T> {
    type Item = &'a ObjectRef<T>;
    type IntoIter = std::slice::Iter<'a, ObjectRef<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: ObjectType> LinkSequence for ObjectVector<T> {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn element_type(&self) -> &'static str {
        T::TYPE
    }

    fn links(&self) -> Box<dyn Iterator<Item = Link> + '_> {
        Box::new(self.items.iter().map(ObjectRef::link))
    }
}

impl<T: ObjectType> LinkContainer for ObjectVector<T> {
    fn element_type(&self) -> &'static str {
        T::TYPE
    }

    fn clear(&mut self) {
        self.items.clear();
    }

    fn append(&mut self, id: ObjectId, proxy: Option<WeakProxyRef>) {
        let mut item = ObjectRef::new();
        item.bind(id, proxy);
        self.items.push(item);
    }
}
