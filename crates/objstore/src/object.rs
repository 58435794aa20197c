//! The persistent object contract.

use crate::proxy::{ProxyRef, WeakProxyRef};
use crate::store::StoreKey;
use crate::visitor::{FieldReader, FieldWriter};
use objstore_core::Result;
use std::any::Any;

/// Identity of a persistent object. `0` is reserved to mean
/// "unassigned/transient": an object carries it until it is inserted into a
/// store, and a reference handle carries it while unset.
pub type ObjectId = i64;

/// Identity state embedded by every persistent type: the object's id and a
/// back-reference to its owning proxy.
///
/// The fields are private; id and proxy are assigned only by the object
/// store, which proves its authority with the [`StoreKey`] capability, and
/// by the sanctioned [`read`](Self::read) path during deserialization. The
/// `write`/`read` pair puts the `id` field first on every wire, which both
/// backends rely on.
#[derive(Debug, Default)]
pub struct ObjectCore {
    id: ObjectId,
    proxy: Option<WeakProxyRef>,
}

impl ObjectCore {
    /// A transient core: id 0, no proxy.
    pub fn new() -> Self {
        Self::default()
    }

    /// A core carrying a chosen id, still unbound to any store. Used when
    /// reconstructing an object whose identity is already known.
    pub fn with_id(id: ObjectId) -> Self {
        Self { id, proxy: None }
    }

    /// The object's id; 0 until inserted.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// The owning proxy, if the object is inserted and the proxy is still
    /// alive in its store.
    pub fn proxy(&self) -> Option<ProxyRef> {
        self.proxy.as_ref()?.upgrade()
    }

    /// Is this object a member of a store?
    pub fn is_inserted(&self) -> bool {
        self.proxy().is_some()
    }

    /// Assign identity. Store-only.
    pub fn bind(&mut self, id: ObjectId, proxy: WeakProxyRef, _key: &StoreKey) {
        self.id = id;
        self.proxy = Some(proxy);
    }

    /// Drop the proxy back-reference on removal. Store-only. The id is
    /// kept so the removed object still names the identity it had.
    pub fn unbind(&mut self, _key: &StoreKey) {
        self.proxy = None;
    }

    /// Emit the identity fields; called first by every `write_fields`.
    pub fn write(&self, writer: &mut dyn FieldWriter) -> Result<()> {
        writer.write_i64("id", self.id)
    }

    /// Accept the identity fields; called first by every `read_fields`.
    pub fn read(&mut self, reader: &mut dyn FieldReader) -> Result<()> {
        reader.read_i64("id", &mut self.id)
    }
}

/// The contract every persistent type implements.
///
/// A type describes itself by enumerating its fields, in a fixed declared
/// order, against an abstract visitor: once for writing and once for
/// reading. The type itself is the schema; there is no runtime reflection
/// and no field tags on the binary wire, so the enumeration order *is* the
/// wire contract.
pub trait Object: Any {
    /// The type's registered name.
    fn type_name(&self) -> &str;

    /// The embedded identity state.
    fn core(&self) -> &ObjectCore;

    /// Mutable identity state. Mutating id/proxy still requires the store
    /// capability, so handing this out is safe.
    fn core_mut(&mut self) -> &mut ObjectCore;

    /// Enumerate all fields for writing, identity first.
    fn write_fields(&self, writer: &mut dyn FieldWriter) -> Result<()>;

    /// Enumerate all fields for reading, identity first, in exactly the
    /// order `write_fields` uses.
    fn read_fields(&mut self, reader: &mut dyn FieldReader) -> Result<()>;

    /// Upcast for concrete-type recovery.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for concrete-type recovery.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// The object's id; 0 until inserted.
    fn id(&self) -> ObjectId {
        self.core().id()
    }
}

impl std::fmt::Debug for dyn Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("type_name", &self.type_name())
            .field("id", &self.id())
            .finish()
    }
}

/// A concrete persistent type: nameable at compile time and constructible
/// blank, so prototype factories and typed handles can exist for it.
pub trait ObjectType: Object + Default + Sized + 'static {
    /// The unique type name under which this type registers.
    const TYPE: &'static str;
}
