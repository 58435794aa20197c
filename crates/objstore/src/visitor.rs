//! The field-visitor protocol implemented by every serialization backend.
//!
//! Double-dispatch substitute for reflection: a persistent type enumerates
//! its own fields in declared order against a [`FieldWriter`] or
//! [`FieldReader`], and the backend decides what each visit means: bytes
//! on a buffer, a database column, or a single link repair. Reads take
//! out-parameters so a backend may legitimately leave a field untouched;
//! the linker backend depends on that.

use crate::object::ObjectId;
use crate::proxy::WeakProxyRef;
use objstore_core::Result;

/// One relation entry as it appears on a wire: an id plus the concrete
/// type name of the referenced object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub id: ObjectId,
    pub type_name: String,
}

/// Type-erased view of a single-object reference field.
///
/// Writers use `id`/`type_name`; readers `bind` the handle to a proxy
/// obtained from the active store.
pub trait LinkSlot {
    /// The cached id; 0 when unset.
    fn id(&self) -> ObjectId;

    /// The declared target type of the field.
    fn type_name(&self) -> &'static str;

    /// Point the handle at a proxy (`None` clears it back to unset).
    fn bind(&mut self, id: ObjectId, proxy: Option<WeakProxyRef>);

    /// The wire entry for this reference. Implementations that can reach
    /// the referenced object substitute its concrete type name.
    fn wire_link(&self) -> Link {
        Link {
            id: self.id(),
            type_name: self.type_name().to_string(),
        }
    }
}

/// Lazy, restartable enumeration of a relation container for writing.
/// Every call to [`links`](Self::links) starts a fresh pass.
pub trait LinkSequence {
    /// Number of contained references.
    fn len(&self) -> usize;

    /// Check if the container is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The declared element type of the container.
    fn element_type(&self) -> &'static str;

    /// Iterate the contained references in container order.
    fn links(&self) -> Box<dyn Iterator<Item = Link> + '_>;
}

/// Mutable view of a relation container for reading: cleared, then
/// appended to in arrival order.
pub trait LinkContainer {
    /// The declared element type of the container.
    fn element_type(&self) -> &'static str;

    /// Drop all contained references.
    fn clear(&mut self);

    /// Append a reference bound to `proxy`.
    fn append(&mut self, id: ObjectId, proxy: Option<WeakProxyRef>);
}

/// The write half of the protocol: one operation per field kind.
pub trait FieldWriter {
    fn write_bool(&mut self, field: &str, value: bool) -> Result<()>;
    fn write_char(&mut self, field: &str, value: char) -> Result<()>;
    fn write_i8(&mut self, field: &str, value: i8) -> Result<()>;
    fn write_i16(&mut self, field: &str, value: i16) -> Result<()>;
    fn write_i32(&mut self, field: &str, value: i32) -> Result<()>;
    fn write_i64(&mut self, field: &str, value: i64) -> Result<()>;
    fn write_u8(&mut self, field: &str, value: u8) -> Result<()>;
    fn write_u16(&mut self, field: &str, value: u16) -> Result<()>;
    fn write_u32(&mut self, field: &str, value: u32) -> Result<()>;
    fn write_u64(&mut self, field: &str, value: u64) -> Result<()>;
    fn write_f32(&mut self, field: &str, value: f32) -> Result<()>;
    fn write_f64(&mut self, field: &str, value: f64) -> Result<()>;
    fn write_string(&mut self, field: &str, value: &str) -> Result<()>;

    /// A single object reference, written by reference (id + type), never
    /// by recursing into the referenced object.
    fn write_object(&mut self, field: &str, link: &dyn LinkSlot) -> Result<()>;

    /// An ordered relation container.
    fn write_list(&mut self, field: &str, items: &dyn LinkSequence) -> Result<()>;

    /// An indexed relation container.
    fn write_vector(&mut self, field: &str, items: &dyn LinkSequence) -> Result<()>;

    /// A generic relation container.
    fn write_container(&mut self, field: &str, items: &dyn LinkSequence) -> Result<()>;
}

/// The read half of the protocol, mirroring [`FieldWriter`] operation for
/// operation. Field order must match the write order exactly.
pub trait FieldReader {
    fn read_bool(&mut self, field: &str, value: &mut bool) -> Result<()>;
    fn read_char(&mut self, field: &str, value: &mut char) -> Result<()>;
    fn read_i8(&mut self, field: &str, value: &mut i8) -> Result<()>;
    fn read_i16(&mut self, field: &str, value: &mut i16) -> Result<()>;
    fn read_i32(&mut self, field: &str, value: &mut i32) -> Result<()>;
    fn read_i64(&mut self, field: &str, value: &mut i64) -> Result<()>;
    fn read_u8(&mut self, field: &str, value: &mut u8) -> Result<()>;
    fn read_u16(&mut self, field: &str, value: &mut u16) -> Result<()>;
    fn read_u32(&mut self, field: &str, value: &mut u32) -> Result<()>;
    fn read_u64(&mut self, field: &str, value: &mut u64) -> Result<()>;
    fn read_f32(&mut self, field: &str, value: &mut f32) -> Result<()>;
    fn read_f64(&mut self, field: &str, value: &mut f64) -> Result<()>;
    fn read_string(&mut self, field: &str, value: &mut String) -> Result<()>;

    /// Resolve a single object reference against the active store.
    fn read_object(&mut self, field: &str, link: &mut dyn LinkSlot) -> Result<()>;

    /// Rebuild an ordered relation container.
    fn read_list(&mut self, field: &str, items: &mut dyn LinkContainer) -> Result<()>;

    /// Rebuild an indexed relation container.
    fn read_vector(&mut self, field: &str, items: &mut dyn LinkContainer) -> Result<()>;

    /// Rebuild a generic relation container.
    fn read_container(&mut self, field: &str, items: &mut dyn LinkContainer) -> Result<()>;
}
