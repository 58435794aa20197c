//! An embeddable object-relational persistence core.
//!
//! The store keeps an identity map of object proxies over a prototype type
//! tree. Persistent types describe themselves to visitor backends instead
//! of relying on reflection; the same field enumeration drives binary
//! serialization, database row import and single-field link repair.
//!
//! ```
//! use objstore::{Object, ObjectCore, ObjectStore, ObjectType};
//! use objstore::{FieldReader, FieldWriter};
//! use objstore::Result;
//! use std::any::Any;
//!
//! #[derive(Debug, Default)]
//! struct Artist {
//!     core: ObjectCore,
//!     name: String,
//! }
//!
//! impl Object for Artist {
//!     fn type_name(&self) -> &str {
//!         Self::TYPE
//!     }
//!     fn core(&self) -> &ObjectCore {
//!         &self.core
//!     }
//!     fn core_mut(&mut self) -> &mut ObjectCore {
//!         &mut self.core
//!     }
//!     fn write_fields(&self, writer: &mut dyn FieldWriter) -> Result<()> {
//!         self.core.write(writer)?;
//!         writer.write_string("name", &self.name)
//!     }
//!     fn read_fields(&mut self, reader: &mut dyn FieldReader) -> Result<()> {
//!         self.core.read(reader)?;
//!         reader.read_string("name", &mut self.name)
//!     }
//!     fn as_any(&self) -> &dyn Any {
//!         self
//!     }
//!     fn as_any_mut(&mut self) -> &mut dyn Any {
//!         self
//!     }
//! }
//!
//! impl ObjectType for Artist {
//!     const TYPE: &'static str = "Artist";
//! }
//!
//! # fn main() -> Result<()> {
//! let mut store = ObjectStore::new();
//! store.attach::<Artist>(None)?;
//! let handle = store.insert(Artist {
//!     name: "Alice".to_string(),
//!     ..Artist::default()
//! })?;
//! assert_eq!(handle.with(|a| a.name.clone()), Some("Alice".to_string()));
//! # Ok(())
//! # }
//! ```

pub mod handle;
pub mod importer;
pub mod linker;
pub mod object;
pub mod prototype;
pub mod proxy;
pub mod serializer;
pub mod store;
pub mod visitor;

#[cfg(test)]
pub(crate) mod testutil;

pub use handle::{ObjectList, ObjectRef, ObjectVector};
pub use importer::ImportSession;
pub use linker::link;
pub use object::{Object, ObjectCore, ObjectId, ObjectType};
pub use prototype::{ObjectFactory, PrototypeNode, PrototypeRegistry, RelationEdge};
pub use proxy::{ObjectProxy, ProxyRef, WeakProxyRef};
pub use serializer::{deserialize, serialize};
pub use store::{ObjectStore, StoreKey};
pub use visitor::{FieldReader, FieldWriter, Link, LinkContainer, LinkSequence, LinkSlot};

pub use objstore_core::{
    BufferError, ByteBuffer, ColumnInfo, Error, FromValue, PrototypeError, PrototypeErrorKind,
    Result, Row, RowCursor, SchemaError, StoreError, StoreErrorKind, TypeError, Value,
};
