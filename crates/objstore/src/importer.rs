//! Database row backend of the field-visitor protocol.
//!
//! Rows may arrive in any order, so a foreign key can point at an owner
//! that has not been imported yet. The importer handles that with the
//! registry's staging area: a child seen before its owner parks its id
//! under the owner's container field, and the owner collects the parked
//! ids the moment its own container field is visited.

use crate::object::ObjectId;
use crate::store::ObjectStore;
use crate::visitor::{FieldReader, LinkContainer, LinkSlot};
use objstore_core::{Error, PrototypeError, PrototypeErrorKind, Result, RowCursor, SchemaError};
use std::rc::Rc;

/// One row-import pass over a store.
///
/// Staged relation data left behind by rows whose owner never arrived is
/// discarded when the session ends.
pub struct ImportSession<'a> {
    store: &'a mut ObjectStore,
}

impl<'a> ImportSession<'a> {
    pub fn new(store: &'a mut ObjectStore) -> Self {
        Self { store }
    }

    /// Materialize one database row as an object of `type_name` and
    /// insert it into the store.
    ///
    /// The row's leading column must be the object's own `id`; the
    /// remaining columns are matched name by name against the type's field
    /// enumeration, and any divergence is a schema mismatch.
    #[tracing::instrument(level = "debug", skip(self, row))]
    pub fn import_row<C: RowCursor>(&mut self, type_name: &str, row: &C) -> Result<ObjectId> {
        let node = self.store.find_prototype(type_name).ok_or_else(|| {
            Error::Prototype(PrototypeError {
                kind: PrototypeErrorKind::NotFound,
                type_name: type_name.to_string(),
            })
        })?;
        let mut object = node.create();

        match row.column_name(0) {
            Some("id") => {}
            other => {
                return Err(Error::Schema(SchemaError {
                    expected: "id".to_string(),
                    found: other.unwrap_or("<end of row>").to_string(),
                    position: 0,
                    type_name: type_name.to_string(),
                }));
            }
        }
        let object_id = row.column_int(0)?;

        {
            let mut reader = RowImporter {
                store: self.store,
                cursor: row,
                type_name,
                object_id,
                column: 0,
            };
            object.read_fields(&mut reader)?;
        }

        let proxy = self.store.insert_boxed(object)?;
        let id = proxy.borrow().id();
        Ok(id)
    }

    /// End the session, discarding any undelivered staged relation data.
    pub fn finish(self) {}
}

impl Drop for ImportSession<'_> {
    fn drop(&mut self) {
        self.store.clear_staging();
    }
}

/// Read-side visitor walking row columns in field order.
struct RowImporter<'a, C: RowCursor> {
    store: &'a mut ObjectStore,
    cursor: &'a C,
    type_name: &'a str,
    object_id: ObjectId,
    column: usize,
}

impl<C: RowCursor> RowImporter<'_, C> {
    /// Claim the next column, checking its name against the visited field.
    fn expect(&mut self, field: &str) -> Result<usize> {
        let position = self.column;
        let found = self.cursor.column_name(position);
        if found != Some(field) {
            return Err(Error::Schema(SchemaError {
                expected: field.to_string(),
                found: found.unwrap_or("<end of row>").to_string(),
                position,
                type_name: self.type_name.to_string(),
            }));
        }
        self.column += 1;
        Ok(position)
    }
}

impl<C: RowCursor> FieldReader for RowImporter<'_, C> {
    fn read_bool(&mut self, field: &str, value: &mut bool) -> Result<()> {
        let pos = self.expect(field)?;
        *value = self.cursor.column_int(pos)? != 0;
        Ok(())
    }

    fn read_char(&mut self, field: &str, value: &mut char) -> Result<()> {
        let pos = self.expect(field)?;
        let raw = self.cursor.column_int(pos)? as u32;
        *value = char::from_u32(raw).ok_or_else(|| {
            Error::Type(objstore_core::TypeError {
                expected: "unicode scalar value",
                actual: format!("{raw:#x}"),
                field: Some(field.to_string()),
            })
        })?;
        Ok(())
    }

    fn read_i8(&mut self, field: &str, value: &mut i8) -> Result<()> {
        let pos = self.expect(field)?;
        *value = self.cursor.column_int(pos)? as i8;
        Ok(())
    }

    fn read_i16(&mut self, field: &str, value: &mut i16) -> Result<()> {
        let pos = self.expect(field)?;
        *value = self.cursor.column_int(pos)? as i16;
        Ok(())
    }

    fn read_i32(&mut self, field: &str, value: &mut i32) -> Result<()> {
        let pos = self.expect(field)?;
        *value = self.cursor.column_int(pos)? as i32;
        Ok(())
    }

    fn read_i64(&mut self, field: &str, value: &mut i64) -> Result<()> {
        let pos = self.expect(field)?;
        *value = self.cursor.column_int(pos)?;
        Ok(())
    }

    fn read_u8(&mut self, field: &str, value: &mut u8) -> Result<()> {
        let pos = self.expect(field)?;
        *value = self.cursor.column_int(pos)? as u8;
        Ok(())
    }

    fn read_u16(&mut self, field: &str, value: &mut u16) -> Result<()> {
        let pos = self.expect(field)?;
        *value = self.cursor.column_int(pos)? as u16;
        Ok(())
    }

    fn read_u32(&mut self, field: &str, value: &mut u32) -> Result<()> {
        let pos = self.expect(field)?;
        *value = self.cursor.column_int(pos)? as u32;
        Ok(())
    }

    fn read_u64(&mut self, field: &str, value: &mut u64) -> Result<()> {
        let pos = self.expect(field)?;
        *value = self.cursor.column_int(pos)? as u64;
        Ok(())
    }

    fn read_f32(&mut self, field: &str, value: &mut f32) -> Result<()> {
        let pos = self.expect(field)?;
        *value = self.cursor.column_double(pos)? as f32;
        Ok(())
    }

    fn read_f64(&mut self, field: &str, value: &mut f64) -> Result<()> {
        let pos = self.expect(field)?;
        *value = self.cursor.column_double(pos)?;
        Ok(())
    }

    fn read_string(&mut self, field: &str, value: &mut String) -> Result<()> {
        let pos = self.expect(field)?;
        *value = self.cursor.column_text(pos)?.to_string();
        Ok(())
    }

    /// A foreign-key column. A key of 0 is a null reference and leaves the
    /// handle untouched; otherwise the target identity is reserved with a
    /// stub and, when the referenced type owns this one through a
    /// container, the importing object's id is staged for that owner.
    fn read_object(&mut self, field: &str, link: &mut dyn LinkSlot) -> Result<()> {
        let pos = self.expect(field)?;
        let fk = self.cursor.column_int(pos)?;
        if fk == 0 {
            return Ok(());
        }

        let referenced = link.type_name();
        if self.store.find_prototype(referenced).is_none() {
            return Err(Error::unknown_type(referenced, Some(field)));
        }

        let proxy = self.store.create_proxy(fk);
        if let Some(edge) = self.store.relation_edge(self.type_name, referenced) {
            tracing::debug!(
                child = self.type_name,
                child_id = self.object_id,
                owner = %edge.owner_type,
                owner_id = fk,
                field = %edge.field,
                "staging child for unloaded owner"
            );
            self.store
                .stage_child(&edge.owner_type, &edge.field, fk, self.object_id);
        }
        link.bind(fk, Some(Rc::downgrade(&proxy)));
        Ok(())
    }

    /// Container fields occupy no column; their content is whatever was
    /// staged for this owner, collected exactly once.
    fn read_list(&mut self, field: &str, items: &mut dyn LinkContainer) -> Result<()> {
        self.read_container(field, items)
    }

    fn read_vector(&mut self, field: &str, items: &mut dyn LinkContainer) -> Result<()> {
        self.read_container(field, items)
    }

    fn read_container(&mut self, field: &str, items: &mut dyn LinkContainer) -> Result<()> {
        let element_type = items.element_type();
        if self.store.find_prototype(element_type).is_none() {
            return Err(Error::unknown_type(element_type, Some(field)));
        }

        let staged = self
            .store
            .drain_staged(self.type_name, field, self.object_id);
        items.clear();
        for child_id in staged {
            let proxy = self.store.create_proxy(child_id);
            items.append(child_id, Some(Rc::downgrade(&proxy)));
        }
        Ok(())
    }
}
