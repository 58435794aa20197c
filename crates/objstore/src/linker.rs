//! Targeted link repair through the field-visitor protocol.
//!
//! Rebinding a single reference field does not need a special code path on
//! the object: the linker is just another read backend that ignores every
//! field except the one it was aimed at. Out-parameter reads make that
//! safe, since untouched fields keep their current values.

use crate::object::{Object, ObjectId};
use crate::proxy::{ProxyRef, WeakProxyRef};
use crate::visitor::{FieldReader, LinkContainer, LinkSlot};
use objstore_core::Result;
use std::rc::Rc;

/// Bind `object`'s reference field named `field` to `parent`.
///
/// Returns `true` when the field was found, matched the parent's type and
/// got bound. A stub parent has no type to match against, so linking to
/// one always fails.
pub fn link(object: &mut dyn Object, field: &str, parent: &ProxyRef) -> bool {
    let (parent_id, parent_type) = {
        let borrow = parent.borrow();
        match borrow.object() {
            Some(target) => (borrow.id(), target.type_name().to_string()),
            None => return false,
        }
    };

    let mut linker = FieldLinker {
        field,
        parent_id,
        parent_type,
        parent: Rc::downgrade(parent),
        linked: false,
    };
    // read backends leave unvisited state alone, so a failed pass is a no-op
    if object.read_fields(&mut linker).is_err() {
        return false;
    }
    if linker.linked {
        tracing::trace!(
            field,
            parent_id,
            child = object.type_name(),
            "reference field linked"
        );
    }
    linker.linked
}

struct FieldLinker<'a> {
    field: &'a str,
    parent_id: ObjectId,
    parent_type: String,
    parent: WeakProxyRef,
    linked: bool,
}

impl FieldReader for FieldLinker<'_> {
    fn read_bool(&mut self, _field: &str, _value: &mut bool) -> Result<()> {
        Ok(())
    }

    fn read_char(&mut self, _field: &str, _value: &mut char) -> Result<()> {
        Ok(())
    }

    fn read_i8(&mut self, _field: &str, _value: &mut i8) -> Result<()> {
        Ok(())
    }

    fn read_i16(&mut self, _field: &str, _value: &mut i16) -> Result<()> {
        Ok(())
    }

    fn read_i32(&mut self, _field: &str, _value: &mut i32) -> Result<()> {
        Ok(())
    }

    fn read_i64(&mut self, _field: &str, _value: &mut i64) -> Result<()> {
        Ok(())
    }

    fn read_u8(&mut self, _field: &str, _value: &mut u8) -> Result<()> {
        Ok(())
    }

    fn read_u16(&mut self, _field: &str, _value: &mut u16) -> Result<()> {
        Ok(())
    }

    fn read_u32(&mut self, _field: &str, _value: &mut u32) -> Result<()> {
        Ok(())
    }

    fn read_u64(&mut self, _field: &str, _value: &mut u64) -> Result<()> {
        Ok(())
    }

    fn read_f32(&mut self, _field: &str, _value: &mut f32) -> Result<()> {
        Ok(())
    }

    fn read_f64(&mut self, _field: &str, _value: &mut f64) -> Result<()> {
        Ok(())
    }

    fn read_string(&mut self, _field: &str, _value: &mut String) -> Result<()> {
        Ok(())
    }

    fn read_object(&mut self, field: &str, link: &mut dyn LinkSlot) -> Result<()> {
        if field == self.field && link.type_name() == self.parent_type {
            link.bind(self.parent_id, Some(self.parent.clone()));
            self.linked = true;
        }
        Ok(())
    }

    fn read_list(&mut self, _field: &str, _items: &mut dyn LinkContainer) -> Result<()> {
        Ok(())
    }

    fn read_vector(&mut self, _field: &str, _items: &mut dyn LinkContainer) -> Result<()> {
        Ok(())
    }

    fn read_container(&mut self, _field: &str, _items: &mut dyn LinkContainer) -> Result<()> {
        Ok(())
    }
}
