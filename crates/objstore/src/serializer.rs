//! Binary buffer backend of the field-visitor protocol.
//!
//! The wire carries no field tags and no type headers for primitives; the
//! visiting type's field order is the format. All integers are
//! little-endian. Relations are written by reference only, as id plus the
//! referenced type name, never by recursing into the referenced object.

use crate::object::{Object, ObjectId};
use crate::store::ObjectStore;
use crate::visitor::{FieldReader, FieldWriter, LinkContainer, LinkSequence, LinkSlot};
use objstore_core::{ByteBuffer, Error, Result, TypeError};
use std::rc::Rc;

/// Serialize one object's fields onto `buffer`.
pub fn serialize(object: &dyn Object, buffer: &mut ByteBuffer) -> Result<()> {
    let mut writer = BinaryWriter { buffer };
    object.write_fields(&mut writer)
}

/// Deserialize one object's fields from `buffer`.
///
/// Referenced ids are resolved against `store`: each becomes a proxy,
/// created as a stub when the target is not loaded yet. The object itself
/// is not inserted; its id field is restored from the wire and the caller
/// decides what to do with it.
pub fn deserialize(
    object: &mut dyn Object,
    buffer: &mut ByteBuffer,
    store: &mut ObjectStore,
) -> Result<()> {
    let mut reader = BinaryReader { buffer, store };
    object.read_fields(&mut reader)
}

struct BinaryWriter<'a> {
    buffer: &'a mut ByteBuffer,
}

impl BinaryWriter<'_> {
    fn put_str(&mut self, value: &str) {
        self.buffer.append(&(value.len() as u64).to_le_bytes());
        self.buffer.append(value.as_bytes());
    }

    fn put_link(&mut self, id: ObjectId, type_name: &str) {
        self.buffer.append(&id.to_le_bytes());
        self.put_str(type_name);
    }
}

impl FieldWriter for BinaryWriter<'_> {
    fn write_bool(&mut self, _field: &str, value: bool) -> Result<()> {
        self.buffer.append(&[u8::from(value)]);
        Ok(())
    }

    fn write_char(&mut self, _field: &str, value: char) -> Result<()> {
        self.buffer.append(&u32::from(value).to_le_bytes());
        Ok(())
    }

    fn write_i8(&mut self, _field: &str, value: i8) -> Result<()> {
        self.buffer.append(&value.to_le_bytes());
        Ok(())
    }

    fn write_i16(&mut self, _field: &str, value: i16) -> Result<()> {
        self.buffer.append(&value.to_le_bytes());
        Ok(())
    }

    fn write_i32(&mut self, _field: &str, value: i32) -> Result<()> {
        self.buffer.append(&value.to_le_bytes());
        Ok(())
    }

    fn write_i64(&mut self, _field: &str, value: i64) -> Result<()> {
        self.buffer.append(&value.to_le_bytes());
        Ok(())
    }

    fn write_u8(&mut self, _field: &str, value: u8) -> Result<()> {
        self.buffer.append(&value.to_le_bytes());
        Ok(())
    }

    fn write_u16(&mut self, _field: &str, value: u16) -> Result<()> {
        self.buffer.append(&value.to_le_bytes());
        Ok(())
    }

    fn write_u32(&mut self, _field: &str, value: u32) -> Result<()> {
        self.buffer.append(&value.to_le_bytes());
        Ok(())
    }

    fn write_u64(&mut self, _field: &str, value: u64) -> Result<()> {
        self.buffer.append(&value.to_le_bytes());
        Ok(())
    }

    fn write_f32(&mut self, _field: &str, value: f32) -> Result<()> {
        self.buffer.append(&value.to_le_bytes());
        Ok(())
    }

    fn write_f64(&mut self, _field: &str, value: f64) -> Result<()> {
        self.buffer.append(&value.to_le_bytes());
        Ok(())
    }

    fn write_string(&mut self, _field: &str, value: &str) -> Result<()> {
        self.put_str(value);
        Ok(())
    }

    fn write_object(&mut self, _field: &str, link: &dyn LinkSlot) -> Result<()> {
        let entry = link.wire_link();
        self.put_link(entry.id, &entry.type_name);
        Ok(())
    }

    fn write_list(&mut self, field: &str, items: &dyn LinkSequence) -> Result<()> {
        self.write_container(field, items)
    }

    fn write_vector(&mut self, _field: &str, items: &dyn LinkSequence) -> Result<()> {
        self.buffer.append(&(items.len() as u32).to_le_bytes());
        for (index, link) in items.links().enumerate() {
            self.buffer.append(&link.id.to_le_bytes());
            self.buffer.append(&(index as u32).to_le_bytes());
            self.put_str(&link.type_name);
        }
        Ok(())
    }

    fn write_container(&mut self, _field: &str, items: &dyn LinkSequence) -> Result<()> {
        self.buffer.append(&(items.len() as u32).to_le_bytes());
        for link in items.links() {
            self.put_link(link.id, &link.type_name);
        }
        Ok(())
    }
}

struct BinaryReader<'a> {
    buffer: &'a mut ByteBuffer,
    store: &'a mut ObjectStore,
}

impl BinaryReader<'_> {
    fn take_str(&mut self, field: &str) -> Result<String> {
        let len = u64::from_le_bytes(self.buffer.release_array::<8>()?);
        let bytes = self.buffer.release_vec(len as usize)?;
        String::from_utf8(bytes).map_err(|_| {
            Error::Type(TypeError {
                expected: "utf-8 text",
                actual: "invalid byte sequence".to_string(),
                field: Some(field.to_string()),
            })
        })
    }

    /// Read one (id, type name) link entry and validate the type.
    fn take_link(&mut self, field: &str) -> Result<(ObjectId, String)> {
        let id = ObjectId::from_le_bytes(self.buffer.release_array::<8>()?);
        let type_name = self.take_str(field)?;
        if self.store.find_prototype(&type_name).is_none() {
            return Err(Error::unknown_type(type_name, Some(field)));
        }
        Ok((id, type_name))
    }

    fn take_container(
        &mut self,
        field: &str,
        items: &mut dyn LinkContainer,
        indexed: bool,
    ) -> Result<()> {
        let count = u32::from_le_bytes(self.buffer.release_array::<4>()?);
        items.clear();
        for _ in 0..count {
            let id = ObjectId::from_le_bytes(self.buffer.release_array::<8>()?);
            if indexed {
                // position on the wire; container order already encodes it
                let _index = u32::from_le_bytes(self.buffer.release_array::<4>()?);
            }
            let type_name = self.take_str(field)?;
            if self.store.find_prototype(&type_name).is_none() {
                return Err(Error::unknown_type(type_name, Some(field)));
            }
            if id == 0 {
                items.append(0, None);
            } else {
                let proxy = self.store.create_proxy(id);
                items.append(id, Some(Rc::downgrade(&proxy)));
            }
        }
        Ok(())
    }
}

impl FieldReader for BinaryReader<'_> {
    fn read_bool(&mut self, _field: &str, value: &mut bool) -> Result<()> {
        let [byte] = self.buffer.release_array::<1>()?;
        *value = byte != 0;
        Ok(())
    }

    fn read_char(&mut self, field: &str, value: &mut char) -> Result<()> {
        let raw = u32::from_le_bytes(self.buffer.release_array::<4>()?);
        *value = char::from_u32(raw).ok_or_else(|| {
            Error::Type(TypeError {
                expected: "unicode scalar value",
                actual: format!("{raw:#x}"),
                field: Some(field.to_string()),
            })
        })?;
        Ok(())
    }

    fn read_i8(&mut self, _field: &str, value: &mut i8) -> Result<()> {
        *value = i8::from_le_bytes(self.buffer.release_array::<1>()?);
        Ok(())
    }

    fn read_i16(&mut self, _field: &str, value: &mut i16) -> Result<()> {
        *value = i16::from_le_bytes(self.buffer.release_array::<2>()?);
        Ok(())
    }

    fn read_i32(&mut self, _field: &str, value: &mut i32) -> Result<()> {
        *value = i32::from_le_bytes(self.buffer.release_array::<4>()?);
        Ok(())
    }

    fn read_i64(&mut self, _field: &str, value: &mut i64) -> Result<()> {
        *value = i64::from_le_bytes(self.buffer.release_array::<8>()?);
        Ok(())
    }

    fn read_u8(&mut self, _field: &str, value: &mut u8) -> Result<()> {
        *value = u8::from_le_bytes(self.buffer.release_array::<1>()?);
        Ok(())
    }

    fn read_u16(&mut self, _field: &str, value: &mut u16) -> Result<()> {
        *value = u16::from_le_bytes(self.buffer.release_array::<2>()?);
        Ok(())
    }

    fn read_u32(&mut self, _field: &str, value: &mut u32) -> Result<()> {
        *value = u32::from_le_bytes(self.buffer.release_array::<4>()?);
        Ok(())
    }

    fn read_u64(&mut self, _field: &str, value: &mut u64) -> Result<()> {
        *value = u64::from_le_bytes(self.buffer.release_array::<8>()?);
        Ok(())
    }

    fn read_f32(&mut self, _field: &str, value: &mut f32) -> Result<()> {
        *value = f32::from_le_bytes(self.buffer.release_array::<4>()?);
        Ok(())
    }

    fn read_f64(&mut self, _field: &str, value: &mut f64) -> Result<()> {
        *value = f64::from_le_bytes(self.buffer.release_array::<8>()?);
        Ok(())
    }

    fn read_string(&mut self, field: &str, value: &mut String) -> Result<()> {
        *value = self.take_str(field)?;
        Ok(())
    }

    fn read_object(&mut self, field: &str, link: &mut dyn LinkSlot) -> Result<()> {
        let (id, _type_name) = self.take_link(field)?;
        if id == 0 {
            link.bind(0, None);
        } else {
            let proxy = self.store.create_proxy(id);
            link.bind(id, Some(Rc::downgrade(&proxy)));
        }
        Ok(())
    }

    fn read_list(&mut self, field: &str, items: &mut dyn LinkContainer) -> Result<()> {
        self.take_container(field, items, false)
    }

    fn read_vector(&mut self, field: &str, items: &mut dyn LinkContainer) -> Result<()> {
        self.take_container(field, items, true)
    }

    fn read_container(&mut self, field: &str, items: &mut dyn LinkContainer) -> Result<()> {
        self.take_container(field, items, false)
    }
}
