//! Shared model types for unit tests.

use crate::handle::{ObjectList, ObjectRef, ObjectVector};
use crate::object::{Object, ObjectCore, ObjectId, ObjectType};
use crate::visitor::{FieldReader, FieldWriter};
use objstore_core::{Result, Row, Value};
use std::any::Any;

#[derive(Debug, Default)]
pub struct Artist {
    core: ObjectCore,
    pub name: String,
    pub albums: ObjectList<Album>,
}

impl Artist {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn set_test_id(&mut self, id: ObjectId) {
        self.core = ObjectCore::with_id(id);
    }
}

impl Object for Artist {
    fn type_name(&self) -> &str {
        Self::TYPE
    }

    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn write_fields(&self, writer: &mut dyn FieldWriter) -> Result<()> {
        self.core.write(writer)?;
        writer.write_string("name", &self.name)?;
        writer.write_list("albums", &self.albums)
    }

    fn read_fields(&mut self, reader: &mut dyn FieldReader) -> Result<()> {
        self.core.read(reader)?;
        reader.read_string("name", &mut self.name)?;
        reader.read_list("albums", &mut self.albums)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ObjectType for Artist {
    const TYPE: &'static str = "Artist";
}

#[derive(Debug, Default)]
pub struct Album {
    core: ObjectCore,
    pub name: String,
    pub year: i32,
    pub artist: ObjectRef<Artist>,
    pub tracks: ObjectVector<Track>,
}

impl Album {
    pub fn titled(name: &str, year: i32) -> Self {
        Self {
            name: name.to_string(),
            year,
            ..Self::default()
        }
    }
}

impl Object for Album {
    fn type_name(&self) -> &str {
        Self::TYPE
    }

    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn write_fields(&self, writer: &mut dyn FieldWriter) -> Result<()> {
        self.core.write(writer)?;
        writer.write_string("name", &self.name)?;
        writer.write_i32("year", self.year)?;
        writer.write_object("artist", &self.artist)?;
        writer.write_vector("tracks", &self.tracks)
    }

    fn read_fields(&mut self, reader: &mut dyn FieldReader) -> Result<()> {
        self.core.read(reader)?;
        reader.read_string("name", &mut self.name)?;
        reader.read_i32("year", &mut self.year)?;
        reader.read_object("artist", &mut self.artist)?;
        reader.read_vector("tracks", &mut self.tracks)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ObjectType for Album {
    const TYPE: &'static str = "Album";
}

#[derive(Debug, Default)]
pub struct Track {
    core: ObjectCore,
    pub title: String,
    pub duration: i32,
    pub album: ObjectRef<Album>,
}

impl Object for Track {
    fn type_name(&self) -> &str {
        Self::TYPE
    }

    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn write_fields(&self, writer: &mut dyn FieldWriter) -> Result<()> {
        self.core.write(writer)?;
        writer.write_string("title", &self.title)?;
        writer.write_i32("duration", self.duration)?;
        writer.write_object("album", &self.album)
    }

    fn read_fields(&mut self, reader: &mut dyn FieldReader) -> Result<()> {
        self.core.read(reader)?;
        reader.read_string("title", &mut self.title)?;
        reader.read_i32("duration", &mut self.duration)?;
        reader.read_object("album", &mut self.album)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ObjectType for Track {
    const TYPE: &'static str = "Track";
}

/// A track row in the shape the importer expects: leading id column, then
/// field columns in enumeration order.
pub fn track_row(id: i64, title: &str, duration: i64, album: i64) -> Row {
    Row::new(
        vec![
            "id".to_string(),
            "title".to_string(),
            "duration".to_string(),
            "album".to_string(),
        ],
        vec![
            Value::Int(id),
            Value::Text(title.to_string()),
            Value::Int(duration),
            Value::Int(album),
        ],
    )
}
