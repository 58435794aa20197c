//! Error types for objstore operations.

use std::fmt;

/// The primary error type for all objstore operations.
///
/// Every failure here is an immediate, local, hard failure that aborts the
/// current object's (de)serialization. Nothing is silently skipped: a
/// partially filled object would corrupt the identity map or leave staged
/// relations orphaned.
#[derive(Debug)]
pub enum Error {
    /// Prototype registry mutation errors
    Prototype(PrototypeError),
    /// Object store mutation errors
    Store(StoreError),
    /// Row column name does not match the expected field during import
    Schema(SchemaError),
    /// Type resolution or value conversion errors
    Type(TypeError),
    /// Binary buffer read past end
    Buffer(BufferError),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct PrototypeError {
    pub kind: PrototypeErrorKind,
    pub type_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrototypeErrorKind {
    /// A node with this type name is already registered
    DuplicateType,
    /// The named parent node is not registered
    UnknownParent,
    /// The node still has child nodes and cannot be detached
    HasChildren,
    /// No node with this type name is registered
    NotFound,
}

#[derive(Debug)]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub id: i64,
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// A live proxy already exists for this id
    IdentityConflict,
    /// No live proxy exists for this id
    NotFound,
}

/// Column drift detected during a row import.
///
/// The row importer validates the column name at the current cursor
/// position against the expected field before every read; the binary
/// backend carries no names on the wire and cannot raise this.
#[derive(Debug)]
pub struct SchemaError {
    /// Field name the object declared at this position
    pub expected: String,
    /// Column name actually found at this position
    pub found: String,
    /// Zero-based cursor position
    pub position: usize,
    /// Type being imported when the drift was detected
    pub type_name: String,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub field: Option<String>,
}

#[derive(Debug)]
pub struct BufferError {
    /// Bytes the read needed
    pub requested: usize,
    /// Bytes left in the buffer
    pub available: usize,
}

impl Error {
    /// Shorthand for an unknown-type failure: a type name read from a
    /// relation tuple has no registered prototype.
    pub fn unknown_type(actual: impl Into<String>, field: Option<&str>) -> Self {
        Error::Type(TypeError {
            expected: "registered prototype",
            actual: actual.into(),
            field: field.map(str::to_string),
        })
    }

    /// Is this a schema drift failure from the row importer?
    pub fn is_schema_drift(&self) -> bool {
        matches!(self, Error::Schema(_))
    }

    /// Is this an identity conflict from the object store?
    pub fn is_identity_conflict(&self) -> bool {
        matches!(
            self,
            Error::Store(StoreError {
                kind: StoreErrorKind::IdentityConflict,
                ..
            })
        )
    }

    /// Is this a buffer underrun from the binary backend?
    pub fn is_underrun(&self) -> bool {
        matches!(self, Error::Buffer(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Prototype(e) => write!(f, "Prototype error: {}", e),
            Error::Store(e) => write!(f, "Store error: {}", e),
            Error::Schema(e) => write!(f, "Schema mismatch: {}", e),
            Error::Type(e) => write!(f, "Type error: {}", e),
            Error::Buffer(e) => write!(f, "Buffer underrun: {}", e),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl fmt::Display for PrototypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PrototypeErrorKind::DuplicateType => {
                write!(f, "type '{}' is already registered", self.type_name)
            }
            PrototypeErrorKind::UnknownParent => {
                write!(f, "parent type '{}' is not registered", self.type_name)
            }
            PrototypeErrorKind::HasChildren => {
                write!(f, "type '{}' still has child types", self.type_name)
            }
            PrototypeErrorKind::NotFound => {
                write!(f, "type '{}' is not registered", self.type_name)
            }
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            StoreErrorKind::IdentityConflict => "a live object already exists for id",
            StoreErrorKind::NotFound => "no object found for id",
        };
        if let Some(ty) = &self.type_name {
            write!(f, "{} {} (type '{}')", kind, self.id, ty)
        } else {
            write!(f, "{} {}", kind, self.id)
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "importing '{}': expected field '{}' at column {}, found '{}'",
            self.type_name, self.expected, self.position, self.found
        )
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(field) = &self.field {
            write!(
                f,
                "expected {} for field '{}', found {}",
                self.expected, field, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "requested {} bytes with {} available",
            self.requested, self.available
        )
    }
}

impl From<PrototypeError> for Error {
    fn from(err: PrototypeError) -> Self {
        Error::Prototype(err)
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::Store(err)
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Error::Schema(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<BufferError> for Error {
    fn from(err: BufferError) -> Self {
        Error::Buffer(err)
    }
}

/// Result type alias for objstore operations.
pub type Result<T> = std::result::Result<T, Error>;
