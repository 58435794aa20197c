//! Leaf types for the objstore persistence core.
//!
//! This crate provides the foundational pieces with no dependency on the
//! object graph machinery:
//!
//! - `Error` taxonomy and the crate-wide `Result` alias
//! - `Value` for dynamically-typed column values
//! - `Row`/`ColumnInfo` and the `RowCursor` seam to the database layer
//! - `ByteBuffer`, the append/release cursor under the binary backend

pub mod buffer;
pub mod error;
pub mod row;
pub mod value;

pub use buffer::ByteBuffer;
pub use error::{
    BufferError, Error, PrototypeError, PrototypeErrorKind, Result, SchemaError, StoreError,
    StoreErrorKind, TypeError,
};
pub use row::{ColumnInfo, FromValue, Row, RowCursor};
pub use value::Value;
