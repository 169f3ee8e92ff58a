//! Core mapping engine for dbmap.
//!
//! `dbmap-core` maps rows of a query result onto plain Rust structs. It is
//! the engine behind the `dbmap` facade.
//!
//! # Architecture
//!
//! - **Descriptors**: [`Record`] exposes a struct's fields, their column
//!   annotations and erased accessors. `#[derive(Record)]` in `dbmap-macros`
//!   generates it.
//! - **Converters**: a [`Converter`] handles one family of field types. The
//!   [`Registry`] is an ordered list of converters where the most recently
//!   registered acceptor wins.
//! - **Schema**: [`Schema::build`] walks a record once, resolving every field
//!   to a column and a converter. The result is immutable and reused for
//!   every row.
//! - **Scanning**: [`Schema::scan_row`] binds one row, [`Schema::scan_one`],
//!   [`Schema::scan_all`], [`Schema::scan_iter`] and [`Schema::scan_stream`]
//!   drive a whole [`Rows`] cursor and always close it.
//!
//! Drivers implement [`Row`] and [`Rows`]. [`MemoryRows`] is an in-memory
//! cursor for tests.

pub mod convert;
pub mod cursor;
pub mod error;
pub mod naming;
pub mod options;
pub mod record;
pub mod schema;
pub mod stream;
pub mod types;
pub mod value;

mod probe;
mod scan;

#[cfg(test)]
mod testing;

pub use convert::{
    Converter, Decode, DecodeConverter, Encode, JsonConverter, JsonMap, JsonObject, JsonSlot,
    RawSlot, Registry, Scalar, ScalarConverter, ScalarSlot, global_registry, receiver_mut, register_converter,
};
pub use cursor::{MemoryRow, MemoryRows, Placeholder, Row, Rows, ScanTarget};
pub use error::{BoxError, CursorError, DecodeError, Error, Result, ScanError};
pub use naming::default_column_name;
pub use options::{Options, UnknownColumns};
pub use record::{
    Capabilities, ColumnTag, FieldAccess, FieldAccessMut, FieldDescriptor, FieldType, Record,
    RecordDescriptor, RecordKind,
};
pub use schema::{Mapping, Schema, build_schema};
pub use stream::{RowIter, RowStream};
pub use types::Json;
pub use value::Value;

/// Support items for code generated by `#[derive(Record)]`. Not public API.
#[doc(hidden)]
pub mod __private {
    pub use crate::probe::{
        DecodeFallback, DecodeImpl, EncodeFallback, EncodeImpl, JsonFallback, JsonImpl, Probe,
        field_type,
    };
}
