//! Map database query rows onto plain Rust structs.
//!
//! `dbmap` builds a reusable [`Schema`] from a struct's declared fields once,
//! then uses it to scan rows from any cursor implementing [`Rows`] without
//! re-deriving anything per row.
//!
//! ```ignore
//! use dbmap::prelude::*;
//!
//! #[derive(Record, Default)]
//! struct Hero {
//!     #[dbmap(column = "hero_id")]
//!     id: i64,
//!     name: String,
//!     #[dbmap(flatten)]
//!     audit: Audit,
//! }
//!
//! let schema = Schema::<Hero>::build()?;
//! let heroes = schema.scan_all(rows)?;
//! ```
//!
//! # Converters
//!
//! Every mapped field is handled by the first [`Converter`] in the
//! [`Registry`] that accepts its type. The standard registry tries a field's
//! own [`Decode`] impl, then the built-in scalar types, then JSON objects.
//! [`register_converter`] adds a converter ahead of all others; do this during
//! start-up, before schemas are built.
//!
//! # Cursors
//!
//! [`Schema::scan_one`], [`Schema::scan_all`], [`Schema::scan_iter`] and
//! [`Schema::scan_stream`] take ownership of the cursor and close it exactly
//! once, on success and on every error path.

pub use dbmap_core::*;
pub use dbmap_macros::Record;

/// Commonly used items.
pub mod prelude {
    pub use dbmap_core::{
        Converter, Decode, Encode, Error, Json, JsonMap, JsonObject, Mapping, MemoryRow,
        MemoryRows, Options, Record, Registry, Result, Row, RowStream, Rows, Schema,
        UnknownColumns, Value,
    };
    pub use dbmap_macros::Record;
}
