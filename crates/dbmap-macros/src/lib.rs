//! Procedural macros for dbmap.
//!
//! Use the `dbmap` facade, which re-exports [`macro@Record`]. The generated
//! code refers to `dbmap_core`, so it must be a dependency of the deriving
//! crate.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod record_derive;

/// Derive the `Record` descriptor for a struct with named fields.
///
/// # Field attributes
///
/// - `#[dbmap(column = "name")]`: map the field to an explicit column.
/// - `#[dbmap(skip)]`: leave the field out of the schema.
/// - `#[dbmap(flatten)]`: surface the fields of an embedded `Record` into
///   this one. Ignored when `column` is also given; the field is then mapped
///   as a single column.
///
/// Fields without attributes get a column name inferred from the field name.
///
/// Tuple structs and enums derive a descriptor that schema construction
/// rejects. Generic types and unions are compile errors.
///
/// # Example
///
/// ```ignore
/// #[derive(Record, Default)]
/// struct Hero {
///     #[dbmap(column = "hero_id")]
///     id: i64,
///     name: String,
///     #[dbmap(flatten)]
///     audit: Audit,
///     #[dbmap(skip)]
///     cache: Vec<String>,
/// }
/// ```
#[proc_macro_derive(Record, attributes(dbmap))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match record_derive::parse_record(&input) {
        Ok(def) => record_derive::generate_record_impl(&def).into(),
        Err(e) => e.to_compile_error().into(),
    }
}
