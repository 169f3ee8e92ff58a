//! Schema construction.
//!
//! A [`Mapping`] is built once per record type by walking its
//! [`RecordDescriptor`]: every mapped field gets a column name, a converter and
//! a chain of accessors leading from the root record to the sub-record that
//! owns it. [`Schema`] is the typed handle most callers use.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::convert::{Converter, Registry, global_registry};
use crate::cursor::{Row, Rows};
use crate::error::{Error, Result};
use crate::naming::default_column_name;
use crate::options::Options;
use crate::record::{ColumnTag, FieldAccess, FieldAccessMut, FieldType, Record, RecordDescriptor};
use crate::stream::{RowIter, RowStream};
use crate::value::Value;

/// One mapped column of a schema.
pub(crate) struct MappedField {
    pub(crate) column: String,
    /// Dotted path of field names from the root record, e.g. `inner.secret`.
    pub(crate) path: String,
    pub(crate) ty: FieldType,
    pub(crate) converter: Arc<dyn Converter>,
    get: Vec<FieldAccess>,
    get_mut: Vec<FieldAccessMut>,
}

impl MappedField {
    /// Follow the accessor chain from the root record to this field.
    pub(crate) fn resolve_mut<'a>(&self, root: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        let mut current = root;
        for step in &self.get_mut {
            current = step(current)?;
        }
        Some(current)
    }

    pub(crate) fn resolve<'a>(&self, root: &'a dyn Any) -> Option<&'a dyn Any> {
        let mut current = root;
        for step in &self.get {
            current = step(current)?;
        }
        Some(current)
    }
}

impl fmt::Debug for MappedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedField")
            .field("column", &self.column)
            .field("path", &self.path)
            .field("type", &self.ty.type_name())
            .field("converter", &self.converter.name())
            .field("depth", &self.get_mut.len())
            .finish()
    }
}

/// The immutable column-to-field mapping of one record type.
///
/// Safe to share across threads once built.
#[derive(Debug)]
pub struct Mapping {
    record: &'static str,
    type_id: TypeId,
    fields: Vec<MappedField>,
    by_column: HashMap<String, usize>,
    options: Options,
}

struct Builder<'r> {
    registry: &'r Registry,
    root: &'static str,
    fields: Vec<MappedField>,
    by_column: HashMap<String, usize>,
}

impl Builder<'_> {
    fn walk(
        &mut self,
        desc: &RecordDescriptor,
        prefix: &str,
        get: &[FieldAccess],
        get_mut: &[FieldAccessMut],
    ) -> Result<()> {
        if !desc.is_record() {
            return Err(Error::NotARecordType {
                type_name: desc.type_name,
                kind: desc.kind.as_str(),
            });
        }

        for field in &desc.fields {
            let path = if prefix.is_empty() {
                field.name.to_string()
            } else {
                format!("{}.{}", prefix, field.name)
            };
            let mut get_chain = get.to_vec();
            get_chain.push(field.get);
            let mut get_mut_chain = get_mut.to_vec();
            get_mut_chain.push(field.get_mut);

            let column = match (field.tag, field.embedded) {
                (ColumnTag::Skip, _) => continue,
                (ColumnTag::Named(column), _) => column.to_string(),
                (ColumnTag::Infer, Some(describe)) => {
                    self.walk(&describe(), &path, &get_chain, &get_mut_chain)?;
                    continue;
                }
                (ColumnTag::Infer, None) => default_column_name(field.name),
            };

            if self.by_column.contains_key(&column) {
                return Err(Error::DuplicateColumn {
                    column,
                    record: self.root,
                });
            }

            let converter = self
                .registry
                .find_for(&field.ty)
                .ok_or_else(|| Error::UnsupportedField {
                    field: path.clone(),
                    type_name: field.ty.type_name(),
                })?;

            tracing::trace!(
                column = %column,
                field = %path,
                converter = converter.name(),
                "Resolved field"
            );

            self.by_column.insert(column.clone(), self.fields.len());
            self.fields.push(MappedField {
                column,
                path,
                ty: field.ty,
                converter: Arc::clone(converter),
                get: get_chain,
                get_mut: get_mut_chain,
            });
        }
        Ok(())
    }
}

impl Mapping {
    /// Build a mapping from a descriptor, resolving converters in `registry`.
    ///
    /// Fails without a partial result on the first non-record type, duplicate
    /// column or field no converter accepts.
    pub fn build(desc: &RecordDescriptor, registry: &Registry, options: Options) -> Result<Self> {
        let mut builder = Builder {
            registry,
            root: desc.type_name,
            fields: Vec::new(),
            by_column: HashMap::new(),
        };
        builder.walk(desc, "", &[], &[])?;

        tracing::debug!(
            record = desc.type_name,
            columns = builder.fields.len(),
            "Built schema"
        );

        Ok(Self {
            record: desc.type_name,
            type_id: desc.type_id,
            fields: builder.fields,
            by_column: builder.by_column,
            options,
        })
    }

    /// Name of the record type this mapping was built for.
    pub fn record_name(&self) -> &'static str {
        self.record
    }

    pub fn record_type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Number of mapped columns.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Mapped column names in field declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|f| f.column.as_str())
    }

    /// The dotted field path a column is stored in.
    pub fn field_for(&self, column: &str) -> Option<&str> {
        self.field(column).map(|f| f.path.as_str())
    }

    /// Name of the converter handling a column.
    pub fn converter_for(&self, column: &str) -> Option<&'static str> {
        self.field(column).map(|f| f.converter.name())
    }

    pub(crate) fn field(&self, column: &str) -> Option<&MappedField> {
        self.by_column.get(column).map(|&idx| &self.fields[idx])
    }

    /// Erased targets carry no type name, only their `TypeId`.
    pub(crate) fn check_target(&self, target: &dyn Any) -> Result<()> {
        if target.type_id() == self.type_id {
            Ok(())
        } else {
            Err(Error::IncompatibleTarget {
                expected: self.record,
                actual: "a value of another type".to_string(),
            })
        }
    }

    /// Scan the row the cursor is positioned on into `target`.
    ///
    /// `target` must be the record type the mapping was built for. `columns`
    /// is the cursor's column order.
    pub fn scan_row<W: Row + ?Sized>(
        &self,
        target: &mut dyn Any,
        row: &mut W,
        columns: &[String],
    ) -> Result<()> {
        crate::scan::scan_row(self, target, row, columns)
    }

    /// Scan the first row of `rows` into `target`, closing the cursor.
    ///
    /// Returns `Ok(false)` when the cursor has no rows.
    pub fn scan_one<C: Rows>(&self, target: &mut dyn Any, rows: C) -> Result<bool> {
        crate::stream::scan_one(self, target, rows)
    }

    /// Produce `(column, value)` pairs from `source` in declaration order.
    pub fn encode(&self, source: &dyn Any) -> Result<Vec<(&str, Value)>> {
        self.check_target(source)?;
        self.fields
            .iter()
            .map(|field| {
                let value = field
                    .resolve(source)
                    .ok_or_else(|| self.unreachable_field(field))
                    .and_then(|value| field.converter.encode(value, &field.ty))
                    .map_err(|err| match err {
                        Error::EncodeUnsupported { converter, .. } => Error::EncodeUnsupported {
                            field: field.path.clone(),
                            converter,
                        },
                        other => other,
                    })?;
                Ok((field.column.as_str(), value))
            })
            .collect()
    }

    pub(crate) fn unreachable_field(&self, field: &MappedField) -> Error {
        Error::IncompatibleTarget {
            expected: self.record,
            actual: format!("a value without field {}", field.path),
        }
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mapping({}){{", self.record)?;
        for (idx, field) in self.fields.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field.column, field.converter.name())?;
        }
        write!(f, "}}")
    }
}

/// A built mapping for the record type `R`.
///
/// Cloning is cheap; clones share the same mapping.
pub struct Schema<R> {
    mapping: Arc<Mapping>,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for Schema<R> {
    fn clone(&self) -> Self {
        Self {
            mapping: Arc::clone(&self.mapping),
            _record: PhantomData,
        }
    }
}

impl<R> fmt::Debug for Schema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Schema").field(&self.mapping).finish()
    }
}

impl<R> fmt::Display for Schema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.mapping, f)
    }
}

impl<R: Record> Schema<R> {
    /// Build with the process-wide registry and default options.
    pub fn build() -> Result<Self> {
        Self::build_with(&global_registry(), Options::default())
    }

    pub fn build_with(registry: &Registry, options: Options) -> Result<Self> {
        let mapping = Mapping::build(&R::descriptor(), registry, options)?;
        Ok(Self {
            mapping: Arc::new(mapping),
            _record: PhantomData,
        })
    }

    /// Like [`Schema::build`], for schemas that are known to be valid.
    ///
    /// # Panics
    ///
    /// Panics if the schema cannot be built.
    pub fn must_build() -> Self {
        match Self::build() {
            Ok(schema) => schema,
            Err(e) => panic!(
                "cannot build schema for {}: {}",
                std::any::type_name::<R>(),
                e
            ),
        }
    }

    /// Wrap an erased mapping, checking that it was built for `R`.
    pub fn from_mapping(mapping: Arc<Mapping>) -> Result<Self> {
        if mapping.record_type_id() != TypeId::of::<R>() {
            return Err(Error::IncompatibleTarget {
                expected: mapping.record_name(),
                actual: std::any::type_name::<R>().to_string(),
            });
        }
        Ok(Self {
            mapping,
            _record: PhantomData,
        })
    }

    pub fn mapping(&self) -> &Arc<Mapping> {
        &self.mapping
    }

    pub fn scan_row<W: Row + ?Sized>(
        &self,
        target: &mut R,
        row: &mut W,
        columns: &[String],
    ) -> Result<()> {
        crate::scan::scan_row(&self.mapping, target, row, columns)
    }

    /// Scan the first row of `rows` into `target`, closing the cursor.
    pub fn scan_one<C: Rows>(&self, target: &mut R, rows: C) -> Result<bool> {
        crate::stream::scan_one(&self.mapping, target, rows)
    }

    pub fn encode(&self, source: &R) -> Result<Vec<(&str, Value)>> {
        self.mapping.encode(source)
    }
}

impl<R: Record + Default> Schema<R> {
    /// Iterate over the rows of `rows` on the calling thread.
    ///
    /// The iterator ends after the first error. The cursor is closed when the
    /// iterator is dropped.
    pub fn scan_iter<C: Rows>(&self, rows: C) -> RowIter<R, C> {
        RowIter::new(Arc::clone(&self.mapping), rows)
    }

    /// Scan every row, or fail with the first error and no partial results.
    pub fn scan_all<C: Rows>(&self, rows: C) -> Result<Vec<R>> {
        crate::stream::scan_all(self.scan_iter(rows))
    }
}

impl<R: Record + Default + Send> Schema<R> {
    /// Scan rows on a producer thread, handing each record over as it is
    /// consumed.
    pub fn scan_stream<C: Rows + Send + 'static>(&self, rows: C) -> RowStream<R> {
        RowStream::spawn(self.scan_iter(rows), &self.mapping.options().stream_thread_name)
    }
}

/// Build a schema for `R` with the process-wide registry.
pub fn build_schema<R: Record>() -> Result<Schema<R>> {
    Schema::build()
}
