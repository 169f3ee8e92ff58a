//! Static record shape descriptors.
//!
//! A [`RecordDescriptor`] is the compile-time view of a user struct: its
//! fields in declaration order, each with a name, a column annotation, an
//! embedding flag and erased accessors. `#[derive(Record)]` generates it, so
//! schema construction never needs run-time reflection.

use std::any::{Any, TypeId};
use std::fmt;

use crate::error::Result;
use crate::value::Value;

/// Erased mutable accessor from a record to one of its fields.
pub type FieldAccessMut = fn(&mut dyn Any) -> Option<&mut dyn Any>;

/// Erased shared accessor from a record to one of its fields.
pub type FieldAccess = fn(&dyn Any) -> Option<&dyn Any>;

/// A type whose shape can be described to the schema builder.
///
/// Usually derived:
///
/// ```ignore
/// #[derive(Record, Default)]
/// struct Hero {
///     #[dbmap(column = "hero_id")]
///     id: i64,
///     name: String,
///     #[dbmap(skip)]
///     cache: Vec<String>,
/// }
/// ```
pub trait Record: Any {
    fn descriptor() -> RecordDescriptor
    where
        Self: Sized;
}

/// What kind of type a descriptor was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A struct with named fields.
    Struct,
    TupleStruct,
    Enum,
}

impl RecordKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            RecordKind::Struct => "struct",
            RecordKind::TupleStruct => "tuple struct",
            RecordKind::Enum => "enum",
        }
    }
}

/// The static shape of a record type.
#[derive(Debug, Clone)]
pub struct RecordDescriptor {
    pub type_name: &'static str,
    pub type_id: TypeId,
    pub kind: RecordKind,
    pub fields: Vec<FieldDescriptor>,
}

impl RecordDescriptor {
    /// Describe a struct with named fields.
    pub fn record<T: Any>(fields: Vec<FieldDescriptor>) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
            kind: RecordKind::Struct,
            fields,
        }
    }

    /// Describe a type that has no named fields to map.
    pub fn opaque<T: Any>(kind: RecordKind) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
            kind,
            fields: Vec::new(),
        }
    }

    pub fn is_record(&self) -> bool {
        self.kind == RecordKind::Struct
    }
}

/// The column annotation carried by a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnTag {
    /// No annotation: embed if the field is flattened, otherwise infer the
    /// column name from the field name.
    Infer,
    Named(&'static str),
    /// Excluded from mapping.
    Skip,
}

/// One declared field of a record.
#[derive(Clone)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub tag: ColumnTag,
    pub ty: FieldType,
    pub get: FieldAccess,
    pub get_mut: FieldAccessMut,
    /// Set for flattened fields: describes the embedded record.
    pub embedded: Option<fn() -> RecordDescriptor>,
}

impl FieldDescriptor {
    pub fn new(
        name: &'static str,
        tag: ColumnTag,
        ty: FieldType,
        get: FieldAccess,
        get_mut: FieldAccessMut,
    ) -> Self {
        Self {
            name,
            tag,
            ty,
            get,
            get_mut,
            embedded: None,
        }
    }

    /// Mark the field as an embedded record whose fields are surfaced into
    /// the parent's schema.
    pub fn embedded(mut self, describe: fn() -> RecordDescriptor) -> Self {
        self.embedded = Some(describe);
        self
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("ty", &self.ty)
            .field("embedded", &self.embedded.is_some())
            .finish_non_exhaustive()
    }
}

/// Binds a raw value into a field through its `Decode` impl.
pub type DecodeHook = fn(&mut dyn Any, Value) -> Result<()>;

/// Produces a column value from a field through its `Encode` impl.
pub type EncodeHook = fn(&dyn Any) -> Result<Value>;

/// Conversions between a field and a JSON object.
#[derive(Clone, Copy)]
pub struct JsonHooks {
    pub assign: fn(&mut dyn Any, serde_json::Map<String, serde_json::Value>) -> Result<()>,
    pub to_map: fn(&dyn Any) -> Result<serde_json::Map<String, serde_json::Value>>,
}

/// Engine traits a field type was found to implement when it was described.
#[derive(Clone, Copy, Default)]
pub struct Capabilities {
    pub decode: Option<DecodeHook>,
    pub encode: Option<EncodeHook>,
    pub json: Option<JsonHooks>,
}

impl Capabilities {
    /// Record that `T` implements [`Decode`](crate::Decode).
    pub fn with_decode<T: crate::Decode + Any>(mut self) -> Self {
        self.decode = Some(crate::convert::decode_hook::<T>);
        self
    }

    /// Record that `T` implements [`Encode`](crate::Encode).
    pub fn with_encode<T: crate::Encode + Any>(mut self) -> Self {
        self.encode = Some(crate::convert::encode_hook::<T>);
        self
    }

    /// Record that `T` implements [`JsonObject`](crate::JsonObject).
    pub fn with_json<T: crate::JsonObject>(mut self) -> Self {
        self.json = Some(crate::convert::json_hooks::<T>());
        self
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("decode", &self.decode.is_some())
            .field("encode", &self.encode.is_some())
            .field("json", &self.json.is_some())
            .finish()
    }
}

/// The declared value type of a field.
#[derive(Debug, Clone, Copy)]
pub struct FieldType {
    type_id: TypeId,
    type_name: &'static str,
    capabilities: Capabilities,
}

impl FieldType {
    /// Describe `T` with no capabilities.
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            capabilities: Capabilities::default(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl PartialEq for FieldType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for FieldType {}
