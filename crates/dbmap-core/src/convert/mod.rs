//! Field converters and the converter registry.
//!
//! A [`Converter`] is a stateless policy object that decides which field
//! types it handles, hands the cursor a receiver for a field, and commits the
//! scanned receiver back into the field. The [`Registry`] is an ordered list
//! of converters queried by the schema builder.
//!
//! # Priority
//!
//! Registration **prepends**. `find_for` walks the list front to back and the
//! first converter whose `accepts` returns true wins, so the most recently
//! registered converter has the highest priority. Registering a converter
//! that accepts a type already handled by a default overrides the default for
//! every schema built afterwards.

mod decode;
mod json;
mod scalar;

pub use decode::{Decode, DecodeConverter, Encode};
pub use json::{JsonConverter, JsonMap, JsonObject, JsonSlot};
pub use scalar::{Scalar, ScalarConverter, ScalarSlot};

pub(crate) use decode::{decode_hook, encode_hook};
pub(crate) use json::json_hooks;

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::cursor::ScanTarget;
use crate::error::{Error, Result};
use crate::record::FieldType;
use crate::value::Value;

/// A type-handling strategy for one family of field types.
///
/// `accepts` must be a pure predicate: the registry may call it any number of
/// times, in any order, while building schemas.
pub trait Converter: Send + Sync + fmt::Debug {
    /// A short name used in diagnostics and `Mapping`'s display.
    fn name(&self) -> &'static str;

    fn accepts(&self, ty: &FieldType) -> bool;

    /// Produce the receiver the cursor will bind the field's column into.
    fn receive(&self, field: &mut dyn Any, ty: &FieldType) -> Box<dyn ScanTarget>;

    /// Move the scanned receiver's value into the field.
    fn commit(&self, field: &mut dyn Any, ty: &FieldType, scanned: &mut dyn ScanTarget)
    -> Result<()>;

    /// Produce a column value from the field.
    fn encode(&self, field: &dyn Any, ty: &FieldType) -> Result<Value> {
        let _ = field;
        Err(Error::EncodeUnsupported {
            field: ty.type_name().to_string(),
            converter: self.name(),
        })
    }
}

/// A receiver that keeps the raw column value for the commit phase.
#[derive(Debug, Default)]
pub struct RawSlot {
    value: Option<Value>,
}

impl RawSlot {
    /// Take the bound value, leaving the slot empty.
    pub fn take(&mut self) -> Option<Value> {
        self.value.take()
    }
}

impl ScanTarget for RawSlot {
    fn bind(&mut self, raw: Value) -> Result<()> {
        self.value = Some(raw);
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Downcast a scanned receiver to the concrete type a converter handed out.
pub fn receiver_mut<'a, T: Any>(
    scanned: &'a mut dyn ScanTarget,
    ty: &FieldType,
) -> Result<&'a mut T> {
    let found = scanned.type_name();
    scanned.as_any_mut().downcast_mut::<T>().ok_or_else(|| {
        Error::decode(
            ty.type_name(),
            found,
            format!("expected a {} receiver", std::any::type_name::<T>()),
        )
    })
}

/// An ordered, priority-by-recency list of converters.
#[derive(Clone, Default)]
pub struct Registry {
    converters: Vec<Arc<dyn Converter>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in converters.
    ///
    /// Registered json, then scalar, then decode, so lookups try a field's own
    /// `Decode` impl first, then the scalar table, then JSON objects.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(JsonConverter);
        registry.register(ScalarConverter::standard());
        registry.register(DecodeConverter);
        registry
    }

    /// Prepend a converter. No conflict detection is performed.
    pub fn register<C: Converter + 'static>(&mut self, converter: C) {
        self.register_shared(Arc::new(converter));
    }

    pub fn register_shared(&mut self, converter: Arc<dyn Converter>) {
        self.converters.insert(0, converter);
    }

    /// The first converter in list order that accepts `ty`.
    pub fn find_for(&self, ty: &FieldType) -> Option<&Arc<dyn Converter>> {
        self.converters.iter().find(|c| c.accepts(ty))
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Converter names in lookup order.
    pub fn names(&self) -> Vec<&'static str> {
        self.converters.iter().map(|c| c.name()).collect()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("converters", &self.names())
            .finish()
    }
}

fn global() -> &'static RwLock<Registry> {
    static GLOBAL: OnceLock<RwLock<Registry>> = OnceLock::new();
    GLOBAL.get_or_init(|| RwLock::new(Registry::standard()))
}

/// Register a converter in the process-wide registry used by
/// [`Schema::build`](crate::Schema::build).
///
/// Call this during initialization, before schemas are built. Schemas built
/// earlier keep the converters they resolved.
pub fn register_converter<C: Converter + 'static>(converter: C) {
    let mut registry = global().write().unwrap_or_else(PoisonError::into_inner);
    tracing::debug!(converter = converter.name(), "Registering global converter");
    registry.register(converter);
}

/// A snapshot of the process-wide registry.
pub fn global_registry() -> Registry {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Named(&'static str, bool);

    impl Converter for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn accepts(&self, _ty: &FieldType) -> bool {
            self.1
        }

        fn receive(&self, _field: &mut dyn Any, _ty: &FieldType) -> Box<dyn ScanTarget> {
            Box::new(RawSlot::default())
        }

        fn commit(
            &self,
            _field: &mut dyn Any,
            _ty: &FieldType,
            _scanned: &mut dyn ScanTarget,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_later_registration_wins() {
        let mut registry = Registry::new();
        registry.register(Named("first", true));
        registry.register(Named("second", true));
        let ty = FieldType::of::<i64>();
        assert_eq!(registry.find_for(&ty).unwrap().name(), "second");
        assert_eq!(registry.names(), ["second", "first"]);
    }

    #[test]
    fn test_non_acceptors_are_skipped() {
        let mut registry = Registry::new();
        registry.register(Named("yes", true));
        registry.register(Named("no", false));
        let ty = FieldType::of::<i64>();
        assert_eq!(registry.find_for(&ty).unwrap().name(), "yes");
    }

    #[test]
    fn test_empty_registry_finds_nothing() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(registry.find_for(&FieldType::of::<i64>()).is_none());
    }

    #[test]
    fn test_standard_order() {
        assert_eq!(Registry::standard().names(), ["decode", "scalar", "json"]);
    }

    #[test]
    fn test_default_encode_is_unsupported() {
        let conv = Named("plain", true);
        let err = conv.encode(&1_i64, &FieldType::of::<i64>()).unwrap_err();
        assert!(matches!(err, Error::EncodeUnsupported { converter: "plain", .. }));
    }

    #[test]
    fn test_receiver_downcast_mismatch() {
        let mut slot = JsonSlot::default();
        let err = receiver_mut::<RawSlot>(&mut slot, &FieldType::of::<i64>()).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
