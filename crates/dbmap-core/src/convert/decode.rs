//! Converter for field types that decode themselves.

use std::any::Any;

use super::{Converter, RawSlot, receiver_mut};
use crate::cursor::ScanTarget;
use crate::error::{Error, Result};
use crate::record::FieldType;
use crate::value::Value;

/// A value that can bind a raw column value into itself.
///
/// Implementations should fail with [`Error::Decode`] when the raw value's
/// shape (text, bytes, ...) is not one they understand.
pub trait Decode {
    fn decode(&mut self, raw: Value) -> Result<()>;
}

/// A value that can produce its own column value.
pub trait Encode {
    fn encode(&self) -> Result<Value>;
}

fn field_mismatch<T>() -> Error {
    Error::decode(
        std::any::type_name::<T>(),
        "field",
        "field does not have the described type",
    )
}

pub(crate) fn decode_hook<T: Decode + Any>(field: &mut dyn Any, raw: Value) -> Result<()> {
    field
        .downcast_mut::<T>()
        .ok_or_else(field_mismatch::<T>)?
        .decode(raw)
}

pub(crate) fn encode_hook<T: Encode + Any>(field: &dyn Any) -> Result<Value> {
    field
        .downcast_ref::<T>()
        .ok_or_else(field_mismatch::<T>)?
        .encode()
}

/// Delegates scanning entirely to the field type's [`Decode`] impl.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeConverter;

impl Converter for DecodeConverter {
    fn name(&self) -> &'static str {
        "decode"
    }

    fn accepts(&self, ty: &FieldType) -> bool {
        ty.capabilities().decode.is_some()
    }

    fn receive(&self, _field: &mut dyn Any, _ty: &FieldType) -> Box<dyn ScanTarget> {
        Box::new(RawSlot::default())
    }

    fn commit(
        &self,
        field: &mut dyn Any,
        ty: &FieldType,
        scanned: &mut dyn ScanTarget,
    ) -> Result<()> {
        let Some(value) = receiver_mut::<RawSlot>(scanned, ty)?.take() else {
            return Ok(());
        };
        match ty.capabilities().decode {
            Some(decode) => decode(field, value),
            None => Err(Error::UnsupportedField {
                field: ty.type_name().to_string(),
                type_name: ty.type_name(),
            }),
        }
    }

    fn encode(&self, field: &dyn Any, ty: &FieldType) -> Result<Value> {
        match ty.capabilities().encode {
            Some(encode) => encode(field),
            None => Err(Error::EncodeUnsupported {
                field: ty.type_name().to_string(),
                converter: self.name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Capabilities;

    /// Comma-separated tags stored in a text column.
    #[derive(Debug, Default, PartialEq)]
    struct Tags(Vec<String>);

    impl Decode for Tags {
        fn decode(&mut self, raw: Value) -> Result<()> {
            match raw {
                Value::Text(s) => {
                    self.0 = s.split(',').map(str::to_string).collect();
                    Ok(())
                }
                other => Err(Error::decode("Tags", other.kind(), "expected text")),
            }
        }
    }

    impl Encode for Tags {
        fn encode(&self) -> Result<Value> {
            Ok(Value::Text(self.0.join(",")))
        }
    }

    fn tags_type() -> FieldType {
        FieldType::of::<Tags>().with_capabilities(Capabilities::default().with_decode::<Tags>().with_encode::<Tags>())
    }

    #[test]
    fn test_accepts_only_decodable_types() {
        assert!(DecodeConverter.accepts(&tags_type()));
        assert!(!DecodeConverter.accepts(&FieldType::of::<Tags>()));
    }

    #[test]
    fn test_delegates_to_decode() {
        let ty = tags_type();
        let mut field = Tags::default();
        let mut slot = DecodeConverter.receive(&mut field, &ty);
        slot.bind(Value::from("a,b")).unwrap();
        DecodeConverter.commit(&mut field, &ty, slot.as_mut()).unwrap();
        assert_eq!(field, Tags(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(DecodeConverter.encode(&field, &ty).unwrap(), Value::from("a,b"));
    }

    #[test]
    fn test_decode_failure_surfaces() {
        let ty = tags_type();
        let mut field = Tags::default();
        let mut slot = DecodeConverter.receive(&mut field, &ty);
        slot.bind(Value::Int(3)).unwrap();
        let err = DecodeConverter.commit(&mut field, &ty, slot.as_mut()).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
