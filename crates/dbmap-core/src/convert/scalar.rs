//! Scalar converter: integers, floats, booleans, text, bytes and time values.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, NaiveDateTime, Utc};

use super::{Converter, RawSlot, receiver_mut};
use crate::cursor::ScanTarget;
use crate::error::{DecodeError, Error, Result};
use crate::record::FieldType;
use crate::value::Value;

/// A field type that maps one-to-one onto a raw column value.
///
/// Implement this for your own newtypes and add them with
/// [`ScalarConverter::with_type`].
pub trait Scalar: Sized + Send + 'static {
    fn from_value(value: Value) -> Result<Self>;

    fn to_value(&self) -> Result<Value>;
}

fn unsupported<T>(value: &Value) -> Error {
    let expected = std::any::type_name::<T>();
    if value.is_null() {
        Error::decode(
            expected,
            value.kind(),
            format!("converting NULL to {} is unsupported", expected),
        )
    } else {
        Error::decode(
            expected,
            value.kind(),
            format!("unsupported conversion from {} to {}", value.kind(), expected),
        )
    }
}

fn parse_failure<T>(value: &Value, err: impl std::error::Error + Send + Sync + 'static) -> Error {
    let expected = std::any::type_name::<T>();
    Error::Decode(DecodeError {
        expected,
        found: value.kind(),
        message: format!("converting {} to {}", value, expected),
        source: Some(Box::new(err)),
    })
}

macro_rules! impl_scalar_int {
    ($($ty:ty),* $(,)?) => {$(
        impl Scalar for $ty {
            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::Int(v) => <$ty>::try_from(v).map_err(|e| parse_failure::<$ty>(&value, e)),
                    Value::Text(ref s) => s.trim().parse::<$ty>().map_err(|e| parse_failure::<$ty>(&value, e)),
                    Value::Bool(b) => Ok(<$ty>::from(b)),
                    ref other => Err(unsupported::<$ty>(other)),
                }
            }

            fn to_value(&self) -> Result<Value> {
                i64::try_from(*self)
                    .map(Value::Int)
                    .map_err(|e| parse_failure::<i64>(&Value::Text(self.to_string()), e))
            }
        }
    )*};
}

impl_scalar_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Scalar for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            Value::Text(ref s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| parse_failure::<f64>(&value, e)),
            ref other => Err(unsupported::<f64>(other)),
        }
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Float(*self))
    }
}

impl Scalar for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(v) => Ok(v as f32),
            Value::Int(v) => Ok(v as f32),
            Value::Text(ref s) => s
                .trim()
                .parse::<f32>()
                .map_err(|e| parse_failure::<f32>(&value, e)),
            ref other => Err(unsupported::<f32>(other)),
        }
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Float(f64::from(*self)))
    }
}

impl Scalar for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(v) => Ok(v),
            Value::Int(0) => Ok(false),
            Value::Int(1) => Ok(true),
            Value::Text(ref s) => match s.trim() {
                "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
                "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
                _ => Err(unsupported::<bool>(&value)),
            },
            ref other => Err(unsupported::<bool>(other)),
        }
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Bool(*self))
    }
}

impl Scalar for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Bytes(b) => String::from_utf8(b).map_err(|e| {
                let raw = Value::Bytes(e.as_bytes().to_vec());
                parse_failure::<String>(&raw, e.utf8_error())
            }),
            Value::Int(v) => Ok(v.to_string()),
            Value::Float(v) => Ok(v.to_string()),
            Value::Bool(v) => Ok(v.to_string()),
            Value::Timestamp(v) => Ok(v.to_rfc3339()),
            ref other => Err(unsupported::<String>(other)),
        }
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Text(self.clone()))
    }
}

impl Scalar for Vec<u8> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            ref other => Err(unsupported::<Vec<u8>>(other)),
        }
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Bytes(self.clone()))
    }
}

impl Scalar for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Timestamp(v) => Ok(v),
            Value::Text(ref s) => DateTime::parse_from_rfc3339(s.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| parse_failure::<DateTime<Utc>>(&value, e)),
            ref other => Err(unsupported::<DateTime<Utc>>(other)),
        }
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Timestamp(*self))
    }
}

impl Scalar for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self> {
        DateTime::<Utc>::from_value(value).map(|dt| dt.naive_utc())
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Timestamp(self.and_utc()))
    }
}

impl Scalar for SystemTime {
    fn from_value(value: Value) -> Result<Self> {
        DateTime::<Utc>::from_value(value).map(SystemTime::from)
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Timestamp(DateTime::<Utc>::from(*self)))
    }
}

/// Durations arrive either as intervals or as integer nanoseconds.
impl Scalar for Duration {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Interval(v) => Ok(v),
            Value::Int(nanos) => u64::try_from(nanos)
                .map(Duration::from_nanos)
                .map_err(|e| parse_failure::<Duration>(&value, e)),
            ref other => Err(unsupported::<Duration>(other)),
        }
    }

    fn to_value(&self) -> Result<Value> {
        Ok(Value::Interval(*self))
    }
}

impl<T: Scalar> Scalar for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn to_value(&self) -> Result<Value> {
        match self {
            Some(v) => v.to_value(),
            None => Ok(Value::Null),
        }
    }
}

type Converted = Box<dyn Any + Send>;

#[derive(Clone, Copy)]
struct ScalarOps {
    type_name: &'static str,
    convert: fn(Value) -> Result<Converted>,
    assign: fn(&mut dyn Any, Converted) -> Result<()>,
    encode: fn(&dyn Any) -> Result<Value>,
}

fn field_mismatch<T>(found: &'static str) -> Error {
    Error::decode(
        std::any::type_name::<T>(),
        found,
        "field does not have the converter's declared type",
    )
}

fn convert_scalar<T: Scalar>(value: Value) -> Result<Converted> {
    T::from_value(value).map(|v| Box::new(v) as Converted)
}

fn assign_scalar<T: Scalar>(field: &mut dyn Any, converted: Converted) -> Result<()> {
    let slot = field
        .downcast_mut::<T>()
        .ok_or_else(|| field_mismatch::<T>("field"))?;
    let value = converted
        .downcast::<T>()
        .map_err(|_| field_mismatch::<T>("converted value"))?;
    *slot = *value;
    Ok(())
}

fn encode_scalar<T: Scalar>(field: &dyn Any) -> Result<Value> {
    field
        .downcast_ref::<T>()
        .ok_or_else(|| field_mismatch::<T>("field"))?
        .to_value()
}

/// Receiver that converts the raw value to the field's type while the cursor
/// binds it, so a bad value fails the cursor scan at its column.
pub struct ScalarSlot {
    ops: ScalarOps,
    value: Option<Converted>,
}

impl ScalarSlot {
    fn new(ops: ScalarOps) -> Self {
        Self { ops, value: None }
    }
}

impl std::fmt::Debug for ScalarSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalarSlot")
            .field("type", &self.ops.type_name)
            .field("bound", &self.value.is_some())
            .finish()
    }
}

impl ScanTarget for ScalarSlot {
    fn bind(&mut self, raw: Value) -> Result<()> {
        self.value = Some((self.ops.convert)(raw)?);
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Handles every type in its table by passing the raw value through
/// [`Scalar::from_value`] as the cursor binds it.
///
/// `T` and `Option<T>` are separate table entries.
#[derive(Clone, Default)]
pub struct ScalarConverter {
    table: HashMap<TypeId, ScalarOps>,
}

impl ScalarConverter {
    /// A converter with an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in scalar types and their `Option` forms.
    pub fn standard() -> Self {
        macro_rules! with_types {
            ($conv:expr, $($ty:ty),* $(,)?) => {
                $conv$(.with_type::<$ty>().with_type::<Option<$ty>>())*
            };
        }
        with_types!(
            Self::new(),
            i8,
            i16,
            i32,
            i64,
            isize,
            u8,
            u16,
            u32,
            u64,
            usize,
            f32,
            f64,
            bool,
            String,
            Vec<u8>,
            DateTime<Utc>,
            NaiveDateTime,
            SystemTime,
            Duration,
        )
    }

    /// Add `T` to the table.
    pub fn with_type<T: Scalar>(mut self) -> Self {
        self.table.insert(
            TypeId::of::<T>(),
            ScalarOps {
                type_name: std::any::type_name::<T>(),
                convert: convert_scalar::<T>,
                assign: assign_scalar::<T>,
                encode: encode_scalar::<T>,
            },
        );
        self
    }

    fn ops(&self, ty: &FieldType) -> Result<&ScalarOps> {
        self.table.get(&ty.type_id()).ok_or_else(|| Error::UnsupportedField {
            field: ty.type_name().to_string(),
            type_name: ty.type_name(),
        })
    }
}

impl std::fmt::Debug for ScalarConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.table.values().map(|ops| ops.type_name).collect();
        types.sort_unstable();
        f.debug_struct("ScalarConverter").field("types", &types).finish()
    }
}

impl Converter for ScalarConverter {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn accepts(&self, ty: &FieldType) -> bool {
        self.table.contains_key(&ty.type_id())
    }

    fn receive(&self, _field: &mut dyn Any, ty: &FieldType) -> Box<dyn ScanTarget> {
        match self.table.get(&ty.type_id()) {
            Some(ops) => Box::new(ScalarSlot::new(*ops)),
            // Not in the table: commit reports the receiver mismatch.
            None => Box::new(RawSlot::default()),
        }
    }

    fn commit(
        &self,
        field: &mut dyn Any,
        ty: &FieldType,
        scanned: &mut dyn ScanTarget,
    ) -> Result<()> {
        let Some(converted) = receiver_mut::<ScalarSlot>(scanned, ty)?.value.take() else {
            return Ok(());
        };
        (self.ops(ty)?.assign)(field, converted)
    }

    fn encode(&self, field: &dyn Any, ty: &FieldType) -> Result<Value> {
        (self.ops(ty)?.encode)(field)
    }
}
