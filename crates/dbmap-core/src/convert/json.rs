//! Converter for string-keyed JSON object fields.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};

use super::{Converter, receiver_mut};
use crate::cursor::ScanTarget;
use crate::error::{DecodeError, Error, Result};
use crate::record::{FieldType, JsonHooks};
use crate::value::Value;

/// A JSON object with string keys.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// A field type that is interchangeable with a [`JsonMap`].
///
/// Implement this for newtypes over a map to have them stored as JSON text.
pub trait JsonObject: Sized + Any {
    fn from_json_object(map: JsonMap) -> Self;

    fn to_json_object(&self) -> JsonMap;
}

impl JsonObject for JsonMap {
    fn from_json_object(map: JsonMap) -> Self {
        map
    }

    fn to_json_object(&self) -> JsonMap {
        self.clone()
    }
}

impl JsonObject for HashMap<String, serde_json::Value> {
    fn from_json_object(map: JsonMap) -> Self {
        map.into_iter().collect()
    }

    fn to_json_object(&self) -> JsonMap {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl JsonObject for BTreeMap<String, serde_json::Value> {
    fn from_json_object(map: JsonMap) -> Self {
        map.into_iter().collect()
    }

    fn to_json_object(&self) -> JsonMap {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

fn field_mismatch<T>() -> Error {
    Error::decode(
        std::any::type_name::<T>(),
        "field",
        "field does not have the described type",
    )
}

fn assign<T: JsonObject>(field: &mut dyn Any, map: JsonMap) -> Result<()> {
    let field = field.downcast_mut::<T>().ok_or_else(field_mismatch::<T>)?;
    *field = T::from_json_object(map);
    Ok(())
}

fn to_map<T: JsonObject>(field: &dyn Any) -> Result<JsonMap> {
    field
        .downcast_ref::<T>()
        .map(T::to_json_object)
        .ok_or_else(field_mismatch::<T>)
}

pub(crate) fn json_hooks<T: JsonObject>() -> JsonHooks {
    JsonHooks {
        assign: assign::<T>,
        to_map: to_map::<T>,
    }
}

/// Receiver that decodes JSON text or bytes while the cursor binds it.
#[derive(Debug, Default)]
pub struct JsonSlot {
    map: Option<JsonMap>,
}

impl JsonSlot {
    pub fn take(&mut self) -> Option<JsonMap> {
        self.map.take()
    }
}

fn json_failure(found: &'static str, err: serde_json::Error) -> Error {
    Error::Decode(
        DecodeError {
            expected: "json object",
            found,
            message: err.to_string(),
            source: None,
        }
        .with_source(err),
    )
}

impl ScanTarget for JsonSlot {
    fn bind(&mut self, raw: Value) -> Result<()> {
        // JSON `null` text decodes to an empty object.
        let map = match &raw {
            Value::Text(text) => serde_json::from_str::<Option<JsonMap>>(text)
                .map_err(|e| json_failure("text", e))?,
            Value::Bytes(bytes) => serde_json::from_slice::<Option<JsonMap>>(bytes)
                .map_err(|e| json_failure("bytes", e))?,
            other => {
                return Err(Error::decode(
                    "json object",
                    other.kind(),
                    format!("can not decode json from {}", other),
                ));
            }
        };
        self.map = Some(map.unwrap_or_default());
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Stores [`JsonObject`] fields as JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConverter;

impl Converter for JsonConverter {
    fn name(&self) -> &'static str {
        "json"
    }

    fn accepts(&self, ty: &FieldType) -> bool {
        ty.capabilities().json.is_some()
    }

    fn receive(&self, _field: &mut dyn Any, _ty: &FieldType) -> Box<dyn ScanTarget> {
        Box::new(JsonSlot::default())
    }

    fn commit(
        &self,
        field: &mut dyn Any,
        ty: &FieldType,
        scanned: &mut dyn ScanTarget,
    ) -> Result<()> {
        let Some(map) = receiver_mut::<JsonSlot>(scanned, ty)?.take() else {
            return Ok(());
        };
        match ty.capabilities().json {
            Some(hooks) => (hooks.assign)(field, map),
            None => Err(Error::UnsupportedField {
                field: ty.type_name().to_string(),
                type_name: ty.type_name(),
            }),
        }
    }

    fn encode(&self, field: &dyn Any, ty: &FieldType) -> Result<Value> {
        let Some(hooks) = ty.capabilities().json else {
            return Err(Error::EncodeUnsupported {
                field: ty.type_name().to_string(),
                converter: self.name(),
            });
        };
        let map = (hooks.to_map)(field)?;
        serde_json::to_string(&map).map(Value::Text).map_err(|e| {
            Error::Decode(
                DecodeError {
                    expected: "text",
                    found: "json object",
                    message: e.to_string(),
                    source: None,
                }
                .with_source(e),
            )
        })
    }
}
