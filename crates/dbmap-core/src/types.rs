//! Wrapper types with their own column encoding.

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::convert::{Decode, Encode};
use crate::error::{DecodeError, Error, Result};
use crate::value::Value;

/// Stores any serde type as JSON text.
///
/// Unlike [`JsonObject`](crate::JsonObject) fields, the wrapped value may be
/// any JSON shape. A NULL column decodes as JSON `null`, so `Json<Option<T>>`
/// accepts NULL and `Json<T>` for a non-nullable `T` rejects it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T> From<T> for Json<T> {
    fn from(value: T) -> Self {
        Json(value)
    }
}

fn json_error<T>(found: &'static str, err: serde_json::Error) -> Error {
    Error::Decode(
        DecodeError {
            expected: std::any::type_name::<T>(),
            found,
            message: err.to_string(),
            source: None,
        }
        .with_source(err),
    )
}

impl<T: DeserializeOwned> Decode for Json<T> {
    fn decode(&mut self, raw: Value) -> Result<()> {
        let decoded = match &raw {
            Value::Text(text) => serde_json::from_str(text),
            Value::Bytes(bytes) => serde_json::from_slice(bytes),
            Value::Null => serde_json::from_value(serde_json::Value::Null),
            other => {
                return Err(Error::decode(
                    std::any::type_name::<T>(),
                    other.kind(),
                    format!("can not decode json from {}", other),
                ));
            }
        };
        self.0 = decoded.map_err(|e| json_error::<T>(raw.kind(), e))?;
        Ok(())
    }
}

impl<T: Serialize> Encode for Json<T> {
    fn encode(&self) -> Result<Value> {
        serde_json::to_string(&self.0)
            .map(Value::Text)
            .map_err(|e| json_error::<T>("json", e))
    }
}
