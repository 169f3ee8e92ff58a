//! Capability detection used by `#[derive(Record)]`.
//!
//! The derive cannot see which traits a field type implements, so it emits
//! method calls on `&Probe<T>`. When `T` implements the engine trait the
//! inherent-looking `*Impl` method on `Probe<T>` is found first; otherwise
//! method resolution autorefs once more and lands on the `*Fallback` impl for
//! `&Probe<T>`, which reports the capability as absent. This only resolves as
//! intended for concrete types, which is why the derive rejects generics.

use std::any::Any;
use std::marker::PhantomData;

use crate::convert::{Decode, Encode, JsonObject, decode_hook, encode_hook, json_hooks};
use crate::record::{Capabilities, DecodeHook, EncodeHook, FieldType, JsonHooks};

pub struct Probe<T>(PhantomData<T>);

impl<T> Probe<T> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Probe<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub trait DecodeImpl {
    fn decode_hook(&self) -> Option<DecodeHook>;
}

impl<T: Decode + Any> DecodeImpl for Probe<T> {
    fn decode_hook(&self) -> Option<DecodeHook> {
        Some(decode_hook::<T>)
    }
}

pub trait DecodeFallback {
    fn decode_hook(&self) -> Option<DecodeHook>;
}

impl<T> DecodeFallback for &Probe<T> {
    fn decode_hook(&self) -> Option<DecodeHook> {
        None
    }
}

pub trait EncodeImpl {
    fn encode_hook(&self) -> Option<EncodeHook>;
}

impl<T: Encode + Any> EncodeImpl for Probe<T> {
    fn encode_hook(&self) -> Option<EncodeHook> {
        Some(encode_hook::<T>)
    }
}

pub trait EncodeFallback {
    fn encode_hook(&self) -> Option<EncodeHook>;
}

impl<T> EncodeFallback for &Probe<T> {
    fn encode_hook(&self) -> Option<EncodeHook> {
        None
    }
}

pub trait JsonImpl {
    fn json_hooks(&self) -> Option<JsonHooks>;
}

impl<T: JsonObject> JsonImpl for Probe<T> {
    fn json_hooks(&self) -> Option<JsonHooks> {
        Some(json_hooks::<T>())
    }
}

pub trait JsonFallback {
    fn json_hooks(&self) -> Option<JsonHooks>;
}

impl<T> JsonFallback for &Probe<T> {
    fn json_hooks(&self) -> Option<JsonHooks> {
        None
    }
}

/// Assemble a field type from the probed capabilities.
pub fn field_type<T: Any>(
    decode: Option<DecodeHook>,
    encode: Option<EncodeHook>,
    json: Option<JsonHooks>,
) -> FieldType {
    FieldType::of::<T>().with_capabilities(Capabilities {
        decode,
        encode,
        json,
    })
}
