//! Hand-written record fixtures for unit tests.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::cursor::MemoryRow;
use crate::record::{ColumnTag, Record, RecordDescriptor};
use crate::value::Value;

/// Builds a `FieldDescriptor` the way `#[derive(Record)]` does.
macro_rules! field {
    ($owner:ty, $name:ident, $tag:expr, $ty:ty) => {{
        #[allow(unused_imports)]
        use $crate::probe::{
            DecodeFallback as _, DecodeImpl as _, EncodeFallback as _, EncodeImpl as _,
            JsonFallback as _, JsonImpl as _, Probe,
        };
        $crate::record::FieldDescriptor::new(
            stringify!($name),
            $tag,
            $crate::probe::field_type::<$ty>(
                (&Probe::<$ty>::new()).decode_hook(),
                (&Probe::<$ty>::new()).encode_hook(),
                (&Probe::<$ty>::new()).json_hooks(),
            ),
            |record| {
                record
                    .downcast_ref::<$owner>()
                    .map(|r| &r.$name as &dyn ::std::any::Any)
            },
            |record| {
                record
                    .downcast_mut::<$owner>()
                    .map(|r| &mut r.$name as &mut dyn ::std::any::Any)
            },
        )
    }};
}

pub(crate) use field;

#[derive(Debug, Default, PartialEq)]
pub(crate) struct Inner {
    pub(crate) secret: Vec<u8>,
    pub(crate) splart: DateTime<Utc>,
}

impl Record for Inner {
    fn descriptor() -> RecordDescriptor {
        RecordDescriptor::record::<Self>(vec![
            field!(Inner, secret, ColumnTag::Infer, Vec<u8>),
            field!(Inner, splart, ColumnTag::Infer, DateTime<Utc>),
        ])
    }
}

#[derive(Debug, Default, PartialEq)]
pub(crate) struct Outer {
    pub(crate) foo: i64,
    pub(crate) bar: String,
    pub(crate) dur: Duration,
    pub(crate) inner: Inner,
    pub(crate) ignored: Vec<String>,
}

impl Record for Outer {
    fn descriptor() -> RecordDescriptor {
        RecordDescriptor::record::<Self>(vec![
            field!(Outer, foo, ColumnTag::Infer, i64),
            field!(Outer, bar, ColumnTag::Named("bar"), String),
            field!(Outer, dur, ColumnTag::Infer, Duration),
            field!(Outer, inner, ColumnTag::Infer, Inner).embedded(Inner::descriptor),
            field!(Outer, ignored, ColumnTag::Skip, Vec<String>),
        ])
    }
}

pub(crate) fn splart() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2019, 3, 14, 15, 9, 26)
        .single()
        .unwrap_or_default()
}

/// A row matching every column of [`Outer`].
pub(crate) fn outer_row() -> MemoryRow {
    MemoryRow::from_pairs([
        ("foo", Value::Int(42)),
        ("bar", Value::from("yep")),
        ("dur", Value::Interval(Duration::from_secs(12))),
        ("splart", Value::Timestamp(splart())),
        ("secret", Value::Bytes(vec![1, 2, 3])),
    ])
}
