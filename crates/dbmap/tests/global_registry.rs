//! Runs in its own test binary: it changes the process-wide registry.

use std::any::Any;

use dbmap::prelude::*;
use dbmap::{FieldType, RawSlot, ScanTarget, global_registry, receiver_mut, register_converter};

/// A point stored as `"x,y"` text.
#[derive(Debug, Default, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}

#[derive(Debug)]
struct PointConverter;

impl Converter for PointConverter {
    fn name(&self) -> &'static str {
        "point"
    }

    fn accepts(&self, ty: &FieldType) -> bool {
        ty.is::<Point>()
    }

    fn receive(&self, _field: &mut dyn Any, _ty: &FieldType) -> Box<dyn ScanTarget> {
        Box::new(RawSlot::default())
    }

    fn commit(
        &self,
        field: &mut dyn Any,
        ty: &FieldType,
        scanned: &mut dyn ScanTarget,
    ) -> dbmap::Result<()> {
        let Some(raw) = receiver_mut::<RawSlot>(scanned, ty)?.take() else {
            return Ok(());
        };
        let text = raw.as_str().unwrap_or_default();
        let (x, y) = text
            .split_once(',')
            .and_then(|(x, y)| Some((x.trim().parse().ok()?, y.trim().parse().ok()?)))
            .ok_or_else(|| Error::decode("Point", raw.kind(), format!("bad point {text:?}")))?;
        if let Some(point) = field.downcast_mut::<Point>() {
            *point = Point { x, y };
        }
        Ok(())
    }

    fn encode(&self, field: &dyn Any, ty: &FieldType) -> dbmap::Result<Value> {
        field
            .downcast_ref::<Point>()
            .map(|p| Value::Text(format!("{},{}", p.x, p.y)))
            .ok_or_else(|| Error::decode("Point", "field", ty.type_name()))
    }
}

#[derive(Record, Debug, Default)]
struct Marker {
    label: String,
    at: Point,
}

#[test]
fn registered_converters_apply_to_later_schemas() {
    assert!(matches!(
        Schema::<Marker>::build(),
        Err(Error::UnsupportedField { ref field, .. }) if field == "at"
    ));

    register_converter(PointConverter);
    assert_eq!(global_registry().names()[0], "point");

    let schema = Schema::<Marker>::build().unwrap();
    let mut marker = Marker::default();
    let rows = MemoryRows::new(vec![MemoryRow::from_pairs([
        ("label", Value::from("home")),
        ("at", Value::from("3, 4")),
    ])]);
    assert!(schema.scan_one(&mut marker, rows).unwrap());
    assert_eq!(marker.at, Point { x: 3, y: 4 });

    let encoded = schema.encode(&marker).unwrap();
    assert_eq!(encoded[1], ("at", Value::from("3,4")));
}
