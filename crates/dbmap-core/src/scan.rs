//! Row scanning.
//!
//! Scanning is two-phase. Every mapped column first gets a receiver from its
//! converter and the cursor binds the whole row into those receivers in one
//! call. Only then is each receiver committed into its field, so a row that
//! fails to bind leaves the target untouched.

use std::any::Any;
use std::sync::OnceLock;

use regex::Regex;

use crate::cursor::{Placeholder, Row};
use crate::error::{Error, Result, ScanError};
use crate::options::UnknownColumns;
use crate::schema::{MappedField, Mapping};

/// Cursor messages naming a placeholder, e.g.
/// `sql: Scan error on column index 2, name "dur": bad value`.
const INDEX_PATTERN: &str = r#"(?s)index (\d+)(?:, name "[^"]*")?: (.+)$"#;

fn index_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| match Regex::new(INDEX_PATTERN) {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::warn!(error = %e, "Invalid scan index pattern, scan errors will not be translated");
                None
            }
        })
        .as_ref()
}

/// Re-express a cursor failure that names a zero-based placeholder index as a
/// [`ScanError`] carrying the receiver type at that position. Anything else
/// is returned unchanged.
pub(crate) fn translate_scan_error(err: Error, placeholders: &[Placeholder]) -> Error {
    let Error::Cursor(cursor) = &err else {
        return err;
    };
    let Some(caps) = index_pattern().and_then(|re| re.captures(&cursor.message)) else {
        return err;
    };
    let index = caps.get(1).and_then(|m| m.as_str().parse::<usize>().ok());
    let message = caps.get(2).map_or("", |m| m.as_str());
    match index {
        Some(index) if index < placeholders.len() => Error::Scan(ScanError {
            index: Some(index),
            message: message.to_string(),
            receiver: Some(placeholders[index].receiver_type()),
        }),
        _ => err,
    }
}

pub(crate) fn scan_row<W: Row + ?Sized>(
    mapping: &Mapping,
    target: &mut dyn Any,
    row: &mut W,
    columns: &[String],
) -> Result<()> {
    mapping.check_target(&*target)?;

    let mut placeholders = Vec::with_capacity(columns.len());
    let mut mapped: Vec<Option<&MappedField>> = Vec::with_capacity(columns.len());
    for column in columns {
        let Some(field) = mapping.field(column) else {
            if mapping.options().unknown_columns == UnknownColumns::Reject {
                return Err(Error::UnknownColumn(column.clone()));
            }
            placeholders.push(Placeholder::discard());
            mapped.push(None);
            continue;
        };
        let slot = field
            .resolve_mut(target)
            .ok_or_else(|| mapping.unreachable_field(field))?;
        placeholders.push(Placeholder::bound(field.converter.receive(slot, &field.ty)));
        mapped.push(Some(field));
    }

    row.scan(&mut placeholders)
        .map_err(|err| translate_scan_error(err, &placeholders))?;

    for (placeholder, field) in placeholders.iter_mut().zip(mapped) {
        let (Some(field), Some(scanned)) = (field, placeholder.target_mut()) else {
            continue;
        };
        let slot = field
            .resolve_mut(target)
            .ok_or_else(|| mapping.unreachable_field(field))?;
        field.converter.commit(slot, &field.ty, scanned)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::convert::{RawSlot, Registry};
    use crate::cursor::MemoryRow;
    use crate::error::CursorError;
    use crate::options::Options;
    use crate::schema::Schema;
    use crate::testing::{Outer, outer_row};
    use crate::value::Value;

    fn schema(options: Options) -> Schema<Outer> {
        Schema::build_with(&Registry::standard(), options).unwrap()
    }

    fn columns(row: &MemoryRow) -> Vec<String> {
        row.columns().to_vec()
    }

    #[test]
    fn test_scans_nested_fields() {
        let mut row = outer_row();
        let mut outer = Outer::default();
        schema(Options::default())
            .scan_row(&mut outer, &mut row, &columns(&outer_row()))
            .unwrap();
        assert_eq!(outer.foo, 42);
        assert_eq!(outer.bar, "yep");
        assert_eq!(outer.dur, Duration::from_secs(12));
        assert_eq!(outer.inner.secret, vec![1, 2, 3]);
    }

    #[test]
    fn test_unknown_columns_are_ignored() {
        let mut row = MemoryRow::from_pairs([("foo", Value::Int(7)), ("zzz", Value::from("extra"))]);
        let cols = columns(&row);
        let mut outer = Outer::default();
        schema(Options::default())
            .scan_row(&mut outer, &mut row, &cols)
            .unwrap();
        assert_eq!(outer.foo, 7);
    }

    #[test]
    fn test_unknown_columns_can_be_rejected() {
        let mut row = MemoryRow::from_pairs([("foo", Value::Int(7)), ("zzz", Value::from("extra"))]);
        let cols = columns(&row);
        let mut outer = Outer::default();
        let err = schema(Options::new().reject_unknown_columns())
            .scan_row(&mut outer, &mut row, &cols)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownColumn(ref c) if c == "zzz"));
        assert_eq!(outer.foo, 0);
    }

    #[test]
    fn test_conversion_failure_names_the_column() {
        let mut row = MemoryRow::from_pairs([
            ("bar", Value::from("written")),
            ("foo", Value::from("not a number")),
        ]);
        let cols = columns(&row);
        let mut outer = Outer::default();
        let err = schema(Options::default())
            .scan_row(&mut outer, &mut row, &cols)
            .unwrap_err();
        match err {
            Error::Scan(scan) => {
                assert_eq!(scan.index, Some(1));
                assert!(scan.message.contains("not a number"));
                assert!(scan.receiver.unwrap().ends_with("ScalarSlot"));
            }
            other => panic!("expected a scan error, got {other:?}"),
        }
        assert!(outer.bar.is_empty());
        assert_eq!(outer.foo, 0);
    }

    #[test]
    fn test_null_into_non_optional_field_names_the_column() {
        let mut row = MemoryRow::from_pairs([("foo", Value::Null)]);
        let cols = columns(&row);
        let err = schema(Options::default())
            .scan_row(&mut Outer::default(), &mut row, &cols)
            .unwrap_err();
        assert!(matches!(err, Error::Scan(ScanError { index: Some(0), .. })));
        assert!(err.to_string().contains("converting NULL to i64 is unsupported"));
    }

    #[test]
    fn test_translates_indexed_cursor_errors() {
        let placeholders = vec![
            Placeholder::discard(),
            Placeholder::bound(Box::new(RawSlot::default())),
        ];
        let err = Error::Cursor(CursorError::new(
            "sql: Scan error on column index 1, name \"dur\": converting NULL is unsupported",
        ));
        match translate_scan_error(err, &placeholders) {
            Error::Scan(scan) => {
                assert_eq!(scan.index, Some(1));
                assert_eq!(scan.message, "converting NULL is unsupported");
                assert!(scan.receiver.unwrap().ends_with("RawSlot"));
            }
            other => panic!("expected a scan error, got {other:?}"),
        }
    }

    #[test]
    fn test_unmatched_errors_pass_through() {
        let placeholders = vec![Placeholder::discard()];
        let err = translate_scan_error(Error::cursor("connection reset"), &placeholders);
        assert_eq!(err.to_string(), "connection reset");

        let err = translate_scan_error(
            Error::cursor("Scan error on column index 9: out of range"),
            &placeholders,
        );
        assert!(matches!(err, Error::Cursor(_)));

        let err = translate_scan_error(Error::UnknownColumn("x".into()), &placeholders);
        assert!(matches!(err, Error::UnknownColumn(_)));
    }

    #[test]
    fn test_failed_scan_leaves_target_untouched() {
        let mut row = MemoryRow::from_pairs([("foo", Value::Int(1)), ("bar", Value::from("x"))]);
        let mut outer = Outer::default();
        // Column list longer than the row: the cursor rejects the scan.
        let cols = vec!["bar".to_string(), "foo".to_string(), "dur".to_string()];
        let err = schema(Options::default())
            .scan_row(&mut outer, &mut row, &cols)
            .unwrap_err();
        assert!(err.to_string().contains("destination arguments"));
        assert_eq!(outer.foo, 0);
        assert!(outer.bar.is_empty());
    }
}
