//! Error types for schema construction, row scanning and cursor handling.

use std::error::Error as StdError;
use std::fmt;

/// Boxed error used as the `source` of cursor and decode failures.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The result type used throughout dbmap.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure the mapping engine can report.
#[derive(Debug)]
pub enum Error {
    /// A schema was requested for a type that is not a struct with named fields.
    NotARecordType {
        type_name: &'static str,
        kind: &'static str,
    },
    /// Two fields (at any embedding depth) resolve to the same column.
    DuplicateColumn {
        column: String,
        record: &'static str,
    },
    /// No registered converter accepts the field's type.
    UnsupportedField {
        field: String,
        type_name: &'static str,
    },
    /// The scan target is not the record type the schema was built for.
    IncompatibleTarget {
        expected: &'static str,
        actual: String,
    },
    /// A column reported by the cursor is absent from the schema and the
    /// schema was configured to reject unknown columns.
    UnknownColumn(String),
    /// The cursor could not report its column list.
    ColumnListUnavailable(CursorError),
    /// The cursor's scan primitive failed.
    Scan(ScanError),
    /// A raw column value could not be decoded into the receiving value.
    Decode(DecodeError),
    /// The cursor reported a failure (including its end-of-iteration error).
    Cursor(CursorError),
    /// A field's converter cannot produce a column value.
    EncodeUnsupported {
        field: String,
        converter: &'static str,
    },
}

impl Error {
    /// Shorthand for a cursor failure carrying only a message.
    pub fn cursor(message: impl Into<String>) -> Self {
        Error::Cursor(CursorError::new(message))
    }

    /// Shorthand for a decode failure.
    pub fn decode(expected: &'static str, found: &'static str, message: impl Into<String>) -> Self {
        Error::Decode(DecodeError {
            expected,
            found,
            message: message.into(),
            source: None,
        })
    }

    /// Whether this error was produced while building a schema.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Error::NotARecordType { .. }
                | Error::DuplicateColumn { .. }
                | Error::UnsupportedField { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotARecordType { type_name, kind } => {
                write!(f, "argument is not a struct, {} is a {}", type_name, kind)
            }
            Error::DuplicateColumn { column, record } => {
                write!(f, "duplicate mapping for {:?} on {}", column, record)
            }
            Error::UnsupportedField { field, type_name } => {
                write!(f, "unsupported field: {} (type={})", field, type_name)
            }
            Error::IncompatibleTarget { expected, actual } => write!(
                f,
                "mapping type ({}) is not convertible to the scan target ({})",
                expected, actual
            ),
            Error::UnknownColumn(column) => write!(f, "column {:?} is not mapped", column),
            Error::ColumnListUnavailable(err) => write!(f, "column list unavailable: {}", err),
            Error::Scan(err) => write!(f, "{}", err),
            Error::Decode(err) => write!(f, "{}", err),
            Error::Cursor(err) => write!(f, "{}", err),
            Error::EncodeUnsupported { field, converter } => write!(
                f,
                "converter {} cannot encode field {}",
                converter, field
            ),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::ColumnListUnavailable(err) | Error::Cursor(err) => err.source(),
            Error::Decode(err) => err.source(),
            _ => None,
        }
    }
}

/// A failure reported by the cursor's scan primitive.
///
/// When the cursor's message names a placeholder position the scanner
/// re-expresses it with `index` and the `receiver` type that sat at that
/// position. Otherwise both are `None` and `message` is the cursor's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    pub index: Option<usize>,
    pub message: String,
    pub receiver: Option<&'static str>,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.index, self.receiver) {
            (Some(index), Some(receiver)) => write!(
                f,
                "scan error on index {}: {} (recv: {})",
                index, self.message, receiver
            ),
            (Some(index), None) => write!(f, "scan error on index {}: {}", index, self.message),
            _ => write!(f, "scan error: {}", self.message),
        }
    }
}

/// A raw column value whose runtime shape the receiver does not understand.
#[derive(Debug)]
pub struct DecodeError {
    /// The receiving type.
    pub expected: &'static str,
    /// The kind of raw value that was offered.
    pub found: &'static str,
    pub message: String,
    pub source: Option<BoxError>,
}

impl DecodeError {
    /// Attach an underlying error.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "can not decode {} into {}: {}",
            self.found, self.expected, self.message
        )
    }
}

/// A failure raised by the external row cursor.
#[derive(Debug)]
pub struct CursorError {
    pub message: String,
    pub source: Option<BoxError>,
}

impl CursorError {
    /// Create a cursor error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Attach an underlying error.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl fmt::Display for CursorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
