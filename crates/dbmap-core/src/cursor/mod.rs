//! The row cursor capability consumed by the engine.
//!
//! A cursor is the pull side of a query: it reports its column list once,
//! advances row by row, binds the current row's raw values into the
//! placeholders the scanner hands it, and is closed when the consumer is done.
//! Drivers implement [`Row`] and [`Rows`]; [`MemoryRows`] is an in-memory
//! implementation for tests and fixtures.

mod memory;

pub use memory::{MemoryRow, MemoryRows};

use std::any::Any;
use std::fmt;

use crate::error::Result;
use crate::value::Value;

/// A receiver the cursor writes a raw column value into.
///
/// Converters hand one `ScanTarget` per mapped column to the cursor and read
/// it back during the commit phase.
pub trait ScanTarget: Send {
    /// Bind a raw column value into this receiver.
    fn bind(&mut self, raw: Value) -> Result<()>;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Name of the concrete receiver type, used in scan diagnostics.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// One scan slot, positionally aligned with the cursor's column list.
///
/// Columns the schema does not map get a discard slot, so a cursor can always
/// bind every column it reports.
#[derive(Default)]
pub struct Placeholder {
    target: Option<Box<dyn ScanTarget>>,
}

impl Placeholder {
    /// A slot whose value is dropped.
    pub fn discard() -> Self {
        Self { target: None }
    }

    /// A slot bound to a converter's receiver.
    pub fn bound(target: Box<dyn ScanTarget>) -> Self {
        Self {
            target: Some(target),
        }
    }

    pub fn is_discard(&self) -> bool {
        self.target.is_none()
    }

    /// Write a raw value into the slot.
    pub fn bind(&mut self, raw: Value) -> Result<()> {
        match self.target.as_mut() {
            Some(target) => target.bind(raw),
            None => Ok(()),
        }
    }

    /// Name of the receiver type behind the slot.
    pub fn receiver_type(&self) -> &'static str {
        self.target
            .as_ref()
            .map_or("discard", |target| target.type_name())
    }

    pub(crate) fn target_mut(&mut self) -> Option<&mut (dyn ScanTarget + 'static)> {
        self.target.as_deref_mut()
    }
}

impl fmt::Debug for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Placeholder")
            .field(&self.receiver_type())
            .finish()
    }
}

/// A single positioned row that can be scanned.
pub trait Row {
    /// Bind the current row's values into `dest`, one slot per column in the
    /// order of the cursor's column list.
    fn scan(&mut self, dest: &mut [Placeholder]) -> Result<()>;
}

/// A multi-row cursor.
///
/// States: before the first row, positioned on a row, exhausted, closed.
/// `close` may be called more than once; the engine calls it exactly once per
/// scan operation.
pub trait Rows: Row {
    /// The ordered column names. Stable for the cursor's lifetime.
    fn columns(&mut self) -> Result<Vec<String>>;

    /// Move to the next row, returning whether one became available.
    fn advance(&mut self) -> bool;

    /// The error that ended iteration, if any.
    fn last_error(&mut self) -> Option<crate::Error>;

    fn close(&mut self) -> Result<()>;
}

impl<R: Row + ?Sized> Row for &mut R {
    fn scan(&mut self, dest: &mut [Placeholder]) -> Result<()> {
        (**self).scan(dest)
    }
}

impl<R: Rows + ?Sized> Rows for &mut R {
    fn columns(&mut self) -> Result<Vec<String>> {
        (**self).columns()
    }

    fn advance(&mut self) -> bool {
        (**self).advance()
    }

    fn last_error(&mut self) -> Option<crate::Error> {
        (**self).last_error()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

impl<R: Row + ?Sized> Row for Box<R> {
    fn scan(&mut self, dest: &mut [Placeholder]) -> Result<()> {
        (**self).scan(dest)
    }
}

impl<R: Rows + ?Sized> Rows for Box<R> {
    fn columns(&mut self) -> Result<Vec<String>> {
        (**self).columns()
    }

    fn advance(&mut self) -> bool {
        (**self).advance()
    }

    fn last_error(&mut self) -> Option<crate::Error> {
        (**self).last_error()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Owns a cursor for the duration of a scan and closes it exactly once when
/// dropped, whichever way the scan exits.
pub(crate) struct CursorGuard<C: Rows> {
    rows: C,
}

impl<C: Rows> CursorGuard<C> {
    pub(crate) fn new(rows: C) -> Self {
        Self { rows }
    }

    pub(crate) fn rows(&mut self) -> &mut C {
        &mut self.rows
    }
}

impl<C: Rows> Drop for CursorGuard<C> {
    fn drop(&mut self) {
        if let Err(e) = self.rows.close() {
            tracing::warn!(error = %e, "Failed to close row cursor");
        }
    }
}
