//! In-memory cursor implementation.
//!
//! Rows are built from `(column, value)` pairs; columns are sorted by name so
//! the reported column order is deterministic. Failures can be injected at
//! each point of the cursor protocol to exercise the consumer's error paths.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Placeholder, Row, Rows};
use crate::error::{CursorError, Error, Result};
use crate::value::Value;

/// A single row with named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryRow {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl MemoryRow {
    /// Build a row from `(column, value)` pairs. Columns are sorted by name.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let sorted: BTreeMap<String, Value> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let (columns, values): (Vec<String>, Vec<Value>) = sorted.into_iter().unzip();
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Get the value of a named column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }
}

impl Row for MemoryRow {
    fn scan(&mut self, dest: &mut [Placeholder]) -> Result<()> {
        if dest.len() != self.values.len() {
            return Err(Error::cursor(format!(
                "sql: expected {} destination arguments in Scan, not {}",
                self.values.len(),
                dest.len()
            )));
        }
        for (idx, (slot, value)) in dest.iter_mut().zip(&self.values).enumerate() {
            if let Err(err) = slot.bind(value.clone()) {
                return Err(Error::Cursor(
                    CursorError::new(format!(
                        "sql: Scan error on column index {}, name {:?}: {}",
                        idx, self.columns[idx], err
                    ))
                    .with_source(err),
                ));
            }
        }
        Ok(())
    }
}

/// A multi-row in-memory cursor.
///
/// The column list is taken from the first row.
#[derive(Debug, Default)]
pub struct MemoryRows {
    rows: Vec<MemoryRow>,
    current: Option<usize>,
    closed: bool,
    columns_error: Option<String>,
    scan_failures: BTreeMap<usize, String>,
    end_error: Option<String>,
    closes: Arc<AtomicUsize>,
}

impl MemoryRows {
    pub fn new(rows: Vec<MemoryRow>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// A cursor with no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Make `columns()` fail with the given message.
    pub fn fail_columns(mut self, message: impl Into<String>) -> Self {
        self.columns_error = Some(message.into());
        self
    }

    /// Make scanning the zero-based row `row` fail with the given message.
    pub fn fail_scan_at(mut self, row: usize, message: impl Into<String>) -> Self {
        self.scan_failures.insert(row, message.into());
        self
    }

    /// Report an error from `last_error()` once the rows are exhausted.
    pub fn with_end_error(mut self, message: impl Into<String>) -> Self {
        self.end_error = Some(message.into());
        self
    }

    /// Shared counter of `close()` calls, readable after the cursor moved away.
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn exhausted(&self) -> bool {
        self.current.is_some_and(|idx| idx >= self.rows.len())
    }
}

impl Row for MemoryRows {
    fn scan(&mut self, dest: &mut [Placeholder]) -> Result<()> {
        if self.closed {
            return Err(Error::cursor("sql: Rows are closed"));
        }
        let idx = match self.current {
            Some(idx) if idx < self.rows.len() => idx,
            _ => return Err(Error::cursor("sql: Scan called without calling Next")),
        };
        if let Some(message) = self.scan_failures.get(&idx) {
            return Err(Error::cursor(message.clone()));
        }
        self.rows[idx].scan(dest)
    }
}

impl Rows for MemoryRows {
    fn columns(&mut self) -> Result<Vec<String>> {
        if let Some(message) = &self.columns_error {
            return Err(Error::ColumnListUnavailable(CursorError::new(message.clone())));
        }
        if self.closed {
            return Err(Error::ColumnListUnavailable(CursorError::new(
                "sql: Rows are closed",
            )));
        }
        Ok(self
            .rows
            .first()
            .map(|row| row.columns.clone())
            .unwrap_or_default())
    }

    fn advance(&mut self) -> bool {
        if self.closed {
            return false;
        }
        let next = self.current.map_or(0, |idx| idx + 1);
        self.current = Some(next.min(self.rows.len()));
        next < self.rows.len()
    }

    fn last_error(&mut self) -> Option<Error> {
        if self.exhausted() {
            self.end_error.take().map(Error::cursor)
        } else {
            None
        }
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
