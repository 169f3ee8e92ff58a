//! Cursor consumers.
//!
//! Every consumer takes ownership of the cursor and closes it exactly once,
//! whichever way it finishes.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;

use crate::cursor::{CursorGuard, Rows};
use crate::error::{CursorError, Error, Result};
use crate::record::Record;
use crate::schema::Mapping;

pub(crate) fn scan_one<C: Rows>(mapping: &Mapping, target: &mut dyn Any, rows: C) -> Result<bool> {
    let mut guard = CursorGuard::new(rows);
    let columns = guard.rows().columns()?;
    if !guard.rows().advance() {
        return Ok(false);
    }
    crate::scan::scan_row(mapping, target, guard.rows(), &columns)?;
    Ok(true)
}

/// Scans the rows of a cursor on the calling thread.
///
/// Yields one record per row. After an error, or after the cursor's
/// end-of-iteration error, the iterator is finished. The cursor is closed
/// when the iterator is dropped.
pub struct RowIter<R, C: Rows> {
    mapping: Arc<Mapping>,
    guard: CursorGuard<C>,
    columns: Option<Vec<String>>,
    finished: bool,
    scanned: usize,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record + Default, C: Rows> RowIter<R, C> {
    pub(crate) fn new(mapping: Arc<Mapping>, rows: C) -> Self {
        Self {
            mapping,
            guard: CursorGuard::new(rows),
            columns: None,
            finished: false,
            scanned: 0,
            _record: PhantomData,
        }
    }

    fn fail(&mut self, err: Error) -> Option<Result<R>> {
        self.finished = true;
        Some(Err(err))
    }
}

impl<R: Record + Default, C: Rows> Iterator for RowIter<R, C> {
    type Item = Result<R>;

    fn next(&mut self) -> Option<Result<R>> {
        if self.finished {
            return None;
        }
        let columns = match self.columns.take() {
            Some(columns) => columns,
            None => match self.guard.rows().columns() {
                Ok(columns) => columns,
                Err(e) => return self.fail(e),
            },
        };

        if !self.guard.rows().advance() {
            self.finished = true;
            tracing::debug!(
                record = self.mapping.record_name(),
                rows = self.scanned,
                "Cursor exhausted"
            );
            return self.guard.rows().last_error().map(Err);
        }

        let mut record = R::default();
        let scanned = crate::scan::scan_row(&self.mapping, &mut record, self.guard.rows(), &columns);
        self.columns = Some(columns);
        match scanned {
            Ok(()) => {
                self.scanned += 1;
                Some(Ok(record))
            }
            Err(e) => self.fail(e),
        }
    }
}

/// Scan every row or fail with the first error. Rows scanned before the
/// failure are dropped.
#[tracing::instrument(level = "debug", skip_all, fields(record = rows.mapping.record_name()))]
pub(crate) fn scan_all<R: Record + Default, C: Rows>(rows: RowIter<R, C>) -> Result<Vec<R>> {
    rows.collect()
}

/// Records scanned on a producer thread, handed over one at a time.
///
/// The producer blocks until each record is taken, and checks for
/// cancellation before advancing the cursor and before each hand-over.
/// Dropping the stream or calling [`RowStream::cancel`] stops the producer,
/// which then closes the cursor.
pub struct RowStream<R> {
    receiver: Option<Receiver<Result<R>>>,
    pending: Option<Error>,
    cancelled: Arc<AtomicBool>,
}

impl<R: Record + Default + Send> RowStream<R> {
    pub(crate) fn spawn<C: Rows + Send + 'static>(rows: RowIter<R, C>, thread_name: &str) -> Self {
        let (tx, rx) = mpsc::sync_channel(0);
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        tracing::debug!(
            record = rows.mapping.record_name(),
            thread = thread_name,
            "Starting row stream"
        );
        let spawned = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || produce(rows, &tx, &flag));

        match spawned {
            Ok(_) => Self {
                receiver: Some(rx),
                pending: None,
                cancelled,
            },
            // The closure, and with it the cursor, has already been dropped
            // and closed.
            Err(e) => Self {
                receiver: None,
                pending: Some(Error::Cursor(
                    CursorError::new(format!("failed to start row stream: {}", e)).with_source(e),
                )),
                cancelled,
            },
        }
    }
}

impl<R> RowStream<R> {
    /// Stop the producer. Records not yet taken are discarded.
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        self.receiver = None;
        self.pending = None;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl<R> Iterator for RowStream<R> {
    type Item = Result<R>;

    fn next(&mut self) -> Option<Result<R>> {
        if let Some(err) = self.pending.take() {
            return Some(Err(err));
        }
        let item = self.receiver.as_ref()?.recv().ok();
        if item.is_none() {
            self.receiver = None;
        }
        item
    }
}

impl<R> Drop for RowStream<R> {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

fn produce<R, C>(mut rows: RowIter<R, C>, tx: &SyncSender<Result<R>>, cancelled: &AtomicBool)
where
    R: Record + Default,
    C: Rows,
{
    loop {
        if cancelled.load(Ordering::Acquire) {
            tracing::debug!(rows = rows.scanned, "Row stream cancelled");
            return;
        }
        let Some(item) = rows.next() else {
            return;
        };
        if cancelled.load(Ordering::Acquire) {
            tracing::debug!(rows = rows.scanned, "Row stream cancelled");
            return;
        }
        if tx.send(item).is_err() {
            tracing::debug!(rows = rows.scanned, "Row stream abandoned");
            return;
        }
    }
}
