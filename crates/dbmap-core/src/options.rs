//! Schema options.

/// How a schema treats columns the cursor reports but the record does not map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownColumns {
    /// Bind them to a discard slot. Queries may return extra columns.
    #[default]
    Ignore,
    /// Fail the scan with [`Error::UnknownColumn`](crate::Error::UnknownColumn).
    Reject,
}

/// Options fixed into a schema when it is built.
///
/// # Example
///
/// ```ignore
/// let options = Options::new()
///     .reject_unknown_columns()
///     .stream_thread_name("hero-stream");
/// let schema = Schema::<Hero>::build_with(&global_registry(), options)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub unknown_columns: UnknownColumns,
    /// Name given to the producer thread of `scan_stream`.
    pub stream_thread_name: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            unknown_columns: UnknownColumns::default(),
            stream_thread_name: "dbmap-stream".to_string(),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unknown-column policy.
    pub fn unknown_columns(mut self, policy: UnknownColumns) -> Self {
        self.unknown_columns = policy;
        self
    }

    /// Fail scans whose cursor reports a column the schema does not map.
    pub fn reject_unknown_columns(self) -> Self {
        self.unknown_columns(UnknownColumns::Reject)
    }

    /// Set the producer thread name used by `scan_stream`.
    pub fn stream_thread_name(mut self, name: impl Into<String>) -> Self {
        self.stream_thread_name = name.into();
        self
    }
}
