//! Statement-level log sinks.
//!
//! Every statement a [`Database`](crate::Database) implementation executes is
//! recorded to the handle's [`LoggerRegistry`], an ordered, interior-mutable
//! list of [`SqlLogger`] sinks. The registry can be suspended for a scope —
//! sinks are drained into an RAII guard and put back, unchanged and in the
//! same order, when the guard drops — which is how connection switches and
//! anonymous-class binds run without statement noise.

use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A record of one executed statement.
#[derive(Debug, Clone)]
pub struct StatementLog {
    /// The SQL text that was executed
    pub sql: String,
    /// Rows affected, when the statement reports it
    pub rows_affected: Option<u64>,
    /// Wall-clock execution time
    pub elapsed: Duration,
}

impl StatementLog {
    /// Create a record for a statement that reported affected rows.
    pub fn new(sql: impl Into<String>, rows_affected: Option<u64>, elapsed: Duration) -> Self {
        Self {
            sql: sql.into(),
            rows_affected,
            elapsed,
        }
    }
}

impl fmt::Display for StatementLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rows_affected {
            Some(n) => write!(f, "({:?}) {} [{n} rows]", self.elapsed, self.sql),
            None => write!(f, "({:?}) {}", self.elapsed, self.sql),
        }
    }
}

/// A destination for statement records.
pub trait SqlLogger: Send + Sync {
    /// Receive one statement record.
    fn log(&self, entry: &StatementLog);
}

/// An ordered list of statement log sinks attached to a database handle.
///
/// The list is interior-mutable so sinks can be added, cleared, and restored
/// on a shared handle. `record` fans an entry out to every sink in order.
#[derive(Default)]
pub struct LoggerRegistry {
    sinks: Mutex<Vec<Arc<dyn SqlLogger>>>,
}

impl LoggerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sink to the list.
    pub fn add(&self, sink: Arc<dyn SqlLogger>) {
        self.sinks.lock().unwrap().push(sink);
    }

    /// Number of attached sinks.
    pub fn len(&self) -> usize {
        self.sinks.lock().unwrap().len()
    }

    /// Check whether no sinks are attached.
    pub fn is_empty(&self) -> bool {
        self.sinks.lock().unwrap().is_empty()
    }

    /// Clone the current sink list, in order.
    pub fn snapshot(&self) -> Vec<Arc<dyn SqlLogger>> {
        self.sinks.lock().unwrap().clone()
    }

    /// Remove all sinks.
    pub fn clear(&self) {
        self.sinks.lock().unwrap().clear();
    }

    /// Replace the sink list wholesale.
    ///
    /// Sinks added since the matching `snapshot`/`suspend` are discarded;
    /// restoration means exactly the saved list, in the saved order.
    pub fn restore(&self, sinks: Vec<Arc<dyn SqlLogger>>) {
        *self.sinks.lock().unwrap() = sinks;
    }

    /// Fan a statement record out to every sink, in order.
    pub fn record(&self, entry: &StatementLog) {
        let sinks = self.snapshot();
        for sink in &sinks {
            sink.log(entry);
        }
    }

    /// Drain the sinks into a guard that restores them on drop.
    ///
    /// While the guard lives, `record` reaches no sinks. Restoration runs on
    /// every exit path, including unwinding.
    pub fn suspend(&self) -> LoggerSuspension<'_> {
        let saved = mem::take(&mut *self.sinks.lock().unwrap());
        LoggerSuspension {
            registry: self,
            saved: Some(saved),
        }
    }

    /// Run a closure with all sinks suspended, restoring them afterwards.
    pub fn suspended<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.suspend();
        f()
    }
}

impl fmt::Debug for LoggerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerRegistry")
            .field("sinks", &self.len())
            .finish()
    }
}

/// RAII guard holding a registry's drained sinks.
///
/// Dropping the guard puts the saved sinks back, replacing anything added
/// in the meantime.
pub struct LoggerSuspension<'a> {
    registry: &'a LoggerRegistry,
    saved: Option<Vec<Arc<dyn SqlLogger>>>,
}

impl LoggerSuspension<'_> {
    /// Number of sinks held for restoration.
    pub fn held(&self) -> usize {
        self.saved.as_ref().map_or(0, Vec::len)
    }
}

impl Drop for LoggerSuspension<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.registry.restore(saved);
        }
    }
}

impl fmt::Debug for LoggerSuspension<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerSuspension")
            .field("held", &self.held())
            .finish()
    }
}

/// A sink that collects records in memory, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<StatementLog>>,
}

impl MemoryLogger {
    /// Create an empty collector.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Clone out the collected records, in arrival order.
    pub fn entries(&self) -> Vec<StatementLog> {
        self.entries.lock().unwrap().clone()
    }

    /// Collected SQL texts, in arrival order.
    pub fn statements(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.sql.clone())
            .collect()
    }

    /// Number of collected records.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Check whether nothing has been collected.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Discard collected records.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl SqlLogger for MemoryLogger {
    fn log(&self, entry: &StatementLog) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}
