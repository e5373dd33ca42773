//! Per-thread write handles.
//!
//! Write handles are single-owner, so every thread that writes during a
//! phase lazily opens its own and keeps it for the whole phase. At the end of
//! the phase [`HandleTable::flush_all`] is the barrier: every handle is
//! flushed and closed, and only then are the phase's objects visible to
//! readers of the store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};

use graft_store::{ObjectInserter, ObjectStore, StoreResult};
use tracing::trace;

type Handle = Arc<Mutex<Box<dyn ObjectInserter>>>;

/// Write handles keyed by the thread that owns them.
pub struct HandleTable {
    store: Arc<dyn ObjectStore>,
    handles: Mutex<HashMap<ThreadId, Handle>>,
}

impl HandleTable {
    /// An empty table whose handles write to `store`.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            handles: Mutex::new(HashMap::new()),
        }
    }

    fn current(&self) -> Handle {
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        let handle = handles.entry(thread::current().id()).or_insert_with(|| {
            trace!(thread = ?thread::current().id(), "opened write handle");
            Arc::new(Mutex::new(self.store.new_inserter()))
        });
        Arc::clone(handle)
    }

    /// Run `f` with the calling thread's handle, opening it on first use.
    pub fn with_handle<R>(
        &self,
        f: impl FnOnce(&mut dyn ObjectInserter) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let handle = self.current();
        let mut inserter = handle.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut **inserter)
    }

    /// Number of handles opened so far.
    pub fn len(&self) -> usize {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flush and close every handle. Returns how many were closed.
    ///
    /// Stops at the first failing flush; the remaining handles are dropped
    /// unflushed.
    pub fn flush_all(&self) -> StoreResult<usize> {
        let drained: Vec<Handle> = self
            .handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, handle)| handle)
            .collect();
        let count = drained.len();
        for handle in drained {
            handle
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .flush()?;
        }
        trace!(count, "closed write handles");
        Ok(count)
    }
}
