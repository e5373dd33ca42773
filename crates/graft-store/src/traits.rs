use graft_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, StoredObject};

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written; the same data always produces the
///   same ID.
/// - Concurrent reads are always safe.
/// - The store never interprets object contents.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Read an object by its content-addressed ID.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    /// Write an object and return its content-addressed ID.
    ///
    /// If the object already exists, this is a no-op.
    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    /// Check whether an object exists in the store.
    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Open a new write handle on this store.
    ///
    /// Handles are not meant to be shared between threads; open one per
    /// writer and flush it before its objects are needed by readers.
    fn new_inserter(&self) -> Box<dyn ObjectInserter>;

    /// Read an object that must exist.
    fn read_existing(&self, id: &ObjectId) -> StoreResult<StoredObject> {
        self.read(id)?.ok_or(StoreError::NotFound(*id))
    }

    /// The kind of an existing object.
    fn kind_of(&self, id: &ObjectId) -> StoreResult<ObjectKind> {
        Ok(self.read_existing(id)?.kind)
    }
}

/// A write handle on an [`ObjectStore`].
///
/// Inserted objects get their final ID immediately but only become visible
/// to readers of the store after [`flush`](ObjectInserter::flush). Dropping a
/// handle without flushing discards its pending objects.
pub trait ObjectInserter: Send {
    /// Buffer an object for writing and return its ID.
    fn insert(&mut self, object: &StoredObject) -> StoreResult<ObjectId>;

    /// Publish every buffered object to the store.
    fn flush(&mut self) -> StoreResult<()>;

    /// Number of objects buffered since the last flush.
    fn pending(&self) -> usize;
}
