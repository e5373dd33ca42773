use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use graft_types::ObjectId;
use tracing::trace;

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;
use crate::traits::{ObjectInserter, ObjectStore};

type ObjectMap = HashMap<ObjectId, StoredObject>;

/// In-memory, HashMap-based object store.
///
/// Intended for tests, the CLI's bundle files and embedding. All objects are
/// held behind a shared `RwLock`; inserters opened on the store keep a handle
/// to the same map so they can publish on flush.
#[derive(Clone)]
pub struct InMemoryObjectStore {
    objects: Arc<RwLock<ObjectMap>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return a sorted list of all object IDs in the store.
    pub fn all_ids(&self) -> Vec<ObjectId> {
        let map = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<ObjectId> = map.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(e: PoisonError<T>) -> StoreError {
    StoreError::Poisoned(e.to_string())
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let map = self.objects.read().map_err(poisoned)?;
        Ok(map.get(id).cloned())
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        let mut map = self.objects.write().map_err(poisoned)?;
        // Already present means identical content.
        map.entry(id).or_insert_with(|| object.clone());
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        let map = self.objects.read().map_err(poisoned)?;
        Ok(map.contains_key(id))
    }

    fn new_inserter(&self) -> Box<dyn ObjectInserter> {
        Box::new(MemoryInserter {
            objects: Arc::clone(&self.objects),
            pending: Vec::new(),
        })
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.len())
            .finish()
    }
}

/// Buffered write handle on an [`InMemoryObjectStore`].
pub struct MemoryInserter {
    objects: Arc<RwLock<ObjectMap>>,
    pending: Vec<(ObjectId, StoredObject)>,
}

impl ObjectInserter for MemoryInserter {
    fn insert(&mut self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        self.pending.push((id, object.clone()));
        Ok(id)
    }

    fn flush(&mut self) -> StoreResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let mut map = self.objects.write().map_err(poisoned)?;
        let count = self.pending.len();
        for (id, object) in self.pending.drain(..) {
            map.entry(id).or_insert(object);
        }
        trace!(count, "flushed inserter");
        Ok(())
    }

    fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::*;

    fn make_blob(content: &[u8]) -> StoredObject {
        Blob::new(content.to_vec()).to_stored_object()
    }

    fn make_tree() -> StoredObject {
        Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "hello.txt", ObjectId::from_bytes(b"hello")),
            TreeEntry::new(EntryMode::Directory, "subdir", ObjectId::from_bytes(b"subdir")),
        ])
        .to_stored_object()
        .unwrap()
    }

    // -----------------------------------------------------------------------
    // Core read/write
    // -----------------------------------------------------------------------

    #[test]
    fn write_and_read_blob() {
        let store = InMemoryObjectStore::new();
        let obj = make_blob(b"hello world");
        let id = store.write(&obj).unwrap();
        assert!(!id.is_null());
        assert_eq!(store.read(&id).unwrap(), Some(obj));
    }

    #[test]
    fn write_and_read_tree() {
        let store = InMemoryObjectStore::new();
        let id = store.write(&make_tree()).unwrap();
        let tree = Tree::from_stored_object(&store.read_existing(&id).unwrap()).unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(store.kind_of(&id).unwrap(), ObjectKind::Tree);
    }

    #[test]
    fn read_existing_reports_missing_id() {
        let store = InMemoryObjectStore::new();
        let id = ObjectId::from_bytes(b"missing");
        assert!(store.read(&id).unwrap().is_none());
        assert!(matches!(
            store.read_existing(&id),
            Err(StoreError::NotFound(missing)) if missing == id
        ));
    }

    #[test]
    fn same_content_is_stored_once() {
        let store = InMemoryObjectStore::new();
        let id1 = store.write(&make_blob(b"identical content")).unwrap();
        let id2 = store.write(&make_blob(b"identical content")).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn all_ids_is_sorted() {
        let store = InMemoryObjectStore::new();
        for data in [&b"aaa"[..], b"bbb", b"ccc"] {
            store.write(&make_blob(data)).unwrap();
        }
        let ids = store.all_ids();
        assert_eq!(ids.len(), 3);
        assert!(ids.windows(2).all(|w| w[0] <= w[1]));
    }

    // -----------------------------------------------------------------------
    // Inserters
    // -----------------------------------------------------------------------

    #[test]
    fn inserter_publishes_on_flush() {
        let store = InMemoryObjectStore::new();
        let mut ins = store.new_inserter();
        let id = ins.insert(&make_blob(b"buffered")).unwrap();
        assert_eq!(ins.pending(), 1);
        assert!(!store.exists(&id).unwrap());

        ins.flush().unwrap();
        assert_eq!(ins.pending(), 0);
        assert!(store.exists(&id).unwrap());
    }

    #[test]
    fn inserter_id_matches_direct_write() {
        let store = InMemoryObjectStore::new();
        let obj = make_tree();
        let mut ins = store.new_inserter();
        assert_eq!(ins.insert(&obj).unwrap(), store.write(&obj).unwrap());
    }

    #[test]
    fn dropped_inserter_discards_pending() {
        let store = InMemoryObjectStore::new();
        let id = {
            let mut ins = store.new_inserter();
            ins.insert(&make_blob(b"lost")).unwrap()
        };
        assert!(!store.exists(&id).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn inserters_on_clones_share_objects() {
        let store = InMemoryObjectStore::new();
        let clone = store.clone();
        let mut ins = clone.new_inserter();
        let id = ins.insert(&make_blob(b"shared")).unwrap();
        ins.flush().unwrap();
        assert!(store.exists(&id).unwrap());
    }

    #[test]
    fn one_inserter_per_thread() {
        use std::thread;

        let store = InMemoryObjectStore::new();
        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let mut ins = store.new_inserter();
                thread::spawn(move || {
                    ins.insert(&make_blob(&[i])).unwrap();
                    ins.insert(&make_blob(b"common")).unwrap();
                    ins.flush().unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
        assert_eq!(store.len(), 9);
    }

    #[test]
    fn debug_format() {
        let store = InMemoryObjectStore::new();
        store.write(&make_blob(b"x")).unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryObjectStore"));
        assert!(debug.contains("object_count"));
    }
}
