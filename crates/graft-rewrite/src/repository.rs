//! A repository as the engine sees it: an object store plus a ref store.
//!
//! Reads decode straight from the store. The direct write helpers here are
//! for populating repositories (tests, bundle import); the engine itself
//! writes through buffered inserters.

use std::sync::Arc;

use graft_refs::{InMemoryRefStore, Ref, RefStore};
use graft_store::{
    Blob, Commit, InMemoryObjectStore, ObjectKind, ObjectStore, StoreError, StoreResult,
    StoredObject, Tag, Tree, TreeEntry,
};
use graft_types::ObjectId;

use crate::entry::Entry;

/// Object and ref storage of one repository. Clones share storage.
#[derive(Clone)]
pub struct Repository {
    objects: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
}

impl Repository {
    /// A repository over the given stores.
    pub fn new(objects: Arc<dyn ObjectStore>, refs: Arc<dyn RefStore>) -> Self {
        Self { objects, refs }
    }

    /// A fresh, empty repository held in memory.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryRefStore::new()),
        )
    }

    /// The object store.
    pub fn objects(&self) -> &Arc<dyn ObjectStore> {
        &self.objects
    }

    /// The ref store.
    pub fn refs(&self) -> &Arc<dyn RefStore> {
        &self.refs
    }

    // ---- Object reads ----

    /// Kind of a stored object. Fails if it is absent.
    pub fn object_kind(&self, id: &ObjectId) -> StoreResult<ObjectKind> {
        self.objects.kind_of(id)
    }

    /// Read a tree's entries in stored order, tagging each with
    /// `path_context`.
    pub fn read_tree(&self, id: &ObjectId, path_context: Option<&str>) -> StoreResult<Vec<Entry>> {
        let tree = Tree::from_stored_object(&self.read_kind(id, ObjectKind::Tree)?)?;
        Ok(tree
            .entries
            .iter()
            .map(|e| Entry::from_tree_entry(e, path_context.map(str::to_owned)))
            .collect())
    }

    /// Content of a blob.
    pub fn read_blob(&self, id: &ObjectId) -> StoreResult<Vec<u8>> {
        Ok(Blob::from_stored_object(&self.read_kind(id, ObjectKind::Blob)?)?.data)
    }

    /// Read and decode a commit.
    pub fn read_commit(&self, id: &ObjectId) -> StoreResult<Commit> {
        Commit::from_stored_object(&self.read_kind(id, ObjectKind::Commit)?)
    }

    /// Read and decode an annotated tag.
    pub fn parse_tag(&self, id: &ObjectId) -> StoreResult<Tag> {
        Tag::from_stored_object(&self.read_kind(id, ObjectKind::Tag)?)
    }

    fn read_kind(&self, id: &ObjectId, kind: ObjectKind) -> StoreResult<StoredObject> {
        let object = self.objects.read_existing(id)?;
        if object.kind != kind {
            return Err(StoreError::CorruptObject {
                id: *id,
                reason: format!("expected {kind:?}, found {:?}", object.kind),
            });
        }
        Ok(object)
    }

    // ---- Refs ----

    /// Every ref, sorted by name.
    pub fn list_refs(&self) -> graft_refs::Result<Vec<(String, Ref)>> {
        self.refs.list_refs("")
    }

    /// Create or replace a ref.
    pub fn set_ref(&self, name: &str, reference: Ref) -> graft_refs::Result<()> {
        self.refs.write_ref(name, &reference)
    }

    // ---- Direct writes ----

    /// Store a blob immediately, outside any write handle.
    pub fn write_blob(&self, data: &[u8]) -> StoreResult<ObjectId> {
        self.objects.write(&Blob::new(data.to_vec()).to_stored_object())
    }

    pub fn write_tree(&self, entries: Vec<TreeEntry>) -> StoreResult<ObjectId> {
        self.objects.write(&Tree::new(entries).to_stored_object()?)
    }

    pub fn write_commit(&self, commit: &Commit) -> StoreResult<ObjectId> {
        self.objects.write(&commit.to_stored_object()?)
    }

    pub fn write_tag(&self, tag: &Tag) -> StoreResult<ObjectId> {
        self.objects.write(&tag.to_stored_object()?)
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository").finish_non_exhaustive()
    }
}
