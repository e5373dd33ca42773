//! Repository fixtures shared by the engine tests.

use std::sync::Arc;

use graft_refs::{InMemoryRefStore, Ref};
use graft_store::{
    Commit, EntryMode, InMemoryObjectStore, ObjectKind, ObjectStore, Person, Tag, TreeEntry,
};
use graft_types::ObjectId;

use crate::repository::Repository;

pub(crate) struct Fixture {
    pub repo: Repository,
    pub store: InMemoryObjectStore,
}

impl Fixture {
    pub fn new() -> Self {
        let store = InMemoryObjectStore::new();
        let repo = Repository::new(Arc::new(store.clone()), Arc::new(InMemoryRefStore::new()));
        Self { repo, store }
    }

    pub fn blob(&self, data: &str) -> ObjectId {
        self.repo.write_blob(data.as_bytes()).unwrap()
    }

    /// Tree whose entry modes follow the kinds of the named objects.
    pub fn tree(&self, entries: &[(&str, ObjectId)]) -> ObjectId {
        let entries = entries
            .iter()
            .map(|(name, id)| {
                let mode = match self.store.kind_of(id).unwrap() {
                    ObjectKind::Tree => EntryMode::Directory,
                    _ => EntryMode::Regular,
                };
                (mode, *name, *id)
            })
            .collect::<Vec<_>>();
        self.tree_with(&entries)
    }

    pub fn tree_with(&self, entries: &[(EntryMode, &str, ObjectId)]) -> ObjectId {
        self.repo
            .write_tree(
                entries
                    .iter()
                    .map(|(mode, name, id)| TreeEntry::new(*mode, *name, *id))
                    .collect(),
            )
            .unwrap()
    }

    pub fn commit(&self, tree: ObjectId, parents: &[ObjectId], time: i64, message: &str) -> ObjectId {
        let who = Person::new("Dev", "dev@example.com", time, 0);
        self.repo
            .write_commit(&Commit {
                tree,
                parents: parents.to_vec(),
                author: who.clone(),
                committer: who,
                message: message.to_owned(),
            })
            .unwrap()
    }

    pub fn annotated_tag(&self, target: ObjectId, name: &str) -> ObjectId {
        let kind = self.store.kind_of(&target).unwrap();
        self.repo
            .write_tag(&Tag {
                object: target,
                object_kind: kind,
                name: name.to_owned(),
                tagger: Some(Person::new("Rel", "rel@example.com", 99, 0)),
                message: format!("release {name}"),
            })
            .unwrap()
    }

    pub fn set_ref(&self, name: &str, target: ObjectId) {
        self.repo.set_ref(name, Ref::Direct(target)).unwrap();
    }

    pub fn set_symbolic(&self, name: &str, target: &str) {
        self.repo.set_ref(name, Ref::Symbolic(target.to_owned())).unwrap();
    }
}

/// The commit a ref resolves to in `repo`.
pub(crate) fn resolve(repo: &Repository, name: &str) -> ObjectId {
    repo.refs()
        .resolve(name)
        .unwrap()
        .unwrap_or_else(|| panic!("{name} should resolve"))
}

/// Every file path under a tree, sorted.
pub(crate) fn file_paths(repo: &Repository, tree: &ObjectId) -> Vec<String> {
    fn walk(repo: &Repository, tree: &ObjectId, prefix: &str, out: &mut Vec<String>) {
        for entry in repo.read_tree(tree, None).unwrap() {
            let path = if prefix.is_empty() {
                entry.name.clone()
            } else {
                format!("{prefix}/{}", entry.name)
            };
            if entry.is_tree() {
                walk(repo, &entry.id, &path, out);
            } else {
                out.push(path);
            }
        }
    }
    let mut out = Vec::new();
    walk(repo, tree, "", &mut out);
    out.sort();
    out
}

/// First-parent history from `tip`, newest first.
pub(crate) fn first_parent_chain(repo: &Repository, tip: ObjectId) -> Vec<(ObjectId, Commit)> {
    let mut chain = Vec::new();
    let mut next = Some(tip);
    while let Some(id) = next {
        let commit = repo.read_commit(&id).unwrap();
        next = commit.parents.first().copied();
        chain.push((id, commit));
    }
    chain
}
