//! Tree entries as the unit of memoized rewriting.
//!
//! An [`Entry`] is the cache key of the entry cache: two entries that compare
//! equal are guaranteed to rewrite to the same result. Without path
//! sensitivity the key is pure content (mode, name, id), so identical
//! subtrees anywhere in history are rewritten once. With path sensitivity the
//! parent path joins the key, and identical content at different paths is
//! rewritten separately.

use graft_store::{EntryMode, TreeEntry};
use graft_types::ObjectId;

/// One node of a tree: a file, directory, symlink or submodule.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Entry {
    pub mode: EntryMode,
    /// Name within the parent tree. Empty for a root tree.
    pub name: String,
    pub id: ObjectId,
    /// Path of the parent directory. `None` when path sensitivity is off.
    pub path_context: Option<String>,
}

impl Entry {
    /// Build an entry. `path_context` is the parent directory path, if tracked.
    pub fn new(
        mode: EntryMode,
        name: impl Into<String>,
        id: ObjectId,
        path_context: Option<String>,
    ) -> Self {
        Self {
            mode,
            name: name.into(),
            id,
            path_context,
        }
    }

    /// The synthetic entry standing for a commit's root tree.
    pub fn root(tree: ObjectId, path_sensitive: bool) -> Self {
        Self::new(
            EntryMode::Directory,
            "",
            tree,
            path_sensitive.then(String::new),
        )
    }

    /// Build an entry from a stored tree entry.
    pub fn from_tree_entry(entry: &TreeEntry, path_context: Option<String>) -> Self {
        Self::new(entry.mode, entry.name.clone(), entry.object_id, path_context)
    }

    /// Convert back into the stored form, dropping the path context.
    pub fn to_tree_entry(&self) -> TreeEntry {
        TreeEntry::new(self.mode, self.name.clone(), self.id)
    }

    /// Returns `true` for the synthetic root entry.
    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    /// Returns `true` for directories, the root included.
    pub fn is_tree(&self) -> bool {
        self.mode.is_tree()
    }

    /// Slash-joined path of this entry.
    ///
    /// Without path sensitivity only the name is known.
    pub fn path(&self) -> String {
        match self.path_context.as_deref() {
            Some(parent) if !parent.is_empty() && !self.name.is_empty() => {
                format!("{parent}/{}", self.name)
            }
            Some(parent) if self.name.is_empty() => parent.to_owned(),
            _ => self.name.clone(),
        }
    }
}

/// Result of rewriting one entry: the replacement, or nothing when the
/// entry should disappear from its parent tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntrySet {
    Present(Entry),
    Empty,
}

impl EntrySet {
    /// Append whatever this result contributes to a tree being assembled.
    pub fn register_to(&self, entries: &mut Vec<Entry>) {
        if let EntrySet::Present(entry) = self {
            entries.push(entry.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, EntrySet::Empty)
    }

    /// The surviving entry, if any.
    pub fn entry(&self) -> Option<&Entry> {
        match self {
            EntrySet::Present(entry) => Some(entry),
            EntrySet::Empty => None,
        }
    }
}
