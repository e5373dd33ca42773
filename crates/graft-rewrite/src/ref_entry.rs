//! Refs as the unit of memoized ref rewriting.

use std::fmt;

use graft_refs::Ref;
use graft_types::ObjectId;

/// A ref's name and target, or the absence of a ref.
///
/// `Empty` as a rewrite result means the ref should stop existing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RefEntry {
    Object { name: String, id: ObjectId },
    Symbolic { name: String, target: String },
    Empty,
}

impl RefEntry {
    /// Describe a stored ref.
    pub fn from_ref(name: &str, reference: &Ref) -> Self {
        match reference {
            Ref::Direct(id) => RefEntry::Object {
                name: name.to_owned(),
                id: *id,
            },
            Ref::Symbolic(target) => RefEntry::Symbolic {
                name: name.to_owned(),
                target: target.clone(),
            },
        }
    }

    /// The stored form, or `None` for `Empty`.
    pub fn to_ref(&self) -> Option<Ref> {
        match self {
            RefEntry::Object { id, .. } => Some(Ref::Direct(*id)),
            RefEntry::Symbolic { target, .. } => Some(Ref::Symbolic(target.clone())),
            RefEntry::Empty => None,
        }
    }

    /// Full ref name. `None` for `Empty`.
    pub fn name(&self) -> Option<&str> {
        match self {
            RefEntry::Object { name, .. } | RefEntry::Symbolic { name, .. } => Some(name),
            RefEntry::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RefEntry::Empty)
    }

    /// Returns `true` if both entries point at the same thing, ignoring names.
    pub fn same_target(&self, other: &RefEntry) -> bool {
        match (self, other) {
            (RefEntry::Object { id: a, .. }, RefEntry::Object { id: b, .. }) => a == b,
            (RefEntry::Symbolic { target: a, .. }, RefEntry::Symbolic { target: b, .. }) => a == b,
            (RefEntry::Empty, RefEntry::Empty) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RefEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefEntry::Object { name, id } => write!(f, "{name} -> {}", id.short_hex()),
            RefEntry::Symbolic { name, target } => write!(f, "{name} -> ref: {target}"),
            RefEntry::Empty => write!(f, "(empty)"),
        }
    }
}
