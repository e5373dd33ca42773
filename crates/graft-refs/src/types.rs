//! Core reference types.

use serde::{Deserialize, Serialize};
use graft_types::ObjectId;

/// The value stored under a ref name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ref {
    /// Points directly at an object.
    Direct(ObjectId),
    /// Names another ref (e.g. `HEAD` -> `refs/heads/main`).
    Symbolic(String),
}

impl Ref {
    /// Returns `true` if this is a symbolic ref.
    pub fn is_symbolic(&self) -> bool {
        matches!(self, Ref::Symbolic(_))
    }

    /// The object id of a direct ref.
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            Ref::Direct(id) => Some(*id),
            Ref::Symbolic(_) => None,
        }
    }

    /// The target name of a symbolic ref.
    pub fn symbolic_target(&self) -> Option<&str> {
        match self {
            Ref::Direct(_) => None,
            Ref::Symbolic(target) => Some(target),
        }
    }
}

impl std::fmt::Display for Ref {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ref::Direct(id) => write!(f, "{id}"),
            Ref::Symbolic(target) => write!(f, "ref: {target}"),
        }
    }
}
