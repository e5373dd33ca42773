//! The [`RefStore`] trait defining the reference storage interface.

use graft_types::ObjectId;

use crate::error::{RefError, Result};
use crate::names::{R_HEADS, R_TAGS};
use crate::types::Ref;

/// Maximum number of symbolic hops followed by [`RefStore::resolve`].
pub const MAX_SYMBOLIC_DEPTH: usize = 5;

/// Storage backend for named references.
///
/// Implementations must be thread-safe (`Send + Sync`). The namespace follows
/// git's layout:
///
/// - `HEAD`
/// - `refs/heads/*` for branches
/// - `refs/tags/*` for tags
pub trait RefStore: Send + Sync {
    /// Read a ref by its full name (e.g. "refs/heads/main").
    ///
    /// Returns `Ok(None)` if the ref does not exist.
    fn read_ref(&self, name: &str) -> Result<Option<Ref>>;

    /// Create or overwrite a ref.
    fn write_ref(&self, name: &str, reference: &Ref) -> Result<()>;

    /// Delete a ref. Returns `Ok(true)` if it existed.
    fn delete_ref(&self, name: &str) -> Result<bool>;

    /// List all refs whose full name starts with `prefix`, sorted by name.
    ///
    /// Pass `""` to list all refs.
    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, Ref)>>;

    /// Move a ref to a new name.
    ///
    /// Fails if `from` does not exist or `to` already does.
    fn rename_ref(&self, from: &str, to: &str) -> Result<()> {
        let reference = self.read_ref(from)?.ok_or_else(|| RefError::NotFound {
            name: from.to_string(),
        })?;
        if self.read_ref(to)?.is_some() {
            return Err(RefError::AlreadyExists {
                name: to.to_string(),
            });
        }
        self.write_ref(to, &reference)?;
        self.delete_ref(from)?;
        Ok(())
    }

    /// Follow symbolic refs from `name` to an object id.
    ///
    /// Returns `Ok(None)` when the chain ends at a missing ref (an unborn
    /// branch).
    fn resolve(&self, name: &str) -> Result<Option<ObjectId>> {
        let mut current = name.to_string();
        for _ in 0..=MAX_SYMBOLIC_DEPTH {
            match self.read_ref(&current)? {
                None => return Ok(None),
                Some(Ref::Direct(id)) => return Ok(Some(id)),
                Some(Ref::Symbolic(target)) => current = target,
            }
        }
        Err(RefError::SymbolicDepthExceeded {
            name: name.to_string(),
        })
    }

    /// List all branch refs.
    fn branches(&self) -> Result<Vec<(String, Ref)>> {
        self.list_refs(R_HEADS)
    }

    /// List all tag refs.
    fn tags(&self) -> Result<Vec<(String, Ref)>> {
        self.list_refs(R_TAGS)
    }
}
