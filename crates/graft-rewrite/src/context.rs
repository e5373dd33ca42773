//! Diagnostic context threaded through every rewrite call.
//!
//! A [`Context`] is an immutable set of key/value pairs describing where the
//! engine currently is (commit, root tree, path, ref). Extending it returns a
//! new value and leaves the original untouched, so a context can be handed to
//! worker threads freely. It only ever feeds logs and error messages.

use std::fmt;
use std::sync::Arc;

/// What a context value describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Repo,
    Commit,
    Root,
    Path,
    Ref,
    Tag,
}

impl Key {
    fn label(self) -> &'static str {
        match self {
            Key::Repo => "repo",
            Key::Commit => "commit",
            Key::Root => "root",
            Key::Path => "path",
            Key::Ref => "ref",
            Key::Tag => "tag",
        }
    }
}

/// Immutable diagnostic context. Cheap to clone.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Context {
    values: Arc<[(Key, String)]>,
}

impl Context {
    /// The empty context a run starts from.
    pub fn root() -> Self {
        Self::default()
    }

    /// A copy of this context with `key` set to `value`.
    ///
    /// Setting a key that is already present replaces its value.
    pub fn with(&self, key: Key, value: impl fmt::Display) -> Self {
        let mut values: Vec<(Key, String)> = self
            .values
            .iter()
            .filter(|(k, _)| *k != key)
            .cloned()
            .collect();
        values.push((key, value.to_string()));
        values.sort_by_key(|(k, _)| *k);
        Self {
            values: values.into(),
        }
    }

    /// The value recorded for `key`, if any.
    pub fn get(&self, key: Key) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.values.is_empty() {
            return write!(f, "-");
        }
        for (i, (key, value)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", key.label(), value)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Context({self})")
    }
}
