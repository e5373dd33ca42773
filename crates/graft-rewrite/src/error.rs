//! Error types for the rewrite engine.
//!
//! Collaborator failures are fatal and carry the [`Context`] that was active
//! when they happened. Conditions the engine can work around (unmapped ref
//! targets, refs to non-commits) are logged instead and never reach here.

use graft_dag::DagError;
use graft_refs::RefError;
use graft_store::StoreError;
use graft_types::ObjectId;

use crate::context::Context;

/// Errors that abort a rewrite run.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    /// The object store failed.
    #[error("store error (context: {context}): {source}")]
    Store {
        context: Context,
        #[source]
        source: StoreError,
    },

    /// The ref store failed.
    #[error("ref error (context: {context}): {source}")]
    Ref {
        context: Context,
        #[source]
        source: RefError,
    },

    /// Collecting or ordering commits failed.
    #[error("commit walk failed: {0}")]
    Walk(#[from] DagError),

    /// A commit was reached before one of its parents was rewritten.
    #[error("parent {parent} of commit {commit} has not been rewritten")]
    MissingParent { commit: ObjectId, parent: ObjectId },

    /// A commit was rewritten twice.
    #[error("commit {0} is already mapped")]
    AlreadyMapped(ObjectId),

    /// The pre-pass worker pool could not be built.
    #[error("worker pool error: {0}")]
    Pool(String),

    /// Configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// Reading policy input files failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for rewrite results.
pub type RewriteResult<T> = Result<T, RewriteError>;

/// Attach the active diagnostic context to a collaborator failure.
pub trait WithContext<T> {
    fn within(self, context: &Context) -> RewriteResult<T>;
}

impl<T> WithContext<T> for Result<T, StoreError> {
    fn within(self, context: &Context) -> RewriteResult<T> {
        self.map_err(|source| RewriteError::Store {
            context: context.clone(),
            source,
        })
    }
}

impl<T> WithContext<T> for Result<T, RefError> {
    fn within(self, context: &Context) -> RewriteResult<T> {
        self.map_err(|source| RewriteError::Ref {
            context: context.clone(),
            source,
        })
    }
}
