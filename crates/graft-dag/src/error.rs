//! Error types for commit graph operations.

use graft_store::{ObjectKind, StoreError};
use graft_types::ObjectId;

/// Errors that can occur while walking or ordering commits.
#[derive(Debug, thiserror::Error)]
pub enum DagError {
    /// A start or parent id names something other than a commit.
    #[error("expected commit at {id}, found {kind}")]
    NotACommit { id: ObjectId, kind: ObjectKind },

    /// Attempted to add a commit that is already in the graph.
    #[error("duplicate node: {0:?}")]
    DuplicateNode(ObjectId),

    /// A cycle was detected, which violates the DAG invariant.
    #[error("cycle detected involving node {0:?}")]
    CycleDetected(ObjectId),

    /// Reading a commit from the object store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias for graph results.
pub type DagResult<T> = Result<T, DagError>;
