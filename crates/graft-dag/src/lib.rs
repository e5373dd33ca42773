//! Commit graph walking for graft.
//!
//! A [`RevWalk`] collects every commit reachable from a set of start points
//! but not from a set of uninteresting points, producing a [`CommitGraph`].
//! The graph hands out commits in topological order (parents before
//! children, oldest first) for the sequential rewrite, or as a plain set for
//! unordered parallel work.

pub mod error;
pub mod graph;
pub mod node;
pub mod walk;

pub use error::{DagError, DagResult};
pub use graph::CommitGraph;
pub use node::CommitNode;
pub use walk::RevWalk;
