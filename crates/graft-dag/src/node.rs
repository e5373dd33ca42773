//! Graph node type.

use graft_store::Commit;
use graft_types::ObjectId;

/// A commit as seen by the walker: just enough to order and rewrite it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitNode {
    pub id: ObjectId,
    /// Root tree of the commit.
    pub tree: ObjectId,
    /// Parent commits, in commit order. May name commits outside the graph.
    pub parents: Vec<ObjectId>,
    /// Committer timestamp, used to break ordering ties.
    pub commit_time: i64,
}

impl CommitNode {
    /// Build a node from a decoded commit.
    pub fn from_commit(id: ObjectId, commit: &Commit) -> Self {
        Self {
            id,
            tree: commit.tree,
            parents: commit.parents.clone(),
            commit_time: commit.committer.time,
        }
    }

    /// Returns `true` if the commit has no parents at all.
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}
