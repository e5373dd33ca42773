//! Reachability walk over commits stored in an [`ObjectStore`].

use std::collections::{HashSet, VecDeque};

use graft_store::{Commit, ObjectKind, ObjectStore};
use graft_types::ObjectId;
use tracing::{debug, trace};

use crate::error::{DagError, DagResult};
use crate::graph::CommitGraph;
use crate::node::CommitNode;

/// Collects the commits reachable from start points and not reachable from
/// uninteresting points.
///
/// An empty uninteresting set walks the full history.
pub struct RevWalk<'a> {
    store: &'a dyn ObjectStore,
    starts: Vec<ObjectId>,
    uninteresting: Vec<ObjectId>,
}

impl<'a> RevWalk<'a> {
    /// Create a walk over commits read from `store`.
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self {
            store,
            starts: Vec::new(),
            uninteresting: Vec::new(),
        }
    }

    /// Add a tip whose history should be collected.
    pub fn mark_start(&mut self, id: ObjectId) -> &mut Self {
        self.starts.push(id);
        self
    }

    /// Exclude a commit and all of its ancestors.
    pub fn mark_uninteresting(&mut self, id: ObjectId) -> &mut Self {
        self.uninteresting.push(id);
        self
    }

    fn parse_commit(&self, id: &ObjectId) -> DagResult<Commit> {
        let object = self.store.read_existing(id)?;
        if object.kind != ObjectKind::Commit {
            return Err(DagError::NotACommit {
                id: *id,
                kind: object.kind,
            });
        }
        Ok(Commit::from_stored_object(&object)?)
    }

    /// Breadth-first walk from `seeds`, skipping `excluded`, returning every
    /// visited commit.
    fn reach(
        &self,
        seeds: &[ObjectId],
        excluded: &HashSet<ObjectId>,
    ) -> DagResult<Vec<CommitNode>> {
        let mut visited: HashSet<ObjectId> = HashSet::new();
        let mut queue: VecDeque<ObjectId> = VecDeque::new();
        for id in seeds {
            if !excluded.contains(id) && visited.insert(*id) {
                queue.push_back(*id);
            }
        }

        let mut nodes = Vec::new();
        while let Some(current) = queue.pop_front() {
            let commit = self.parse_commit(&current)?;
            for parent in &commit.parents {
                if !excluded.contains(parent) && visited.insert(*parent) {
                    queue.push_back(*parent);
                }
            }
            trace!(commit = %current.short_hex(), "visited commit");
            nodes.push(CommitNode::from_commit(current, &commit));
        }
        Ok(nodes)
    }

    /// Run the walk.
    pub fn collect(&self) -> DagResult<CommitGraph> {
        let hidden: HashSet<ObjectId> = self
            .reach(&self.uninteresting, &HashSet::new())?
            .into_iter()
            .map(|n| n.id)
            .collect();
        let nodes = self.reach(&self.starts, &hidden)?;
        debug!(
            starts = self.starts.len(),
            hidden = hidden.len(),
            commits = nodes.len(),
            "collected commits"
        );
        CommitGraph::from_nodes(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_store::{Blob, InMemoryObjectStore, Person, Tree};

    struct History {
        store: InMemoryObjectStore,
        tree: ObjectId,
    }

    impl History {
        fn new() -> Self {
            let store = InMemoryObjectStore::new();
            let tree = store.write(&Tree::empty().to_stored_object().unwrap()).unwrap();
            Self { store, tree }
        }

        fn commit(&self, time: i64, parents: &[ObjectId]) -> ObjectId {
            let who = Person::new("t", "t@example.com", time, 0);
            let commit = Commit {
                tree: self.tree,
                parents: parents.to_vec(),
                author: who.clone(),
                committer: who,
                message: format!("commit at {time}"),
            };
            self.store.write(&commit.to_stored_object().unwrap()).unwrap()
        }
    }

    #[test]
    fn walks_full_history() {
        let h = History::new();
        let a = h.commit(1, &[]);
        let b = h.commit(2, &[a]);
        let c = h.commit(3, &[b]);

        let graph = RevWalk::new(&h.store).mark_start(c).collect().unwrap();
        assert_eq!(graph.len(), 3);
        let order: Vec<_> = graph.topological_order().unwrap().iter().map(|n| n.id).collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn shared_history_is_visited_once() {
        let h = History::new();
        let a = h.commit(1, &[]);
        let b = h.commit(2, &[a]);
        let c = h.commit(3, &[a]);

        let mut walk = RevWalk::new(&h.store);
        walk.mark_start(b).mark_start(c).mark_start(b);
        assert_eq!(walk.collect().unwrap().len(), 3);
    }

    #[test]
    fn uninteresting_hides_ancestors() {
        let h = History::new();
        let a = h.commit(1, &[]);
        let b = h.commit(2, &[a]);
        let c = h.commit(3, &[b]);
        let d = h.commit(4, &[c]);

        let mut walk = RevWalk::new(&h.store);
        walk.mark_start(d).mark_uninteresting(b);
        let graph = walk.collect().unwrap();
        assert_eq!(graph.len(), 2);
        assert!(graph.contains(&c) && graph.contains(&d));
        assert_eq!(graph.boundary(), vec![b]);
    }

    #[test]
    fn non_commit_start_is_rejected() {
        let h = History::new();
        let blob = h.store.write(&Blob::new(b"x".to_vec()).to_stored_object()).unwrap();
        let err = RevWalk::new(&h.store).mark_start(blob).collect().unwrap_err();
        assert!(matches!(err, DagError::NotACommit { kind: ObjectKind::Blob, .. }));
    }

    #[test]
    fn missing_commit_is_a_store_error() {
        let h = History::new();
        let err = RevWalk::new(&h.store)
            .mark_start(ObjectId::from_bytes(b"nowhere"))
            .collect()
            .unwrap_err();
        assert!(matches!(err, DagError::Store(_)));
    }
}
