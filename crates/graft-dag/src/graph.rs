//! The collected commit graph and its orderings.
//!
//! # Invariants
//!
//! - Node ids are unique within the graph.
//! - Parent ids may point outside the graph; those are boundary commits
//!   excluded by the walk and are ignored for ordering.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use graft_types::ObjectId;
use tracing::debug;

use crate::error::{DagError, DagResult};
use crate::node::CommitNode;

/// A set of commits with a forward-edge index for ordering.
#[derive(Clone, Debug, Default)]
pub struct CommitGraph {
    nodes: HashMap<ObjectId, CommitNode>,
    /// Forward-edge index: parent -> children inside the graph.
    children: HashMap<ObjectId, Vec<ObjectId>>,
}

impl CommitGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from already-collected nodes, in any order.
    pub fn from_nodes(nodes: impl IntoIterator<Item = CommitNode>) -> DagResult<Self> {
        let mut graph = Self::new();
        for node in nodes {
            if graph.nodes.contains_key(&node.id) {
                return Err(DagError::DuplicateNode(node.id));
            }
            graph.nodes.insert(node.id, node);
        }
        for node in graph.nodes.values() {
            for parent in &node.parents {
                if graph.nodes.contains_key(parent) {
                    graph.children.entry(*parent).or_default().push(node.id);
                }
            }
        }
        Ok(graph)
    }

    /// Total number of commits in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no commits.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns `true` if the commit is part of this graph.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Retrieve a commit by id.
    pub fn get(&self, id: &ObjectId) -> Option<&CommitNode> {
        self.nodes.get(id)
    }

    /// All commits, with no ordering guarantee beyond determinism.
    ///
    /// Suitable for work that depends only on commit content, never on
    /// ancestry.
    pub fn commits(&self) -> Vec<&CommitNode> {
        let mut nodes: Vec<&CommitNode> = self.nodes.values().collect();
        nodes.sort_by_key(|n| n.id);
        nodes
    }

    /// Parents that are referenced by graph commits but not part of the graph.
    pub fn boundary(&self) -> Vec<ObjectId> {
        let mut boundary: Vec<ObjectId> = self
            .nodes
            .values()
            .flat_map(|n| n.parents.iter())
            .filter(|p| !self.nodes.contains_key(p))
            .copied()
            .collect();
        boundary.sort();
        boundary.dedup();
        boundary
    }

    /// Number of parents of `node` that are inside the graph.
    fn in_degree(&self, node: &CommitNode) -> usize {
        node.parents
            .iter()
            .filter(|p| self.nodes.contains_key(p))
            .count()
    }

    /// Return all commits in topological order: every parent strictly before
    /// its children, oldest ancestors first.
    ///
    /// Uses Kahn's algorithm. Among commits that are ready at the same time
    /// the one with the smallest `(commit_time, id)` goes first, which makes
    /// the order deterministic.
    pub fn topological_order(&self) -> DagResult<Vec<&CommitNode>> {
        let mut in_degree: HashMap<ObjectId, usize> = HashMap::with_capacity(self.nodes.len());
        let mut ready: BinaryHeap<Reverse<(i64, ObjectId)>> = BinaryHeap::new();

        for node in self.nodes.values() {
            let degree = self.in_degree(node);
            if degree == 0 {
                ready.push(Reverse((node.commit_time, node.id)));
            }
            in_degree.insert(node.id, degree);
        }

        let mut result = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse((_, current))) = ready.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            result.push(node);

            if let Some(child_ids) = self.children.get(&current) {
                for child_id in child_ids {
                    if let Some(deg) = in_degree.get_mut(child_id) {
                        *deg -= 1;
                        if *deg == 0 {
                            if let Some(child) = self.nodes.get(child_id) {
                                ready.push(Reverse((child.commit_time, child.id)));
                            }
                        }
                    }
                }
            }
        }

        if result.len() != self.nodes.len() {
            let stuck = in_degree
                .iter()
                .filter(|(_, deg)| **deg > 0)
                .map(|(id, _)| *id)
                .min()
                .unwrap_or_else(ObjectId::null);
            return Err(DagError::CycleDetected(stuck));
        }

        debug!(commits = result.len(), "computed topological order");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn oid(byte: u8) -> ObjectId {
        ObjectId::from_hash([byte; 32])
    }

    fn node(id: u8, time: i64, parents: &[u8]) -> CommitNode {
        CommitNode {
            id: oid(id),
            tree: oid(200),
            parents: parents.iter().map(|p| oid(*p)).collect(),
            commit_time: time,
        }
    }

    fn ids(order: &[&CommitNode]) -> Vec<ObjectId> {
        order.iter().map(|n| n.id).collect()
    }

    #[test]
    fn empty_graph() {
        let graph = CommitGraph::new();
        assert!(graph.is_empty());
        assert!(graph.topological_order().unwrap().is_empty());
    }

    #[test]
    fn duplicate_node_is_rejected() {
        let err = CommitGraph::from_nodes([node(1, 0, &[]), node(1, 0, &[])]).unwrap_err();
        assert!(matches!(err, DagError::DuplicateNode(id) if id == oid(1)));
    }

    #[test]
    fn linear_chain_is_oldest_first() {
        // Inserted tip-first, as a walk discovers them.
        let graph =
            CommitGraph::from_nodes([node(3, 30, &[2]), node(2, 20, &[1]), node(1, 10, &[])])
                .unwrap();
        let order = graph.topological_order().unwrap();
        assert_eq!(ids(&order), vec![oid(1), oid(2), oid(3)]);
    }

    #[test]
    fn parents_beat_timestamps() {
        // Child has an older timestamp than its parent (clock skew).
        let graph = CommitGraph::from_nodes([node(1, 100, &[]), node(2, 5, &[1])]).unwrap();
        let order = graph.topological_order().unwrap();
        assert_eq!(ids(&order), vec![oid(1), oid(2)]);
    }

    #[test]
    fn diamond_orders_merge_last() {
        //   1
        //  / \
        // 2   3
        //  \ /
        //   4
        let graph = CommitGraph::from_nodes([
            node(4, 40, &[2, 3]),
            node(3, 20, &[1]),
            node(2, 30, &[1]),
            node(1, 10, &[]),
        ])
        .unwrap();
        let order = graph.topological_order().unwrap();
        assert_eq!(ids(&order), vec![oid(1), oid(3), oid(2), oid(4)]);
    }

    #[test]
    fn boundary_parents_are_ignored_for_ordering() {
        let graph = CommitGraph::from_nodes([node(5, 50, &[4]), node(6, 60, &[5, 9])]).unwrap();
        assert_eq!(graph.boundary(), vec![oid(4), oid(9)]);
        let order = graph.topological_order().unwrap();
        assert_eq!(ids(&order), vec![oid(5), oid(6)]);
    }

    #[test]
    fn cycle_is_detected() {
        let graph = CommitGraph::from_nodes([node(1, 0, &[2]), node(2, 0, &[1])]).unwrap();
        assert!(matches!(
            graph.topological_order(),
            Err(DagError::CycleDetected(_))
        ));
    }

    #[test]
    fn commits_lists_every_node() {
        let graph = CommitGraph::from_nodes([node(2, 0, &[1]), node(1, 0, &[])]).unwrap();
        assert_eq!(graph.commits().len(), 2);
        assert!(graph.contains(&oid(1)));
        assert!(graph.get(&oid(3)).is_none());
    }

    fn arbitrary_dag() -> impl Strategy<Value = Vec<CommitNode>> {
        // Node i may only have parents < i, so the input is always acyclic.
        prop::collection::vec((any::<i16>(), prop::collection::vec(any::<prop::sample::Index>(), 0..3)), 1..24)
            .prop_map(|specs| {
                specs
                    .into_iter()
                    .enumerate()
                    .map(|(i, (time, parents))| {
                        let parents: Vec<u8> = if i == 0 {
                            Vec::new()
                        } else {
                            parents.iter().map(|p| p.index(i) as u8).collect()
                        };
                        node(i as u8, i64::from(time), &parents)
                    })
                    .collect()
            })
    }

    proptest! {
        #[test]
        fn every_parent_precedes_its_child(nodes in arbitrary_dag()) {
            let graph = CommitGraph::from_nodes(nodes).unwrap();
            let order = graph.topological_order().unwrap();
            prop_assert_eq!(order.len(), graph.len());

            let position: HashMap<ObjectId, usize> =
                order.iter().enumerate().map(|(i, n)| (n.id, i)).collect();
            for n in &order {
                for p in &n.parents {
                    prop_assert!(position[p] < position[&n.id]);
                }
            }
        }

        #[test]
        fn order_is_deterministic(nodes in arbitrary_dag()) {
            let mut reversed = nodes.clone();
            reversed.reverse();
            let a = CommitGraph::from_nodes(nodes).unwrap();
            let b = CommitGraph::from_nodes(reversed).unwrap();
            prop_assert_eq!(
                ids(&a.topological_order().unwrap()),
                ids(&b.topological_order().unwrap())
            );
        }
    }
}
