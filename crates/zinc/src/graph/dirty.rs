//! Priority queue of nodes awaiting processing, ordered by index.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use std::rc::{Rc, Weak};

use crate::graph::graph_builder::{Node, NodeId};
use crate::graph::index::FractionalIndex;

/// A queued node together with the index it had when marked.
///
/// The index is snapshotted at insertion. The only index mutation the graph
/// ever performs mid-step targets the node currently being processed, which
/// has already left the queue, so a snapshot can never go stale while queued.
pub(crate) struct DirtyEntry {
    pub(crate) index: FractionalIndex,
    pub(crate) id: NodeId,
    pub(crate) node: Weak<dyn Node>,
}

impl PartialEq for DirtyEntry {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.id == other.id
    }
}

impl Eq for DirtyEntry {}

impl PartialOrd for DirtyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DirtyEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index
            .cmp(&other.index)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Min-heap of dirty nodes, deduplicated by node id.
#[derive(Default)]
pub(crate) struct DirtySet {
    heap: BinaryHeap<Reverse<DirtyEntry>>,
    queued: HashSet<NodeId>,
}

impl DirtySet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queues `node` at its current index. Returns false if already queued.
    pub(crate) fn insert(&mut self, node: &Rc<dyn Node>) -> bool {
        let id = node.id();
        if !self.queued.insert(id) {
            return false;
        }
        self.heap.push(Reverse(DirtyEntry {
            index: node.index(),
            id,
            node: Rc::downgrade(node),
        }));
        true
    }

    /// Removes and returns the entry with the smallest index.
    pub(crate) fn pop(&mut self) -> Option<DirtyEntry> {
        let Reverse(entry) = self.heap.pop()?;
        self.queued.remove(&entry.id);
        Some(entry)
    }

    pub(crate) fn clear(&mut self) {
        self.heap.clear();
        self.queued.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    #[test]
    fn pops_in_ascending_index_order() {
        let graph = Graph::new();
        let first = graph.constant_value(0);
        let second = graph.constant_value(0);
        let third = graph.constant_value(0);

        let mut queue = DirtySet::new();
        assert!(queue.insert(third.node()));
        assert!(queue.insert(first.node()));
        assert!(queue.insert(second.node()));

        assert_eq!(queue.pop().unwrap().id, first.node().id());
        assert_eq!(queue.pop().unwrap().id, second.node().id());
        assert_eq!(queue.pop().unwrap().id, third.node().id());
        assert!(queue.pop().is_none());
    }

    #[test]
    fn inserting_a_queued_node_is_a_no_op() {
        let graph = Graph::new();
        let node = graph.constant_value(0);

        let mut queue = DirtySet::new();
        assert!(queue.insert(node.node()));
        assert!(!queue.insert(node.node()));
        assert!(queue.pop().is_some());
        assert!(queue.pop().is_none());

        // Popping clears the dedup mark, so the node can queue again.
        assert!(queue.insert(node.node()));
    }

    #[test]
    fn clear_empties_queue_and_dedup_marks() {
        let graph = Graph::new();
        let node = graph.constant_value(0);

        let mut queue = DirtySet::new();
        queue.insert(node.node());
        queue.clear();
        assert!(queue.pop().is_none());
        assert!(queue.insert(node.node()));
    }
}
