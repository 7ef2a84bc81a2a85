//! Weak downstream-edge registry kept by every node.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use crate::graph::graph_builder::{Node, NodeId};

/// The nodes that read a given node's value.
///
/// Edges are weak: holding a dependent here must not keep it alive, so a
/// dropped node simply stops being notified. Entries are deduplicated by node
/// id, and a removed id is masked immediately even though its entry is only
/// compacted out of the list the next time a dead edge is noticed.
pub(crate) struct Dependents {
    entries: RefCell<Vec<(NodeId, Weak<dyn Node>)>>,
    active: RefCell<HashSet<NodeId>>,
}

impl Dependents {
    pub(crate) fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
            active: RefCell::new(HashSet::new()),
        }
    }

    /// Registers `node` as a dependent. Re-adding an id is a no-op.
    pub(crate) fn add(&self, node: &Rc<dyn Node>) {
        let id = node.id();
        if self.active.borrow_mut().insert(id) {
            let mut entries = self.entries.borrow_mut();
            if !entries.iter().any(|(entry_id, _)| *entry_id == id) {
                entries.push((id, Rc::downgrade(node)));
            }
        }
    }

    /// Unregisters the dependent with the given id, if present.
    pub(crate) fn remove(&self, id: NodeId) {
        self.active.borrow_mut().remove(&id);
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.active.borrow().contains(&id)
    }

    /// Calls `visit` for every live, registered dependent. Dead edges found
    /// along the way trigger a compaction afterwards.
    pub(crate) fn for_each_live(&self, mut visit: impl FnMut(Rc<dyn Node>)) {
        let snapshot: Vec<(NodeId, Weak<dyn Node>)> = self.entries.borrow().clone();
        let mut saw_dead = false;
        for (id, weak) in &snapshot {
            match weak.upgrade() {
                Some(node) => {
                    if self.active.borrow().contains(id) {
                        visit(node);
                    }
                }
                None => saw_dead = true,
            }
        }
        if saw_dead {
            self.compact();
        }
    }

    fn compact(&self) {
        let mut entries = self.entries.borrow_mut();
        entries.retain(|(_, weak)| weak.strong_count() > 0);
        let live: HashSet<NodeId> = entries.iter().map(|(id, _)| *id).collect();
        self.active.borrow_mut().retain(|id| live.contains(id));
    }
}
