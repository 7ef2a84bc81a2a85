//! Graph construction and the step scheduler.
//!
//! A [`Graph`] owns a registry of value nodes connected by dependency edges.
//! Nodes carry [`FractionalIndex`]es that order every upstream node before
//! its downstreams, and [`Graph::step`] drains dirty nodes in index order,
//! re-evaluating each one at most once per step. A node whose recomputed
//! value is unchanged does not wake its dependents, so work is proportional
//! to the part of the graph actually affected by a step's inputs.
//!
//! Nodes may be created and disposed at any time, including from inside a
//! node's own evaluation. Nodes created mid-step are spliced into the order
//! right after their creator and run later in the same step.

use std::borrow::Cow;
use std::cell::{Cell, Ref, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::error::Error;
use crate::graph::dependents::Dependents;
use crate::graph::dirty::DirtySet;
use crate::graph::index::{FractionalIndex, IndexParts};

/// Bounds for values carried on a [`Stream`].
///
/// Values are cloned out of the graph on read and compared against the
/// previous value after every recomputation to decide whether dependents
/// need to run.
pub trait Data: Clone + Eq + 'static {}

impl<T: Clone + Eq + 'static> Data for T {}

/// Identifies a node within its graph for the node's whole lifetime.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub(crate) struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Object-safe view of a node held by the registry, queues and edges.
pub(crate) trait Node: 'static {
    fn id(&self) -> NodeId;
    fn name(&self) -> Cow<'static, str>;
    fn index(&self) -> FractionalIndex;
    fn set_index(&self, index: FractionalIndex);
    fn dependents(&self) -> &Dependents;
    /// Recomputes the node's value. Called only by the scheduler, never
    /// while any graph-wide borrow is outstanding.
    fn step(&self);
    /// Unregisters the node so it is never scheduled again. Its last value
    /// stays readable through any surviving [`Stream`] handle.
    fn dispose(&self);
}

/// What a concrete node kind supplies; [`Node`] is implemented on top.
pub(crate) trait Operator: 'static {
    fn state(&self) -> &NodeState;
    fn name(&self) -> Cow<'static, str>;
    fn eval(&self);
    /// Extra teardown for node kinds with companion nodes.
    fn on_dispose(&self) {}
}

impl<O: Operator> Node for O {
    fn id(&self) -> NodeId {
        self.state().id
    }

    fn name(&self) -> Cow<'static, str> {
        Operator::name(self)
    }

    fn index(&self) -> FractionalIndex {
        self.state()
            .index
            .borrow()
            .clone()
            .expect("node index is assigned at registration")
    }

    fn set_index(&self, index: FractionalIndex) {
        *self.state().index.borrow_mut() = Some(index);
    }

    fn dependents(&self) -> &Dependents {
        &self.state().dependents
    }

    fn step(&self) {
        self.eval();
    }

    fn dispose(&self) {
        self.state().graph.remove_value(self.state().id);
        self.on_dispose();
    }
}

/// Bookkeeping shared by every node kind.
pub(crate) struct NodeState {
    id: NodeId,
    index: RefCell<Option<FractionalIndex>>,
    dependents: Dependents,
    graph: Rc<GraphInner>,
    this: Weak<dyn Node>,
}

impl NodeState {
    pub(crate) fn new(graph: &Rc<GraphInner>, this: Weak<dyn Node>) -> Self {
        Self {
            id: graph.next_node_id(),
            index: RefCell::new(None),
            dependents: Dependents::new(),
            graph: graph.clone(),
            this,
        }
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn graph(&self) -> &Rc<GraphInner> {
        &self.graph
    }

    /// The node this state belongs to.
    pub(crate) fn this(&self) -> Rc<dyn Node> {
        self.this.upgrade().expect("node is alive during use")
    }

    /// Stores `value` into `slot` and wakes dependents when it differs from
    /// the previous value (or unconditionally under [`Propagation::Always`]).
    pub(crate) fn publish<T: Data>(&self, slot: &StreamValue<T>, value: T) {
        let changed = slot.replace_if_changed(value);
        if changed || self.graph.always_propagate() {
            self.invalidate_dependents();
        }
    }

    pub(crate) fn invalidate_dependents(&self) {
        let graph = &self.graph;
        self.dependents.for_each_live(|dependent| graph.mark_dirty(&dependent));
    }
}

/// Shared slot holding a stream's current value.
pub(crate) struct StreamValue<T>(Rc<RefCell<T>>);

impl<T> Clone for StreamValue<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Data> StreamValue<T> {
    pub(crate) fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    pub(crate) fn get(&self) -> T {
        self.0.borrow().clone()
    }

    pub(crate) fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    fn replace_if_changed(&self, value: T) -> bool {
        let mut current = self.0.borrow_mut();
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    }
}

/// A node's handle on one of its inputs: the value slot plus a strong
/// reference keeping the upstream node alive while anything still reads it.
pub(crate) struct Upstream<T> {
    value: StreamValue<T>,
    node: Rc<dyn Node>,
}

impl<T> Clone for Upstream<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            node: self.node.clone(),
        }
    }
}

impl<T> Upstream<T> {
    pub(crate) fn value(&self) -> &StreamValue<T> {
        &self.value
    }

    pub(crate) fn node(&self) -> &Rc<dyn Node> {
        &self.node
    }
}

/// Index-splitting state while one node's evaluation creates others.
///
/// The first creation renames the creating node from index `p` to `p.1`;
/// subsequent creations take `p.2`, `p.3` and so on, all ordered after the
/// creator and before whatever followed `p`.
struct SplitState {
    prefix: IndexParts,
    next_child: i64,
}

/// When a recomputed value wakes the node's dependents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Propagation {
    /// Only when the new value differs from the previous one.
    #[default]
    OnChange,
    /// After every recomputation, changed or not.
    Always,
}

/// Tuning knobs fixed at graph construction.
#[derive(Clone, Debug, Default)]
pub struct GraphConfig {
    pub propagation: Propagation,
}

pub(crate) struct GraphInner {
    config: GraphConfig,
    next_id: Cell<u64>,
    next_position: Cell<i64>,
    next_negative: Cell<i64>,
    stepping: Cell<bool>,
    nodes: RefCell<HashMap<NodeId, Rc<dyn Node>>>,
    externals: RefCell<HashMap<NodeId, Weak<dyn Node>>>,
    dirty: RefCell<DirtySet>,
    dirty_next: RefCell<DirtySet>,
    last_processed: RefCell<Option<Rc<dyn Node>>>,
    split: RefCell<Option<SplitState>>,
    after_step: RefCell<Vec<Box<dyn FnMut()>>>,
}

impl GraphInner {
    fn new(config: GraphConfig) -> Rc<Self> {
        Rc::new(Self {
            config,
            next_id: Cell::new(0),
            next_position: Cell::new(0),
            next_negative: Cell::new(-1),
            stepping: Cell::new(false),
            nodes: RefCell::new(HashMap::new()),
            externals: RefCell::new(HashMap::new()),
            dirty: RefCell::new(DirtySet::new()),
            dirty_next: RefCell::new(DirtySet::new()),
            last_processed: RefCell::new(None),
            split: RefCell::new(None),
            after_step: RefCell::new(Vec::new()),
        })
    }

    pub(crate) fn next_node_id(&self) -> NodeId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        NodeId(id)
    }

    pub(crate) fn always_propagate(&self) -> bool {
        self.config.propagation == Propagation::Always
    }

    /// Registers `node`, assigning it the next index slot.
    ///
    /// Outside a step, nodes take consecutive whole-number indices. During a
    /// step, a node created while another is being processed is spliced in
    /// right after its creator; a node created before any processing this
    /// step takes a negative index so it runs ahead of everything.
    pub(crate) fn add_value(&self, node: Rc<dyn Node>) {
        let index = if !self.stepping.get() {
            let position = self.next_position.get();
            self.next_position.set(position + 1);
            FractionalIndex::new(position)
        } else {
            let creator = self.last_processed.borrow().clone();
            match creator {
                None => {
                    let position = self.next_negative.get();
                    self.next_negative.set(position - 1);
                    FractionalIndex::new(position)
                }
                Some(creator) => {
                    let mut split = self.split.borrow_mut();
                    let state = split.get_or_insert_with(|| {
                        let prefix: IndexParts = creator.index().parts().iter().copied().collect();
                        creator.set_index(creator.index().add_epsilon());
                        SplitState {
                            prefix,
                            next_child: 1,
                        }
                    });
                    state.next_child += 1;
                    let mut parts = state.prefix.clone();
                    parts.push(state.next_child);
                    FractionalIndex::from_parts(parts)
                }
            }
        };
        trace!(node = %node.name(), id = %node.id(), index = %index, "registering node");
        node.set_index(index);
        self.nodes.borrow_mut().insert(node.id(), node);
    }

    /// Additionally marks `node` as external: it will be queued at the start
    /// of every step.
    pub(crate) fn add_external(&self, node: &Rc<dyn Node>) {
        self.externals
            .borrow_mut()
            .insert(node.id(), Rc::downgrade(node));
    }

    pub(crate) fn remove_value(&self, id: NodeId) {
        trace!(id = %id, "unregistering node");
        self.nodes.borrow_mut().remove(&id);
        self.externals.borrow_mut().remove(&id);
    }

    pub(crate) fn is_registered(&self, id: NodeId) -> bool {
        self.nodes.borrow().contains_key(&id)
    }

    /// Queues `node` for processing: in the current step when one is in
    /// progress, otherwise in the next step.
    pub(crate) fn mark_dirty(&self, node: &Rc<dyn Node>) {
        if self.stepping.get() {
            self.dirty.borrow_mut().insert(node);
        } else {
            self.dirty_next.borrow_mut().insert(node);
        }
    }

    /// Queues `node` for the following step, never the current one.
    pub(crate) fn mark_dirty_next_step(&self, node: &Rc<dyn Node>) {
        self.dirty_next.borrow_mut().insert(node);
    }

    pub(crate) fn register_after_step(&self, callback: Box<dyn FnMut()>) {
        self.after_step.borrow_mut().push(callback);
    }

    /// Runs one step: drains the dirty queue in ascending index order.
    pub(crate) fn step(&self) -> Result<(), Error> {
        self.stepping.set(true);
        {
            let mut current = self.dirty.borrow_mut();
            let mut deferred = self.dirty_next.borrow_mut();
            mem::swap(&mut *current, &mut *deferred);
        }
        let externals: Vec<Weak<dyn Node>> = self.externals.borrow().values().cloned().collect();
        for weak in externals {
            if let Some(node) = weak.upgrade() {
                self.dirty.borrow_mut().insert(&node);
            }
        }

        let mut processed = 0usize;
        let outcome = loop {
            let entry = self.dirty.borrow_mut().pop();
            let Some(entry) = entry else { break Ok(()) };
            let Some(node) = entry.node.upgrade() else { continue };
            if !self.is_registered(entry.id) {
                trace!(id = %entry.id, "dropping dirty mark for unregistered node");
                continue;
            }
            let index = node.index();
            let last_index = self
                .last_processed
                .borrow()
                .as_ref()
                .map(|last| last.index());
            if let Some(last) = last_index {
                if last >= index {
                    break Err(Error::OrderViolation {
                        node: node.name(),
                        index,
                        last,
                    });
                }
            }
            trace!(node = %node.name(), id = %node.id(), index = %index, "processing");
            *self.last_processed.borrow_mut() = Some(node.clone());
            *self.split.borrow_mut() = None;
            node.step();
            processed += 1;
        };

        *self.last_processed.borrow_mut() = None;
        *self.split.borrow_mut() = None;
        self.stepping.set(false);
        debug!(nodes = processed, "step complete");
        outcome?;
        self.run_after_step();
        Ok(())
    }

    fn run_after_step(&self) {
        let mut callbacks = self.after_step.take();
        for callback in callbacks.iter_mut() {
            callback();
        }
        let mut added = self.after_step.take();
        callbacks.append(&mut added);
        *self.after_step.borrow_mut() = callbacks;
    }

    /// Empties the registry and queues, breaking every cycle between the
    /// graph and its nodes. Surviving stream handles stay readable.
    pub(crate) fn clear(&self) {
        self.nodes.borrow_mut().clear();
        self.externals.borrow_mut().clear();
        self.dirty.borrow_mut().clear();
        self.dirty_next.borrow_mut().clear();
        self.after_step.borrow_mut().clear();
        *self.last_processed.borrow_mut() = None;
        *self.split.borrow_mut() = None;
    }

    #[cfg(test)]
    pub(crate) fn set_stepping_for_test(&self, stepping: bool) {
        self.stepping.set(stepping);
    }
}

/// An incremental computation graph.
///
/// `Graph` is the owning handle: nodes hold strong references back to the
/// graph internals, so dropping the `Graph` tears the registry down to break
/// those cycles. Streams and input handles that outlive the graph keep their
/// last values but are never re-evaluated.
pub struct Graph {
    inner: Rc<GraphInner>,
}

impl Graph {
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            inner: GraphInner::new(config),
        }
    }

    /// Runs one step: commits pending input, then re-evaluates affected
    /// nodes in dependency order, at most once each.
    ///
    /// An error means the graph is wired with a backward edge (a node
    /// reading a value that is recomputed later in the same step) and is not
    /// recoverable.
    pub fn step(&self) -> Result<(), Error> {
        self.inner.step()
    }

    /// Registers `callback` to run after every step, in registration order.
    pub fn after_step(&self, callback: impl FnMut() + 'static) {
        self.inner.register_after_step(Box::new(callback));
    }

    pub(crate) fn inner(&self) -> &Rc<GraphInner> {
        &self.inner
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Graph {
    fn drop(&mut self) {
        self.inner.clear();
    }
}

/// A handle on one node's value.
///
/// Streams are cheap to clone and compare equal when they refer to the same
/// node. Reading never blocks and never recomputes; values advance only
/// during [`Graph::step`].
pub struct Stream<T> {
    graph: Rc<GraphInner>,
    value: StreamValue<T>,
    node: Rc<dyn Node>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
            value: self.value.clone(),
            node: self.node.clone(),
        }
    }
}

impl<T> PartialEq for Stream<T> {
    fn eq(&self, other: &Self) -> bool {
        self.node.id() == other.node.id() && Rc::ptr_eq(&self.graph, &other.graph)
    }
}

impl<T> Eq for Stream<T> {}

impl<T> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("node", &self.node.name())
            .field("id", &self.node.id())
            .finish()
    }
}

impl<T: Data> Stream<T> {
    pub(crate) fn from_node(
        graph: Rc<GraphInner>,
        value: StreamValue<T>,
        node: Rc<dyn Node>,
    ) -> Self {
        Self { graph, value, node }
    }

    /// The current value.
    pub fn get(&self) -> T {
        self.value.get()
    }

    /// Permanently removes the node from its graph. The stream keeps
    /// returning the last value but is never re-evaluated.
    pub fn dispose(&self) {
        self.node.dispose();
    }

    pub(crate) fn graph(&self) -> &Rc<GraphInner> {
        &self.graph
    }

    pub(crate) fn node(&self) -> &Rc<dyn Node> {
        &self.node
    }

    pub(crate) fn value(&self) -> &StreamValue<T> {
        &self.value
    }

    pub(crate) fn upstream(&self) -> Upstream<T> {
        Upstream {
            value: self.value.clone(),
            node: self.node.clone(),
        }
    }
}
