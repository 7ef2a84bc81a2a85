//! Host-driven input streams.
//!
//! Writes through the handles only stage a pending value; nothing becomes
//! visible inside the graph until the next [`Graph::step`](crate::Graph::step)
//! commits it. Plain inputs latch the last pushed value; change inputs drain
//! their pending accumulation to zero at every commit, so a value pushed once
//! is visible for exactly one step.

use std::borrow::Cow;
use std::cell::RefCell;
use std::mem;
use std::rc::{Rc, Weak};

use crate::algebra::{MonoidValue, Weight};
use crate::graph::{Data, Graph, GraphInner, Node, NodeState, Operator, Stream, StreamValue};

/// Latches the most recent value pushed by the host.
pub(crate) struct InputNode<T> {
    state: NodeState,
    value: StreamValue<T>,
    pending: RefCell<T>,
}

impl<T: Data> InputNode<T> {
    pub(crate) fn connect(graph: &Rc<GraphInner>, initial: T) -> (Stream<T>, InputHandle<T>) {
        let slot = StreamValue::new(initial.clone());
        let node = Rc::new_cyclic(|this: &Weak<Self>| Self {
            state: NodeState::new(graph, this.clone()),
            value: slot.clone(),
            pending: RefCell::new(initial),
        });
        let dyn_node: Rc<dyn Node> = node.clone();
        graph.add_value(dyn_node.clone());
        graph.add_external(&dyn_node);
        let stream = Stream::from_node(graph.clone(), slot, dyn_node);
        (stream, InputHandle { node })
    }
}

impl<T: Data> Operator for InputNode<T> {
    fn state(&self) -> &NodeState {
        &self.state
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::from("Input")
    }

    fn eval(&self) {
        let next = self.pending.borrow().clone();
        self.state.publish(&self.value, next);
    }
}

/// Write half of [`Graph::input_value`].
pub struct InputHandle<T> {
    node: Rc<InputNode<T>>,
}

impl<T> Clone for InputHandle<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
        }
    }
}

impl<T: Data> InputHandle<T> {
    /// Stages `value` for the next step. Pushing twice between steps keeps
    /// only the later value.
    pub fn push(&self, value: T) {
        *self.node.pending.borrow_mut() = value;
    }
}

/// Accumulates pushed changes and drains them at every commit.
pub(crate) struct ChangeInputNode<T> {
    state: NodeState,
    value: StreamValue<T>,
    pending: RefCell<T>,
    label: &'static str,
}

impl<T: MonoidValue> ChangeInputNode<T> {
    pub(crate) fn connect(graph: &Rc<GraphInner>, label: &'static str) -> (Stream<T>, Rc<Self>) {
        let slot = StreamValue::new(T::zero());
        let node = Rc::new_cyclic(|this: &Weak<Self>| Self {
            state: NodeState::new(graph, this.clone()),
            value: slot.clone(),
            pending: RefCell::new(T::zero()),
            label,
        });
        let dyn_node: Rc<dyn Node> = node.clone();
        graph.add_value(dyn_node.clone());
        graph.add_external(&dyn_node);
        let stream = Stream::from_node(graph.clone(), slot, dyn_node);
        (stream, node)
    }

    /// Rewrites the pending accumulation in place.
    pub(crate) fn update(&self, rewrite: impl FnOnce(T) -> T) {
        let mut pending = self.pending.borrow_mut();
        let current = mem::replace(&mut *pending, T::zero());
        *pending = rewrite(current);
    }

    /// Adds `delta` onto the pending accumulation.
    pub(crate) fn merge(&self, delta: T) {
        self.update(|current| current + delta);
    }
}

impl<T: MonoidValue> Operator for ChangeInputNode<T> {
    fn state(&self) -> &NodeState {
        &self.state
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::from(self.label)
    }

    fn eval(&self) {
        let next = mem::replace(&mut *self.pending.borrow_mut(), T::zero());
        self.state.publish(&self.value, next);
    }
}

/// Write half of [`Graph::counter_value`].
pub struct CounterHandle {
    node: Rc<ChangeInputNode<Weight>>,
}

impl Clone for CounterHandle {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
        }
    }
}

impl CounterHandle {
    /// Adds `amount` to the total committed at the next step.
    pub fn add(&self, amount: Weight) {
        self.node.merge(amount);
    }
}

impl Graph {
    /// A stream the host drives directly: it holds `initial` until a value
    /// pushed through the handle is committed by a step.
    pub fn input_value<T: Data>(&self, initial: T) -> (Stream<T>, InputHandle<T>) {
        InputNode::connect(self.inner(), initial)
    }

    /// A stream of per-step totals: each step it carries the sum of the
    /// amounts added since the previous step, then resets to zero.
    pub fn counter_value(&self) -> (Stream<Weight>, CounterHandle) {
        let (stream, node) = ChangeInputNode::connect(self.inner(), "Counter");
        (stream, CounterHandle { node })
    }
}
