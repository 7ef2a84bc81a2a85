//! One-step delay: the only legal way to close a cycle.
//!
//! A register pairs two nodes. The register node sits early in the order and
//! commits, at each step, the value its sampler captured during the previous
//! step; the sampler node sits after the register's input and captures that
//! input's value as it settles. Splitting the two halves is what lets a
//! feedback edge point "backwards" without violating the in-step ordering:
//! the backward hop always crosses a step boundary.
//!
//! ```text
//!                ┌────────┐
//!    input ─────▶│ Sampler │─ ─ next step ─ ─▶┌──────────┐
//!                └────────┘                   │ Register │────▶ delayed
//!                     ▲                       └──────────┘
//!                     └── reads input ──┘
//! ```

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::graph::{
    Data, GraphInner, Node, NodeId, NodeState, Operator, Stream, StreamValue, Upstream,
};

pub(crate) struct RegisterNode<T> {
    state: NodeState,
    value: StreamValue<T>,
    pending: RefCell<T>,
    sampler: Cell<Option<NodeId>>,
}

impl<T: Data> RegisterNode<T> {
    pub(crate) fn connect(graph: &Rc<GraphInner>, initial: T) -> (Stream<T>, Rc<Self>) {
        let slot = StreamValue::new(initial.clone());
        let node = Rc::new_cyclic(|this: &Weak<Self>| Self {
            state: NodeState::new(graph, this.clone()),
            value: slot.clone(),
            pending: RefCell::new(initial),
            sampler: Cell::new(None),
        });
        let dyn_node: Rc<dyn Node> = node.clone();
        graph.add_value(dyn_node.clone());
        let stream = Stream::from_node(graph.clone(), slot, dyn_node);
        (stream, node)
    }

    /// Stages the value the register will commit at its next evaluation.
    fn set_pending(&self, value: T) {
        *self.pending.borrow_mut() = value;
        self.state
            .graph()
            .mark_dirty_next_step(&self.state.this());
    }
}

impl<T: Data> Operator for RegisterNode<T> {
    fn state(&self) -> &NodeState {
        &self.state
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::from("Register")
    }

    fn eval(&self) {
        let next = self.pending.borrow().clone();
        self.state.publish(&self.value, next);
    }

    fn on_dispose(&self) {
        if let Some(sampler) = self.sampler.get() {
            self.state.graph().remove_value(sampler);
        }
    }
}

/// Captures the register input's settled value each step.
pub(crate) struct SamplerNode<T> {
    state: NodeState,
    input: Upstream<T>,
    register: Rc<RegisterNode<T>>,
}

impl<T: Data> SamplerNode<T> {
    /// Wires `input` into `register`. A register accepts exactly one input
    /// for its whole life.
    pub(crate) fn connect(graph: &Rc<GraphInner>, register: &Rc<RegisterNode<T>>, input: &Stream<T>) {
        if register.sampler.get().is_some() {
            panic!("register is already wired to an input");
        }
        let node = Rc::new_cyclic(|this: &Weak<Self>| Self {
            state: NodeState::new(graph, this.clone()),
            input: input.upstream(),
            register: register.clone(),
        });
        let dyn_node: Rc<dyn Node> = node.clone();
        input.node().dependents().add(&dyn_node);
        node.eval();
        graph.add_value(dyn_node);
        register.sampler.set(Some(node.state.id()));
    }
}

impl<T: Data> Operator for SamplerNode<T> {
    fn state(&self) -> &NodeState {
        &self.state
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::from("Sampler")
    }

    fn eval(&self) {
        self.register.set_pending(self.input.value().get());
    }

    fn on_dispose(&self) {
        self.state
            .graph()
            .remove_value(self.register.state.id());
    }
}

impl<T: Data> Stream<T> {
    /// This stream's value from one step ago; `initial` before that.
    pub fn delay(&self, initial: T) -> Stream<T> {
        let (delayed, register) = RegisterNode::connect(self.graph(), initial);
        SamplerNode::connect(self.graph(), &register, self);
        delayed
    }

    /// A running fold over this stream's values.
    ///
    /// The result starts at `func(initial, current)` and, at each step, folds
    /// the input's new value into the previous result through a one-step
    /// feedback loop.
    pub fn accumulate<A: Data>(
        &self,
        initial: A,
        func: impl Fn(&A, &T) -> A + 'static,
    ) -> Stream<A> {
        let (previous, register) = RegisterNode::connect(self.graph(), initial);
        let output = previous.zip(self, func);
        SamplerNode::connect(self.graph(), &register, &output);
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    #[test]
    fn delay_lags_its_input_by_one_step() {
        let graph = Graph::new();
        let (value, handle) = graph.input_value(10);
        let delayed = value.delay(0);
        assert_eq!(delayed.get(), 0);

        graph.step().unwrap();
        assert_eq!((value.get(), delayed.get()), (10, 10));

        handle.push(20);
        graph.step().unwrap();
        assert_eq!((value.get(), delayed.get()), (20, 10));

        graph.step().unwrap();
        assert_eq!((value.get(), delayed.get()), (20, 20));
    }

    #[test]
    fn accumulate_refolds_a_latched_input_while_the_loop_is_hot() {
        let graph = Graph::new();
        let (value, _handle) = graph.input_value(1);
        let sum = value.accumulate(0, |acc, n| acc + n);
        assert_eq!(sum.get(), 1);

        // A latched non-zero input keeps the feedback loop hot: every step
        // folds the input in again. Streams meant to quiesce accumulate
        // deltas that reset to zero instead (see the counter tests).
        graph.step().unwrap();
        assert_eq!(sum.get(), 2);
        graph.step().unwrap();
        assert_eq!(sum.get(), 3);
    }

    #[test]
    fn accumulate_reacts_to_input_from_the_same_step() {
        let graph = Graph::new();
        let (total, counter) = graph.counter_value();
        let sum = total.accumulate(0, |acc, n| acc + n);
        counter.add(4);
        graph.step().unwrap();
        counter.add(2);
        graph.step().unwrap();
        graph.step().unwrap();
        graph.step().unwrap();
        assert_eq!(sum.get(), 6);
    }

    #[test]
    #[should_panic(expected = "already wired")]
    fn register_rejects_a_second_input() {
        let graph = Graph::new();
        let first = graph.constant_value(1);
        let second = graph.constant_value(2);
        let (_delayed, register) = RegisterNode::connect(first.graph(), 0);
        SamplerNode::connect(first.graph(), &register, &first);
        SamplerNode::connect(second.graph(), &register, &second);
    }

    #[test]
    fn disposing_the_delayed_stream_removes_both_halves() {
        let graph = Graph::new();
        let (value, handle) = graph.input_value(1);
        let delayed = value.delay(0);
        graph.step().unwrap();
        assert_eq!(delayed.get(), 1);

        delayed.dispose();
        handle.push(9);
        graph.step().unwrap();
        graph.step().unwrap();
        assert_eq!(delayed.get(), 1);
    }
}
