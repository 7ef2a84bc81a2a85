//! Follows a stream whose value is itself a stream.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::graph::{Data, Node, NodeState, Operator, Stream, StreamValue, Upstream};

/// Tracks the stream currently selected by the outer stream.
///
/// When the outer value switches to a different inner stream, the node moves
/// its dependency edge from the old inner to the new one and takes the new
/// inner's current value. Selecting a stream created later in the order than
/// this node, while that stream still changes, trips the scheduler's
/// ordering check.
pub(crate) struct FlattenNode<T> {
    state: NodeState,
    outer: Upstream<Stream<T>>,
    inner: RefCell<Upstream<T>>,
    value: StreamValue<T>,
}

impl<T: Data> FlattenNode<T> {
    pub(crate) fn connect(outer: &Stream<Stream<T>>) -> Stream<T> {
        let graph = outer.graph().clone();
        let selected = outer.get();
        let initial = selected.get();
        let slot = StreamValue::new(initial);
        let node = Rc::new_cyclic(|this: &Weak<Self>| Self {
            state: NodeState::new(&graph, this.clone()),
            outer: outer.upstream(),
            inner: RefCell::new(selected.upstream()),
            value: slot.clone(),
        });
        let node: Rc<dyn Node> = node;
        outer.node().dependents().add(&node);
        selected.node().dependents().add(&node);
        graph.add_value(node.clone());
        Stream::from_node(graph, slot, node)
    }
}

impl<T: Data> Operator for FlattenNode<T> {
    fn state(&self) -> &NodeState {
        &self.state
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::from("Flatten")
    }

    fn eval(&self) {
        let selected = self.outer.value().get();
        {
            let mut inner = self.inner.borrow_mut();
            if inner.node().id() != selected.node().id() {
                inner.node().dependents().remove(self.state.id());
                let this = self.state.this();
                selected.node().dependents().add(&this);
                *inner = selected.upstream();
            }
        }
        let next = self.inner.borrow().value().get();
        self.state.publish(&self.value, next);
    }
}

impl<T: Data> Stream<Stream<T>> {
    /// The value of whichever stream this stream currently selects.
    pub fn flatten(&self) -> Stream<T> {
        FlattenNode::connect(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::graph::Graph;
    use std::cell::Cell;

    #[test]
    fn follows_the_selected_stream() {
        let graph = Graph::new();
        let (first, first_handle) = graph.input_value(1);
        let (second, second_handle) = graph.input_value(100);
        let (selector, select) = graph.input_value(first.clone());
        let flat = selector.flatten();
        assert_eq!(flat.get(), 1);

        first_handle.push(2);
        graph.step().unwrap();
        assert_eq!(flat.get(), 2);

        // Changes to the unselected stream are invisible.
        second_handle.push(200);
        graph.step().unwrap();
        assert_eq!(flat.get(), 2);

        // Switching picks up the new inner's current value in the same step.
        select.push(second.clone());
        graph.step().unwrap();
        assert_eq!(flat.get(), 200);

        // After the switch, only the new inner is followed.
        first_handle.push(3);
        second_handle.push(300);
        graph.step().unwrap();
        assert_eq!(flat.get(), 300);
    }

    #[test]
    fn switching_and_new_value_arrive_together() {
        let graph = Graph::new();
        let (first, _first_handle) = graph.input_value(1);
        let (second, second_handle) = graph.input_value(10);
        let (selector, select) = graph.input_value(first.clone());
        let flat = selector.flatten();

        select.push(second.clone());
        second_handle.push(20);
        graph.step().unwrap();
        assert_eq!(flat.get(), 20);
    }

    #[test]
    fn external_selection_alternates_between_constants() {
        let graph = Graph::new();
        let low = graph.constant_value(10);
        let high = graph.constant_value(20);
        let toggle = graph.external_value({
            let take_low = Cell::new(true);
            let low = low.clone();
            let high = high.clone();
            move || {
                let selected = if take_low.get() { low.clone() } else { high.clone() };
                take_low.set(!take_low.get());
                selected
            }
        });
        let flat = toggle.flatten();
        assert_eq!(flat.get(), 10);

        // The flattened value flips exactly at the step the selection does.
        graph.step().unwrap();
        assert_eq!(flat.get(), 20);
        graph.step().unwrap();
        assert_eq!(flat.get(), 10);
        graph.step().unwrap();
        assert_eq!(flat.get(), 20);
    }

    #[test]
    fn selecting_a_later_changing_stream_is_an_ordering_violation() {
        let graph = Graph::new();
        let (first, _first_handle) = graph.input_value(0);
        let (selector, select) = graph.input_value(first.clone());
        let flat = selector.flatten();

        // Created after the flatten node, and changing every step.
        let late = graph.external_value({
            let count = Cell::new(0);
            move || {
                count.set(count.get() + 1);
                count.get()
            }
        });

        select.push(late.clone());
        let err = graph.step().unwrap_err();
        assert!(matches!(err, Error::OrderViolation { .. }));
        let _ = flat;
    }
}
