//! Applies a pure function to one input stream.

use std::borrow::Cow;
use std::rc::{Rc, Weak};

use crate::graph::{Data, Node, NodeState, Operator, Stream, StreamValue, Upstream};

pub(crate) struct MapNode<I, O, F> {
    state: NodeState,
    input: Upstream<I>,
    value: StreamValue<O>,
    func: F,
}

impl<I, O, F> MapNode<I, O, F>
where
    I: Data,
    O: Data,
    F: Fn(&I) -> O + 'static,
{
    pub(crate) fn connect(input: &Stream<I>, func: F) -> Stream<O> {
        let graph = input.graph().clone();
        let initial = func(&input.value().borrow());
        let slot = StreamValue::new(initial);
        let node = Rc::new_cyclic(|this: &Weak<Self>| Self {
            state: NodeState::new(&graph, this.clone()),
            input: input.upstream(),
            value: slot.clone(),
            func,
        });
        let node: Rc<dyn Node> = node;
        input.node().dependents().add(&node);
        graph.add_value(node.clone());
        Stream::from_node(graph, slot, node)
    }
}

impl<I, O, F> Operator for MapNode<I, O, F>
where
    I: Data,
    O: Data,
    F: Fn(&I) -> O + 'static,
{
    fn state(&self) -> &NodeState {
        &self.state
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::from("Map")
    }

    fn eval(&self) {
        let next = (self.func)(&self.input.value().borrow());
        self.state.publish(&self.value, next);
    }
}

impl<T: Data> Stream<T> {
    /// A stream carrying `func` of this stream's value.
    ///
    /// `func` must be pure: it is re-run at unspecified times, but only when
    /// this stream's value changed.
    pub fn map<O: Data>(&self, func: impl Fn(&T) -> O + 'static) -> Stream<O> {
        MapNode::connect(self, func)
    }
}
