//! A stream that always holds the same value.

use std::borrow::Cow;
use std::rc::{Rc, Weak};

use crate::graph::{Data, Graph, GraphInner, Node, NodeState, Operator, Stream, StreamValue};

pub(crate) struct ConstantNode<T> {
    state: NodeState,
    value: StreamValue<T>,
}

impl<T: Data> ConstantNode<T> {
    pub(crate) fn connect(graph: &Rc<GraphInner>, value: T) -> Stream<T> {
        let slot = StreamValue::new(value);
        let node = Rc::new_cyclic(|this: &Weak<Self>| Self {
            state: NodeState::new(graph, this.clone()),
            value: slot.clone(),
        });
        let node: Rc<dyn Node> = node;
        graph.add_value(node.clone());
        Stream::from_node(graph.clone(), slot, node)
    }
}

impl<T: Data> Operator for ConstantNode<T> {
    fn state(&self) -> &NodeState {
        &self.state
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::from("Constant")
    }

    fn eval(&self) {
        let value = self.value.get();
        self.state.publish(&self.value, value);
    }
}

impl Graph {
    /// A stream that holds `value` and never changes.
    pub fn constant_value<T: Data>(&self, value: T) -> Stream<T> {
        ConstantNode::connect(self.inner(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_never_propagates() {
        let graph = Graph::new();
        let base = graph.constant_value("fixed");
        let derived = base.map(|s| s.len());
        assert_eq!(derived.get(), 5);
        graph.step().unwrap();
        assert_eq!(derived.get(), 5);
    }
}
