//! Pushes values out of the graph.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::graph::{Data, Node, NodeState, Operator, Stream, StreamValue, Upstream};

/// Runs a host callback with the input's value.
///
/// The callback fires once at construction and then once per step in which
/// the input changed. It never fires for steps the input sat still.
pub(crate) struct SinkNode<T, F> {
    state: NodeState,
    input: Upstream<T>,
    callback: RefCell<F>,
    value: StreamValue<()>,
}

impl<T, F> SinkNode<T, F>
where
    T: Data,
    F: FnMut(&T) + 'static,
{
    pub(crate) fn connect(input: &Stream<T>, callback: F) -> Stream<()> {
        let graph = input.graph().clone();
        let slot = StreamValue::new(());
        let node = Rc::new_cyclic(|this: &Weak<Self>| Self {
            state: NodeState::new(&graph, this.clone()),
            input: input.upstream(),
            callback: RefCell::new(callback),
            value: slot.clone(),
        });
        let node: Rc<dyn Node> = node;
        input.node().dependents().add(&node);
        graph.add_value(node.clone());
        node.step();
        Stream::from_node(graph, slot, node)
    }
}

impl<T, F> Operator for SinkNode<T, F>
where
    T: Data,
    F: FnMut(&T) + 'static,
{
    fn state(&self) -> &NodeState {
        &self.state
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::from("Sink")
    }

    fn eval(&self) {
        (self.callback.borrow_mut())(&self.input.value().borrow());
    }
}

impl<T: Data> Stream<T> {
    /// Observes this stream: `callback` runs now and after any step that
    /// changed the value. The returned stream carries no data; keep it to
    /// [`dispose`](Stream::dispose) the observer.
    pub fn sink(&self, callback: impl FnMut(&T) + 'static) -> Stream<()> {
        SinkNode::connect(self, callback)
    }
}
