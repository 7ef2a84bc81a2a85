//! A stream sampled from outside the graph.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::graph::{Data, Graph, GraphInner, Node, NodeState, Operator, Stream, StreamValue};

/// Re-samples a host-provided closure at the start of every step.
///
/// The closure runs once at construction and once per step; downstream nodes
/// only wake when the sampled value actually changed.
pub(crate) struct ExternalNode<T, F> {
    state: NodeState,
    value: StreamValue<T>,
    sample: RefCell<F>,
}

impl<T, F> ExternalNode<T, F>
where
    T: Data,
    F: FnMut() -> T + 'static,
{
    pub(crate) fn connect(graph: &Rc<GraphInner>, mut sample: F) -> Stream<T> {
        let initial = sample();
        let slot = StreamValue::new(initial);
        let node = Rc::new_cyclic(|this: &Weak<Self>| Self {
            state: NodeState::new(graph, this.clone()),
            value: slot.clone(),
            sample: RefCell::new(sample),
        });
        let node: Rc<dyn Node> = node;
        graph.add_value(node.clone());
        graph.add_external(&node);
        Stream::from_node(graph.clone(), slot, node)
    }
}

impl<T, F> Operator for ExternalNode<T, F>
where
    T: Data,
    F: FnMut() -> T + 'static,
{
    fn state(&self) -> &NodeState {
        &self.state
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::from("External")
    }

    fn eval(&self) {
        let next = (self.sample.borrow_mut())();
        self.state.publish(&self.value, next);
    }
}

impl Graph {
    /// A stream fed by `sample`, re-read at the start of every step.
    pub fn external_value<T: Data>(&self, sample: impl FnMut() -> T + 'static) -> Stream<T> {
        ExternalNode::connect(self.inner(), sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn samples_at_construction_and_every_step() {
        let graph = Graph::new();
        let calls = Rc::new(Cell::new(0));
        let source = graph.external_value({
            let calls = calls.clone();
            move || {
                calls.set(calls.get() + 1);
                calls.get()
            }
        });
        assert_eq!(source.get(), 1);
        graph.step().unwrap();
        assert_eq!(source.get(), 2);
        graph.step().unwrap();
        assert_eq!(source.get(), 3);
    }

    #[test]
    fn unchanged_samples_do_not_wake_dependents() {
        let graph = Graph::new();
        let source = graph.external_value(|| 7);
        let evals = Rc::new(Cell::new(0));
        let derived = {
            let evals = evals.clone();
            source.map(move |n| {
                evals.set(evals.get() + 1);
                *n * 2
            })
        };
        assert_eq!(derived.get(), 14);
        assert_eq!(evals.get(), 1);
        graph.step().unwrap();
        graph.step().unwrap();
        assert_eq!(evals.get(), 1);
    }
}
