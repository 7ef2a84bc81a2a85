//! Combines streams with a pure function.

use std::borrow::Cow;
use std::rc::{Rc, Weak};

use crate::graph::{Data, Node, NodeState, Operator, Stream, StreamValue, Upstream};

pub(crate) struct ZipNode<A, B, O, F> {
    state: NodeState,
    left: Upstream<A>,
    right: Upstream<B>,
    value: StreamValue<O>,
    func: F,
}

impl<A, B, O, F> ZipNode<A, B, O, F>
where
    A: Data,
    B: Data,
    O: Data,
    F: Fn(&A, &B) -> O + 'static,
{
    pub(crate) fn connect(left: &Stream<A>, right: &Stream<B>, func: F) -> Stream<O> {
        assert!(
            Rc::ptr_eq(left.graph(), right.graph()),
            "cannot zip streams from different graphs"
        );
        let graph = left.graph().clone();
        let initial = func(&left.value().borrow(), &right.value().borrow());
        let slot = StreamValue::new(initial);
        let node = Rc::new_cyclic(|this: &Weak<Self>| Self {
            state: NodeState::new(&graph, this.clone()),
            left: left.upstream(),
            right: right.upstream(),
            value: slot.clone(),
            func,
        });
        let node: Rc<dyn Node> = node;
        left.node().dependents().add(&node);
        right.node().dependents().add(&node);
        graph.add_value(node.clone());
        Stream::from_node(graph, slot, node)
    }
}

impl<A, B, O, F> Operator for ZipNode<A, B, O, F>
where
    A: Data,
    B: Data,
    O: Data,
    F: Fn(&A, &B) -> O + 'static,
{
    fn state(&self) -> &NodeState {
        &self.state
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::from("Zip")
    }

    fn eval(&self) {
        let next = (self.func)(&self.left.value().borrow(), &self.right.value().borrow());
        self.state.publish(&self.value, next);
    }
}

impl<T: Data> Stream<T> {
    /// A stream carrying `func` of both input values, re-evaluated when
    /// either input changes. Both inputs see values from the same step.
    pub fn zip<B: Data, O: Data>(
        &self,
        other: &Stream<B>,
        func: impl Fn(&T, &B) -> O + 'static,
    ) -> Stream<O> {
        ZipNode::connect(self, other, func)
    }

    /// [`zip`](Self::zip) over three streams.
    pub fn zip2<B: Data, C: Data, O: Data>(
        &self,
        second: &Stream<B>,
        third: &Stream<C>,
        func: impl Fn(&T, &B, &C) -> O + 'static,
    ) -> Stream<O> {
        let tail = second.zip(third, |b, c| (b.clone(), c.clone()));
        self.zip(&tail, move |a, (b, c)| func(a, b, c))
    }

    /// [`zip`](Self::zip) over four streams.
    pub fn zip3<B: Data, C: Data, D: Data, O: Data>(
        &self,
        second: &Stream<B>,
        third: &Stream<C>,
        fourth: &Stream<D>,
        func: impl Fn(&T, &B, &C, &D) -> O + 'static,
    ) -> Stream<O> {
        let tail = second.zip2(third, fourth, |b, c, d| (b.clone(), c.clone(), d.clone()));
        self.zip(&tail, move |a, (b, c, d)| func(a, b, c, d))
    }

    /// [`zip`](Self::zip) over five streams.
    pub fn zip4<B: Data, C: Data, D: Data, E: Data, O: Data>(
        &self,
        second: &Stream<B>,
        third: &Stream<C>,
        fourth: &Stream<D>,
        fifth: &Stream<E>,
        func: impl Fn(&T, &B, &C, &D, &E) -> O + 'static,
    ) -> Stream<O> {
        let tail = second.zip3(third, fourth, fifth, |b, c, d, e| {
            (b.clone(), c.clone(), d.clone(), e.clone())
        });
        self.zip(&tail, move |a, (b, c, d, e)| func(a, b, c, d, e))
    }

    /// [`zip`](Self::zip) over six streams.
    pub fn zip5<B: Data, C: Data, D: Data, E: Data, G: Data, O: Data>(
        &self,
        second: &Stream<B>,
        third: &Stream<C>,
        fourth: &Stream<D>,
        fifth: &Stream<E>,
        sixth: &Stream<G>,
        func: impl Fn(&T, &B, &C, &D, &E, &G) -> O + 'static,
    ) -> Stream<O> {
        let tail = second.zip4(third, fourth, fifth, sixth, |b, c, d, e, g| {
            (b.clone(), c.clone(), d.clone(), e.clone(), g.clone())
        });
        self.zip(&tail, move |a, (b, c, d, e, g)| func(a, b, c, d, e, g))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use std::cell::Cell;

    #[test]
    fn zip_sees_both_inputs_from_the_same_step() {
        let graph = Graph::new();
        let (left, left_handle) = graph.input_value(1);
        let (right, right_handle) = graph.input_value(10);
        let sum = left.zip(&right, |a, b| a + b);
        assert_eq!(sum.get(), 11);

        left_handle.push(2);
        right_handle.push(20);
        graph.step().unwrap();
        assert_eq!(sum.get(), 22);
    }

    #[test]
    fn zip_reevaluates_once_when_both_inputs_change() {
        let graph = Graph::new();
        let (left, left_handle) = graph.input_value(0);
        let (right, right_handle) = graph.input_value(0);
        let evals = Rc::new(Cell::new(0));
        let sum = {
            let evals = evals.clone();
            left.zip(&right, move |a, b| {
                evals.set(evals.get() + 1);
                a + b
            })
        };
        assert_eq!(evals.get(), 1);

        left_handle.push(3);
        right_handle.push(4);
        graph.step().unwrap();
        assert_eq!(sum.get(), 7);
        assert_eq!(evals.get(), 2);
    }

    #[test]
    fn wide_zips_combine_all_inputs() {
        let graph = Graph::new();
        let (a, ha) = graph.input_value(1);
        let b = graph.constant_value(2);
        let c = graph.constant_value(3);
        let d = graph.constant_value(4);
        let e = graph.constant_value(5);
        let f = graph.constant_value(6);

        let three = a.zip2(&b, &c, |a, b, c| a + b + c);
        let four = a.zip3(&b, &c, &d, |a, b, c, d| a + b + c + d);
        let five = a.zip4(&b, &c, &d, &e, |a, b, c, d, e| a + b + c + d + e);
        let six = a.zip5(&b, &c, &d, &e, &f, |a, b, c, d, e, f| a + b + c + d + e + f);
        assert_eq!(three.get(), 6);
        assert_eq!(four.get(), 10);
        assert_eq!(five.get(), 15);
        assert_eq!(six.get(), 21);

        ha.push(100);
        graph.step().unwrap();
        assert_eq!(three.get(), 105);
        assert_eq!(four.get(), 109);
        assert_eq!(five.get(), 114);
        assert_eq!(six.get(), 120);
    }

    #[test]
    #[should_panic(expected = "different graphs")]
    fn zipping_across_graphs_panics() {
        let first = Graph::new();
        let second = Graph::new();
        let a = first.constant_value(1);
        let b = second.constant_value(2);
        let _ = a.zip(&b, |a, b| a + b);
    }
}
