//! Incrementally maintained append-only logs.

use std::ops::Deref;
use std::rc::Rc;

use imbl::Vector;

use crate::algebra::{WeightedSet, ZItem};
use crate::graph::{Data, Graph, GraphInner, Stream};
use crate::operator::ChangeInputNode;
use crate::view::set::ReactiveSet;

/// An append-only sequence maintained incrementally across steps.
///
/// The same triple as [`ReactiveSet`](crate::view::ReactiveSet), carried over
/// [`imbl::Vector`] batches: `changes` holds the items appended this step, in
/// append order; `materialized` is the whole log; `previous_materialized`
/// lags it by one step. Per-item operations ([`map`](Self::map),
/// [`filter`](Self::filter), [`fold`](Self::fold)) touch only each step's
/// batch.
pub struct ReactiveLog<T> {
    changes: Stream<Vector<T>>,
    materialized: Stream<Vector<T>>,
    previous: Stream<Vector<T>>,
    length: Stream<usize>,
}

impl<T> Clone for ReactiveLog<T> {
    fn clone(&self) -> Self {
        Self {
            changes: self.changes.clone(),
            materialized: self.materialized.clone(),
            previous: self.previous.clone(),
            length: self.length.clone(),
        }
    }
}

impl<T: Data> ReactiveLog<T> {
    /// Wraps a batch stream, concatenating it onto `start`.
    pub(crate) fn from_changes(changes: Stream<Vector<T>>, start: Vector<T>) -> Self {
        let materialized = changes.accumulate(start.clone(), |acc: &Vector<T>, batch| {
            let mut next = acc.clone();
            next.append(batch.clone());
            next
        });
        let previous = materialized.delay(start.clone());
        let length = changes.accumulate(start.len(), |len, batch| len + batch.len());
        Self {
            changes,
            materialized,
            previous,
            length,
        }
    }

    /// This step's batch of appended items.
    pub fn changes(&self) -> &Stream<Vector<T>> {
        &self.changes
    }

    /// The whole log.
    pub fn materialized(&self) -> &Stream<Vector<T>> {
        &self.materialized
    }

    /// The log as of one step ago.
    pub fn previous_materialized(&self) -> &Stream<Vector<T>> {
        &self.previous
    }

    /// Current contents.
    pub fn snapshot(&self) -> Vector<T> {
        self.materialized.get()
    }

    /// Contents as of one step ago.
    pub fn previous_snapshot(&self) -> Vector<T> {
        self.previous.get()
    }

    /// Number of items in the log.
    pub fn length(&self) -> &Stream<usize> {
        &self.length
    }

    /// A running fold over every item ever appended.
    ///
    /// Seeded by folding the log's previous contents, then advanced one
    /// per-step batch at a time.
    pub fn fold<S: Data>(&self, initial: S, func: impl Fn(&S, &T) -> S + 'static) -> Stream<S> {
        let mut seed = initial;
        for item in self.previous_snapshot().iter() {
            seed = func(&seed, item);
        }
        self.changes.accumulate(seed, move |acc, batch| {
            let mut state = acc.clone();
            for item in batch.iter() {
                state = func(&state, item);
            }
            state
        })
    }

    /// The log with every item pushed through `func`.
    pub fn map<U: Data>(&self, func: impl Fn(&T) -> U + 'static) -> ReactiveLog<U> {
        let start = self.previous_snapshot().iter().map(&func).collect();
        let changes = self
            .changes
            .map(move |batch| batch.iter().map(&func).collect());
        ReactiveLog::from_changes(changes, start)
    }

    /// The log restricted to items satisfying `predicate`.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + 'static) -> ReactiveLog<T> {
        let start = self
            .previous_snapshot()
            .iter()
            .filter(|item| predicate(item))
            .cloned()
            .collect();
        let changes = self.changes.map(move |batch| {
            batch
                .iter()
                .filter(|item| predicate(item))
                .cloned()
                .collect()
        });
        ReactiveLog::from_changes(changes, start)
    }
}

impl<S: ZItem> ReactiveLog<WeightedSet<S>> {
    /// The union of every set ever appended, as a maintained set.
    pub fn to_set(&self) -> ReactiveSet<S> {
        let mut start = WeightedSet::new();
        for delta in self.previous_snapshot().iter() {
            start = start.union(delta);
        }
        let changes = self.changes.map(|batch| {
            let mut merged = WeightedSet::new();
            for delta in batch.iter() {
                merged = merged.union(delta);
            }
            merged
        });
        ReactiveSet::from_changes(changes, start)
    }
}

/// A [`ReactiveLog`] fed directly by the host.
///
/// Appends stage a pending batch; the next [`Graph::step`] commits it as the
/// log's change for that step. Derefs to [`ReactiveLog`] for reading and
/// deriving.
pub struct InputLog<T> {
    log: ReactiveLog<T>,
    input: Rc<ChangeInputNode<Vector<T>>>,
}

impl<T> Deref for InputLog<T> {
    type Target = ReactiveLog<T>;

    fn deref(&self) -> &ReactiveLog<T> {
        &self.log
    }
}

impl<T: Data> InputLog<T> {
    pub(crate) fn new(graph: &Rc<GraphInner>, start: Vector<T>) -> Self {
        let (changes, input) = ChangeInputNode::connect(graph, "LogInput");
        let log = ReactiveLog::from_changes(changes, start);
        Self { log, input }
    }

    /// Stages `item` to be appended at the next step.
    pub fn push(&self, item: T) {
        self.input.update(|mut pending| {
            pending.push_back(item);
            pending
        });
    }

    /// Stages `items` to be appended, in order, at the next step.
    pub fn push_all(&self, items: impl IntoIterator<Item = T>) {
        self.input.update(|mut pending| {
            pending.extend(items);
            pending
        });
    }
}

impl Graph {
    /// An empty host-fed log.
    pub fn input_log<T: Data>(&self) -> InputLog<T> {
        InputLog::new(self.inner(), Vector::new())
    }

    /// A host-fed log starting from `contents`.
    pub fn input_log_from<T: Data>(&self, contents: Vector<T>) -> InputLog<T> {
        InputLog::new(self.inner(), contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vector<T: Clone>(items: &[T]) -> Vector<T> {
        items.iter().cloned().collect()
    }

    #[test]
    fn appends_commit_in_order_and_flow_for_one_step() {
        let graph = Graph::new();
        let log: InputLog<&str> = graph.input_log();
        log.push("a");
        log.push_all(["b", "c"]);
        assert!(log.snapshot().is_empty());

        graph.step().unwrap();
        assert_eq!(log.changes().get(), vector(&["a", "b", "c"]));
        assert_eq!(log.snapshot(), vector(&["a", "b", "c"]));
        assert!(log.previous_snapshot().is_empty());

        log.push("d");
        graph.step().unwrap();
        assert_eq!(log.changes().get(), vector(&["d"]));
        assert_eq!(log.snapshot(), vector(&["a", "b", "c", "d"]));
        assert_eq!(log.previous_snapshot(), vector(&["a", "b", "c"]));
    }

    #[test]
    fn input_log_from_starts_populated() {
        let graph = Graph::new();
        let log = graph.input_log_from(vector(&[1, 2]));
        assert_eq!(log.snapshot(), vector(&[1, 2]));
        assert_eq!(log.length().get(), 2);

        log.push(3);
        graph.step().unwrap();
        assert_eq!(log.snapshot(), vector(&[1, 2, 3]));
        assert_eq!(log.length().get(), 3);
    }

    #[test]
    fn fold_covers_past_and_future_items() {
        let graph = Graph::new();
        let log: InputLog<i64> = graph.input_log();
        log.push(10);
        graph.step().unwrap();

        // Derived mid-session: the seed folds what was already committed.
        let sum = log.fold(0, |acc, n| acc + n);
        assert_eq!(sum.get(), 10);

        log.push_all([1, 2]);
        graph.step().unwrap();
        assert_eq!(sum.get(), 13);

        graph.step().unwrap();
        assert_eq!(sum.get(), 13);
    }

    #[test]
    fn map_and_filter_rewrite_each_batch() {
        let graph = Graph::new();
        let log: InputLog<i32> = graph.input_log();
        let doubled = log.map(|n| n * 2);
        let odd = log.filter(|n| n % 2 != 0);

        log.push_all([1, 2, 3]);
        graph.step().unwrap();
        assert_eq!(doubled.snapshot(), vector(&[2, 4, 6]));
        assert_eq!(odd.snapshot(), vector(&[1, 3]));

        log.push(5);
        graph.step().unwrap();
        assert_eq!(doubled.snapshot(), vector(&[2, 4, 6, 10]));
        assert_eq!(odd.snapshot(), vector(&[1, 3, 5]));
        assert_eq!(odd.changes().get(), vector(&[5]));
    }

    #[test]
    fn to_set_unions_appended_deltas() {
        let graph = Graph::new();
        let log: InputLog<WeightedSet<&str>> = graph.input_log();
        let set = log.to_set();

        log.push([("x", 2)].into_iter().collect());
        log.push([("x", 1), ("y", 1)].into_iter().collect());
        graph.step().unwrap();
        assert_eq!(set.snapshot(), [("x", 3), ("y", 1)].into_iter().collect());

        log.push([("y", -1)].into_iter().collect());
        graph.step().unwrap();
        assert_eq!(set.snapshot(), [("x", 3)].into_iter().collect());
    }

    #[test]
    fn length_counts_without_rescanning() {
        let graph = Graph::new();
        let log: InputLog<u8> = graph.input_log();
        assert_eq!(log.length().get(), 0);
        log.push_all([1, 2, 3]);
        graph.step().unwrap();
        assert_eq!(log.length().get(), 3);
        graph.step().unwrap();
        assert_eq!(log.length().get(), 3);
    }
}
