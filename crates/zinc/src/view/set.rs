//! Incrementally maintained weighted sets.

use std::ops::Deref;
use std::rc::Rc;

use crate::algebra::{Weight, WeightedSet, ZItem};
use crate::graph::{Graph, GraphInner, Stream};
use crate::operator::ChangeInputNode;
use crate::view::relation::ReactiveRelation;

/// A [`WeightedSet`] maintained incrementally across steps.
///
/// Three streams travel together. `changes` carries each step's delta and is
/// empty on steps where nothing happened; `materialized` accumulates the
/// deltas into the current set; `previous_materialized` lags it by one step.
/// A derived set computes its own delta from its inputs' deltas, touching
/// the inputs' full contents only where the delta rule requires it, so steps
/// cost in proportion to what changed.
pub struct ReactiveSet<T> {
    changes: Stream<WeightedSet<T>>,
    materialized: Stream<WeightedSet<T>>,
    previous: Stream<WeightedSet<T>>,
}

impl<T> Clone for ReactiveSet<T> {
    fn clone(&self) -> Self {
        Self {
            changes: self.changes.clone(),
            materialized: self.materialized.clone(),
            previous: self.previous.clone(),
        }
    }
}

impl<T: ZItem> ReactiveSet<T> {
    /// Wraps a delta stream, accumulating it on top of `start`.
    pub(crate) fn from_changes(changes: Stream<WeightedSet<T>>, start: WeightedSet<T>) -> Self {
        let materialized = changes.accumulate(start.clone(), |acc, delta| acc.union(delta));
        let previous = materialized.delay(start);
        Self {
            changes,
            materialized,
            previous,
        }
    }

    /// This step's delta.
    pub fn changes(&self) -> &Stream<WeightedSet<T>> {
        &self.changes
    }

    /// The accumulated set.
    pub fn materialized(&self) -> &Stream<WeightedSet<T>> {
        &self.materialized
    }

    /// The accumulated set as of one step ago.
    pub fn previous_materialized(&self) -> &Stream<WeightedSet<T>> {
        &self.previous
    }

    /// Current contents.
    pub fn snapshot(&self) -> WeightedSet<T> {
        self.materialized.get()
    }

    /// Contents as of one step ago.
    pub fn previous_snapshot(&self) -> WeightedSet<T> {
        self.previous.get()
    }

    /// The pointwise weight sum of the two sets.
    pub fn union(&self, other: &Self) -> Self {
        let changes = self.changes.zip(&other.changes, |a, b| a.union(b));
        let start = self.previous_snapshot().union(&other.previous_snapshot());
        Self::from_changes(changes, start)
    }

    /// The pointwise weight difference of the two sets.
    pub fn difference(&self, other: &Self) -> Self {
        let changes = self.changes.zip(&other.changes, |a, b| a.difference(b));
        let start = self.previous_snapshot().difference(&other.previous_snapshot());
        Self::from_changes(changes, start)
    }

    /// The intersection of the two sets, weights multiplied.
    ///
    /// Intersection is bilinear, so the delta needs the inputs' previous
    /// contents as well as their deltas: new matches arise between one
    /// side's delta and the other side's existing items, and between the two
    /// deltas themselves.
    pub fn intersection(&self, other: &Self) -> Self {
        let changes = self.changes.zip3(
            &self.previous,
            &other.changes,
            &other.previous,
            |delta_a, prev_a, delta_b, prev_b| {
                delta_a
                    .intersection(prev_b)
                    .union(&prev_a.intersection(delta_b))
                    .union(&delta_a.intersection(delta_b))
            },
        );
        let start = self
            .previous_snapshot()
            .intersection(&other.previous_snapshot());
        Self::from_changes(changes, start)
    }

    /// The items satisfying `predicate`.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + 'static) -> Self {
        let start = self.previous_snapshot().filter(&predicate);
        let changes = self.changes.map(move |delta| delta.filter(&predicate));
        Self::from_changes(changes, start)
    }

    /// The image of the set under `func`, weights summed per output item.
    pub fn map<U: ZItem>(&self, func: impl Fn(&T) -> U + 'static) -> ReactiveSet<U> {
        let start = self.previous_snapshot().map(&func);
        let changes = self.changes.map(move |delta| delta.map(&func));
        ReactiveSet::from_changes(changes, start)
    }

    /// The set grouped into a relation keyed by `key`.
    pub fn group_by<K: ZItem>(&self, key: impl Fn(&T) -> K + 'static) -> ReactiveRelation<K, T> {
        let start = self.previous_snapshot().group_by(&key);
        let changes = self.changes.map(move |delta| delta.group_by(&key));
        ReactiveRelation::from_changes(changes, start)
    }

    /// Joins two sets on extracted keys: every pair of items agreeing on
    /// their key is passed to `merge`, at the product of the item weights.
    pub fn join<U, K, R>(
        &self,
        other: &ReactiveSet<U>,
        left_key: impl Fn(&T) -> K + 'static,
        right_key: impl Fn(&U) -> K + 'static,
        merge: impl Fn(&T, &U) -> R + 'static,
    ) -> ReactiveSet<R>
    where
        U: ZItem,
        K: ZItem,
        R: ZItem,
    {
        self.group_by(left_key)
            .join(&other.group_by(right_key))
            .map_values(move |(left, right)| merge(left, right))
            .flatten()
    }
}

/// A [`ReactiveSet`] fed directly by the host.
///
/// Mutations stage a pending delta; the next [`Graph::step`] commits it as
/// the set's change for that step. Derefs to [`ReactiveSet`] for reading
/// and deriving.
pub struct InputSet<T> {
    set: ReactiveSet<T>,
    input: Rc<ChangeInputNode<WeightedSet<T>>>,
}

impl<T> Deref for InputSet<T> {
    type Target = ReactiveSet<T>;

    fn deref(&self) -> &ReactiveSet<T> {
        &self.set
    }
}

impl<T: ZItem> InputSet<T> {
    pub(crate) fn new(graph: &Rc<GraphInner>, start: WeightedSet<T>) -> Self {
        let (changes, input) = ChangeInputNode::connect(graph, "SetInput");
        let set = ReactiveSet::from_changes(changes, start);
        Self { set, input }
    }

    /// Stages `weight` to be added to `item` at the next step.
    pub fn add(&self, item: T, weight: Weight) {
        self.input.update(|pending| pending.add(item, weight));
    }

    /// Stages `weight` to be subtracted from `item` at the next step.
    pub fn remove(&self, item: T, weight: Weight) {
        self.input.update(|pending| pending.remove(item, weight));
    }

    /// Stages a whole delta at once.
    pub fn push(&self, delta: WeightedSet<T>) {
        self.input.merge(delta);
    }
}

impl Graph {
    /// An empty host-fed set.
    pub fn input_set<T: ZItem>(&self) -> InputSet<T> {
        InputSet::new(self.inner(), WeightedSet::new())
    }

    /// A host-fed set starting from `contents`.
    pub fn input_set_from<T: ZItem>(&self, contents: WeightedSet<T>) -> InputSet<T> {
        InputSet::new(self.inner(), contents)
    }
}
