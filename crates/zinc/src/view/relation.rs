//! Incrementally maintained weighted relations.

use std::ops::Deref;
use std::rc::Rc;

use crate::algebra::{Weight, WeightedRelation, WeightedSet, ZItem};
use crate::graph::{Graph, GraphInner, Stream};
use crate::operator::ChangeInputNode;
use crate::view::set::ReactiveSet;

/// A [`WeightedRelation`] maintained incrementally across steps.
///
/// The same triple as [`ReactiveSet`]: a delta stream, the accumulated
/// relation, and the accumulation one step behind. Linear operations derive
/// their delta from the input deltas alone; [`join`](Self::join) and
/// [`intersection`](Self::intersection) are bilinear and also consult the
/// inputs' previous contents.
pub struct ReactiveRelation<K, V> {
    changes: Stream<WeightedRelation<K, V>>,
    materialized: Stream<WeightedRelation<K, V>>,
    previous: Stream<WeightedRelation<K, V>>,
}

impl<K, V> Clone for ReactiveRelation<K, V> {
    fn clone(&self) -> Self {
        Self {
            changes: self.changes.clone(),
            materialized: self.materialized.clone(),
            previous: self.previous.clone(),
        }
    }
}

impl<K: ZItem, V: ZItem> ReactiveRelation<K, V> {
    pub(crate) fn from_changes(
        changes: Stream<WeightedRelation<K, V>>,
        start: WeightedRelation<K, V>,
    ) -> Self {
        let materialized = changes.accumulate(start.clone(), |acc, delta| acc.union(delta));
        let previous = materialized.delay(start);
        Self {
            changes,
            materialized,
            previous,
        }
    }

    /// This step's delta.
    pub fn changes(&self) -> &Stream<WeightedRelation<K, V>> {
        &self.changes
    }

    /// The accumulated relation.
    pub fn materialized(&self) -> &Stream<WeightedRelation<K, V>> {
        &self.materialized
    }

    /// The accumulated relation as of one step ago.
    pub fn previous_materialized(&self) -> &Stream<WeightedRelation<K, V>> {
        &self.previous
    }

    /// Current contents.
    pub fn snapshot(&self) -> WeightedRelation<K, V> {
        self.materialized.get()
    }

    /// Contents as of one step ago.
    pub fn previous_snapshot(&self) -> WeightedRelation<K, V> {
        self.previous.get()
    }

    /// The row-wise weight sum of the two relations.
    pub fn union(&self, other: &Self) -> Self {
        let changes = self.changes.zip(&other.changes, |a, b| a.union(b));
        let start = self.previous_snapshot().union(&other.previous_snapshot());
        Self::from_changes(changes, start)
    }

    /// The row-wise weight difference of the two relations.
    pub fn difference(&self, other: &Self) -> Self {
        let changes = self.changes.zip(&other.changes, |a, b| a.difference(b));
        let start = self
            .previous_snapshot()
            .difference(&other.previous_snapshot());
        Self::from_changes(changes, start)
    }

    /// The row-wise intersection of the two relations.
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

    /// Pairs rows of the two relations key by key.
    pub fn join<V2: ZItem>(
        &self,
        other: &ReactiveRelation<K, V2>,
    ) -> ReactiveRelation<K, (V, V2)> {
        let changes = self.changes.zip3(
            &self.previous,
            &other.changes,
            &other.previous,
            |delta_a, prev_a, delta_b, prev_b| {
                delta_a
                    .join(prev_b)
                    .union(&prev_a.join(delta_b))
                    .union(&delta_a.join(delta_b))
            },
        );
        let start = self.previous_snapshot().join(&other.previous_snapshot());
        ReactiveRelation::from_changes(changes, start)
    }

    /// The rows filtered to values satisfying `predicate`.
    pub fn filter(&self, predicate: impl Fn(&V) -> bool + 'static) -> Self {
        let start = self.previous_snapshot().filter(&predicate);
        let changes = self.changes.map(move |delta| delta.filter(&predicate));
        Self::from_changes(changes, start)
    }

    /// The image of every row under `func`.
    pub fn map_values<U: ZItem>(&self, func: impl Fn(&V) -> U + 'static) -> ReactiveRelation<K, U> {
        let start = self.previous_snapshot().map_values(&func);
        let changes = self.changes.map(move |delta| delta.map_values(&func));
        ReactiveRelation::from_changes(changes, start)
    }

    /// All rows merged into one set, keys discarded.
    pub fn flatten(&self) -> ReactiveSet<V> {
        let start = self.previous_snapshot().flatten();
        let changes = self.changes.map(|delta| delta.flatten());
        ReactiveSet::from_changes(changes, start)
    }
}

/// A [`ReactiveRelation`] fed directly by the host.
pub struct InputRelation<K, V> {
    relation: ReactiveRelation<K, V>,
    input: Rc<ChangeInputNode<WeightedRelation<K, V>>>,
}

impl<K, V> Deref for InputRelation<K, V> {
    type Target = ReactiveRelation<K, V>;

    fn deref(&self) -> &ReactiveRelation<K, V> {
        &self.relation
    }
}

impl<K: ZItem, V: ZItem> InputRelation<K, V> {
    pub(crate) fn new(graph: &Rc<GraphInner>, start: WeightedRelation<K, V>) -> Self {
        let (changes, input) = ChangeInputNode::connect(graph, "RelationInput");
        let relation = ReactiveRelation::from_changes(changes, start);
        Self { relation, input }
    }

    /// Stages `weight` to be added to `value` under `key` at the next step.
    pub fn add(&self, key: K, value: V, weight: Weight) {
        self.input.update(|pending| pending.add(key, value, weight));
    }

    /// Stages `weight` to be subtracted from `value` under `key`.
    pub fn remove(&self, key: K, value: V, weight: Weight) {
        self.input
            .update(|pending| pending.remove(key, value, weight));
    }

    /// Stages a whole row to be merged under `key`.
    pub fn add_row(&self, key: K, row: &WeightedSet<V>) {
        let row = row.clone();
        self.input.update(move |pending| pending.add_row(key, &row));
    }

    /// Stages a whole delta at once.
    pub fn push(&self, delta: WeightedRelation<K, V>) {
        self.input.merge(delta);
    }
}

impl Graph {
    /// An empty host-fed relation.
    pub fn input_relation<K: ZItem, V: ZItem>(&self) -> InputRelation<K, V> {
        InputRelation::new(self.inner(), WeightedRelation::new())
    }

    /// A host-fed relation starting from `contents`.
    pub fn input_relation_from<K: ZItem, V: ZItem>(
        &self,
        contents: WeightedRelation<K, V>,
    ) -> InputRelation<K, V> {
        InputRelation::new(self.inner(), contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn changes_commit_and_rows_canonicalize() {
        let graph = Graph::new();
        let rel: InputRelation<u32, &str> = graph.input_relation();
        rel.add(1, "alice", 1);
        rel.add(2, "bob", 1);
        graph.step().unwrap();
        assert_eq!(rel.snapshot().get(&1), ["alice"].into_iter().collect());
        assert_eq!(rel.snapshot().len(), 2);

        rel.remove(1, "alice", 1);
        graph.step().unwrap();
        assert!(!rel.snapshot().contains_key(&1));
        assert!(rel.changes().get().contains_key(&1));

        graph.step().unwrap();
        assert!(rel.changes().get().is_empty());
    }

    #[test]
    fn join_follows_rows_added_on_either_side() {
        let graph = Graph::new();
        let users: InputRelation<u32, &str> = graph.input_relation();
        let orders: InputRelation<u32, &str> = graph.input_relation();
        let placed = users.join(&orders);

        users.add(1, "alice", 1);
        users.add(2, "bob", 1);
        orders.add(1, "order-1", 1);
        orders.add(3, "order-9", 1);
        graph.step().unwrap();
        assert_eq!(placed.snapshot().len(), 1);
        assert_eq!(placed.snapshot().weight(&1, &("alice", "order-1")), 1);

        // A user arriving later must meet the order that was already there.
        users.add(3, "carol", 1);
        graph.step().unwrap();
        assert_eq!(placed.snapshot().weight(&3, &("carol", "order-9")), 1);

        // And rows removed upstream disappear downstream.
        orders.remove(1, "order-1", 1);
        graph.step().unwrap();
        assert!(!placed.snapshot().contains_key(&1));
        assert_eq!(placed.snapshot().len(), 1);
    }

    #[test]
    fn join_derived_mid_session_starts_correct() {
        let graph = Graph::new();
        let left: InputRelation<u8, &str> = graph.input_relation();
        let right: InputRelation<u8, &str> = graph.input_relation();
        left.add(7, "l", 2);
        right.add(7, "r", 3);
        graph.step().unwrap();

        let joined = left.join(&right);
        assert_eq!(joined.snapshot().weight(&7, &("l", "r")), 6);

        left.remove(7, "l", 2);
        graph.step().unwrap();
        assert!(joined.snapshot().is_empty());
    }

    #[test]
    fn filter_map_values_and_flatten_stream_changes() {
        let graph = Graph::new();
        let rel: InputRelation<u32, i32> = graph.input_relation();
        let positive = rel.filter(|n| *n > 0);
        let doubled = rel.map_values(|n| n * 2);
        let all = rel.flatten();

        rel.add(1, 5, 1);
        rel.add(1, -5, 1);
        rel.add(2, 5, 1);
        graph.step().unwrap();
        assert_eq!(positive.snapshot().get(&1), [5].into_iter().collect());
        assert_eq!(doubled.snapshot().weight(&1, &10), 1);
        assert_eq!(doubled.snapshot().weight(&1, &-10), 1);
        assert_eq!(all.snapshot().get(&5), 2);
        assert_eq!(all.snapshot().get(&-5), 1);

        rel.remove(2, 5, 1);
        graph.step().unwrap();
        assert_eq!(all.snapshot().get(&5), 1);
        assert!(!doubled.snapshot().contains_key(&2));
    }

    #[test]
    fn union_intersection_difference_row_wise() {
        let graph = Graph::new();
        let a: InputRelation<u8, &str> = graph.input_relation();
        let b: InputRelation<u8, &str> = graph.input_relation();
        let merged = a.union(&b);
        let shared = a.intersection(&b);
        let gap = a.difference(&b);

        a.add(1, "x", 2);
        b.add(1, "x", 3);
        b.add(2, "y", 1);
        graph.step().unwrap();
        assert_eq!(merged.snapshot().weight(&1, &"x"), 5);
        assert_eq!(merged.snapshot().weight(&2, &"y"), 1);
        assert_eq!(shared.snapshot().weight(&1, &"x"), 6);
        assert_eq!(shared.snapshot().len(), 1);
        assert_eq!(gap.snapshot().weight(&1, &"x"), -1);
        assert_eq!(gap.snapshot().weight(&2, &"y"), -1);
    }

    #[test]
    fn add_row_stages_a_whole_row() {
        let graph = Graph::new();
        let rel: InputRelation<u8, &str> = graph.input_relation();
        let row: WeightedSet<&str> = [("a", 1), ("b", 2)].into_iter().collect();
        rel.add_row(9, &row);
        graph.step().unwrap();
        assert_eq!(rel.snapshot().get(&9), row);
    }

    #[derive(Clone, Debug)]
    enum Op {
        Left(u8, u8, i64),
        Right(u8, u8, i64),
    }

    fn arb_script() -> impl Strategy<Value = Vec<Vec<Op>>> {
        let op = prop_oneof![
            (0u8..3, any::<u8>(), -2i64..=2).prop_map(|(k, v, w)| Op::Left(k, v, w)),
            (0u8..3, any::<u8>(), -2i64..=2).prop_map(|(k, v, w)| Op::Right(k, v, w)),
        ];
        proptest::collection::vec(proptest::collection::vec(op, 0..5), 1..6)
    }

    proptest! {
        #[test]
        fn derived_relations_match_full_recomputation(script in arb_script()) {
            let graph = Graph::new();
            let left: InputRelation<u8, u8> = graph.input_relation();
            let right: InputRelation<u8, u8> = graph.input_relation();
            let joined = left.join(&right);
            let merged = left.union(&right);

            for batch in script {
                for op in batch {
                    match op {
                        Op::Left(k, v, w) => left.add(k, v, w),
                        Op::Right(k, v, w) => right.add(k, v, w),
                    }
                }
                graph.step().unwrap();

                let full_left = left.snapshot();
                let full_right = right.snapshot();
                prop_assert_eq!(joined.snapshot(), full_left.join(&full_right));
                prop_assert_eq!(merged.snapshot(), full_left.union(&full_right));
            }
        }
    }
}
