//! Keyed weighted collections: one weighted set of values per key.

use std::fmt::{self, Debug};
use std::iter::FromIterator;
use std::mem;
use std::ops::{Add, AddAssign, Neg};

use crate::algebra::{HasZero, RingValue, Weight, WeightedSet, ZItem};

/// A weighted relation: a map from keys to non-empty [`WeightedSet`] rows.
///
/// Set operations apply row-wise to matching keys, and a row whose set
/// becomes empty is removed from the relation. [`join`](Self::join) pairs the
/// rows of two relations that share a key.
#[derive(Clone)]
pub struct WeightedRelation<K, V, W = Weight> {
    rows: imbl::HashMap<K, WeightedSet<V, W>>,
}

impl<K, V, W> WeightedRelation<K, V, W>
where
    K: ZItem,
    V: ZItem,
    W: RingValue,
{
    /// The empty relation.
    pub fn new() -> Self {
        Self {
            rows: imbl::HashMap::new(),
        }
    }

    /// Number of keys with a non-empty row.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The row under `key`, or the empty set when absent.
    pub fn get(&self, key: &K) -> WeightedSet<V, W> {
        self.rows.get(key).cloned().unwrap_or_default()
    }

    /// Weight of `value` under `key`, or zero when absent.
    pub fn weight(&self, key: &K, value: &V) -> W {
        match self.rows.get(key) {
            Some(row) => row.get(value),
            None => W::zero(),
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.rows.contains_key(key)
    }

    /// Iterates over `(key, row)` pairs.
    pub fn rows(&self) -> impl Iterator<Item = (&K, &WeightedSet<V, W>)> {
        self.rows.iter()
    }

    /// Iterates over `(key, value, weight)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V, &W)> {
        self.rows
            .iter()
            .flat_map(|(key, row)| row.iter().map(move |(value, weight)| (key, value, weight)))
    }

    /// This relation with `weight` added to `value` under `key`.
    pub fn add(&self, key: K, value: V, weight: W) -> Self {
        self.update_row(key, |row| row.add(value, weight))
    }

    /// This relation with `weight` subtracted from `value` under `key`.
    pub fn remove(&self, key: K, value: V, weight: W) -> Self {
        self.add(key, value, weight.neg())
    }

    /// This relation with `row` merged into the set under `key`.
    pub fn add_row(&self, key: K, row: &WeightedSet<V, W>) -> Self {
        self.update_row(key, |current| current.union(row))
    }

    /// Row-wise weight sum.
    pub fn union(&self, other: &Self) -> Self {
        let mut result = self.clone();
        for (key, row) in other.rows() {
            result = result.update_row(key.clone(), |current| current.union(row));
        }
        result
    }

    /// Row-wise weight difference.
    pub fn difference(&self, other: &Self) -> Self {
        let mut result = self.clone();
        for (key, row) in other.rows() {
            result = result.update_row(key.clone(), |current| current.difference(row));
        }
        result
    }

    /// Row-wise intersection over the keys present in both relations.
    pub fn intersection(&self, other: &Self) -> Self {
        let mut rows = imbl::HashMap::new();
        for (key, row) in self.rows() {
            if let Some(other_row) = other.rows.get(key) {
                let section = row.intersection(other_row);
                if !section.is_empty() {
                    rows.insert(key.clone(), section);
                }
            }
        }
        Self { rows }
    }

    /// Rows filtered to the values satisfying `predicate`.
    pub fn filter(&self, predicate: impl Fn(&V) -> bool) -> Self {
        let mut rows = imbl::HashMap::new();
        for (key, row) in self.rows() {
            let kept = row.filter(&predicate);
            if !kept.is_empty() {
                rows.insert(key.clone(), kept);
            }
        }
        Self { rows }
    }

    /// Applies `func` to every value, row by row. Within a row, values mapped
    /// to the same output have their weights summed.
    pub fn map_values<U: ZItem>(&self, func: impl Fn(&V) -> U) -> WeightedRelation<K, U, W> {
        let mut rows = imbl::HashMap::new();
        for (key, row) in self.rows() {
            let mapped = row.map(&func);
            if !mapped.is_empty() {
                rows.insert(key.clone(), mapped);
            }
        }
        WeightedRelation { rows }
    }

    /// Pairs the rows of the two relations key by key: for every key present
    /// in both, the result row is the product of the two rows.
    pub fn join<V2: ZItem>(
        &self,
        other: &WeightedRelation<K, V2, W>,
    ) -> WeightedRelation<K, (V, V2), W> {
        let mut rows = imbl::HashMap::new();
        for (key, row) in self.rows() {
            if let Some(other_row) = other.rows.get(key) {
                let paired = row.product(other_row);
                if !paired.is_empty() {
                    rows.insert(key.clone(), paired);
                }
            }
        }
        WeightedRelation { rows }
    }

    /// Merges all rows into a single set, summing the weights of values that
    /// appear under several keys.
    pub fn flatten(&self) -> WeightedSet<V, W> {
        let mut flat = WeightedSet::new();
        for (_, row) in self.rows() {
            flat = flat.union(row);
        }
        flat
    }

    fn update_row(&self, key: K, update: impl FnOnce(&WeightedSet<V, W>) -> WeightedSet<V, W>) -> Self {
        let current = self.get(&key);
        let next = update(&current);
        let mut rows = self.rows.clone();
        if next.is_empty() {
            rows.remove(&key);
        } else {
            rows.insert(key, next);
        }
        Self { rows }
    }
}

impl<K: ZItem, V: ZItem, W: RingValue> Default for WeightedRelation<K, V, W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ZItem, V: ZItem, W: RingValue> PartialEq for WeightedRelation<K, V, W> {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
    }
}

impl<K: ZItem, V: ZItem, W: RingValue> Eq for WeightedRelation<K, V, W> {}

impl<K, V, W> Debug for WeightedRelation<K, V, W>
where
    K: ZItem + Debug,
    V: ZItem + Debug,
    W: RingValue + Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeightedRelation")?;
        f.debug_map().entries(self.rows()).finish()
    }
}

impl<K: ZItem, V: ZItem, W: RingValue> Add for WeightedRelation<K, V, W> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.union(&rhs)
    }
}

impl<K: ZItem, V: ZItem, W: RingValue> AddAssign for WeightedRelation<K, V, W> {
    fn add_assign(&mut self, rhs: Self) {
        let lhs = mem::take(self);
        *self = lhs.union(&rhs);
    }
}

impl<K: ZItem, V: ZItem, W: RingValue> Neg for WeightedRelation<K, V, W> {
    type Output = Self;

    fn neg(self) -> Self {
        let mut rows = imbl::HashMap::new();
        for (key, row) in self.rows() {
            rows.insert(key.clone(), row.clone().neg());
        }
        Self { rows }
    }
}

impl<K: ZItem, V: ZItem, W: RingValue> HasZero for WeightedRelation<K, V, W> {
    fn zero() -> Self {
        Self::new()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<K: ZItem, V: ZItem, W: RingValue> FromIterator<(K, V, W)> for WeightedRelation<K, V, W> {
    fn from_iter<I: IntoIterator<Item = (K, V, W)>>(iter: I) -> Self {
        let mut relation = Self::new();
        for (key, value, weight) in iter {
            relation = WeightedRelation::add(&relation, key, value, weight);
        }
        relation
    }
}
