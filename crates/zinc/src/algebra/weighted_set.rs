//! Signed multisets backed by a persistent hash map.

use std::fmt::{self, Debug};
use std::iter::FromIterator;
use std::mem;
use std::ops::{Add, AddAssign, Neg};

use crate::algebra::{HasOne, HasZero, RingValue, Weight, WeightedRelation, ZItem};

/// A signed multiset: each item carries a non-zero weight.
///
/// Weights add under [`union`](Self::union), subtract under
/// [`difference`](Self::difference), and multiply under
/// [`intersection`](Self::intersection) and [`product`](Self::product).
/// Entries whose weight reaches zero are removed, so two sets holding the
/// same items at the same weights are always equal.
///
/// The backing map is persistent: every operation returns a new set sharing
/// structure with its inputs, and cloning is O(1).
#[derive(Clone)]
pub struct WeightedSet<T, W = Weight> {
    entries: imbl::HashMap<T, W>,
}

impl<T, W> WeightedSet<T, W>
where
    T: ZItem,
    W: RingValue,
{
    /// The empty set.
    pub fn new() -> Self {
        Self {
            entries: imbl::HashMap::new(),
        }
    }

    /// Number of distinct items.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Weight of `item`, or zero when absent.
    pub fn get(&self, item: &T) -> W {
        self.entries.get(item).cloned().unwrap_or_else(W::zero)
    }

    pub fn contains(&self, item: &T) -> bool {
        self.entries.contains_key(item)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&T, &W)> {
        self.entries.iter()
    }

    /// This set with `weight` added to `item`'s weight.
    pub fn add(&self, item: T, weight: W) -> Self {
        let mut entries = self.entries.clone();
        Self::merge_into(&mut entries, item, weight);
        Self { entries }
    }

    /// This set with `weight` subtracted from `item`'s weight.
    pub fn remove(&self, item: T, weight: W) -> Self {
        self.add(item, weight.neg())
    }

    /// Pointwise weight sum.
    pub fn union(&self, other: &Self) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        let mut entries = self.entries.clone();
        for (item, weight) in other.iter() {
            Self::merge_into(&mut entries, item.clone(), weight.clone());
        }
        Self { entries }
    }

    /// Pointwise weight difference.
    pub fn difference(&self, other: &Self) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        let mut entries = self.entries.clone();
        for (item, weight) in other.iter() {
            Self::merge_into(&mut entries, item.clone(), weight.clone().neg());
        }
        Self { entries }
    }

    /// Items present in both sets, weights multiplied.
    pub fn intersection(&self, other: &Self) -> Self {
        let mut entries = imbl::HashMap::new();
        for (item, weight) in self.iter() {
            if let Some(other_weight) = other.entries.get(item) {
                Self::merge_into(
                    &mut entries,
                    item.clone(),
                    weight.clone() * other_weight.clone(),
                );
            }
        }
        Self { entries }
    }

    /// Items satisfying `predicate`, weights unchanged.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool) -> Self {
        let mut entries = imbl::HashMap::new();
        for (item, weight) in self.iter() {
            if predicate(item) {
                entries.insert(item.clone(), weight.clone());
            }
        }
        Self { entries }
    }

    /// Applies `func` to every item. Items mapped to the same output have
    /// their weights summed.
    pub fn map<U: ZItem>(&self, func: impl Fn(&T) -> U) -> WeightedSet<U, W> {
        let mut entries = imbl::HashMap::new();
        for (item, weight) in self.iter() {
            WeightedSet::merge_into(&mut entries, func(item), weight.clone());
        }
        WeightedSet { entries }
    }

    /// Cartesian product, pairing every item of `self` with every item of
    /// `other` at the product of their weights.
    pub fn product<U: ZItem>(&self, other: &WeightedSet<U, W>) -> WeightedSet<(T, U), W> {
        let mut entries = imbl::HashMap::new();
        for (left, left_weight) in self.iter() {
            for (right, right_weight) in other.iter() {
                WeightedSet::merge_into(
                    &mut entries,
                    (left.clone(), right.clone()),
                    left_weight.clone() * right_weight.clone(),
                );
            }
        }
        WeightedSet { entries }
    }

    /// Groups items into a relation keyed by `key`, preserving weights.
    pub fn group_by<K: ZItem>(&self, key: impl Fn(&T) -> K) -> WeightedRelation<K, T, W> {
        let mut relation = WeightedRelation::new();
        for (item, weight) in self.iter() {
            relation = WeightedRelation::add(&relation, key(item), item.clone(), weight.clone());
        }
        relation
    }

    fn merge_into(entries: &mut imbl::HashMap<T, W>, item: T, weight: W) {
        let combined = match entries.get(&item) {
            Some(current) => current.clone() + weight,
            None => weight,
        };
        if combined.is_zero() {
            entries.remove(&item);
        } else {
            entries.insert(item, combined);
        }
    }
}

impl<T: ZItem, W: RingValue> Default for WeightedSet<T, W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ZItem, W: RingValue> PartialEq for WeightedSet<T, W> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<T: ZItem, W: RingValue> Eq for WeightedSet<T, W> {}

impl<T: ZItem + Debug, W: RingValue + Debug> Debug for WeightedSet<T, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeightedSet")?;
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<T: ZItem, W: RingValue> Add for WeightedSet<T, W> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.union(&rhs)
    }
}

impl<T: ZItem, W: RingValue> AddAssign for WeightedSet<T, W> {
    fn add_assign(&mut self, rhs: Self) {
        let lhs = mem::take(self);
        *self = lhs.union(&rhs);
    }
}

impl<T: ZItem, W: RingValue> Neg for WeightedSet<T, W> {
    type Output = Self;

    fn neg(self) -> Self {
        let mut entries = imbl::HashMap::new();
        for (item, weight) in self.iter() {
            entries.insert(item.clone(), weight.clone().neg());
        }
        Self { entries }
    }
}

impl<T: ZItem, W: RingValue> HasZero for WeightedSet<T, W> {
    fn zero() -> Self {
        Self::new()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T: ZItem, W: RingValue> FromIterator<(T, W)> for WeightedSet<T, W> {
    fn from_iter<I: IntoIterator<Item = (T, W)>>(iter: I) -> Self {
        let mut entries = imbl::HashMap::new();
        for (item, weight) in iter {
            Self::merge_into(&mut entries, item, weight);
        }
        Self { entries }
    }
}

/// Builds a set of the given items, each at weight one.
impl<T: ZItem, W: RingValue> FromIterator<T> for WeightedSet<T, W> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        iter.into_iter().map(|item| (item, W::one())).collect()
    }
}
