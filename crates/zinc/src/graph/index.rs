//! Dense total order for scheduling nodes within a step.

use std::cmp::Ordering;
use std::fmt::{self, Display};

use smallvec::{smallvec, SmallVec};

pub(crate) type IndexParts = SmallVec<[i64; 4]>;

/// A point in a dense total order, written as a dotted path like `2.1.3`.
///
/// Between any two indices another can be created, which lets nodes built in
/// the middle of a step be scheduled between the node that created them and
/// everything downstream. Comparison pads the shorter path with zeros, so
/// `1` and `1.0` are the same point and `1.1` falls between `1` and `2`.
#[derive(Clone, Debug)]
pub struct FractionalIndex {
    parts: IndexParts,
}

impl FractionalIndex {
    pub(crate) fn new(position: i64) -> Self {
        Self {
            parts: smallvec![position],
        }
    }

    pub(crate) fn from_parts(parts: IndexParts) -> Self {
        Self { parts }
    }

    /// The path components of this index.
    pub fn parts(&self) -> &[i64] {
        &self.parts
    }

    /// An index infinitesimally after this one: the path extended by `1`.
    pub(crate) fn add_epsilon(&self) -> Self {
        let mut parts = self.parts.clone();
        parts.push(1);
        Self { parts }
    }

    fn compare_padded(a: &[i64], b: &[i64]) -> Ordering {
        let len = a.len().max(b.len());
        for position in 0..len {
            let left = a.get(position).copied().unwrap_or(0);
            let right = b.get(position).copied().unwrap_or(0);
            match left.cmp(&right) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialEq for FractionalIndex {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FractionalIndex {}

impl PartialOrd for FractionalIndex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FractionalIndex {
    fn cmp(&self, other: &Self) -> Ordering {
        Self::compare_padded(&self.parts, &other.parts)
    }
}

impl Display for FractionalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for part in &self.parts {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{part}")?;
            first = false;
        }
        Ok(())
    }
}
