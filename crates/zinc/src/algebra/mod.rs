//! Algebraic traits for weights and the collections built on them.
//!
//! Weighted collections multiply and cancel entry weights, so the weight type
//! must behave like a ring: addition with a zero, negation, multiplication
//! with a one. The traits here carve that out of [`num_traits`] in the small
//! pieces the rest of the crate needs, with blanket impls so any suitable
//! numeric type (notably [`Weight`]) qualifies without further ceremony.

mod weighted_relation;
mod weighted_set;

pub use weighted_relation::WeightedRelation;
pub use weighted_set::WeightedSet;

use std::hash::Hash;
use std::ops::{Add, Mul, Neg};

/// Default weight carried by [`WeightedSet`] and [`WeightedRelation`].
pub type Weight = i64;

/// A type with an additive identity.
///
/// Like [`num_traits::Zero`] but without the `Add` supertrait, so collection
/// types can implement it on the same terms as scalars.
pub trait HasZero {
    fn zero() -> Self;
    fn is_zero(&self) -> bool;
}

/// A type with a multiplicative identity.
pub trait HasOne {
    fn one() -> Self;
}

macro_rules! impl_has_zero {
    ($($type:ty),*) => {
        $(
            impl HasZero for $type {
                #[inline]
                fn zero() -> Self {
                    <Self as num_traits::Zero>::zero()
                }

                #[inline]
                fn is_zero(&self) -> bool {
                    <Self as num_traits::Zero>::is_zero(self)
                }
            }
        )*
    };
}

impl_has_zero!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

macro_rules! impl_has_one {
    ($($type:ty),*) => {
        $(
            impl HasOne for $type {
                #[inline]
                fn one() -> Self {
                    <Self as num_traits::One>::one()
                }
            }
        )*
    };
}

impl_has_one!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

/// Logs are batched in [`imbl::Vector`]s, whose additive identity is the
/// empty vector.
impl<T: Clone> HasZero for imbl::Vector<T> {
    fn zero() -> Self {
        imbl::Vector::new()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

/// A commutative monoid: the bound for anything that accumulates by `+`.
pub trait MonoidValue: Clone + Eq + HasZero + Add<Output = Self> + 'static {}

impl<T> MonoidValue for T where T: Clone + Eq + HasZero + Add<Output = T> + 'static {}

/// A group: a monoid whose elements can be negated away.
pub trait GroupValue: MonoidValue + Neg<Output = Self> {}

impl<T> GroupValue for T where T: MonoidValue + Neg<Output = T> {}

/// A ring: the full contract for collection weights.
pub trait RingValue: GroupValue + Mul<Output = Self> + HasOne {}

impl<T> RingValue for T where T: GroupValue + Mul<Output = T> + HasOne {}

/// Bounds for values stored in weighted collections.
///
/// Entries are hashed for lookup, compared for change detection, and cloned
/// freely because the collections are persistent.
pub trait ZItem: Clone + Eq + Hash + 'static {}

impl<T> ZItem for T where T: Clone + Eq + Hash + 'static {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_zero_and_one() {
        assert_eq!(<Weight as HasZero>::zero(), 0);
        assert!(<Weight as HasZero>::is_zero(&0));
        assert!(!<Weight as HasZero>::is_zero(&3));
        assert_eq!(<Weight as HasOne>::one(), 1);
    }

    #[test]
    fn vector_zero_is_empty() {
        let empty = <imbl::Vector<u32> as HasZero>::zero();
        assert!(empty.is_zero());
        let mut filled = empty;
        filled.push_back(1);
        assert!(!filled.is_zero());
    }

    fn assert_ring<T: RingValue>() {}

    #[test]
    fn weight_is_a_ring() {
        assert_ring::<Weight>();
        assert_ring::<i32>();
    }
}
