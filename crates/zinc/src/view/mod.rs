//! Incrementally maintained views over weighted collections.
//!
//! Each view bundles three streams: `changes` (this step's delta),
//! `materialized` (the accumulated contents) and `previous_materialized`
//! (the contents one step back). Deriving one view from another wires the
//! delta rule for the operation, so downstream views update in work
//! proportional to the delta.

mod log;
mod relation;
mod set;

pub use log::{InputLog, ReactiveLog};
pub use relation::{InputRelation, ReactiveRelation};
pub use set::{InputSet, ReactiveSet};
