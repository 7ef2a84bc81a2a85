//! Node kinds: sources, combinators, feedback and sinks.
//!
//! Each file defines one node kind together with the [`Graph`](crate::Graph)
//! or [`Stream`](crate::Stream) method that creates it.

mod constant;
mod external;
mod flatten;
mod input;
mod map;
mod register;
mod sink;
mod zip;

pub use input::{CounterHandle, InputHandle};

pub(crate) use input::ChangeInputNode;
