//! The reactive node graph and its step scheduler.

mod dependents;
mod dirty;
mod graph_builder;
mod index;

pub use graph_builder::{Data, Graph, GraphConfig, Propagation, Stream};
pub use index::FractionalIndex;

pub(crate) use graph_builder::{
    GraphInner, Node, NodeId, NodeState, Operator, StreamValue, Upstream,
};
