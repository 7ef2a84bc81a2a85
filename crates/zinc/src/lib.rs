//! Incremental computation over weighted collections.
//!
//! A [`Graph`] holds time-varying values ("streams") advanced in discrete
//! steps. Writes through input handles stage until the next [`Graph::step`],
//! which re-evaluates exactly the affected nodes, in dependency order, once
//! each. On top of the scalar streams, [`view`] maintains weighted sets,
//! keyed relations and append-only logs incrementally: deriving a union,
//! join or grouping wires a delta rule, so each step costs in proportion to
//! what changed rather than to the size of the collections.
//!
//! ```
//! use zinc::{Graph, view::InputRelation};
//!
//! let graph = Graph::new();
//! let users: InputRelation<u32, &str> = graph.input_relation();
//! let orders: InputRelation<u32, &str> = graph.input_relation();
//! let placed = users.join(&orders);
//!
//! users.add(1, "alice", 1);
//! orders.add(1, "order-1", 1);
//! graph.step()?;
//! assert_eq!(placed.snapshot().weight(&1, &("alice", "order-1")), 1);
//! # Ok::<(), zinc::Error>(())
//! ```

mod error;
pub use error::Error;

pub mod algebra;
pub use algebra::{Weight, WeightedRelation, WeightedSet};

pub mod graph;
pub use graph::{Data, FractionalIndex, Graph, GraphConfig, Propagation, Stream};

pub mod operator;
pub use operator::{CounterHandle, InputHandle};

pub mod view;
