//! Error types surfaced by the scheduler.

use std::borrow::Cow;

use thiserror::Error;

use crate::graph::FractionalIndex;

/// Fatal scheduling failures reported by [`Graph::step`](crate::Graph::step).
///
/// These are wiring defects, not runtime conditions: a graph that produces one
/// is misconstructed and the error is not recoverable by retrying.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A node came up for processing at an index that is not strictly greater
    /// than the last index processed this step. Signals a dependency cycle or
    /// an index-assignment defect.
    #[error(
        "node `{node}` at index {index} must be greater than last processed index {last}"
    )]
    OrderViolation {
        /// Diagnostic name of the offending node.
        node: Cow<'static, str>,
        /// Index of the node that was about to run.
        index: FractionalIndex,
        /// Index of the node processed immediately before it.
        last: FractionalIndex,
    },
}
