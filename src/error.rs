//! Error taxonomy shared by every module.

use thiserror::Error;

/// Errors raised while building graphs, learning routes, or talking to a [`Network`].
///
/// Structural variants are reported once, at construction; the rest surface from a
/// single solver iteration and abort the run.
///
/// [`Network`]: crate::Network
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A graph must have at least one node.
    #[error("number of nodes must be positive")]
    EmptyGraph,

    /// A start, finish, or edge endpoint is outside `[0, n)`.
    #[error("node {node} is out of range [0, {n})")]
    NodeOutOfRange { node: usize, n: usize },

    /// Start and finish coincide; there is no edge to learn.
    #[error("start and finish are the same node ({0})")]
    StartIsFinish(usize),

    /// The same ordered pair appears twice in the edge list.
    #[error("duplicate edge {from} -> {to}")]
    DuplicateEdge { from: usize, to: usize },

    /// A directed cycle is reachable from the start node.
    #[error("cycle reachable from the start node (closed at {from} -> {to})")]
    Cycle { from: usize, to: usize },

    /// No directed path leads from start to finish.
    #[error("finish node {finish} is unreachable from start node {start}")]
    Unreachable { start: usize, finish: usize },

    /// The predecessor chain from finish does not lead back to start.
    #[error("predecessor chain from {finish} does not reach {start}")]
    BrokenPath { start: usize, finish: usize },

    /// Prior hyperparameters are outside their domain.
    #[error("invalid prior: {0}")]
    InvalidPrior(&'static str),

    /// Simulated edge parameters are outside their domain.
    #[error("invalid parameters for edge {from} -> {to}: {reason}")]
    InvalidEdgeParams {
        from: usize,
        to: usize,
        reason: &'static str,
    },

    /// A route was rejected by the environment.
    #[error("invalid route {route:?}: {reason}")]
    InvalidRoute {
        route: Vec<usize>,
        reason: &'static str,
    },

    /// The environment failed to serve a traversal request.
    #[error("network request failed: {0}")]
    Network(String),

    /// The environment answered with the wrong number of travel times.
    #[error("expected {expected} travel times, got {got}")]
    ObservationCount { expected: usize, got: usize },

    /// A travel time was zero, negative, or not finite.
    #[error("travel time must be finite and positive, got {value}")]
    InvalidObservation { value: f64 },

    /// A sampling distribution could not be constructed from the current parameters.
    #[error("sampling failed: {0}")]
    Sampling(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
