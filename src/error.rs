//! Unified error types for `oxinli`.

use thiserror::Error;

use crate::graph::Edge;

/// The main error type for `oxinli` operations.
#[derive(Debug, Error)]
pub enum NatLogError {
    /// Dependency graph errors
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// A structural edit broke the tree invariant
    #[error("Tree invariant error: {0}")]
    TreeInvariant(#[from] TreeInvariantViolation),

    /// Clause classifier errors
    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    /// Deletion weight errors
    #[error("Weights error: {0}")]
    Weights(#[from] WeightsError),

    /// Pipeline errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors (native only)
    #[cfg(feature = "native")]
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// IO errors (no filesystem access, represented as string)
    #[cfg(not(feature = "native"))]
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while building or reading a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A token index does not exist in the sentence
    #[error("Token index {0} is out of range")]
    TokenOutOfRange(usize),

    /// An edge endpoint is not a vertex of the graph
    #[error("Vertex {0} is not in the graph")]
    MissingVertex(usize),

    /// A line of CoNLL input could not be read
    #[error("Malformed CoNLL input at line {line}: {reason}")]
    MalformedConll {
        /// 1-based line number in the input
        line: usize,
        /// What was wrong with the line
        reason: String,
    },

    /// The graph has no tokens
    #[error("Graph is empty")]
    Empty,
}

/// A structural edit left the dependency graph in a non-tree state.
///
/// This always indicates a defect in an edit or search action; it is never
/// recovered from silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("edit on `{edge}` broke the tree invariant in graph:\n{graph}")]
pub struct TreeInvariantViolation {
    /// The edge whose edit produced the violation
    pub edge: Edge,
    /// Rendering of the offending graph
    pub graph: String,
}

/// Errors related to the clause classifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifierError {
    /// Only linear classifiers are supported
    #[error("Unsupported classifier kind `{0}`; only `linear` is supported")]
    UnsupportedKind(String),

    /// A weight refers to a label that does not exist
    #[error("Unknown clause label `{0}`")]
    UnknownLabel(String),
}

/// Errors related to deletion weights.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightsError {
    /// The affinity cap must be strictly positive
    #[error("Affinity probability cap must be positive, got {0}")]
    InvalidCap(f64),

    /// An affinity key has the wrong number of parts
    #[error("Malformed affinity key `{0}`")]
    MalformedKey(String),

    /// A label default is not a probability
    #[error("Deletion probability for `{label}` must be in [0, 1], got {probability}")]
    InvalidProbability { label: String, probability: f64 },
}

/// Errors related to the extraction pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// A batch worker did not finish
    #[error("Batch worker failed: {0}")]
    WorkerFailed(String),
}

/// Result type alias for `oxinli` operations.
pub type Result<T> = std::result::Result<T, NatLogError>;
