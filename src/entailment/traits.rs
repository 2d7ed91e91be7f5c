//! Traits for the forward-entailment search.

use crate::graph::{DependencyGraph, Edge};

/// Estimates how likely a dependent can be deleted without changing what
/// the sentence is about.
///
/// Implementations must be immutable once built so that one set of weights
/// can be shared by concurrent searches.
pub trait DeletionWeights: Send + Sync {
    /// Probability of deleting the dependent of `edge`.
    ///
    /// `neighbors` are the other edges leaving the same governor, for
    /// context-sensitive estimates.
    fn deletion_probability(&self, graph: &DependencyGraph, edge: &Edge, neighbors: &[&Edge]) -> f64;

    /// Context-free probability of deleting a dependent under `label`.
    fn label_probability(&self, label: &str) -> f64;
}
