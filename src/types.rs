//! Core output types for `oxinli`.

use std::collections::BTreeSet;

use crate::graph::{DependencyGraph, Edge};

/// A scored piece of a sentence: a clause or a shortened clause.
///
/// The graph is always a tree. Conjunction arcs that could not be kept in
/// the tree but whose endpoints both survive are listed in `extra_edges`.
#[derive(Debug, Clone, PartialEq)]
pub struct SentenceFragment {
    /// The fragment's dependency tree.
    pub graph: DependencyGraph,
    /// Probability of the fragment given the sentence, in `[0, 1]`.
    pub score: f64,
    /// Whether the fragment is asserted true.
    pub truth: bool,
    /// Non-tree arcs between surviving words.
    pub extra_edges: Vec<Edge>,
}

impl SentenceFragment {
    /// Create a new fragment.
    #[must_use]
    pub fn new(graph: DependencyGraph, score: f64, truth: bool) -> Self {
        Self {
            graph,
            score,
            truth,
            extra_edges: Vec::new(),
        }
    }

    /// Attach non-tree arcs.
    #[must_use]
    pub fn with_extra_edges(mut self, extra_edges: Vec<Edge>) -> Self {
        self.extra_edges = extra_edges;
        self
    }

    /// Set the score.
    #[must_use]
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    /// The surviving token indices.
    #[must_use]
    pub fn token_set(&self) -> BTreeSet<usize> {
        self.graph.vertices().collect()
    }

    /// The fragment's words, in sentence order.
    #[must_use]
    pub fn words(&self) -> Vec<&str> {
        self.graph.words()
    }

    /// Number of words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.vertex_count()
    }

    /// Whether the fragment has no words.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// The fragment as a space-separated sentence.
    #[must_use]
    pub fn to_sentence(&self) -> String {
        self.graph.to_sentence()
    }
}

impl std::fmt::Display for SentenceFragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_sentence())
    }
}
