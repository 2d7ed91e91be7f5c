//! Depth-first search for shorter sentences entailed by a clause.

use std::collections::HashSet;
use std::sync::Arc;

use super::traits::DeletionWeights;
use super::weights::NaturalLogicWeights;
use crate::config::EntailmentConfig;
use crate::error::Result;
use crate::graph::{DependencyGraph, Edge, EditContext, EditLog, Token, TreeEdit, clean_tree};
use crate::natlog::NaturalLogicRelation;
use crate::types::SentenceFragment;

/// Determiners dropped from every premise before the search starts.
pub const DETERMINERS: &[&str] = &["the", "a", "an", "this", "that", "those", "these"];

/// How far up the tree subject marking walks from a vertex.
const SUBJECT_DEPTH_LIMIT: usize = 100;

/// Set of deleted token indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DeletionMask(Vec<u64>);

impl DeletionMask {
    fn new(len: usize) -> Self {
        Self(vec![0; len.div_ceil(64)])
    }

    fn contains(&self, index: usize) -> bool {
        self.0
            .get(index / 64)
            .is_some_and(|word| word & (1 << (index % 64)) != 0)
    }

    fn insert(&mut self, index: usize) {
        if let Some(word) = self.0.get_mut(index / 64) {
            *word |= 1 << (index % 64);
        }
    }
}

#[derive(Debug, Clone)]
struct EntailmentState {
    deleted: DeletionMask,
    index: usize,
    score: f64,
    edits: EditLog,
}

/// A premise prepared for search.
struct Premise {
    tree: DependencyGraph,
    cut_edges: Vec<Edge>,
    base_score: f64,
    is_subject: Vec<bool>,
    order: Vec<usize>,
}

/// Finds the shortenings of a clause that natural logic guarantees to be true.
///
/// Vertices are visited in topological order. For each one the search either
/// keeps it or, when that is sound, deletes its whole subtree. A deletion is
/// sound when the relation it induces, projected through the vertex's
/// polarity, keeps the hypothesis true given the truth of the premise. Each
/// deletion multiplies the score by a [`DeletionWeights`] probability.
///
/// Token polarities must be annotated before searching; see
/// [`crate::natlog::annotate`].
#[derive(Clone)]
pub struct ForwardEntailer {
    config: EntailmentConfig,
    weights: Arc<dyn DeletionWeights>,
}

impl Default for ForwardEntailer {
    fn default() -> Self {
        Self::new(EntailmentConfig::default())
    }
}

impl std::fmt::Debug for ForwardEntailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardEntailer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ForwardEntailer {
    /// Create an entailer with default weights at the configured affinity cap.
    #[must_use]
    pub fn new(config: EntailmentConfig) -> Self {
        let weights = NaturalLogicWeights::new(config.affinity_probability_cap).unwrap_or_else(|err| {
            tracing::warn!(%err, "falling back to the default affinity cap");
            NaturalLogicWeights::default()
        });
        Self {
            config,
            weights: Arc::new(weights),
        }
    }

    /// Use different deletion weights.
    #[must_use]
    pub fn with_weights(mut self, weights: Arc<dyn DeletionWeights>) -> Self {
        self.weights = weights;
        self
    }

    /// The entailer's configuration.
    #[must_use]
    pub fn config(&self) -> &EntailmentConfig {
        &self.config
    }

    /// Entailed fragments of `graph` under the configured premise truth.
    ///
    /// # Errors
    ///
    /// Returns an error if a deletion breaks the tree invariant.
    pub fn search(&self, graph: &DependencyGraph) -> Result<Vec<SentenceFragment>> {
        self.search_with_truth(graph, self.config.premise_truth)
    }

    /// Entailed fragments of a clause, scaled by the clause's own score and
    /// using its truth as the premise truth.
    ///
    /// # Errors
    ///
    /// Returns an error if a deletion breaks the tree invariant.
    pub fn entailments_of(&self, clause: &SentenceFragment) -> Result<Vec<SentenceFragment>> {
        let fragments = self.search_with_truth(&clause.graph, clause.truth)?;
        Ok(fragments
            .into_iter()
            .map(|fragment| {
                let score = fragment.score * clause.score;
                fragment.with_score(score)
            })
            .collect())
    }

    /// Entailed fragments of `graph` given whether it is asserted true.
    ///
    /// The input is never modified. Every fragment returned is true, has a
    /// score in `(0, 1]`, and has a distinct set of tokens. Results come in
    /// discovery order.
    ///
    /// # Errors
    ///
    /// Returns an error if a deletion breaks the tree invariant.
    pub fn search_with_truth(
        &self,
        graph: &DependencyGraph,
        premise_truth: bool,
    ) -> Result<Vec<SentenceFragment>> {
        let mut results = Vec::new();
        if self.config.max_results == 0 {
            return Ok(results);
        }
        let Some(premise) = self.prepare(graph) else {
            tracing::debug!("entailment search on an empty tree");
            return Ok(results);
        };

        let mut stack = vec![EntailmentState {
            deleted: DeletionMask::new(premise.tree.sentence_length()),
            index: 0,
            score: premise.base_score,
            edits: EditLog::new(),
        }];
        let mut seen = HashSet::new();
        let mut ticks = 0usize;

        while let Some(state) = stack.pop() {
            ticks += 1;
            if ticks > self.config.max_ticks {
                tracing::warn!(ticks, results = results.len(), "entailment search ran out of ticks");
                break;
            }
            let Some(&vertex) = premise.order.get(state.index) else {
                continue;
            };
            let keep = EntailmentState {
                index: state.index + 1,
                ..state.clone()
            };
            if state.deleted.contains(vertex) {
                stack.push(keep);
                continue;
            }
            stack.push(keep);

            let Some((edge, weight)) = self.deletion_weight(&premise, vertex, premise_truth) else {
                continue;
            };
            let score = state.score * weight;
            if score <= 0.0 {
                continue;
            }
            let mut deleted = state.deleted;
            for below in premise.tree.descendants(vertex) {
                deleted.insert(below);
            }
            if !seen.insert(deleted.clone()) {
                continue;
            }
            let edits = state.edits.then(&edge, TreeEdit::RemoveVertex { vertex });
            results.push(materialize(&premise, &edits, score)?);
            if results.len() >= self.config.max_results {
                break;
            }
            stack.push(EntailmentState {
                deleted,
                index: state.index + 1,
                score,
                edits,
            });
        }

        tracing::debug!(ticks, results = results.len(), "entailment search finished");
        Ok(results)
    }

    /// Copy the graph, drop determiners, cut shared conjunct arcs and
    /// precompute what the search needs.
    fn prepare(&self, graph: &DependencyGraph) -> Option<Premise> {
        let mut tree = graph.clone();
        let root = tree.first_root()?;

        let in_quantifier = |tree: &DependencyGraph, vertex: usize| {
            tree.tokens()
                .iter()
                .filter_map(|t| t.operator)
                .any(|spec| spec.quantifier.len() > 1 && spec.quantifier.contains(vertex))
        };
        let determiners: Vec<usize> = tree
            .vertices()
            .filter(|&v| {
                v != root
                    && tree.is_leaf(v)
                    && tree.incoming(v).any(|e| e.relation == "det")
                    && tree
                        .token(v)
                        .is_some_and(|t| DETERMINERS.contains(&t.word.to_lowercase().as_str()))
                    && !in_quantifier(&tree, v)
            })
            .collect();
        for &vertex in &determiners {
            tree.remove_vertex(vertex);
        }
        let base_score: f64 =
            std::iter::repeat_n(self.weights.label_probability("det"), determiners.len()).product();

        let mut cut_edges = Vec::new();
        let vertices: Vec<usize> = tree.vertices().collect();
        for vertex in vertices {
            let in_degree = tree.in_degree(vertex);
            if in_degree <= 1 {
                continue;
            }
            let conjuncts: Vec<Edge> = tree
                .incoming(vertex)
                .filter(|e| e.relation == "conj:and")
                .cloned()
                .collect();
            let spare = usize::from(conjuncts.len() == in_degree);
            for edge in conjuncts.into_iter().skip(spare) {
                tree.remove_edge(&edge);
                cut_edges.push(edge);
            }
        }
        if !tree.is_tree() {
            tracing::warn!("entailment premise is not a tree; cleaning it");
            cut_edges.extend(clean_tree(&mut tree));
            if tree.is_empty() {
                return None;
            }
        }

        let mut is_subject = vec![false; tree.sentence_length()];
        for vertex in tree.vertices() {
            let mut node = vertex;
            for _ in 0..SUBJECT_DEPTH_LIMIT {
                let Some(edge) = tree.parent_edge(node) else {
                    break;
                };
                if edge.relation.contains("subj") {
                    is_subject[vertex] = true;
                    break;
                }
                node = edge.governor;
            }
        }

        let order = tree.topological_order().unwrap_or_else(|| {
            tracing::warn!("entailment premise has a cycle; using linear order");
            tree.vertices().collect()
        });

        Some(Premise {
            tree,
            cut_edges,
            base_score,
            is_subject,
            order,
        })
    }

    /// The probability of deleting `vertex`, with the arc it hangs from, or
    /// `None` when the deletion is not sound.
    fn deletion_weight(
        &self,
        premise: &Premise,
        vertex: usize,
        premise_truth: bool,
    ) -> Option<(Edge, f64)> {
        let tree = &premise.tree;
        if tree.first_root() == Some(vertex) {
            return None;
        }
        let token = tree.token(vertex)?;
        let mut governing: Option<Edge> = None;
        let mut weight = 1.0;
        for edge in tree.incoming(vertex) {
            if tree.token(edge.governor).is_some_and(Token::is_cardinal) {
                return None;
            }
            let lexical = match token.operator {
                Some(spec) if spec.head == vertex => spec.instance.deletion_relation,
                _ => NaturalLogicRelation::for_dependency_deletion(
                    &edge.relation,
                    premise.is_subject[vertex],
                    Some(token.word.as_str()),
                ),
            };
            if !token.polarity.truth_after(lexical, premise_truth).is_true() {
                return None;
            }
            let neighbors: Vec<&Edge> = tree
                .outgoing(edge.governor)
                .filter(|e| *e != edge)
                .collect();
            weight *= self.weights.deletion_probability(tree, edge, &neighbors);
            governing.get_or_insert_with(|| edge.clone());
        }
        governing.map(|edge| (edge, weight))
    }
}

fn materialize(premise: &Premise, edits: &EditLog, score: f64) -> Result<SentenceFragment> {
    let mut graph = premise.tree.clone();
    let ctx = EditContext {
        original: &premise.tree,
        extra_edges: &premise.cut_edges,
    };
    edits.apply(&mut graph, &ctx)?;
    let extra_edges: Vec<Edge> = premise
        .cut_edges
        .iter()
        .filter(|e| graph.contains_vertex(e.governor) && graph.contains_vertex(e.dependent))
        .cloned()
        .map(Edge::as_extra)
        .collect();
    Ok(SentenceFragment::new(graph, score, true).with_extra_edges(extra_edges))
}
