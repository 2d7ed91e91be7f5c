//! Best-first search for independent clauses.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};
use std::sync::Arc;

use super::action::{ClauseAction, hard_split_order, is_indirect_speech, order_actions};
use super::classifier::LinearClassifier;
use super::featurizer::DefaultFeaturizer;
use super::traits::{Classifier, ClauseLabel, Featurizer, Features};
use crate::config::ClauseSplitterConfig;
use crate::error::{Result, TreeInvariantViolation};
use crate::graph::{DependencyGraph, Edge, EditContext, EditLog, TreeEdit, clean_tree, short_relation};
use crate::types::SentenceFragment;

/// A node of the clause search.
///
/// States are never mutated once built; taking an action derives a new state
/// that shares its edit history with its parent.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    /// The edge just traversed; `None` for the start state.
    pub edge: Option<Edge>,
    /// Nearest subject edge seen on the way here.
    pub subject: Option<Edge>,
    /// Number of steps since the subject anchor was last updated.
    pub distance_from_subj: usize,
    /// Nearest object edge seen on the way here.
    pub object: Option<Edge>,
    /// Nearest prepositional edge seen on the way here.
    pub preposition: Option<Edge>,
    /// Edits that carve this state's clause out of the tree.
    pub edits: EditLog,
    /// Whether this state is a finished clause.
    pub done: bool,
}

impl SearchState {
    /// The start state: no edge taken, and already a clause (the whole
    /// sentence).
    #[must_use]
    pub fn start() -> Self {
        Self {
            done: true,
            ..Self::default()
        }
    }

    /// This state with its doneness set from a classifier label.
    #[must_use]
    fn with_label(mut self, label: ClauseLabel) -> Self {
        self.done = label == ClauseLabel::Split;
        self
    }
}

/// The cleaned tree a search runs over, with the arcs cleaning removed.
#[derive(Debug)]
struct ClauseProblem {
    tree: DependencyGraph,
    extra_edges: Vec<Edge>,
    assumed_truth: bool,
}

/// A clause proposed by the search.
///
/// The clause graph is not built until [`ClauseCandidate::materialize`] is
/// called, and is rebuilt on every call.
#[derive(Debug, Clone)]
pub struct ClauseCandidate {
    /// Cumulative log-probability of the path to this clause.
    pub log_prob: f64,
    /// Feature vectors of each transition on the path.
    pub features: Vec<Features>,
    edge: Option<Edge>,
    edits: EditLog,
    problem: Arc<ClauseProblem>,
}

impl ClauseCandidate {
    /// Probability of the path to this clause.
    #[must_use]
    pub fn probability(&self) -> f64 {
        self.log_prob.exp()
    }

    /// The edits that produce this clause from the cleaned tree.
    #[must_use]
    pub fn edits(&self) -> &EditLog {
        &self.edits
    }

    /// Build the clause: replay the edits onto a copy of the cleaned tree and
    /// copy back any extra arcs hanging off the new root.
    ///
    /// # Errors
    ///
    /// Returns a [`TreeInvariantViolation`] if an edit breaks the tree.
    pub fn materialize(&self) -> std::result::Result<SentenceFragment, TreeInvariantViolation> {
        let problem = &self.problem;
        let mut graph = problem.tree.clone();
        let ctx = EditContext {
            original: &problem.tree,
            extra_edges: &problem.extra_edges,
        };
        self.edits.apply(&mut graph, &ctx)?;
        TreeEdit::RestoreExtraEdges.apply(&mut graph, &ctx);
        if !graph.is_tree() {
            let edge = self.edge.clone().unwrap_or_else(|| {
                let root = problem.tree.first_root().unwrap_or_default();
                Edge::new(root, root, "root")
            });
            return Err(TreeInvariantViolation {
                edge,
                graph: graph.to_string(),
            });
        }
        Ok(SentenceFragment::new(graph, self.probability(), problem.assumed_truth))
    }
}

struct FrontierEntry {
    log_prob: f64,
    sequence: u64,
    state: SearchState,
    features: Vec<Features>,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Highest log-probability first, then first pushed first.
        self.log_prob
            .total_cmp(&other.log_prob)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Anchors visible from a root word.
#[derive(Default)]
struct Anchors<'a> {
    subject: Option<&'a Edge>,
    object: Option<&'a Edge>,
    preposition: Option<&'a Edge>,
}

fn find_anchors(tree: &DependencyGraph, root_word: usize) -> Anchors<'_> {
    let mut anchors = Anchors::default();
    for edge in tree.outgoing(root_word) {
        if edge.relation.contains("obj") {
            anchors.object = Some(edge);
        } else if edge.relation.contains("subj") {
            anchors.subject = Some(edge);
        }
        if matches!(short_relation(&edge.relation), "prep" | "nmod" | "obl") {
            anchors.preposition = Some(edge);
        }
    }
    anchors
}

/// Splits a sentence into candidate independent clauses.
///
/// The search walks down from the root, and at each word considers every
/// outgoing edge under every applicable [`ClauseAction`]. Hard-split edges
/// take their first applicable forced action at no cost; all other
/// transitions are labeled by the [`Classifier`], and those it does not
/// reject are queued by cumulative log-probability. Each state labeled a
/// split is handed to the caller as a [`ClauseCandidate`].
///
/// # Example
///
/// ```rust,ignore
/// let splitter = ClauseSplitter::default();
/// for clause in splitter.top_clauses(&graph)? {
///     println!("{} ({:.2})", clause, clause.score);
/// }
/// ```
#[derive(Clone)]
pub struct ClauseSplitter {
    config: ClauseSplitterConfig,
    classifier: Arc<dyn Classifier>,
    featurizer: Arc<dyn Featurizer>,
}

impl Default for ClauseSplitter {
    fn default() -> Self {
        Self::new(ClauseSplitterConfig::default())
    }
}

impl std::fmt::Debug for ClauseSplitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClauseSplitter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ClauseSplitter {
    /// Create a splitter with an unweighted linear classifier and the
    /// default featurizer.
    #[must_use]
    pub fn new(config: ClauseSplitterConfig) -> Self {
        Self {
            config,
            classifier: Arc::new(LinearClassifier::new()),
            featurizer: Arc::new(DefaultFeaturizer),
        }
    }

    /// Use a different classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Use a different featurizer.
    #[must_use]
    pub fn with_featurizer(mut self, featurizer: Arc<dyn Featurizer>) -> Self {
        self.featurizer = featurizer;
        self
    }

    /// The splitter's configuration.
    #[must_use]
    pub fn config(&self) -> &ClauseSplitterConfig {
        &self.config
    }

    /// Run the search, handing each clause to `accumulator` best first until
    /// it returns `false`, the frontier empties, or the tick budget runs out.
    ///
    /// The input graph is copied and cleaned into a tree first; it is never
    /// modified. Returns the number of candidates produced.
    pub fn search<A>(&self, graph: &DependencyGraph, mut accumulator: A) -> usize
    where
        A: FnMut(ClauseCandidate) -> bool,
    {
        let mut tree = graph.clone();
        let extra_edges = clean_tree(&mut tree);
        let Some(root) = tree.first_root() else {
            tracing::debug!("clause search on an empty tree");
            return 0;
        };
        let problem = Arc::new(ClauseProblem {
            tree,
            extra_edges,
            assumed_truth: self.config.assume_truth,
        });
        let tree = &problem.tree;

        let mut fringe = BinaryHeap::new();
        let mut sequence = 0u64;
        fringe.push(FrontierEntry {
            log_prob: 0.0,
            sequence,
            state: SearchState::start(),
            features: Vec::new(),
        });
        let mut seen_words = BTreeSet::new();
        let mut ticks = 0usize;
        let mut produced = 0usize;

        while let Some(entry) = fringe.pop() {
            ticks += 1;
            if ticks > self.config.max_ticks {
                tracing::warn!(ticks, produced, "clause search ran out of ticks");
                break;
            }
            let FrontierEntry {
                log_prob,
                state,
                features,
                ..
            } = entry;
            let root_word = state.edge.as_ref().map_or(root, |e| e.dependent);

            if state.done {
                produced += 1;
                let candidate = ClauseCandidate {
                    log_prob,
                    features: features.clone(),
                    edge: state.edge.clone(),
                    edits: state.edits.clone(),
                    problem: Arc::clone(&problem),
                };
                if !accumulator(candidate) {
                    break;
                }
            }

            let anchors = find_anchors(tree, root_word);
            for edge in tree.outgoing(root_word) {
                if edge.relation == "ccomp" && is_indirect_speech(tree, edge.governor) {
                    continue;
                }
                let forced = hard_split_order(&edge.relation);
                let actions = forced.map_or_else(|| ClauseAction::ALL.to_vec(), order_actions);
                let mut done_forced = false;
                for action in actions {
                    if !action.prerequisites_met(tree, edge) {
                        continue;
                    }
                    if forced.is_some() && done_forced {
                        break;
                    }
                    let Some(candidate) = action.apply_to(
                        &state,
                        edge,
                        anchors.subject,
                        anchors.object,
                        anchors.preposition,
                    ) else {
                        continue;
                    };
                    let transition = self.featurizer.featurize(tree, &state, action, &candidate);
                    let (step_log_prob, label) = if forced.is_some() {
                        done_forced = true;
                        (0.0, ClauseLabel::Split)
                    } else {
                        self.classify(edge, &transition)
                    };
                    if label == ClauseLabel::NotAClause || seen_words.contains(&edge.dependent) {
                        continue;
                    }
                    sequence += 1;
                    let mut path = features.clone();
                    path.push(transition);
                    fringe.push(FrontierEntry {
                        log_prob: log_prob + step_log_prob,
                        sequence,
                        state: candidate.with_label(label),
                        features: path,
                    });
                }
            }
            seen_words.insert(root_word);
        }

        tracing::debug!(ticks, produced, "clause search finished");
        produced
    }

    fn classify(&self, edge: &Edge, features: &Features) -> (f64, ClauseLabel) {
        let mut scores = self.classifier.scores(features);
        if !scores.is_empty() {
            scores = scores.log_normalized();
        }
        if matches!(edge.relation.as_str(), "nsubj" | "obj" | "dobj") {
            scores.remove(ClauseLabel::NotAClause);
        }
        scores
            .argmax()
            .map_or((f64::NEG_INFINITY, ClauseLabel::Split), |(label, score)| (score, label))
    }

    /// Every clause candidate, best first, without materializing any.
    #[must_use]
    pub fn candidates(&self, graph: &DependencyGraph) -> Vec<ClauseCandidate> {
        let mut out = Vec::new();
        self.search(graph, |candidate| {
            out.push(candidate);
            true
        });
        out
    }

    /// Materialized clauses with probability at least the configured
    /// threshold, best first, at most the configured maximum.
    ///
    /// # Errors
    ///
    /// Returns an error if a clause breaks the tree invariant.
    pub fn top_clauses(&self, graph: &DependencyGraph) -> Result<Vec<SentenceFragment>> {
        self.top_clauses_with(graph, self.config.threshold, self.config.max_clauses)
    }

    /// [`Self::top_clauses`] with an explicit threshold and maximum.
    ///
    /// # Errors
    ///
    /// Returns an error if a clause breaks the tree invariant.
    pub fn top_clauses_with(
        &self,
        graph: &DependencyGraph,
        threshold: f64,
        max_clauses: usize,
    ) -> Result<Vec<SentenceFragment>> {
        let mut selected: Vec<ClauseCandidate> = Vec::new();
        if max_clauses == 0 {
            return Ok(Vec::new());
        }
        self.search(graph, |candidate| {
            if candidate.probability() < threshold {
                return false;
            }
            selected.push(candidate);
            selected.len() < max_clauses
        });
        let mut clauses = Vec::with_capacity(selected.len());
        for candidate in &selected {
            clauses.push(candidate.materialize()?);
        }
        Ok(clauses)
    }
}
