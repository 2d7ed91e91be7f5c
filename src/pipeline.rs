//! End-to-end extraction: polarity, clauses, then entailed fragments.

use std::collections::BTreeSet;

use crate::clause::ClauseSplitter;
use crate::config::NatLogConfig;
use crate::entailment::ForwardEntailer;
use crate::error::Result;
use crate::graph::{DependencyGraph, Edge};
use crate::natlog;
use crate::types::SentenceFragment;

/// Adjectives whose removal does not preserve truth ("a former president"
/// is not a president).
pub const PRIVATIVE_ADJECTIVES: &[&str] = &[
    // Hedged
    "believed",
    "debatable",
    "disputed",
    "dubious",
    "hypothetical",
    "impossible",
    "improbable",
    "plausible",
    "putative",
    "questionable",
    "so called",
    "supposed",
    "suspicious",
    "theoretical",
    "uncertain",
    "unlikely",
    "would - be",
    "apparent",
    "arguable",
    "assumed",
    "likely",
    "ostensible",
    "possible",
    "potential",
    "predicted",
    "presumed",
    "probable",
    "seeming",
    // Negated
    "anti",
    "fake",
    "fictional",
    "fictitious",
    "imaginary",
    "mythical",
    "phony",
    "false",
    "artificial",
    "erroneous",
    "mistaken",
    "mock",
    "pseudo",
    "simulated",
    "spurious",
    "deputy",
    "faulty",
    "virtual",
    "doubtful",
    // Temporal
    "erstwhile",
    "ex",
    "expected",
    "former",
    "future",
    "onetime",
    "past",
    "proposed",
];

/// Runs the full natural-logic extraction over parsed sentences.
///
/// For each sentence the pipeline annotates operator scopes and polarity,
/// splits the sentence into clauses, shortens each clause with the
/// [`ForwardEntailer`], and returns every fragment sorted by score with
/// duplicate token sets removed.
#[derive(Debug, Clone)]
pub struct NaturalLogicPipeline {
    config: NatLogConfig,
    splitter: ClauseSplitter,
    entailer: ForwardEntailer,
}

impl Default for NaturalLogicPipeline {
    fn default() -> Self {
        Self::new(NatLogConfig::default())
    }
}

impl NaturalLogicPipeline {
    /// Create a pipeline with default models at the given configuration.
    #[must_use]
    pub fn new(config: NatLogConfig) -> Self {
        let splitter = ClauseSplitter::new(config.clause.clone());
        let entailer = ForwardEntailer::new(config.entailment.clone());
        Self {
            config,
            splitter,
            entailer,
        }
    }

    /// The pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &NatLogConfig {
        &self.config
    }

    /// The clause splitter.
    #[must_use]
    pub fn splitter(&self) -> &ClauseSplitter {
        &self.splitter
    }

    /// The entailment search.
    #[must_use]
    pub fn entailer(&self) -> &ForwardEntailer {
        &self.entailer
    }

    /// Extract every fragment of a sentence, best first.
    ///
    /// The input graph is not modified; annotation happens on a copy.
    ///
    /// # Errors
    ///
    /// Returns an error if a clause split or deletion breaks the tree
    /// invariant.
    pub fn process(&self, graph: &DependencyGraph) -> Result<Vec<SentenceFragment>> {
        let mut annotated = graph.clone();
        let operators = natlog::annotate(&mut annotated);
        tracing::debug!(operators = operators.len(), "annotated sentence");

        let clauses = self.clauses(&annotated)?;
        let mut fragments = Vec::new();
        for clause in &clauses {
            fragments.extend(self.entailments_from_clause(clause)?);
        }

        fragments.sort_by(|a, b| b.score.total_cmp(&a.score));
        let mut seen: BTreeSet<BTreeSet<usize>> = BTreeSet::new();
        fragments.retain(|fragment| seen.insert(fragment.token_set()));

        tracing::debug!(
            clauses = clauses.len(),
            fragments = fragments.len(),
            "processed sentence"
        );
        Ok(fragments)
    }

    /// Split an annotated sentence into clauses, or keep it whole when
    /// splitting is disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if a clause breaks the tree invariant.
    pub fn clauses(&self, annotated: &DependencyGraph) -> Result<Vec<SentenceFragment>> {
        if self.config.pipeline.split_clauses {
            self.splitter.top_clauses(annotated)
        } else if annotated.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(vec![SentenceFragment::new(
                annotated.clone(),
                1.0,
                self.splitter.config().assume_truth,
            )])
        }
    }

    /// The shortenings of one clause: its forward entailments, the clause
    /// itself, then any adjective entailments.
    ///
    /// # Errors
    ///
    /// Returns an error if a deletion breaks the tree invariant.
    pub fn entailments_from_clause(&self, clause: &SentenceFragment) -> Result<Vec<SentenceFragment>> {
        if clause.is_empty() {
            return Ok(Vec::new());
        }
        let mut fragments = Vec::new();
        let limit = self.config.pipeline.entailments_per_clause;
        if limit > 0 {
            let mut entailed = self.entailer.entailments_of(clause)?;
            entailed.truncate(limit);
            fragments.extend(entailed);
        }
        fragments.push(clause.clone());
        if self.config.pipeline.adjective_entailments {
            fragments.extend(adjective_entailments(clause));
        }
        Ok(fragments)
    }

    /// Process independent sentences on blocking worker threads.
    ///
    /// Results come back in input order.
    ///
    /// # Errors
    ///
    /// Returns the first sentence error, or
    /// [`PipelineError::WorkerFailed`](crate::error::PipelineError::WorkerFailed)
    /// if a worker panicked or was cancelled.
    #[cfg(feature = "native")]
    pub async fn process_batch(
        &self,
        graphs: Vec<DependencyGraph>,
    ) -> Result<Vec<Vec<SentenceFragment>>> {
        use crate::error::PipelineError;

        let pipeline = std::sync::Arc::new(self.clone());
        let handles: Vec<_> = graphs
            .into_iter()
            .map(|graph| {
                let pipeline = std::sync::Arc::clone(&pipeline);
                tokio::task::spawn_blocking(move || pipeline.process(&graph))
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let fragments = handle
                .await
                .map_err(|err| PipelineError::WorkerFailed(err.to_string()))??;
            results.push(fragments);
        }
        Ok(results)
    }
}

/// Fragments asserting a copular clause's adjective of its subject.
///
/// Matches `obj >nsubj subj >cop be >det a|an >amod adj`, optionally with an
/// `nmod*`/`acl*` argument of `obj`, and builds `subj be adj [arg]`. Skipped
/// when the adjective or any adjective before it is privative, or when the
/// adjective or copula is not in an upward context.
#[must_use]
pub fn adjective_entailments(clause: &SentenceFragment) -> Vec<SentenceFragment> {
    let tree = &clause.graph;
    let mut fragments = Vec::new();

    for obj in tree.vertices() {
        let has_indefinite = tree.outgoing(obj).any(|e| {
            e.relation == "det"
                && tree
                    .token(e.dependent)
                    .is_some_and(|t| matches!(t.word.to_lowercase().as_str(), "a" | "an"))
        });
        if !has_indefinite {
            continue;
        }
        let subjects = children_with(tree, obj, "nsubj");
        let copulas = children_with(tree, obj, "cop");
        let adjectives = children_with(tree, obj, "amod");
        let argument = tree
            .outgoing(obj)
            .find(|e| e.relation.starts_with("nmod") || e.relation.starts_with("acl"));

        for subj in &subjects {
            for be in &copulas {
                for adj in &adjectives {
                    let privative = adjectives.iter().any(|e| {
                        e.dependent <= adj.dependent
                            && tree.token(e.dependent).is_some_and(|t| {
                                PRIVATIVE_ADJECTIVES.contains(&t.word.to_lowercase().as_str())
                            })
                    });
                    if privative {
                        continue;
                    }
                    let upward = |v: usize| tree.token(v).is_some_and(|t| t.polarity.is_upwards());
                    if !upward(adj.dependent) || !upward(be.dependent) {
                        continue;
                    }
                    if let Some(fragment) = build_adjective_fragment(
                        tree,
                        adj.dependent,
                        be.dependent,
                        subj.dependent,
                        argument,
                        clause,
                    ) {
                        fragments.push(fragment);
                    }
                }
            }
        }
    }
    fragments
}

fn children_with<'a>(tree: &'a DependencyGraph, vertex: usize, relation: &str) -> Vec<&'a Edge> {
    tree.outgoing(vertex).filter(|e| e.relation == relation).collect()
}

fn build_adjective_fragment(
    tree: &DependencyGraph,
    adj: usize,
    be: usize,
    subj: usize,
    argument: Option<&Edge>,
    clause: &SentenceFragment,
) -> Option<SentenceFragment> {
    let mut keep = vec![adj, be, subj];
    keep.extend(argument.map(|e| e.dependent));

    let mut graph = tree.clone();
    let all: Vec<usize> = graph.vertices().collect();
    for vertex in all {
        if !keep.contains(&vertex) {
            graph.remove_vertex(vertex);
        }
    }
    let stale: Vec<Edge> = graph.edges().to_vec();
    for edge in &stale {
        graph.remove_edge(edge);
    }
    graph.set_root(adj);

    let mut edges = vec![Edge::new(adj, be, "cop"), Edge::new(adj, subj, "nsubj")];
    edges.extend(argument.map(|e| Edge::new(adj, e.dependent, &e.relation)));
    for edge in edges {
        if let Err(err) = graph.add_edge(edge) {
            tracing::warn!(%err, "skipping adjective entailment");
            return None;
        }
    }
    if !graph.is_tree() {
        return None;
    }
    Some(SentenceFragment::new(graph, clause.score, clause.truth))
}

/// Builder for [`NaturalLogicPipeline`].
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    config: NatLogConfig,
    splitter: Option<ClauseSplitter>,
    entailer: Option<ForwardEntailer>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration.
    #[must_use]
    pub fn with_config(mut self, config: NatLogConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a prepared clause splitter instead of one built from the
    /// configuration.
    #[must_use]
    pub fn with_splitter(mut self, splitter: ClauseSplitter) -> Self {
        self.splitter = Some(splitter);
        self
    }

    /// Use a prepared entailer instead of one built from the configuration.
    #[must_use]
    pub fn with_entailer(mut self, entailer: ForwardEntailer) -> Self {
        self.entailer = Some(entailer);
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`NatLogError::Config`](crate::error::NatLogError::Config) if
    /// the configuration is invalid.
    pub fn build(self) -> Result<NaturalLogicPipeline> {
        self.config.validate()?;
        let splitter = self
            .splitter
            .unwrap_or_else(|| ClauseSplitter::new(self.config.clause.clone()));
        let entailer = self
            .entailer
            .unwrap_or_else(|| ForwardEntailer::new(self.config.entailment.clone()));
        Ok(NaturalLogicPipeline {
            config: self.config,
            splitter,
            entailer,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{ClauseSplitterConfig, PipelineConfig};
    use crate::entailment::NaturalLogicWeights;

    const CATS_EAT_SOME_MICE: &str = "\
1 Cats cat NNS 2 nsubj
2 eat eat VBP 0 root
3 some some DT 4 det
4 mice mouse NNS 2 dobj
5 quietly quietly RB 2 advmod";

    const BLACK_PRESIDENT: &str = "\
1 Obama Obama NNP 5 nsubj
2 is be VBZ 5 cop
3 a a DT 5 det
4 black black JJ 5 amod
5 president president NN 0 root";

    const FORMER_PRESIDENT: &str = "\
1 Obama Obama NNP 5 nsubj
2 is be VBZ 5 cop
3 a a DT 5 det
4 former former JJ 5 amod
5 president president NN 0 root";

    const KNOW: &str = "\
1 I I PRP 2 nsubj
2 know know VBP 0 root
3 that that IN 5 mark
4 cats cat NNS 5 nsubj
5 eat eat VBP 2 ccomp
6 mice mouse NNS 5 dobj";

    fn parse(conll: &str) -> DependencyGraph {
        DependencyGraph::from_conll(conll).unwrap()
    }

    fn sentences(fragments: &[SentenceFragment]) -> Vec<String> {
        fragments.iter().map(SentenceFragment::to_sentence).collect()
    }

    #[test]
    fn test_process_single_clause() {
        let pipeline = NaturalLogicPipeline::default();
        let fragments = pipeline.process(&parse(CATS_EAT_SOME_MICE)).unwrap();
        assert_eq!(
            sentences(&fragments),
            vec![
                "Cats eat mice quietly",
                "Cats eat mice",
                "Cats eat some mice",
                "Cats eat some mice quietly",
            ]
        );
        assert!(fragments.iter().all(|f| f.truth && f.score == 1.0));
    }

    #[test]
    fn test_process_sorts_by_score() {
        let weights = NaturalLogicWeights::default().with_modifier_affinity("eat", "advmod", 0.1);
        let pipeline = PipelineBuilder::new()
            .with_entailer(ForwardEntailer::default().with_weights(Arc::new(weights)))
            .build()
            .unwrap();
        let fragments = pipeline.process(&parse(CATS_EAT_SOME_MICE)).unwrap();
        assert_eq!(fragments.len(), 4);
        assert!(fragments.windows(2).all(|w| w[0].score >= w[1].score));
        assert!((fragments[3].score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_process_splits_clauses() {
        let pipeline = NaturalLogicPipeline::default();
        let fragments = pipeline.process(&parse(KNOW)).unwrap();
        let found = sentences(&fragments);
        assert!(found.contains(&"I know that cats eat mice".to_string()));
        assert!(found.contains(&"cats eat mice".to_string()));

        let tokens: BTreeSet<BTreeSet<usize>> = fragments.iter().map(|f| f.token_set()).collect();
        assert_eq!(tokens.len(), fragments.len());
    }

    #[test]
    fn test_process_without_splitting() {
        let config = NatLogConfig::new().with_pipeline(PipelineConfig::default().with_split_clauses(false));
        let pipeline = NaturalLogicPipeline::new(config);
        let clauses = pipeline.clauses(&parse(KNOW)).unwrap();
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].len(), 6);
    }

    #[test]
    fn test_entailments_per_clause_cap() {
        let config =
            NatLogConfig::new().with_pipeline(PipelineConfig::default().with_entailments_per_clause(0));
        let pipeline = NaturalLogicPipeline::new(config);
        let fragments = pipeline.process(&parse(CATS_EAT_SOME_MICE)).unwrap();
        assert_eq!(sentences(&fragments), vec!["Cats eat some mice quietly"]);
    }

    #[test]
    fn test_process_does_not_modify_input() {
        let graph = parse(CATS_EAT_SOME_MICE);
        let before = graph.clone();
        let _ = NaturalLogicPipeline::default().process(&graph).unwrap();
        assert_eq!(graph, before);
    }

    #[test]
    fn test_empty_sentence() {
        let pipeline = NaturalLogicPipeline::default();
        assert!(pipeline.process(&DependencyGraph::new(Vec::new())).unwrap().is_empty());
    }

    // ========================================================================
    // Adjective Entailments
    // ========================================================================

    #[test]
    fn test_adjective_entailment() {
        let fragments = NaturalLogicPipeline::default()
            .process(&parse(BLACK_PRESIDENT))
            .unwrap();
        let adjective = fragments
            .iter()
            .find(|f| f.to_sentence() == "Obama is black")
            .unwrap();
        assert!(adjective.truth);
        assert_eq!(adjective.score, 1.0);
        assert_eq!(adjective.graph.first_root(), Some(3));
        assert!(adjective.graph.is_tree());
    }

    #[test]
    fn test_privative_adjective_is_kept() {
        let fragments = NaturalLogicPipeline::default()
            .process(&parse(FORMER_PRESIDENT))
            .unwrap();
        assert!(!sentences(&fragments).contains(&"Obama is former".to_string()));
    }

    #[test]
    fn test_adjective_entailments_can_be_disabled() {
        let config = NatLogConfig::new()
            .with_pipeline(PipelineConfig::default().with_adjective_entailments(false));
        let fragments = NaturalLogicPipeline::new(config)
            .process(&parse(BLACK_PRESIDENT))
            .unwrap();
        assert!(!sentences(&fragments).contains(&"Obama is black".to_string()));
    }

    // ========================================================================
    // Builder
    // ========================================================================

    #[test]
    fn test_builder_rejects_invalid_config() {
        let config =
            NatLogConfig::new().with_clause(ClauseSplitterConfig::default().with_threshold(-0.5));
        assert!(PipelineBuilder::new().with_config(config).build().is_err());
    }

    #[test]
    fn test_builder_uses_config() {
        let config =
            NatLogConfig::new().with_clause(ClauseSplitterConfig::default().with_assume_truth(false));
        let pipeline = PipelineBuilder::new().with_config(config).build().unwrap();
        assert!(!pipeline.splitter().config().assume_truth);
        assert_eq!(pipeline.entailer().config().max_results, 1000);
    }

    // ========================================================================
    // Batch Processing
    // ========================================================================

    #[cfg(feature = "native")]
    #[tokio::test]
    async fn test_process_batch_preserves_order() {
        let pipeline = NaturalLogicPipeline::default();
        let graphs = vec![parse(KNOW), parse(CATS_EAT_SOME_MICE), parse(BLACK_PRESIDENT)];
        let expected: Vec<Vec<SentenceFragment>> =
            graphs.iter().map(|g| pipeline.process(g).unwrap()).collect();

        let results = pipeline.process_batch(graphs).await.unwrap();
        assert_eq!(results, expected);
    }

    #[cfg(feature = "native")]
    #[tokio::test]
    async fn test_process_batch_empty() {
        let results = NaturalLogicPipeline::default()
            .process_batch(Vec::new())
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
