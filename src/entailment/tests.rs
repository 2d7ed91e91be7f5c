use std::sync::Arc;

use super::*;
use crate::config::EntailmentConfig;
use crate::graph::{DependencyGraph, Edge, Token};
use crate::natlog;
use crate::types::SentenceFragment;

// ============================================================================
// Fixtures
// ============================================================================

fn annotated(conll: &str) -> DependencyGraph {
    let mut graph = DependencyGraph::from_conll(conll).unwrap();
    natlog::annotate(&mut graph);
    graph
}

fn sentences(fragments: &[SentenceFragment]) -> Vec<String> {
    fragments.iter().map(SentenceFragment::to_sentence).collect()
}

const ALL_CATS_LONG_TAILS: &str = "\
1 All all DT 2 det
2 cats cat NNS 3 nsubj
3 have have VBP 0 root
4 long long JJ 5 amod
5 tails tail NNS 3 dobj";

const CATS_EAT_SOME_MICE: &str = "\
1 Cats cat NNS 2 nsubj
2 eat eat VBP 0 root
3 some some DT 4 det
4 mice mouse NNS 2 dobj
5 quietly quietly RB 2 advmod";

const NO_CATS: &str = "\
1 No no DT 2 det
2 cats cat NNS 3 nsubj
3 like like VBP 0 root
4 dogs dog NNS 3 dobj";

fn eat_weights() -> Arc<NaturalLogicWeights> {
    Arc::new(NaturalLogicWeights::default().with_modifier_affinity("eat", "advmod", 0.1))
}

// ============================================================================
// Quantifier Tests
// ============================================================================

#[test]
fn test_universal_subject_is_kept() {
    let graph = annotated(
        "1 All all DT 2 det
2 cats cat NNS 3 nsubj
3 have have VBP 0 root
4 tails tail NNS 3 dobj",
    );
    let results = ForwardEntailer::default().search(&graph).unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_object_modifier_under_universal() {
    let graph = annotated(ALL_CATS_LONG_TAILS);
    let results = ForwardEntailer::default().search(&graph).unwrap();
    assert_eq!(sentences(&results), vec!["All cats have tails"]);
    assert_eq!(results[0].score, 1.0);
    assert!(results[0].truth);
}

#[test]
fn test_subject_modifier_under_universal() {
    let graph = annotated(
        "1 All all DT 3 det
2 black black JJ 3 amod
3 cats cat NNS 4 nsubj
4 have have VBP 0 root
5 tails tail NNS 4 dobj",
    );
    assert!(graph.token(1).unwrap().polarity.is_downwards());
    let results = ForwardEntailer::default().search(&graph).unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_adverb_deletion_is_weighted() {
    let graph = annotated(CATS_EAT_SOME_MICE);
    let entailer = ForwardEntailer::default().with_weights(eat_weights());
    let results = entailer.search(&graph).unwrap();

    assert_eq!(
        sentences(&results),
        vec!["Cats eat mice quietly", "Cats eat mice", "Cats eat some mice"]
    );
    let shortened = &results[2];
    assert!(shortened.score > 0.0 && shortened.score < 1.0);
    assert!((shortened.score - 0.7).abs() < 1e-9);
    assert_eq!(results[0].score, 1.0);
}

#[test]
fn test_negative_affinity_keeps_scores_in_range() {
    let graph = annotated(CATS_EAT_SOME_MICE);
    let weights = NaturalLogicWeights::default().with_modifier_affinity("eat", "advmod", -0.1);
    let results = ForwardEntailer::default()
        .with_weights(Arc::new(weights))
        .search(&graph)
        .unwrap();
    assert!(!results.is_empty());
    for fragment in &results {
        assert!(fragment.score > 0.0 && fragment.score <= 1.0);
    }
}

#[test]
fn test_negation_is_never_deleted() {
    let graph = annotated(NO_CATS);
    let results = ForwardEntailer::default().search(&graph).unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_false_premise() {
    // If "no cats like dogs" is false, then "cats like dogs" is true.
    let graph = annotated(NO_CATS);
    let results = ForwardEntailer::default()
        .search_with_truth(&graph, false)
        .unwrap();
    assert_eq!(sentences(&results), vec!["cats like dogs"]);
    assert!(results[0].truth);

    let graph = annotated(CATS_EAT_SOME_MICE);
    let results = ForwardEntailer::default()
        .search_with_truth(&graph, false)
        .unwrap();
    assert!(results.is_empty());
}

// ============================================================================
// Pre-processing Tests
// ============================================================================

#[test]
fn test_determiners_are_dropped() {
    let graph = annotated(
        "1 The the DT 2 det
2 cat cat NN 3 nsubj
3 sleeps sleep VBZ 0 root
4 soundly soundly RB 3 advmod",
    );
    let results = ForwardEntailer::default().search(&graph).unwrap();
    assert_eq!(sentences(&results), vec!["cat sleeps"]);

    let weights = NaturalLogicWeights::default()
        .with_default("det", 0.5)
        .unwrap();
    let results = ForwardEntailer::default()
        .with_weights(Arc::new(weights))
        .search(&graph)
        .unwrap();
    assert_eq!(results[0].score, 0.5);
    assert!(DETERMINERS.contains(&"the"));
}

#[test]
fn test_shared_conjunct_is_cut_and_restored() {
    let graph = annotated(
        "1 Cats cat NOUN NNS _ 4 nsubj _ _
2 and and CCONJ CC _ 1 cc _ _
3 dogs dog NOUN NNS _ 1 conj:and 4:nsubj _
4 eat eat VERB VBP _ 0 root _ _
5 mice mouse NOUN NNS _ 4 obj _ _",
    );
    assert!(!graph.is_tree());
    let results = ForwardEntailer::default().search(&graph).unwrap();
    assert_eq!(sentences(&results), vec!["Cats dogs eat mice"]);

    let fragment = &results[0];
    assert!(fragment.graph.is_tree());
    assert_eq!(fragment.extra_edges.len(), 1);
    let restored = &fragment.extra_edges[0];
    assert_eq!((restored.governor, restored.dependent), (0, 2));
    assert_eq!(restored.relation, "conj:and");
}

#[test]
fn test_numeric_governor_blocks_deletion() {
    // Polarity is left unannotated: every context is upward.
    let graph = DependencyGraph::from_conll(
        "1 Cats cat NNS 2 nsubj
2 eat eat VBP 0 root
3 about about RB 4 advmod
4 3 3 CD 5 nummod
5 mice mouse NNS 2 dobj
6 quietly quietly RB 2 advmod",
    )
    .unwrap();
    let results = ForwardEntailer::default().search(&graph).unwrap();
    assert_eq!(sentences(&results), vec!["Cats eat about 3 mice"]);
}

// ============================================================================
// Search Control Tests
// ============================================================================

#[test]
fn test_empty_and_single_vertex_graphs() {
    let empty = DependencyGraph::new(Vec::new());
    assert!(ForwardEntailer::default().search(&empty).unwrap().is_empty());

    let mut single = DependencyGraph::new(vec![Token::new(0, "Sleep").with_tag("VB")]);
    single.set_root(0);
    assert!(ForwardEntailer::default().search(&single).unwrap().is_empty());
}

#[test]
fn test_tick_budget_returns_partial_results() {
    let graph = annotated(CATS_EAT_SOME_MICE);
    let entailer = ForwardEntailer::new(EntailmentConfig::default().with_max_ticks(2));
    assert!(entailer.search(&graph).unwrap().is_empty());
}

#[test]
fn test_result_cap() {
    let graph = annotated(CATS_EAT_SOME_MICE);
    let entailer = ForwardEntailer::new(EntailmentConfig::default().with_max_results(1));
    assert_eq!(entailer.search(&graph).unwrap().len(), 1);
    let entailer = ForwardEntailer::new(EntailmentConfig::default().with_max_results(0));
    assert!(entailer.search(&graph).unwrap().is_empty());
}

#[test]
fn test_search_is_deterministic() {
    let graph = annotated(CATS_EAT_SOME_MICE);
    let entailer = ForwardEntailer::default().with_weights(eat_weights());
    let first = entailer.search(&graph).unwrap();
    let second = entailer.search(&graph).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_input_graph_is_not_modified() {
    let graph = annotated(CATS_EAT_SOME_MICE);
    let before = graph.clone();
    let _ = ForwardEntailer::default().search(&graph).unwrap();
    assert_eq!(graph, before);
}

#[test]
fn test_entailments_scale_with_clause() {
    let graph = annotated(CATS_EAT_SOME_MICE);
    let clause = SentenceFragment::new(graph, 0.5, true);
    let entailer = ForwardEntailer::default().with_weights(eat_weights());
    let results = entailer.entailments_of(&clause).unwrap();
    assert_eq!(results.len(), 3);
    assert!((results[2].score - 0.35).abs() < 1e-9);
}

#[test]
fn test_custom_weights() {
    struct Never;

    impl DeletionWeights for Never {
        fn deletion_probability(&self, _: &DependencyGraph, _: &Edge, _: &[&Edge]) -> f64 {
            0.0
        }

        fn label_probability(&self, _: &str) -> f64 {
            1.0
        }
    }

    let graph = annotated(ALL_CATS_LONG_TAILS);
    let results = ForwardEntailer::default()
        .with_weights(Arc::new(Never))
        .search(&graph)
        .unwrap();
    assert!(results.is_empty());
}

// ============================================================================
// Property Tests
// ============================================================================

mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    const LABELS: &[&str] = &["amod", "advmod", "det", "nsubj", "dobj", "prep", "cc"];

    /// A random labeled tree: token `i > 0` hangs off some `j < i`.
    fn random_tree() -> impl Strategy<Value = DependencyGraph> {
        (1usize..10).prop_flat_map(|n| {
            (
                proptest::collection::vec(any::<prop::sample::Index>(), n - 1),
                proptest::collection::vec(any::<prop::sample::Index>(), n - 1),
            )
                .prop_map(move |(parents, labels)| {
                    let tokens = (0..n)
                        .map(|i| Token::new(i, &format!("w{i}")).with_tag("NN"))
                        .collect();
                    let mut graph = DependencyGraph::new(tokens);
                    graph.set_root(0);
                    for (i, (parent, label)) in parents.iter().zip(&labels).enumerate() {
                        let child = i + 1;
                        graph
                            .add_edge(Edge::new(parent.index(child), child, *label.get(LABELS)))
                            .unwrap();
                    }
                    graph
                })
        })
    }

    proptest! {
        #[test]
        fn results_are_distinct_subtrees(graph in random_tree()) {
            let results = ForwardEntailer::default().search(&graph).unwrap();
            let all = graph.vertices().collect::<std::collections::BTreeSet<_>>();
            let mut seen = std::collections::HashSet::new();
            for fragment in &results {
                prop_assert!(fragment.graph.is_tree());
                prop_assert!(fragment.score > 0.0 && fragment.score <= 1.0);
                let tokens = fragment.token_set();
                prop_assert!(tokens.contains(&0));
                prop_assert!(tokens.is_subset(&all) && tokens.len() < all.len());
                prop_assert!(seen.insert(tokens));
            }
        }
    }
}
