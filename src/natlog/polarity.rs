//! Per-token polarity: the stack of operator scopes enclosing a token.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::monotonicity::{self, Monotonicity, MonotonicityType};
use super::operator::OperatorSpec;
use super::relation::{NaturalLogicRelation, TruthValue};
use crate::graph::DependencyGraph;

/// Which argument of an operator a token falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgumentSide {
    /// The first (restrictor) argument.
    Subject,
    /// The second (body) argument.
    Object,
}

/// One enclosing operator scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeEntry {
    /// Monotonicity of the enclosing argument.
    pub monotonicity: Monotonicity,
    /// Additivity refinement of the enclosing argument.
    pub kind: MonotonicityType,
    /// Size of the enclosing argument span, used for ordering.
    pub span_len: usize,
    /// Which argument encloses the token.
    pub side: ArgumentSide,
}

/// Ordered scope stack of a token, innermost scope first.
///
/// An empty polarity is the identity context: relations project unchanged
/// and the token counts as upward-monotone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polarity {
    entries: Vec<ScopeEntry>,
}

impl Polarity {
    /// Build a polarity from its scope entries, in any order.
    #[must_use]
    pub fn new(mut entries: Vec<ScopeEntry>) -> Self {
        entries.sort_by_key(|entry| entry.span_len);
        Self { entries }
    }

    /// Scope entries, innermost first.
    #[must_use]
    pub fn entries(&self) -> &[ScopeEntry] {
        &self.entries
    }

    /// The innermost enclosing scope, if any.
    #[must_use]
    pub fn innermost(&self) -> Option<&ScopeEntry> {
        self.entries.first()
    }

    /// Whether the innermost scope is monotone (or there is none).
    #[must_use]
    pub fn is_upwards(&self) -> bool {
        self.innermost()
            .is_none_or(|entry| entry.monotonicity == Monotonicity::Monotone)
    }

    /// Whether the innermost scope is antitone.
    #[must_use]
    pub fn is_downwards(&self) -> bool {
        self.innermost()
            .is_some_and(|entry| entry.monotonicity == Monotonicity::Antitone)
    }

    /// Neither upwards nor downwards.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        !self.is_upwards() && !self.is_downwards()
    }

    /// Project a lexical relation through the innermost scope.
    #[must_use]
    pub fn project(&self, lexical: NaturalLogicRelation) -> NaturalLogicRelation {
        self.innermost().map_or(lexical, |entry| {
            monotonicity::project(lexical, entry.monotonicity, entry.kind)
        })
    }

    /// Whether a true premise stays true after a mutation with this lexical relation.
    #[must_use]
    pub fn maintains_truth(&self, lexical: NaturalLogicRelation) -> bool {
        self.project(lexical).maintains_truth()
    }

    /// Whether a true premise becomes false after a mutation with this lexical relation.
    #[must_use]
    pub fn negates_truth(&self, lexical: NaturalLogicRelation) -> bool {
        self.project(lexical).negates_truth()
    }

    /// Whether a false premise stays false after a mutation with this lexical relation.
    #[must_use]
    pub fn maintains_falsehood(&self, lexical: NaturalLogicRelation) -> bool {
        self.project(lexical).maintains_falsehood()
    }

    /// Whether a false premise becomes true after a mutation with this lexical relation.
    #[must_use]
    pub fn negates_falsehood(&self, lexical: NaturalLogicRelation) -> bool {
        self.project(lexical).negates_falsehood()
    }

    /// Truth of the mutated sentence given the premise truth.
    #[must_use]
    pub fn truth_after(&self, lexical: NaturalLogicRelation, premise_truth: bool) -> TruthValue {
        self.project(lexical).apply_to_truth_value(premise_truth)
    }
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_upwards() {
            f.write_str("up")
        } else if self.is_downwards() {
            f.write_str("down")
        } else {
            f.write_str("flat")
        }
    }
}

/// Polarity of every token given the operators detected in the sentence.
#[must_use]
pub fn compute_polarity(sentence_length: usize, operators: &[OperatorSpec]) -> Vec<Polarity> {
    (0..sentence_length)
        .map(|index| {
            let mut entries = Vec::new();
            for spec in operators {
                if spec.subject.contains(index) {
                    entries.push(ScopeEntry {
                        monotonicity: spec.instance.subject_monotonicity,
                        kind: spec.instance.subject_type,
                        span_len: spec.subject.len(),
                        side: ArgumentSide::Subject,
                    });
                }
                if spec.object.contains(index) {
                    entries.push(ScopeEntry {
                        monotonicity: spec.instance.object_monotonicity,
                        kind: spec.instance.object_type,
                        span_len: spec.object.len(),
                        side: ArgumentSide::Object,
                    });
                }
            }
            Polarity::new(entries)
        })
        .collect()
}

/// Write each token's polarity from the operator annotations already on the
/// graph's tokens.
pub fn annotate_polarity(graph: &mut DependencyGraph) {
    let operators: Vec<OperatorSpec> = graph
        .tokens()
        .iter()
        .filter_map(|token| token.operator)
        .map(|spec| (spec.head, spec))
        .collect::<BTreeMap<_, _>>()
        .into_values()
        .collect();
    let polarities = compute_polarity(graph.sentence_length(), &operators);
    for (token, polarity) in graph.tokens_mut().iter_mut().zip(polarities) {
        token.polarity = polarity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Span;
    use crate::natlog::Operator;
    use NaturalLogicRelation::*;

    fn spec(gloss: &str, quantifier: Span, subject: Span, object: Span) -> OperatorSpec {
        OperatorSpec {
            instance: Operator::from_gloss(gloss).unwrap(),
            head: quantifier.end.saturating_sub(1),
            quantifier,
            subject,
            object,
        }
    }

    #[test]
    fn test_empty_polarity_is_identity() {
        let polarity = Polarity::default();
        assert!(polarity.is_upwards());
        assert!(!polarity.is_downwards());
        assert!(!polarity.is_flat());
        for relation in NaturalLogicRelation::ALL {
            assert_eq!(polarity.project(relation), relation);
        }
    }

    #[test]
    fn test_universal_polarity() {
        // All cats have tails
        let all = spec("all", Span::new(0, 1), Span::new(1, 2), Span::new(2, 4));
        let polarities = compute_polarity(4, &[all]);
        assert_eq!(polarities[0], Polarity::default());
        assert!(polarities[1].is_downwards());
        assert!(polarities[2].is_upwards());
        assert!(polarities[3].is_upwards());
        assert_eq!(polarities[1].project(ForwardEntailment), ReverseEntailment);
        assert!(polarities[3].maintains_truth(ForwardEntailment));
        assert!(!polarities[1].maintains_truth(ForwardEntailment));
    }

    #[test]
    fn test_innermost_scope_first() {
        // Not all cats like no dogs: outer "not all", inner "no" on the object
        let outer = spec("not all", Span::new(0, 2), Span::new(2, 3), Span::new(3, 6));
        let inner = spec("no", Span::new(4, 5), Span::new(5, 6), Span::new(6, 6));
        let polarities = compute_polarity(6, &[outer, inner]);
        let dogs = &polarities[5];
        assert_eq!(dogs.entries().len(), 2);
        assert_eq!(dogs.entries()[0].span_len, 1);
        assert_eq!(dogs.entries()[1].span_len, 3);
        assert!(dogs.is_downwards());
        assert_eq!(dogs.entries()[0].side, ArgumentSide::Subject);
    }

    #[test]
    fn test_nonmonotone_is_flat() {
        let most = spec("most", Span::new(0, 1), Span::new(1, 2), Span::new(2, 4));
        let polarities = compute_polarity(4, &[most]);
        assert!(polarities[1].is_flat());
        assert_eq!(polarities[1].project(ForwardEntailment), Independence);
        assert_eq!(polarities[1].truth_after(ForwardEntailment, true), TruthValue::Unknown);
    }

    #[test]
    fn test_annotate_polarity_from_tokens() {
        let mut graph = DependencyGraph::from_conll(
            "1 No no DT 2 det
2 cats cat NNS 3 nsubj
3 like like VBP 0 root
4 dogs dog NNS 3 dobj",
        )
        .unwrap();
        crate::natlog::annotate_operators(&mut graph);
        annotate_polarity(&mut graph);
        let tokens = graph.tokens();
        assert!(tokens[1].polarity.is_downwards());
        assert!(tokens[3].polarity.is_downwards());
        assert!(tokens[0].polarity.is_upwards());
        assert_eq!(tokens[1].polarity.to_string(), "down");
    }
}
