//! Quantifier detection and operator scope computation.
//!
//! Operators are found by matching a fixed family of structural patterns
//! against the dependency graph. Each match proposes a quantifier head and,
//! where the pattern provides them, subject and object anchors. The head is
//! validated against the [`Operator`] catalog by gloss, and the argument
//! spans are computed from the anchors' yields.

use std::collections::{BTreeMap, VecDeque};

use super::operator::{NUMBER_GLOSS, Operator, OperatorSpec};
use crate::graph::{DependencyGraph, Edge, Span, short_relation};

/// How far back from a quantifier head to look for the start of its phrase.
pub const BACKWARD_WINDOW: usize = 10;

/// How far past a numeric head to look for the end of its phrase.
pub const NUMERIC_FORWARD_WINDOW: usize = 1;

/// One pattern match over the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeMatch {
    /// The word the operator's arguments hang from.
    pub pivot: usize,
    /// The token where the quantifier was matched.
    pub quantifier: usize,
    /// Subject anchor, if the pattern has one.
    pub subject: Option<usize>,
    /// Object anchor, if the pattern has one.
    pub object: Option<usize>,
    /// Whether the subject is a proper noun acting as its own quantifier.
    pub proper_subject: bool,
}

fn is_det(label: &str) -> bool {
    matches!(
        label,
        "det" | "predet" | "det:predet" | "amod" | "advmod" | "neg" | "num" | "nummod" | "nn" | "compound"
    )
}

fn is_gen_subj(label: &str) -> bool {
    matches!(label, "nsubj" | "isubj" | "nsubjpass" | "isubjpass" | "nsubj:pass")
}

fn is_gen_obj(label: &str) -> bool {
    matches!(label, "dobj" | "iobj" | "obj" | "xcomp" | "advcl" | "acomp")
}

fn is_gen_cop(label: &str) -> bool {
    matches!(label, "cop" | "aux" | "auxpass" | "aux:pass")
}

fn is_gen_clause(label: &str) -> bool {
    matches!(label, "prep" | "rcmod" | "acl:relcl") || short_relation(label) == "nmod"
}

fn is_gen_prep(label: &str) -> bool {
    matches!(label, "prep" | "advcl" | "ccomp" | "advmod")
        || matches!(short_relation(label), "nmod" | "obl")
}

fn is_prep(label: &str) -> bool {
    label == "prep" || short_relation(label) == "nmod"
}

fn is_proper_noun_subject_object(label: &str) -> bool {
    matches!(label, "prep" | "ccomp" | "dobj" | "iobj" | "obj")
        || matches!(short_relation(label), "nmod" | "obl")
}

struct Matcher<'a> {
    graph: &'a DependencyGraph,
    matches: Vec<ScopeMatch>,
}

impl Matcher<'_> {
    fn vertices(&self) -> Vec<usize> {
        self.graph.vertices().collect()
    }

    fn children(&self, vertex: usize, label: fn(&str) -> bool) -> Vec<usize> {
        self.graph
            .outgoing(vertex)
            .filter(|e| !e.extra && label(&e.relation))
            .map(|e| e.dependent)
            .collect()
    }

    fn negations(&self, vertex: usize) -> Vec<usize> {
        self.graph
            .outgoing(vertex)
            .filter(|e| !e.extra && self.is_negation(e))
            .map(|e| e.dependent)
            .collect()
    }

    fn is_negation(&self, edge: &Edge) -> bool {
        edge.relation == "neg"
            || edge.relation == "advmod"
                && self
                    .graph
                    .token(edge.dependent)
                    .is_some_and(|t| matches!(t.lemma.to_lowercase().as_str(), "not" | "n't"))
    }

    fn is_quantifier(&self, vertex: usize) -> bool {
        self.graph
            .token(vertex)
            .is_some_and(|t| t.is_cardinal() || Operator::is_quantifier_head(&t.lemma))
    }

    fn is_verb(&self, vertex: usize) -> bool {
        self.graph.token(vertex).is_some_and(|t| t.tag_initial() == 'V')
    }

    fn is_proper_noun(&self, vertex: usize) -> bool {
        self.graph
            .token(vertex)
            .is_some_and(|t| t.tag == "NNP" || t.tag == "PROPN")
    }

    fn lemma_is(&self, vertex: usize, lemma: &str) -> bool {
        self.graph
            .token(vertex)
            .is_some_and(|t| t.lemma.eq_ignore_ascii_case(lemma))
    }

    /// Quantifiers reachable from `vertex` through determiner-like arcs.
    fn determiner_quantifiers(&self, vertex: usize) -> Vec<usize> {
        let mut found = Vec::new();
        let mut fringe = VecDeque::from(self.children(vertex, is_det));
        let mut seen = std::collections::BTreeSet::new();
        while let Some(node) = fringe.pop_front() {
            if !seen.insert(node) {
                continue;
            }
            if self.is_quantifier(node) {
                found.push(node);
            }
            fringe.extend(self.children(node, is_det));
        }
        found
    }

    fn push(&mut self, pivot: usize, quantifier: usize, subject: Option<usize>, object: Option<usize>) {
        self.matches.push(ScopeMatch {
            pivot,
            quantifier,
            subject,
            object,
            proper_subject: false,
        });
    }

    /// `pivot >subj (subject >>det Q) >rel object`
    fn subject_determiner(&mut self, verb_only: bool, object_label: fn(&str) -> bool) {
        for pivot in self.vertices() {
            if verb_only && !self.is_verb(pivot) {
                continue;
            }
            for subject in self.children(pivot, is_gen_subj) {
                for quantifier in self.determiner_quantifiers(subject) {
                    for object in self.children(pivot, object_label) {
                        self.push(pivot, quantifier, Some(subject), Some(object));
                    }
                }
            }
        }
    }

    /// `object >subj (subject >>det Q) >cop pivot`
    fn copula(&mut self) {
        for object in self.vertices() {
            for subject in self.children(object, is_gen_subj) {
                for quantifier in self.determiner_quantifiers(subject) {
                    for pivot in self.children(object, is_gen_cop) {
                        self.push(pivot, quantifier, Some(subject), Some(object));
                    }
                }
            }
        }
    }

    /// `pivot >subj (Q >rel subject) >obj object`
    fn quantifier_clause(
        &mut self,
        verb_only: bool,
        head_arc: fn(&str) -> bool,
        clause_arc: fn(&str) -> bool,
        object_label: fn(&str) -> bool,
    ) {
        for pivot in self.vertices() {
            if verb_only && !self.is_verb(pivot) {
                continue;
            }
            for quantifier in self.children(pivot, head_arc) {
                if !self.is_quantifier(quantifier) {
                    continue;
                }
                for subject in self.children(quantifier, clause_arc) {
                    for object in self.children(pivot, object_label) {
                        self.push(pivot, quantifier, Some(subject), Some(object));
                    }
                }
            }
        }
    }

    fn proper_subjects(&self, pivot: usize) -> Vec<usize> {
        self.children(pivot, is_gen_subj)
            .into_iter()
            .filter(|&s| self.is_proper_noun(s))
            .collect()
    }

    /// Proper-noun subjects act as their own (implicit) quantifier.
    fn proper_noun(&mut self) {
        let mut found = Vec::new();
        for pivot in self.vertices() {
            for subject in self.proper_subjects(pivot) {
                for object in self.children(pivot, is_gen_obj) {
                    found.push((pivot, subject, object));
                }
            }
        }
        for pivot in self.vertices() {
            if !self.is_verb(pivot) {
                continue;
            }
            for subject in self.proper_subjects(pivot) {
                for object in self.children(pivot, is_proper_noun_subject_object) {
                    found.push((pivot, subject, object));
                }
            }
        }
        for object in self.vertices() {
            for subject in self.proper_subjects(object) {
                for pivot in self.children(object, is_gen_cop) {
                    found.push((pivot, subject, object));
                }
            }
        }
        self.matches
            .extend(found.into_iter().map(|(pivot, subject, object)| ScopeMatch {
                pivot,
                quantifier: subject,
                subject: Some(subject),
                object: Some(object),
                proper_subject: true,
            }));
    }

    /// `pivot >neg Q >obj object` and `pivot >neg {} >prep object`
    fn negation(&mut self) {
        for pivot in self.vertices() {
            for quantifier in self.negations(pivot) {
                if self.is_quantifier(quantifier) {
                    for object in self.children(pivot, is_gen_obj) {
                        self.push(pivot, quantifier, None, Some(object));
                    }
                }
            }
        }
        for pivot in self.vertices() {
            for quantifier in self.negations(pivot) {
                for object in self.children(pivot, is_gen_prep) {
                    self.push(pivot, quantifier, None, Some(object));
                }
            }
        }
    }

    /// `pivot >dep {lemma:either}=Q >subj subject >obj object`
    fn either(&mut self) {
        for pivot in self.vertices() {
            if !self.is_verb(pivot) {
                continue;
            }
            for quantifier in self.children(pivot, |l| l == "dep") {
                if !self.lemma_is(quantifier, "either") {
                    continue;
                }
                for subject in self.children(pivot, is_gen_subj) {
                    for object in self.children(pivot, is_gen_obj) {
                        self.push(pivot, quantifier, Some(subject), Some(object));
                    }
                }
            }
        }
    }

    /// `Q >subj pivot >expl {}` for existential "there be".
    fn existential(&mut self) {
        for quantifier in self.vertices() {
            if self.children(quantifier, |l| l == "expl").is_empty() {
                continue;
            }
            for pivot in self.children(quantifier, is_gen_subj) {
                self.push(pivot, quantifier, None, None);
            }
        }
    }
}

/// Run every scope pattern over the graph, in priority order.
#[must_use]
pub fn find_scope_matches(graph: &DependencyGraph) -> Vec<ScopeMatch> {
    let mut matcher = Matcher {
        graph,
        matches: Vec::new(),
    };
    matcher.subject_determiner(false, is_gen_obj);
    matcher.subject_determiner(true, is_gen_prep);
    matcher.copula();
    matcher.quantifier_clause(false, is_gen_subj, is_gen_clause, is_gen_obj);
    matcher.quantifier_clause(true, is_gen_subj, is_gen_clause, is_gen_prep);
    matcher.proper_noun();
    matcher.negation();
    matcher.quantifier_clause(true, is_gen_subj, is_prep, is_gen_obj);
    matcher.quantifier_clause(true, |l| l == "dep", is_prep, is_gen_subj);
    matcher.either();
    matcher.existential();
    matcher.matches
}

/// Gloss of a token for catalog matching.
fn gloss_of(graph: &DependencyGraph, index: usize) -> String {
    graph.token(index).map_or_else(String::new, |t| {
        if t.is_cardinal() {
            NUMBER_GLOSS.to_string()
        } else {
            t.lemma.to_lowercase()
        }
    })
}

/// Find the catalog operator whose phrase ends at (or, for numbers, just
/// after) `head`, returning it with its token span. The longest match wins.
#[must_use]
pub fn validate_quantifier(
    graph: &DependencyGraph,
    head: usize,
    unary: bool,
) -> Option<(&'static Operator, Span)> {
    let length = graph.sentence_length();
    let is_number = graph.token(head).is_some_and(crate::graph::Token::is_cardinal);
    let forward = if is_number { NUMERIC_FORWARD_WINDOW } else { 0 };
    let lookup = if unary {
        Operator::unary_from_gloss
    } else {
        Operator::from_gloss
    };

    let mut best: Option<(&'static Operator, Span)> = None;
    for end in (head + 1)..=(head + 1 + forward).min(length) {
        let start_min = end.saturating_sub(BACKWARD_WINDOW);
        for start in start_min..=head {
            let gloss = (start..end)
                .map(|i| gloss_of(graph, i))
                .collect::<Vec<_>>()
                .join(" ");
            if let Some(op) = lookup(&gloss) {
                let span = Span::new(start, end);
                if best.is_none_or(|(_, b)| span.len() > b.len()) {
                    best = Some((op, span));
                }
                break;
            }
        }
    }
    best
}

/// Token span reachable from `root`, following only `valid` arcs on the
/// first step (all arcs when `None`) and never punctuation.
fn generalized_subtree_span(graph: &DependencyGraph, root: usize, valid: Option<&[&str]>) -> Span {
    let mut min = root;
    let mut max = root;
    let mut fringe: VecDeque<usize> = graph
        .outgoing(root)
        .filter(|e| !e.extra && e.relation != "punct")
        .filter(|e| valid.is_none_or(|arcs| arcs.contains(&e.short_relation())))
        .map(|e| e.dependent)
        .collect();
    let mut seen = std::collections::BTreeSet::from([root]);
    while let Some(node) = fringe.pop_front() {
        if !seen.insert(node) {
            continue;
        }
        min = min.min(node);
        max = max.max(node);
        fringe.extend(
            graph
                .outgoing(node)
                .filter(|e| !e.extra && e.relation != "punct" && e.dependent != node)
                .map(|e| e.dependent),
        );
    }
    Span::new(min, max + 1)
}

fn subtree_span(graph: &DependencyGraph, root: usize) -> Span {
    generalized_subtree_span(graph, root, None)
}

const MODIFIER_ARCS: &[&str] = &["aux", "prep"];
const NOUN_COMPONENT_ARCS: &[&str] = &["nn", "compound"];
const PIVOT_PREPOSITION_ARCS: &[&str] = &["prep", "nmod", "obl"];

/// Compute the subject and object spans of an operator occurrence.
///
/// - With neither anchor, the subject is the pivot's yield minus the
///   quantifier and there is no object.
/// - With only an object, the subject is the object's yield extended by the
///   pivot's prepositional material, and the object is empty right after it.
/// - With both, the subject is the subject's yield minus the quantifier, and
///   the object is the object's yield plus the pivot's auxiliary and
///   prepositional material, minus the subject's yield.
#[must_use]
pub fn compute_scope(
    graph: &DependencyGraph,
    pivot: usize,
    quantifier: Span,
    subject: Option<usize>,
    proper_subject: bool,
    object: Option<usize>,
) -> (Span, Span) {
    match (subject, object) {
        (None, None) => {
            let subject_span = subtree_span(graph, pivot).exclude(quantifier);
            (subject_span, Span::empty_at(subject_span.end))
        }
        (None, Some(object)) => {
            let subject_span = subtree_span(graph, object).include(generalized_subtree_span(
                graph,
                pivot,
                Some(PIVOT_PREPOSITION_ARCS),
            ));
            (subject_span, Span::empty_at(subject_span.end))
        }
        (Some(subject), object) => {
            let subject_subtree = if proper_subject {
                generalized_subtree_span(graph, subject, Some(NOUN_COMPONENT_ARCS))
            } else {
                subtree_span(graph, subject)
            };
            let subject_span = subject_subtree.exclude(quantifier);
            let object_span = match object {
                Some(object) => subtree_span(graph, object)
                    .include(generalized_subtree_span(graph, pivot, Some(MODIFIER_ARCS)))
                    .exclude(subject_subtree),
                None => Span::empty_at(subject_span.end),
            };
            (subject_span, object_span)
        }
    }
}

/// Detect every operator in the sentence and attach each to its head token.
///
/// Overlapping detections are resolved in favour of the longer quantifier:
/// tokens inside a longer quantifier phrase lose any annotation of their
/// own. Returns the surviving operators ordered by head.
pub fn annotate_operators(graph: &mut DependencyGraph) -> Vec<OperatorSpec> {
    let mut by_head: BTreeMap<usize, OperatorSpec> = BTreeMap::new();

    for found in find_scope_matches(graph) {
        let (instance, quantifier, head) = if found.proper_subject {
            (
                Operator::implicit_named_entity(),
                Span::empty_at(found.quantifier),
                found.quantifier,
            )
        } else {
            let Some((instance, span)) =
                validate_quantifier(graph, found.quantifier, found.subject.is_none())
            else {
                continue;
            };
            (instance, span, span.end - 1)
        };
        let (subject, object) = compute_scope(
            graph,
            found.pivot,
            quantifier,
            found.subject,
            found.proper_subject,
            found.object,
        );
        let spec = OperatorSpec {
            instance,
            head,
            quantifier,
            subject,
            object,
        };
        tracing::debug!(operator = %instance, head, %subject, %object, "matched operator");

        let merged = match by_head.get(&head) {
            Some(old) if old.quantifier_len() >= spec.quantifier_len() && old.instance == spec.instance => {
                old.merge(&spec)
            }
            _ => spec,
        };
        by_head.insert(head, merged);
    }

    let mut ordered: Vec<OperatorSpec> = by_head.values().copied().collect();
    ordered.sort_by(|a, b| b.quantifier_len().cmp(&a.quantifier_len()).then(a.head.cmp(&b.head)));
    for spec in ordered {
        if !by_head.contains_key(&spec.head) {
            continue;
        }
        for index in spec.quantifier.start..spec.quantifier.end {
            if index != spec.head {
                by_head.remove(&index);
            }
        }
    }

    for token in graph.tokens_mut() {
        token.operator = by_head.get(&token.index).copied();
    }
    by_head.into_values().collect()
}
