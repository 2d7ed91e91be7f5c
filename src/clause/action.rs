//! Clause-splitting actions.
//!
//! Each action takes the search from the current root word across one
//! outgoing edge, recording the tree edits that carve the clause out.

use serde::{Deserialize, Serialize};

use super::search::SearchState;
use crate::graph::{DependencyGraph, Edge, EditLog, TreeEdit};

/// A way of splitting a clause off at a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseAction {
    /// Keep only the dependent's subtree.
    Simple,
    /// Keep the dependent's subtree and attach the governor below it as a
    /// passive subject.
    CloneRootAsNsubjpass,
    /// Keep the dependent's subtree and give it a copy of the nearest subject.
    CloneNsubj,
    /// Keep the dependent's subtree and give it a copy of the nearest object
    /// as its subject.
    CloneObj,
}

/// Relations whose clauses are split off unconditionally, with the actions
/// to try in order.
const HARD_SPLITS: &[(&str, &[ClauseAction])] = &[
    ("comp", &[ClauseAction::Simple]),
    ("ccomp", &[ClauseAction::Simple]),
    ("xcomp", &[ClauseAction::CloneObj, ClauseAction::CloneNsubj, ClauseAction::Simple]),
    ("vmod", &[ClauseAction::CloneNsubj, ClauseAction::Simple]),
    ("csubj", &[ClauseAction::CloneObj, ClauseAction::Simple]),
    ("advcl", &[ClauseAction::CloneNsubj, ClauseAction::Simple]),
    ("advcl:*", &[ClauseAction::CloneNsubj, ClauseAction::Simple]),
    ("conj:*", &[ClauseAction::CloneNsubj, ClauseAction::CloneObj, ClauseAction::Simple]),
    ("acl:relcl", &[ClauseAction::Simple]),
    ("parataxis", &[ClauseAction::Simple]),
];

/// Governors whose complement clauses are reported speech and never split.
pub const INDIRECT_SPEECH_LEMMAS: &[&str] = &[
    "report", "say", "told", "claim", "assert", "think", "believe", "suppose",
];

/// The forced action order for an edge label, if it is a hard split.
///
/// Labels are looked up exactly first, then by their `family:*` pattern.
#[must_use]
pub fn hard_split_order(relation: &str) -> Option<&'static [ClauseAction]> {
    let lookup = |key: &str| {
        HARD_SPLITS
            .iter()
            .find(|(label, _)| *label == key)
            .map(|(_, order)| *order)
    };
    lookup(relation).or_else(|| {
        relation
            .split_once(':')
            .and_then(|(family, _)| lookup(&format!("{family}:*")))
    })
}

/// The action space reordered so that `forced` actions come first, in the
/// given order, followed by the rest in their usual order.
#[must_use]
pub fn order_actions(forced: &[ClauseAction]) -> Vec<ClauseAction> {
    let mut ordered: Vec<ClauseAction> = forced.to_vec();
    ordered.extend(ClauseAction::ALL.iter().filter(|a| !forced.contains(a)));
    ordered
}

/// Whether a governor's lemma or word marks reported speech.
#[must_use]
pub fn is_indirect_speech(tree: &DependencyGraph, governor: usize) -> bool {
    tree.token(governor).is_some_and(|t| {
        INDIRECT_SPEECH_LEMMAS.contains(&t.lemma.as_str())
            || INDIRECT_SPEECH_LEMMAS.contains(&t.word.as_str())
    })
}

impl ClauseAction {
    /// The action space, in default order.
    pub const ALL: [Self; 4] = [
        Self::Simple,
        Self::CloneRootAsNsubjpass,
        Self::CloneNsubj,
        Self::CloneObj,
    ];

    /// Short name, used as the feature prefix.
    #[must_use]
    pub const fn signature(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::CloneRootAsNsubjpass => "clone_root_as_nsubjpass",
            Self::CloneNsubj => "clone_nsubj",
            Self::CloneObj => "clone_obj",
        }
    }

    /// Whether the action may be taken across `edge` of the original tree.
    #[must_use]
    pub fn prerequisites_met(self, tree: &DependencyGraph, edge: &Edge) -> bool {
        let tag = tree.token(edge.dependent).map_or('\0', crate::graph::Token::tag_initial);
        match self {
            Self::Simple => matches!(tag, 'V' | 'N' | 'J' | 'P' | 'D'),
            Self::CloneRootAsNsubjpass => {
                let mut outgoing = tree.outgoing(edge.governor).peekable();
                if outgoing.peek().is_none() {
                    return false;
                }
                outgoing
                    .filter(|e| !matches!(e.relation.as_str(), "nn" | "amod"))
                    .count()
                    <= 1
            }
            Self::CloneNsubj | Self::CloneObj => {
                matches!(tag, 'V' | 'N')
                    && !tree
                        .outgoing(edge.dependent)
                        .any(|grandchild| grandchild.relation.contains("subj"))
            }
        }
    }

    /// The state reached by taking this action across `edge` from `source`.
    ///
    /// `subject`, `object` and `preposition` are the anchors found at the
    /// current root word. Returns `None` when a cloning action has nothing
    /// to clone.
    #[must_use]
    pub fn apply_to(
        self,
        source: &SearchState,
        edge: &Edge,
        subject: Option<&Edge>,
        object: Option<&Edge>,
        preposition: Option<&Edge>,
    ) -> Option<SearchState> {
        let split = source
            .edits
            .then(edge, TreeEdit::DetachSubtree { keep: edge.clone() })
            .then(edge, TreeEdit::ResolveReferences);
        let inherited_subject = subject.or(source.subject.as_ref()).cloned();
        let distance_from_subj = if subject.is_some() {
            0
        } else {
            source.distance_from_subj + 1
        };
        let object_anchor = object.or(source.object.as_ref()).cloned();
        let preposition = preposition.or(source.preposition.as_ref()).cloned();

        let (edits, subject, distance_from_subj, object) = match self {
            Self::Simple => {
                let edits = if edge.relation.ends_with("comp") {
                    split.then(edge, TreeEdit::StripAuxMark)
                } else {
                    split
                };
                (edits, inherited_subject, distance_from_subj, object_anchor)
            }
            Self::CloneRootAsNsubjpass => (
                split.then(edge, attach(edge, "nsubjpass", edge.governor)),
                inherited_subject,
                distance_from_subj,
                object_anchor,
            ),
            Self::CloneNsubj => {
                let subject = subject.filter(|s| *s != edge)?;
                (
                    clone_as_subject(&split, edge, subject),
                    Some(subject.clone()),
                    0,
                    object_anchor,
                )
            }
            Self::CloneObj => {
                let object = object.filter(|o| *o != edge)?;
                (
                    clone_as_subject(&split, edge, object),
                    inherited_subject,
                    distance_from_subj,
                    Some(object.clone()),
                )
            }
        };

        Some(SearchState {
            edge: Some(edge.clone()),
            subject,
            distance_from_subj,
            object,
            preposition,
            edits,
            done: false,
        })
    }
}

fn attach(edge: &Edge, relation: &str, subtree_root: usize) -> TreeEdit {
    TreeEdit::AttachSubtree {
        governor: edge.dependent,
        relation: relation.to_string(),
        subtree_root,
        ignored: vec![edge.clone()],
    }
}

fn clone_as_subject(split: &EditLog, edge: &Edge, anchor: &Edge) -> EditLog {
    split
        .then(edge, attach(edge, "nsubj", anchor.dependent))
        .then(edge, TreeEdit::StripAuxMark)
}

impl std::fmt::Display for ClauseAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.signature())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> DependencyGraph {
        DependencyGraph::from_conll(
            "1 I I PRP 2 nsubj
2 want want VBP 0 root
3 to to TO 4 aux
4 sleep sleep VB 2 xcomp",
        )
        .unwrap()
    }

    #[test]
    fn test_hard_split_lookup() {
        assert_eq!(hard_split_order("ccomp"), Some(&[ClauseAction::Simple][..]));
        assert_eq!(
            hard_split_order("conj:and").unwrap()[0],
            ClauseAction::CloneNsubj
        );
        assert_eq!(hard_split_order("advcl:because").unwrap().len(), 2);
        assert_eq!(hard_split_order("xcomp").unwrap()[0], ClauseAction::CloneObj);
        assert!(hard_split_order("dobj").is_none());
        assert!(hard_split_order("nmod:in").is_none());
    }

    #[test]
    fn test_order_actions() {
        let order = order_actions(&[ClauseAction::CloneObj, ClauseAction::Simple]);
        assert_eq!(
            order,
            vec![
                ClauseAction::CloneObj,
                ClauseAction::Simple,
                ClauseAction::CloneRootAsNsubjpass,
                ClauseAction::CloneNsubj,
            ]
        );
    }

    #[test]
    fn test_prerequisites() {
        let tree = tree();
        let xcomp = Edge::new(1, 3, "xcomp");
        let nsubj = Edge::new(1, 0, "nsubj");
        assert!(ClauseAction::Simple.prerequisites_met(&tree, &xcomp));
        assert!(ClauseAction::CloneNsubj.prerequisites_met(&tree, &xcomp));
        // PRP is neither a verb nor a noun tag.
        assert!(ClauseAction::Simple.prerequisites_met(&tree, &nsubj));
        assert!(!ClauseAction::CloneNsubj.prerequisites_met(&tree, &nsubj));
        // "want" has two nontrivial dependents.
        assert!(!ClauseAction::CloneRootAsNsubjpass.prerequisites_met(&tree, &xcomp));
    }

    #[test]
    fn test_clone_nsubj_needs_distinct_subject() {
        let start = SearchState::start();
        let xcomp = Edge::new(1, 3, "xcomp");
        let nsubj = Edge::new(1, 0, "nsubj");
        assert!(
            ClauseAction::CloneNsubj
                .apply_to(&start, &nsubj, Some(&nsubj), None, None)
                .is_none()
        );
        let state = ClauseAction::CloneNsubj
            .apply_to(&start, &xcomp, Some(&nsubj), None, None)
            .unwrap();
        assert_eq!(state.subject.as_ref(), Some(&nsubj));
        assert_eq!(state.distance_from_subj, 0);
        assert_eq!(state.edits.len(), 4);
        assert!(!state.done);
        assert!(
            ClauseAction::CloneObj
                .apply_to(&start, &xcomp, Some(&nsubj), None, None)
                .is_none()
        );
    }

    #[test]
    fn test_simple_strips_aux_for_complements() {
        let start = SearchState::start();
        let xcomp = Edge::new(1, 3, "xcomp");
        let state = ClauseAction::Simple
            .apply_to(&start, &xcomp, None, None, None)
            .unwrap();
        let steps = state.edits.steps();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[2].1, &TreeEdit::StripAuxMark);
        assert_eq!(state.distance_from_subj, 1);
    }

    #[test]
    fn test_indirect_speech() {
        let tree = DependencyGraph::from_conll(
            "1 She she PRP 2 nsubj
2 said say VBD 0 root
3 it it PRP 4 nsubj
4 rains rain VBZ 2 ccomp",
        )
        .unwrap();
        assert!(is_indirect_speech(&tree, 1));
        assert!(!is_indirect_speech(&tree, 3));
    }
}
