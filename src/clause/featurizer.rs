//! The default clause-transition featurizer.

use super::action::ClauseAction;
use super::search::SearchState;
use super::traits::{Featurizer, Features};
use crate::graph::{DependencyGraph, Edge};

/// Standard sparse features of a transition: the edge taken, where the
/// search came from, the neighbors of the edge's endpoints and their tags.
/// Every feature name is prefixed with the action signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFeaturizer;

fn short_name(edge: Option<&Edge>) -> &str {
    edge.map_or("root", Edge::short_relation)
}

fn tag(tree: &DependencyGraph, vertex: usize) -> &str {
    tree.token(vertex).map_or("", |t| t.tag.as_str())
}

fn neighbor_count(count: usize) -> String {
    if count < 3 {
        count.to_string()
    } else {
        ">2".to_string()
    }
}

impl Featurizer for DefaultFeaturizer {
    fn featurize(
        &self,
        tree: &DependencyGraph,
        from: &SearchState,
        action: ClauseAction,
        to: &SearchState,
    ) -> Features {
        let signature = action.signature();
        let edge_rel = to.edge.as_ref().map_or("root", |e| e.relation.as_str());
        let edge_short = short_name(to.edge.as_ref());

        let mut feats = Features::new();
        let mut add = |name: String| *feats.entry(format!("{signature}&{name}")).or_insert(0.0) += 1.0;

        add(format!("edge:{edge_rel}"));
        add(format!("edge_type:{edge_short}"));

        if let Some(last) = &from.edge {
            add("not_root".to_string());
            add(format!("last_edge:{}", last.short_relation()));
        } else {
            let root_tag = tree.first_root().map_or("", |r| tag(tree, r));
            add("at_root".to_string());
            add(format!("at_root&root_pos:{root_tag}"));
        }

        if let Some(edge) = &to.edge {
            let mut parent_has_subj = false;
            let mut parent_has_obj = false;
            for neighbor in tree.outgoing(edge.governor).filter(|n| *n != edge) {
                let rel = &neighbor.relation;
                parent_has_subj |= rel.contains("subj");
                parent_has_obj |= rel.contains("obj");
                add(format!("parent_neighbor:{rel}"));
                add(format!("edge_type:{edge_short}&parent_neighbor:{rel}"));
            }

            let mut child_has_subj = false;
            let mut child_has_obj = false;
            let mut child_count = 0;
            for neighbor in tree.outgoing(edge.dependent) {
                let rel = &neighbor.relation;
                child_has_subj |= rel.contains("subj");
                child_has_obj |= rel.contains("obj");
                child_count += 1;
                add(format!("child_neighbor:{rel}"));
                add(format!("edge_type:{edge_short}&child_neighbor:{rel}"));
            }
            let count = neighbor_count(child_count);
            add(format!("child_neighbor_count:{count}"));
            add(format!("edge_type:{edge_short}&child_neighbor_count:{count}"));

            add(format!("parent_neighbor_subj:{parent_has_subj}"));
            add(format!("parent_neighbor_obj:{parent_has_obj}"));
            add(format!("child_neighbor_subj:{child_has_subj}"));
            add(format!("child_neighbor_obj:{child_has_obj}"));

            let gov = tag(tree, edge.governor);
            let dep = tag(tree, edge.dependent);
            add(format!("parent_pos:{gov}"));
            add(format!("child_pos:{dep}"));
            add(format!("pos_signature:{gov}_{dep}"));
            add(format!("edge_type:{edge_short}&pos_signature:{gov}_{dep}"));
        }
        feats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAID: &str = "\
1 I I PRP 2 nsubj
2 said say VBD 0 root
3 cats cat NNS 4 nsubj
4 eat eat VBP 2 ccomp
5 mice mouse NNS 4 dobj";

    #[test]
    fn test_root_transition_features() {
        let tree = DependencyGraph::from_conll(SAID).unwrap();
        let start = SearchState::start();
        let edge = Edge::new(1, 3, "ccomp");
        let next = ClauseAction::Simple
            .apply_to(&start, &edge, None, None, None)
            .unwrap();
        let feats = DefaultFeaturizer.featurize(&tree, &start, ClauseAction::Simple, &next);

        for name in [
            "simple&edge:ccomp",
            "simple&edge_type:ccomp",
            "simple&at_root",
            "simple&at_root&root_pos:VBD",
            "simple&parent_neighbor:nsubj",
            "simple&edge_type:ccomp&parent_neighbor:nsubj",
            "simple&child_neighbor:nsubj",
            "simple&child_neighbor:dobj",
            "simple&child_neighbor_count:2",
            "simple&parent_neighbor_subj:true",
            "simple&parent_neighbor_obj:false",
            "simple&child_neighbor_subj:true",
            "simple&child_neighbor_obj:true",
            "simple&pos_signature:VBD_VBP",
        ] {
            assert_eq!(feats.get(name), Some(&1.0), "missing {name}");
        }
        assert!(!feats.contains_key("simple&not_root"));
    }

    #[test]
    fn test_nested_transition_features() {
        let tree = DependencyGraph::from_conll(SAID).unwrap();
        let ccomp = Edge::new(1, 3, "ccomp");
        let dobj = Edge::new(3, 4, "dobj");
        let first = ClauseAction::Simple
            .apply_to(&SearchState::start(), &ccomp, None, None, None)
            .unwrap();
        let second = ClauseAction::Simple
            .apply_to(&first, &dobj, None, None, None)
            .unwrap();
        let feats = DefaultFeaturizer.featurize(&tree, &first, ClauseAction::Simple, &second);
        assert_eq!(feats.get("simple&not_root"), Some(&1.0));
        assert_eq!(feats.get("simple&last_edge:ccomp"), Some(&1.0));
        assert_eq!(feats.get("simple&child_neighbor_count:0"), Some(&1.0));
        assert!(!feats.contains_key("simple&at_root"));
    }
}
