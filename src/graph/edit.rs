//! Structural edits on dependency graphs.
//!
//! Search states never mutate a graph directly. They record a persistent
//! [`EditLog`] of [`TreeEdit`] commands which is replayed onto a fresh copy
//! of the original graph only when a result is materialized. The tree
//! invariant is checked after every replayed edit.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use super::{DependencyGraph, Edge, short_relation};
use crate::error::TreeInvariantViolation;

/// A single structural mutation of a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEdit {
    /// Keep only the subtree below `keep.dependent` and re-root the graph
    /// there. When `keep` is a conjunct, coordinating conjunctions hanging
    /// off the new root are dropped as well.
    DetachSubtree {
        /// The edge whose dependent becomes the new root.
        keep: Edge,
    },
    /// Copy a subtree of the original graph under `governor`.
    ///
    /// Nothing happens if `subtree_root` is already present or if the copied
    /// subtree would overlap vertices already in the graph.
    AttachSubtree {
        /// Vertex in the edited graph to attach under.
        governor: usize,
        /// Relation of the new arc.
        relation: String,
        /// Root of the subtree in the original graph.
        subtree_root: usize,
        /// Original arcs that must not be followed while copying.
        ignored: Vec<Edge>,
    },
    /// Remove a vertex together with its subtree.
    RemoveVertex {
        /// The vertex to remove.
        vertex: usize,
    },
    /// Replace relative pronouns by the noun phrase their `ref` arc points to.
    ResolveReferences,
    /// Remove `aux` and `mark` leaves attached to the root.
    StripAuxMark,
    /// Copy back the subtrees of extra arcs governed by the root.
    RestoreExtraEdges,
}

/// Read-only inputs shared by every edit of one search.
#[derive(Debug, Clone, Copy)]
pub struct EditContext<'a> {
    /// The cleaned graph the search started from.
    pub original: &'a DependencyGraph,
    /// Arcs removed by [`clean_tree`] from the input graph.
    pub extra_edges: &'a [Edge],
}

impl TreeEdit {
    /// Apply this edit in place.
    pub fn apply(&self, graph: &mut DependencyGraph, ctx: &EditContext<'_>) {
        match self {
            Self::DetachSubtree { keep } => detach_subtree(graph, keep),
            Self::AttachSubtree {
                governor,
                relation,
                subtree_root,
                ignored,
            } => attach_subtree(graph, ctx.original, *governor, relation, *subtree_root, ignored),
            Self::RemoveVertex { vertex } => {
                for below in graph.descendants(*vertex) {
                    graph.remove_vertex(below);
                }
            }
            Self::ResolveReferences => resolve_references(graph, ctx),
            Self::StripAuxMark => strip_aux_mark(graph),
            Self::RestoreExtraEdges => restore_extra_edges(graph, ctx),
        }
    }
}

fn detach_subtree(graph: &mut DependencyGraph, keep: &Edge) {
    let mut to_remove = Vec::new();
    let mut fringe = VecDeque::new();
    for root in graph.roots() {
        to_remove.push(root);
        fringe.extend(
            graph
                .outgoing(root)
                .filter(|e| *e != keep)
                .map(|e| e.dependent),
        );
    }
    let mut seen = BTreeSet::new();
    while let Some(node) = fringe.pop_front() {
        if !seen.insert(node) {
            continue;
        }
        to_remove.push(node);
        fringe.extend(
            graph
                .outgoing(node)
                .filter(|e| *e != keep)
                .map(|e| e.dependent),
        );
    }
    if !graph.contains_vertex(keep.dependent) || to_remove.contains(&keep.dependent) {
        tracing::warn!(edge = %keep, "kept edge is no longer below the root; leaving graph as is");
        return;
    }
    if keep.relation.starts_with("conj") {
        let coordinators: Vec<usize> = graph
            .outgoing(keep.dependent)
            .filter(|e| e.relation == "cc")
            .map(|e| e.dependent)
            .collect();
        for cc in coordinators {
            to_remove.extend(graph.descendants(cc));
        }
    }
    for vertex in to_remove {
        graph.remove_vertex(vertex);
    }
    graph.set_root(keep.dependent);
}

fn attach_subtree(
    graph: &mut DependencyGraph,
    original: &DependencyGraph,
    governor: usize,
    relation: &str,
    subtree_root: usize,
    ignored: &[Edge],
) {
    if graph.contains_vertex(subtree_root) || !graph.contains_vertex(governor) {
        return;
    }
    let mut words = Vec::new();
    let mut edges = Vec::new();
    let mut fringe = VecDeque::from([subtree_root]);
    while let Some(node) = fringe.pop_front() {
        if node != subtree_root {
            words.push(node);
        }
        for edge in original.outgoing(node).filter(|e| !ignored.contains(e)) {
            if graph.contains_vertex(edge.dependent) || edge.dependent == subtree_root {
                tracing::debug!(%edge, "skipping subtree attachment that overlaps the graph");
                return;
            }
            edges.push(edge.clone());
            fringe.push_back(edge.dependent);
        }
    }

    let mut attached = Vec::with_capacity(edges.len() + 1);
    attached.push(Edge::new(governor, subtree_root, relation));
    attached.extend(edges);
    let vertices: Vec<usize> = std::iter::once(subtree_root).chain(words).collect();
    if let Some(&vertex) = vertices.iter().find(|&&v| v >= graph.sentence_length()) {
        tracing::warn!(vertex, "subtree vertex is outside the sentence; skipping attachment");
        return;
    }
    for vertex in vertices {
        if let Err(err) = graph.add_vertex(vertex) {
            tracing::warn!(%err, "failed to add attached vertex");
            return;
        }
    }
    for edge in attached {
        if let Err(err) = graph.add_edge(edge) {
            tracing::warn!(%err, "failed to add attached edge");
        }
    }
}

fn resolve_references(graph: &mut DependencyGraph, ctx: &EditContext<'_>) {
    let replacements: Vec<(usize, usize)> = graph
        .vertices()
        .filter_map(|vertex| {
            ctx.extra_edges
                .iter()
                .find(|e| {
                    e.dependent == vertex
                        && e.relation == "ref"
                        && !graph.contains_vertex(e.governor)
                })
                .map(|e| (vertex, e.governor))
        })
        .collect();
    let ignored: Vec<Edge> = graph
        .first_root()
        .map(|root| ctx.original.incoming(root).cloned().collect())
        .unwrap_or_default();
    for (pronoun, antecedent) in replacements {
        let Some(incoming) = graph.parent_edge(pronoun).cloned() else {
            continue;
        };
        for below in graph.descendants(pronoun) {
            graph.remove_vertex(below);
        }
        attach_subtree(
            graph,
            ctx.original,
            incoming.governor,
            &incoming.relation,
            antecedent,
            &ignored,
        );
    }
}

fn strip_aux_mark(graph: &mut DependencyGraph) {
    let Some(root) = graph.first_root() else {
        return;
    };
    let to_clean: Vec<usize> = graph
        .outgoing(root)
        .filter(|e| e.relation == "aux" || e.relation == "mark")
        .map(|e| e.dependent)
        .filter(|&dep| graph.is_leaf(dep))
        .collect();
    for vertex in to_clean {
        graph.remove_vertex(vertex);
    }
}

fn restore_extra_edges(graph: &mut DependencyGraph, ctx: &EditContext<'_>) {
    let roots: Vec<usize> = graph.roots().collect();
    for root in roots {
        let ignored: Vec<Edge> = ctx.original.incoming(root).cloned().collect();
        for extra in ctx.extra_edges.iter().filter(|e| e.governor == root) {
            attach_subtree(
                graph,
                ctx.original,
                root,
                &extra.relation,
                extra.dependent,
                &ignored,
            );
        }
    }
}

#[derive(Debug)]
struct EditNode {
    edge: Edge,
    edit: TreeEdit,
    parent: Option<Arc<EditNode>>,
}

/// A persistent, append-only list of edits.
///
/// Appending returns a new log sharing its prefix with the old one, so
/// sibling search states share the edits of their common ancestors.
#[derive(Debug, Clone, Default)]
pub struct EditLog {
    head: Option<Arc<EditNode>>,
    len: usize,
}

impl EditLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A new log with `edit`, triggered by `edge`, appended.
    #[must_use]
    pub fn then(&self, edge: &Edge, edit: TreeEdit) -> Self {
        Self {
            head: Some(Arc::new(EditNode {
                edge: edge.clone(),
                edit,
                parent: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    /// Number of edits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The edits, oldest first, each with the edge that triggered it.
    #[must_use]
    pub fn steps(&self) -> Vec<(&Edge, &TreeEdit)> {
        let mut steps = Vec::with_capacity(self.len);
        let mut node = self.head.as_deref();
        while let Some(current) = node {
            steps.push((&current.edge, &current.edit));
            node = current.parent.as_deref();
        }
        steps.reverse();
        steps
    }

    /// Replay every edit onto `graph`, checking the tree invariant after each.
    ///
    /// # Errors
    ///
    /// Returns a [`TreeInvariantViolation`] naming the triggering edge if an
    /// edit leaves `graph` in a non-tree state.
    pub fn apply(
        &self,
        graph: &mut DependencyGraph,
        ctx: &EditContext<'_>,
    ) -> Result<(), TreeInvariantViolation> {
        for (edge, edit) in self.steps() {
            edit.apply(graph, ctx);
            if !graph.is_tree() {
                return Err(TreeInvariantViolation {
                    edge: edge.clone(),
                    graph: graph.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Force a graph into tree shape, returning the arcs that were removed.
///
/// Punctuation leaves and self loops are dropped. Where a vertex has several
/// parents a single arc is kept, preferring basic arcs and preferring a
/// subject or object arc over a conjunct arc. Vertices unreachable from the
/// first root are removed.
pub fn clean_tree(graph: &mut DependencyGraph) -> Vec<Edge> {
    let punctuation: Vec<usize> = graph
        .vertices()
        .filter(|&v| {
            graph
                .token(v)
                .is_some_and(|t| matches!(t.tag_initial(), '.' | ',' | '(' | ')' | ':'))
                && graph.is_leaf(v)
                && !graph.roots().any(|r| r == v)
        })
        .collect();
    for vertex in punctuation {
        graph.remove_vertex(vertex);
    }
    let self_loops: Vec<Edge> = graph
        .edges()
        .iter()
        .filter(|e| e.governor == e.dependent)
        .cloned()
        .collect();
    for edge in &self_loops {
        graph.remove_edge(edge);
    }

    let mut removed = Vec::new();
    let vertices: Vec<usize> = graph.vertices().collect();
    for vertex in vertices {
        let incoming: Vec<Edge> = graph.incoming(vertex).cloned().collect();
        if incoming.len() <= 1 {
            continue;
        }
        let mut keep = &incoming[0];
        for candidate in &incoming[1..] {
            let keep_is_conj = keep.relation.starts_with("conj");
            let prefer_argument = keep_is_conj && is_argument(&candidate.relation);
            let prefer_basic = !candidate.extra
                && keep.extra
                && !(candidate.relation.starts_with("conj") && is_argument(&keep.relation));
            if prefer_argument || prefer_basic {
                keep = candidate;
            }
        }
        let keep = keep.clone();
        for edge in incoming.into_iter().filter(|e| *e != keep) {
            graph.remove_edge(&edge);
            removed.push(edge);
        }
    }

    let roots: Vec<usize> = graph.roots().collect();
    for root in roots {
        let into_root: Vec<Edge> = graph.incoming(root).cloned().collect();
        for edge in into_root {
            graph.remove_edge(&edge);
            removed.push(edge);
        }
    }
    if let Some(root) = graph.first_root() {
        let extra_roots: Vec<usize> = graph.roots().filter(|&r| r != root).collect();
        for other in extra_roots {
            for vertex in graph.descendants(other) {
                graph.remove_vertex(vertex);
            }
        }
        let reachable = graph.descendants(root);
        let unreachable: Vec<usize> = graph.vertices().filter(|v| !reachable.contains(v)).collect();
        for vertex in unreachable {
            graph.remove_vertex(vertex);
        }
    } else {
        let all: Vec<usize> = graph.vertices().collect();
        for vertex in all {
            graph.remove_vertex(vertex);
        }
    }

    let governors: Vec<usize> = graph.vertices().collect();
    for governor in governors {
        let objects = graph
            .outgoing(governor)
            .filter(|e| e.relation == "obj" || e.relation == "dobj")
            .count();
        let that_edge = graph
            .outgoing(governor)
            .find(|e| {
                graph
                    .token(e.dependent)
                    .is_some_and(|t| t.word.eq_ignore_ascii_case("that"))
            })
            .cloned();
        if objects > 1
            && let Some(that_edge) = that_edge
        {
            graph.relabel_edge(&that_edge, "mark");
        }
    }

    removed
}

fn is_argument(relation: &str) -> bool {
    let short = short_relation(relation);
    short.ends_with("subj") || short.ends_with("obj")
}
