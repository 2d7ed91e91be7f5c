//! Labeled dependency graphs over an indexed token sequence.
//!
//! A [`DependencyGraph`] shares its token annotations between copies and
//! owns only its vertex set, edge list and roots, so the search engines can
//! clone a graph per candidate without duplicating the sentence.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, VecDeque};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::natlog::{OperatorSpec, Polarity};

pub mod edit;


pub use edit::{EditContext, EditLog, TreeEdit, clean_tree};

/// Part-of-speech classes used by the natural-logic components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PosTag {
    /// Common noun.
    Noun,
    /// Proper noun.
    ProperNoun,
    /// Verb.
    Verb,
    /// Adjective.
    Adjective,
    /// Adverb.
    Adverb,
    /// Pronoun.
    Pronoun,
    /// Determiner.
    Determiner,
    /// Preposition.
    Preposition,
    /// Conjunction.
    Conjunction,
    /// Auxiliary or modal verb.
    Auxiliary,
    /// Particle.
    Particle,
    /// Punctuation.
    Punctuation,
    /// Cardinal number.
    Number,
    /// Symbol.
    Symbol,
    /// Unknown.
    Unknown,
}

impl PosTag {
    /// Parse a Penn Treebank or Universal POS tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_uppercase().as_str() {
            "NN" | "NNS" | "NOUN" => Self::Noun,
            "NNP" | "NNPS" | "PROPN" => Self::ProperNoun,
            "VB" | "VBD" | "VBG" | "VBN" | "VBP" | "VBZ" | "VERB" => Self::Verb,
            "JJ" | "JJR" | "JJS" | "ADJ" => Self::Adjective,
            "RB" | "RBR" | "RBS" | "ADV" => Self::Adverb,
            "PRP" | "PRP$" | "WP" | "WP$" | "PRON" => Self::Pronoun,
            "DT" | "WDT" | "PDT" | "DET" => Self::Determiner,
            "IN" | "TO" | "ADP" => Self::Preposition,
            "CC" | "CCONJ" | "SCONJ" => Self::Conjunction,
            "MD" | "AUX" => Self::Auxiliary,
            "RP" | "PART" => Self::Particle,
            "." | "," | ":" | "(" | ")" | "-LRB-" | "-RRB-" | "``" | "''" | "PUNCT" => {
                Self::Punctuation
            }
            "CD" | "NUM" => Self::Number,
            "SYM" | "$" | "#" => Self::Symbol,
            _ => Self::Unknown,
        }
    }

    /// Check if this tag represents a verb.
    #[must_use]
    pub fn is_verb(&self) -> bool {
        matches!(self, Self::Verb | Self::Auxiliary)
    }

    /// Check if this tag represents a noun.
    #[must_use]
    pub fn is_noun(&self) -> bool {
        matches!(self, Self::Noun | Self::ProperNoun | Self::Pronoun)
    }
}

/// A half-open span `[start, end)` of token indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// First index in the span.
    pub start: usize,
    /// One past the last index in the span.
    pub end: usize,
}

impl Span {
    /// Create a new span.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// An empty span positioned at `index`.
    #[must_use]
    pub const fn empty_at(index: usize) -> Self {
        Self {
            start: index,
            end: index,
        }
    }

    /// Number of tokens covered.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span covers no tokens.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether `index` lies inside the span.
    #[must_use]
    pub const fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }

    /// Smallest span covering both spans.
    #[must_use]
    pub fn include(self, other: Self) -> Self {
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Trim `other` off this span when it overlaps one of its edges.
    ///
    /// A span strictly inside this one cannot be removed without splitting
    /// it, so in that case this span is returned unchanged.
    #[must_use]
    pub fn exclude(self, other: Self) -> Self {
        if other.end <= self.start || other.start >= self.end {
            self
        } else if other.start <= self.start {
            Self::new(other.end.min(self.end), self.end)
        } else if other.end >= self.end {
            Self::new(self.start, other.start)
        } else {
            self
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A single token of the sentence, with its natural-logic annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Position of the token in the sentence (0-indexed).
    pub index: usize,
    /// Surface form.
    pub word: String,
    /// Lemma (base form).
    pub lemma: String,
    /// Part-of-speech tag as produced by the tagger.
    pub tag: String,
    /// Polarity of the token, computed from the enclosing operator scopes.
    pub polarity: Polarity,
    /// The operator whose quantifier span ends at this token, if any.
    pub operator: Option<OperatorSpec>,
}

impl Token {
    /// Create a new token with an unknown tag.
    #[must_use]
    pub fn new(index: usize, word: &str) -> Self {
        Self {
            index,
            word: word.to_string(),
            lemma: word.to_lowercase(),
            tag: String::new(),
            polarity: Polarity::default(),
            operator: None,
        }
    }

    /// Set the lemma.
    #[must_use]
    pub fn with_lemma(mut self, lemma: &str) -> Self {
        self.lemma = lemma.to_string();
        self
    }

    /// Set the POS tag.
    #[must_use]
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = tag.to_string();
        self
    }

    /// The coarse POS class of this token.
    #[must_use]
    pub fn pos(&self) -> PosTag {
        PosTag::from_tag(&self.tag)
    }

    /// First character of the tag, or `'\0'` when untagged.
    #[must_use]
    pub fn tag_initial(&self) -> char {
        self.tag.chars().next().unwrap_or('\0')
    }

    /// Whether the token is tagged as a cardinal number.
    #[must_use]
    pub fn is_cardinal(&self) -> bool {
        self.tag == "CD" || self.tag == "NUM"
    }
}

/// A labeled dependency arc from `governor` to `dependent`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    /// Head token index.
    pub governor: usize,
    /// Dependent token index.
    pub dependent: usize,
    /// Grammatical relation label, e.g. `nsubj` or `nmod:in`.
    pub relation: String,
    /// Whether this is an extra (enhanced) arc rather than a basic tree arc.
    #[serde(default)]
    pub extra: bool,
}

impl Edge {
    /// Create a new basic edge.
    #[must_use]
    pub fn new(governor: usize, dependent: usize, relation: &str) -> Self {
        Self {
            governor,
            dependent,
            relation: relation.to_string(),
            extra: false,
        }
    }

    /// Mark this edge as an extra arc.
    #[must_use]
    pub fn as_extra(mut self) -> Self {
        self.extra = true;
        self
    }

    /// The relation up to the first `:` or `_`, e.g. `nmod` for `nmod:in`.
    #[must_use]
    pub fn short_relation(&self) -> &str {
        short_relation(&self.relation)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -{}-> {}", self.governor, self.relation, self.dependent)
    }
}

/// The relation up to the first `:` or `_`.
#[must_use]
pub fn short_relation(relation: &str) -> &str {
    relation
        .find([':', '_'])
        .map_or(relation, |cut| &relation[..cut])
}

/// A mutable, labeled, directed multigraph over a shared token sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyGraph {
    tokens: Arc<Vec<Token>>,
    vertices: BTreeSet<usize>,
    edges: Vec<Edge>,
    roots: BTreeSet<usize>,
}

impl DependencyGraph {
    /// Create a graph with every token as a vertex and no edges.
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        let vertices = tokens.iter().map(|t| t.index).collect();
        Self {
            tokens: Arc::new(tokens),
            vertices,
            edges: Vec::new(),
            roots: BTreeSet::new(),
        }
    }

    /// Read a sentence in CoNLL format.
    ///
    /// Two layouts are accepted, one token per line:
    ///
    /// - six columns: `index word lemma tag head relation`
    /// - ten columns (CoNLL-U): `ID FORM LEMMA UPOS XPOS FEATS HEAD DEPREL DEPS MISC`;
    ///   the `DEPS` column contributes extra edges.
    ///
    /// Indices are 1-based with head `0` marking the root. Comment lines,
    /// multiword ranges and empty nodes are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MalformedConll`] when a line cannot be read, and
    /// [`GraphError::Empty`] when no tokens were found.
    pub fn from_conll(text: &str) -> Result<Self, GraphError> {
        let mut tokens = Vec::new();
        let mut arcs: Vec<(usize, usize, String, bool, usize)> = Vec::new();

        for (line_no, line) in text.lines().enumerate().map(|(i, l)| (i + 1, l.trim())) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols[0].contains('-') || cols[0].contains('.') {
                continue;
            }
            let malformed = |reason: &str| GraphError::MalformedConll {
                line: line_no,
                reason: reason.to_string(),
            };
            let (lemma, tag, head, relation, deps) = match cols.len() {
                6 => (cols[2], cols[3], cols[4], cols[5], None),
                n if n >= 8 => {
                    let tag = if cols[4] == "_" { cols[3] } else { cols[4] };
                    (cols[2], tag, cols[6], cols[7], cols.get(8).copied())
                }
                _ => return Err(malformed("expected 6 or 10 columns")),
            };
            let id: usize = cols[0]
                .parse()
                .map_err(|_| malformed("token id is not a number"))?;
            if id != tokens.len() + 1 {
                return Err(malformed("token ids must be consecutive from 1"));
            }
            let head: usize = head
                .parse()
                .map_err(|_| malformed("head is not a number"))?;
            let lemma = if lemma == "_" {
                cols[1].to_lowercase()
            } else {
                lemma.to_string()
            };
            tokens.push(Token::new(id - 1, cols[1]).with_lemma(&lemma).with_tag(tag));
            arcs.push((head, id, relation.to_string(), false, line_no));

            if let Some(deps) = deps
                && deps != "_"
            {
                for dep in deps.split('|') {
                    let (extra_head, extra_rel) = dep
                        .split_once(':')
                        .ok_or_else(|| malformed("DEPS entry must be head:relation"))?;
                    let extra_head: usize = extra_head
                        .parse()
                        .map_err(|_| malformed("DEPS head is not a number"))?;
                    if extra_head != head || extra_rel != relation {
                        arcs.push((extra_head, id, extra_rel.to_string(), true, line_no));
                    }
                }
            }
        }

        if tokens.is_empty() {
            return Err(GraphError::Empty);
        }
        let n = tokens.len();
        let mut graph = Self::new(tokens);
        for (head, id, relation, extra, line) in arcs {
            if head > n {
                return Err(GraphError::MalformedConll {
                    line,
                    reason: format!("head {head} is past the end of the sentence"),
                });
            }
            if head == 0 {
                if !extra {
                    graph.roots.insert(id - 1);
                }
                continue;
            }
            let mut edge = Edge::new(head - 1, id - 1, &relation);
            edge.extra = extra;
            graph.edges.push(edge);
        }
        Ok(graph)
    }

    /// All tokens of the underlying sentence, including removed vertices.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Mutable access to the tokens; copies them if shared with other graphs.
    pub fn tokens_mut(&mut self) -> &mut [Token] {
        Arc::make_mut(&mut self.tokens).as_mut_slice()
    }

    /// Get a token by index.
    #[must_use]
    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// Number of tokens in the underlying sentence.
    #[must_use]
    pub fn sentence_length(&self) -> usize {
        self.tokens.len()
    }

    /// Whether `vertex` is present in this graph.
    #[must_use]
    pub fn contains_vertex(&self, vertex: usize) -> bool {
        self.vertices.contains(&vertex)
    }

    /// The vertices, in sentence order.
    pub fn vertices(&self) -> impl Iterator<Item = usize> + '_ {
        self.vertices.iter().copied()
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Whether the graph has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Add a token back as a vertex.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::TokenOutOfRange`] if there is no such token.
    pub fn add_vertex(&mut self, vertex: usize) -> Result<(), GraphError> {
        if vertex >= self.tokens.len() {
            return Err(GraphError::TokenOutOfRange(vertex));
        }
        self.vertices.insert(vertex);
        Ok(())
    }

    /// Remove a vertex together with every edge touching it.
    pub fn remove_vertex(&mut self, vertex: usize) -> bool {
        if !self.vertices.remove(&vertex) {
            return false;
        }
        self.edges
            .retain(|e| e.governor != vertex && e.dependent != vertex);
        self.roots.remove(&vertex);
        true
    }

    /// Add an edge between two existing vertices.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MissingVertex`] if either endpoint is absent.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        for endpoint in [edge.governor, edge.dependent] {
            if !self.contains_vertex(endpoint) {
                return Err(GraphError::MissingVertex(endpoint));
            }
        }
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
        Ok(())
    }

    /// Remove an edge; returns whether it was present.
    pub fn remove_edge(&mut self, edge: &Edge) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| e != edge);
        self.edges.len() != before
    }

    /// Replace the label of an edge in place.
    pub fn relabel_edge(&mut self, edge: &Edge, relation: &str) -> bool {
        match self.edges.iter_mut().find(|e| *e == edge) {
            Some(found) => {
                found.relation = relation.to_string();
                true
            }
            None => false,
        }
    }

    /// All edges, in insertion order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges leaving `vertex`.
    pub fn outgoing(&self, vertex: usize) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().filter(move |e| e.governor == vertex)
    }

    /// Edges entering `vertex`.
    pub fn incoming(&self, vertex: usize) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().filter(move |e| e.dependent == vertex)
    }

    /// Number of edges entering `vertex`.
    #[must_use]
    pub fn in_degree(&self, vertex: usize) -> usize {
        self.incoming(vertex).count()
    }

    /// The first edge entering `vertex`, if any.
    #[must_use]
    pub fn parent_edge(&self, vertex: usize) -> Option<&Edge> {
        self.incoming(vertex).next()
    }

    /// Whether `vertex` has no outgoing edges.
    #[must_use]
    pub fn is_leaf(&self, vertex: usize) -> bool {
        self.outgoing(vertex).next().is_none()
    }

    /// The roots of the graph.
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.roots.iter().copied()
    }

    /// The lowest-indexed root.
    #[must_use]
    pub fn first_root(&self) -> Option<usize> {
        self.roots.iter().next().copied()
    }

    /// Make `vertex` the single root of the graph.
    pub fn set_root(&mut self, vertex: usize) {
        self.roots.clear();
        self.roots.insert(vertex);
    }

    /// Add `vertex` as an additional root.
    pub fn add_root(&mut self, vertex: usize) {
        self.roots.insert(vertex);
    }

    /// `vertex` and everything reachable from it.
    #[must_use]
    pub fn descendants(&self, vertex: usize) -> BTreeSet<usize> {
        let mut seen = BTreeSet::new();
        let mut fringe = VecDeque::from([vertex]);
        while let Some(node) = fringe.pop_front() {
            if seen.insert(node) {
                fringe.extend(self.outgoing(node).map(|e| e.dependent));
            }
        }
        seen
    }

    /// Token span covered by the subtree rooted at `vertex`.
    #[must_use]
    pub fn yield_span(&self, vertex: usize) -> Span {
        let below = self.descendants(vertex);
        let start = below.first().copied().unwrap_or(vertex);
        let end = below.last().copied().unwrap_or(vertex) + 1;
        Span::new(start, end)
    }

    /// Whether the graph is a tree: one root without incoming edges, every
    /// other vertex with exactly one incoming edge, all reachable from the
    /// root.
    #[must_use]
    pub fn is_tree(&self) -> bool {
        let Some(root) = self.first_root() else {
            return false;
        };
        if self.roots.len() != 1 || !self.contains_vertex(root) || self.in_degree(root) != 0 {
            return false;
        }
        let mut in_degree = vec![0usize; self.tokens.len()];
        for edge in &self.edges {
            if !self.contains_vertex(edge.governor) || !self.contains_vertex(edge.dependent) {
                return false;
            }
            in_degree[edge.dependent] += 1;
        }
        if self
            .vertices
            .iter()
            .any(|&v| v != root && in_degree[v] != 1)
        {
            return false;
        }
        self.descendants(root).len() == self.vertices.len()
    }

    /// Topological order of the vertices, lowest index first among ready
    /// vertices. Returns `None` if the graph has a cycle.
    #[must_use]
    pub fn topological_order(&self) -> Option<Vec<usize>> {
        let mut in_degree = vec![0usize; self.tokens.len()];
        for edge in &self.edges {
            in_degree[edge.dependent] += 1;
        }
        let mut ready: BinaryHeap<Reverse<usize>> = self
            .vertices
            .iter()
            .filter(|&&v| in_degree[v] == 0)
            .map(|&v| Reverse(v))
            .collect();
        let mut order = Vec::with_capacity(self.vertices.len());
        while let Some(Reverse(vertex)) = ready.pop() {
            order.push(vertex);
            for edge in self.outgoing(vertex) {
                in_degree[edge.dependent] -= 1;
                if in_degree[edge.dependent] == 0 {
                    ready.push(Reverse(edge.dependent));
                }
            }
        }
        (order.len() == self.vertices.len()).then_some(order)
    }

    /// The words of the graph, in sentence order.
    #[must_use]
    pub fn words(&self) -> Vec<&str> {
        self.vertices
            .iter()
            .filter_map(|&v| self.token(v))
            .map(|t| t.word.as_str())
            .collect()
    }

    /// The words of the graph joined by spaces.
    #[must_use]
    pub fn to_sentence(&self) -> String {
        self.words().join(" ")
    }

    fn vertex_label(&self, vertex: usize) -> String {
        self.token(vertex)
            .map_or_else(|| format!("?-{vertex}"), |t| format!("{}-{vertex}", t.word))
    }
}

impl fmt::Display for DependencyGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for root in &self.roots {
            writeln!(f, "root -> {}", self.vertex_label(*root))?;
        }
        for edge in &self.edges {
            writeln!(
                f,
                "{} -{}-> {}{}",
                self.vertex_label(edge.governor),
                edge.relation,
                self.vertex_label(edge.dependent),
                if edge.extra { " (extra)" } else { "" }
            )?;
        }
        Ok(())
    }
}
