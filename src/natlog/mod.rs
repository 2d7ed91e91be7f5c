//! Natural-logic core: relations, operators, scopes and polarity.
//!
//! The usual entry point is [`annotate`], which detects every operator in a
//! sentence and then writes each token's [`Polarity`]:
//!
//! ```rust,ignore
//! let mut graph = DependencyGraph::from_conll(conll)?;
//! let operators = natlog::annotate(&mut graph);
//! assert!(graph.token(1).unwrap().polarity.is_downwards());
//! ```

pub mod monotonicity;
pub mod operator;
pub mod polarity;
pub mod relation;
pub mod scope;

pub use monotonicity::{Monotonicity, MonotonicityType, project};
pub use operator::{Operator, OperatorSpec};
pub use polarity::{ArgumentSide, Polarity, ScopeEntry, annotate_polarity, compute_polarity};
pub use relation::{NaturalLogicRelation, TruthValue};
pub use scope::{ScopeMatch, annotate_operators, compute_scope, find_scope_matches, validate_quantifier};

use crate::graph::DependencyGraph;

/// Detect operators and compute polarity for every token of the graph.
///
/// Returns the operators that survived overlap resolution, ordered by head.
pub fn annotate(graph: &mut DependencyGraph) -> Vec<OperatorSpec> {
    let operators = annotate_operators(graph);
    annotate_polarity(graph);
    operators
}
