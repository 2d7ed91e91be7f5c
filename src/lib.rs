//! `oxinli` - Natural-logic inference over dependency trees.
//!
//! `oxinli` decides which shorter sentences a parsed sentence guarantees:
//!
//! - **Relation algebra**: the seven natural-logic relations, their join
//!   table and the truth automaton
//! - **Operators and scope**: quantifier and negation detection with
//!   subject/object scopes
//! - **Polarity**: per-token monotonicity from the enclosing scopes
//! - **Clause splitting**: best-first search for the independent clauses
//!   of a sentence
//! - **Forward entailment**: depth-first search for the truth-preserving
//!   deletions of a clause
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use oxinli::prelude::*;
//!
//! fn main() -> Result<(), NatLogError> {
//!     let graph = DependencyGraph::from_conll(
//!         "1 All all DT 2 det
//! 2 cats cat NNS 3 nsubj
//! 3 have have VBP 0 root
//! 4 long long JJ 5 amod
//! 5 tails tail NNS 3 dobj",
//!     )?;
//!
//!     let pipeline = PipelineBuilder::new().build()?;
//!     for fragment in pipeline.process(&graph)? {
//!         println!("{fragment} ({:.2})", fragment.score);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `native` (default): filesystem loading of configuration and weights,
//!   and the async batch API on top of tokio
//!
//! # Architecture
//!
//! ```text
//! DependencyGraph
//!   │
//!   ▼
//! ┌──────────────────────┐
//! │  natlog::annotate    │  ← Operators, scopes, token polarity
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │   ClauseSplitter     │  ← Best-first clause search
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │   ForwardEntailer    │  ← Sound subtree deletions
//! └──────────┬───────────┘
//!            │
//!            ▼
//!   Vec<SentenceFragment>
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(unexpected_cfgs)]

pub mod clause;
pub mod config;
pub mod entailment;
pub mod error;
pub mod graph;
pub mod natlog;
pub mod pipeline;
pub mod types;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::clause::{
        ClassifierModel, ClauseAction, ClauseCandidate, ClauseLabel, ClauseSplitter, Classifier,
        DefaultFeaturizer, Featurizer, Features, LabelScores, LinearClassifier,
    };
    pub use crate::config::{ClauseSplitterConfig, EntailmentConfig, NatLogConfig, PipelineConfig};
    pub use crate::entailment::{
        AffinityModel, DeletionWeights, ForwardEntailer, NaturalLogicWeights,
    };
    pub use crate::error::{
        ClassifierError, GraphError, NatLogError, PipelineError, TreeInvariantViolation,
        WeightsError,
    };
    pub use crate::graph::{DependencyGraph, Edge, EditLog, PosTag, Span, Token, TreeEdit};
    pub use crate::natlog::{
        Monotonicity, MonotonicityType, NaturalLogicRelation, Operator, OperatorSpec, Polarity,
        TruthValue, annotate,
    };
    pub use crate::pipeline::{NaturalLogicPipeline, PipelineBuilder};
    pub use crate::types::SentenceFragment;
}

pub use error::{NatLogError, Result};
