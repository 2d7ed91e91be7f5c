//! Clause splitting.
//!
//! A sentence is broken into the independent clauses it asserts by a
//! best-first search over its dependency tree:
//! - [`ClauseAction`]s describe how a clause is carved out at an edge
//! - a [`Featurizer`] turns each transition into sparse features
//! - a [`Classifier`] labels transitions as not a clause, an intermediate
//!   step, or a split
//! - [`ClauseSplitter`] runs the search and materializes the results

pub mod action;
pub mod classifier;
pub mod featurizer;
pub mod search;
pub mod traits;


pub use action::{ClauseAction, INDIRECT_SPEECH_LEMMAS, hard_split_order};
pub use classifier::{ClassifierModel, LINEAR_KIND, LinearClassifier};
pub use featurizer::DefaultFeaturizer;
pub use search::{ClauseCandidate, ClauseSplitter, SearchState};
pub use traits::{Classifier, ClauseLabel, Featurizer, Features, LabelScores};
