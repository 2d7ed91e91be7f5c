//! Forward entailment: shortening clauses by deleting subtrees that natural
//! logic allows to go.

pub mod search;
pub mod traits;
pub mod weights;

#[cfg(test)]
mod tests;

pub use search::{DETERMINERS, ForwardEntailer};
pub use traits::DeletionWeights;
pub use weights::{AffinityModel, DEFAULT_AFFINITY_PROBABILITY_CAP, NaturalLogicWeights};
