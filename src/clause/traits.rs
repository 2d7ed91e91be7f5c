//! Traits for the clause splitter's scoring collaborators.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::action::ClauseAction;
use super::search::SearchState;
use crate::error::ClassifierError;
use crate::graph::DependencyGraph;

/// Sparse feature vector, keyed by feature name.
pub type Features = BTreeMap<String, f64>;

/// What the classifier thinks of a candidate transition.
///
/// Variants are declared in tie-break order: when two labels score the
/// same, the earlier one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseLabel {
    /// The transition does not lead to a clause.
    NotAClause,
    /// The transition is on the path to a clause but is not one yet.
    Intermediate,
    /// The transition yields an independent clause.
    Split,
}

impl ClauseLabel {
    /// All labels, in tie-break order.
    pub const ALL: [Self; 3] = [Self::NotAClause, Self::Intermediate, Self::Split];

    /// Canonical name, as used in serialized models.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotAClause => "not_a_clause",
            Self::Intermediate => "intermediate",
            Self::Split => "split",
        }
    }
}

impl FromStr for ClauseLabel {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_a_clause" | "NOT_A_CLAUSE" => Ok(Self::NotAClause),
            "intermediate" | "CLAUSE_INTERM" => Ok(Self::Intermediate),
            "split" | "CLAUSE_SPLIT" => Ok(Self::Split),
            other => Err(ClassifierError::UnknownLabel(other.to_string())),
        }
    }
}

impl std::fmt::Display for ClauseLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score per label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelScores(BTreeMap<ClauseLabel, f64>);

impl LabelScores {
    /// Create an empty score table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the score of a label.
    pub fn set(&mut self, label: ClauseLabel, score: f64) {
        self.0.insert(label, score);
    }

    /// Score of a label, if present.
    #[must_use]
    pub fn get(&self, label: ClauseLabel) -> Option<f64> {
        self.0.get(&label).copied()
    }

    /// Drop a label from consideration.
    pub fn remove(&mut self, label: ClauseLabel) {
        self.0.remove(&label);
    }

    /// Whether no label is scored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Turn raw scores into log-probabilities (log-softmax).
    #[must_use]
    pub fn log_normalized(mut self) -> Self {
        let max = self.0.values().copied().fold(f64::NEG_INFINITY, f64::max);
        if max.is_finite() {
            let log_sum = max + self.0.values().map(|s| (s - max).exp()).sum::<f64>().ln();
            for score in self.0.values_mut() {
                *score -= log_sum;
            }
        }
        self
    }

    /// The best label and its score; ties go to the earlier label.
    #[must_use]
    pub fn argmax(&self) -> Option<(ClauseLabel, f64)> {
        self.0.iter().fold(None, |best, (&label, &score)| match best {
            Some((_, top)) if top >= score => best,
            _ => Some((label, score)),
        })
    }
}

impl FromIterator<(ClauseLabel, f64)> for LabelScores {
    fn from_iter<I: IntoIterator<Item = (ClauseLabel, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Scores a transition's feature vector.
///
/// Implementations must be immutable once built so that one classifier can
/// be shared by concurrent searches.
pub trait Classifier: Send + Sync {
    /// Raw score per label for a feature vector.
    fn scores(&self, features: &Features) -> LabelScores;
}

/// Turns a search transition into a feature vector.
pub trait Featurizer: Send + Sync {
    /// Features of the transition `from --action--> to` over `tree`.
    ///
    /// Must be deterministic and look only at the two states and the
    /// neighborhood of their edges.
    fn featurize(
        &self,
        tree: &DependencyGraph,
        from: &SearchState,
        action: ClauseAction,
        to: &SearchState,
    ) -> Features;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parsing() {
        assert_eq!("split".parse::<ClauseLabel>().unwrap(), ClauseLabel::Split);
        assert_eq!("CLAUSE_INTERM".parse::<ClauseLabel>().unwrap(), ClauseLabel::Intermediate);
        assert_eq!(
            "maybe".parse::<ClauseLabel>().unwrap_err(),
            ClassifierError::UnknownLabel("maybe".to_string())
        );
        for label in ClauseLabel::ALL {
            assert_eq!(label.as_str().parse::<ClauseLabel>().unwrap(), label);
        }
    }

    #[test]
    fn test_log_normalize_uniform() {
        let scores: LabelScores = ClauseLabel::ALL.iter().map(|&l| (l, 0.0)).collect();
        let normalized = scores.log_normalized();
        for label in ClauseLabel::ALL {
            let p = normalized.get(label).unwrap().exp();
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_argmax_tie_order() {
        let mut scores: LabelScores = ClauseLabel::ALL.iter().map(|&l| (l, -1.0)).collect();
        assert_eq!(scores.argmax().unwrap().0, ClauseLabel::NotAClause);
        scores.remove(ClauseLabel::NotAClause);
        assert_eq!(scores.argmax().unwrap().0, ClauseLabel::Intermediate);
        scores.set(ClauseLabel::Split, 0.5);
        assert_eq!(scores.argmax(), Some((ClauseLabel::Split, 0.5)));
        assert!(LabelScores::new().argmax().is_none());
    }
}
