//! Linear clause classifier and its serialized model.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::traits::{Classifier, ClauseLabel, Features, LabelScores};
use crate::error::{ClassifierError, Result};

/// The only model kind the splitter can load.
pub const LINEAR_KIND: &str = "linear";

/// Serialized form of a clause classifier.
///
/// ```json
/// { "kind": "linear", "weights": { "split": { "simple&edge:ccomp": 1.5 } } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierModel {
    /// Model family; must be `"linear"`.
    pub kind: String,
    /// Weight per label, then per feature.
    #[serde(default)]
    pub weights: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Dot-product classifier: the score of a label is the sum of its feature
/// weights times the feature values.
///
/// A classifier without weights scores every label 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearClassifier {
    weights: HashMap<ClauseLabel, HashMap<String, f64>>,
}

impl LinearClassifier {
    /// Create a classifier with no weights.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one weight.
    #[must_use]
    pub fn with_weight(mut self, label: ClauseLabel, feature: &str, weight: f64) -> Self {
        self.weights
            .entry(label)
            .or_default()
            .insert(feature.to_string(), weight);
        self
    }

    /// Build a classifier from a serialized model.
    ///
    /// # Errors
    ///
    /// Fails with [`ClassifierError::UnsupportedKind`] for any model kind other
    /// than `"linear"`, and with [`ClassifierError::UnknownLabel`] for weights
    /// on an unknown label.
    pub fn from_model(model: ClassifierModel) -> std::result::Result<Self, ClassifierError> {
        if model.kind != LINEAR_KIND {
            return Err(ClassifierError::UnsupportedKind(model.kind));
        }
        let mut weights = HashMap::new();
        for (label, features) in model.weights {
            let label: ClauseLabel = label.parse()?;
            weights.insert(label, features.into_iter().collect());
        }
        Ok(Self { weights })
    }

    /// The serialized model of this classifier.
    #[must_use]
    pub fn to_model(&self) -> ClassifierModel {
        ClassifierModel {
            kind: LINEAR_KIND.to_string(),
            weights: self
                .weights
                .iter()
                .map(|(label, features)| {
                    (
                        label.as_str().to_string(),
                        features.iter().map(|(f, w)| (f.clone(), *w)).collect(),
                    )
                })
                .collect(),
        }
    }

    /// Load a classifier from a JSON model.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or the model is rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        let model: ClassifierModel = serde_json::from_str(json)?;
        Ok(Self::from_model(model)?)
    }

    /// Load a classifier from a JSON model file (native only).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the model is rejected.
    #[cfg(feature = "native")]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Number of non-zero weights.
    #[must_use]
    pub fn weight_count(&self) -> usize {
        self.weights
            .values()
            .map(|features| features.values().filter(|w| **w != 0.0).count())
            .sum()
    }
}

impl Classifier for LinearClassifier {
    fn scores(&self, features: &Features) -> LabelScores {
        ClauseLabel::ALL
            .iter()
            .map(|&label| {
                let score = self.weights.get(&label).map_or(0.0, |weights| {
                    features
                        .iter()
                        .filter_map(|(name, value)| weights.get(name).map(|w| w * value))
                        .sum()
                });
                (label, score)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NatLogError;

    fn features(names: &[&str]) -> Features {
        names.iter().map(|n| ((*n).to_string(), 1.0)).collect()
    }

    #[test]
    fn test_empty_classifier_scores_zero() {
        let scores = LinearClassifier::new().scores(&features(&["simple&edge:ccomp"]));
        for label in ClauseLabel::ALL {
            assert_eq!(scores.get(label), Some(0.0));
        }
    }

    #[test]
    fn test_weighted_scores() {
        let classifier = LinearClassifier::new()
            .with_weight(ClauseLabel::Split, "simple&edge:ccomp", 2.0)
            .with_weight(ClauseLabel::Split, "simple&at_root", 0.5)
            .with_weight(ClauseLabel::NotAClause, "simple&edge:det", 3.0);
        let scores = classifier.scores(&features(&["simple&edge:ccomp", "simple&at_root"]));
        assert_eq!(scores.get(ClauseLabel::Split), Some(2.5));
        assert_eq!(scores.get(ClauseLabel::NotAClause), Some(0.0));
        assert_eq!(scores.argmax().unwrap().0, ClauseLabel::Split);
        assert_eq!(classifier.weight_count(), 3);
    }

    #[test]
    fn test_model_roundtrip() {
        let classifier = LinearClassifier::new().with_weight(ClauseLabel::Intermediate, "f", -1.0);
        let model = classifier.to_model();
        assert_eq!(model.kind, "linear");
        let restored = LinearClassifier::from_model(model).unwrap();
        assert_eq!(restored, classifier);
    }

    #[test]
    fn test_rejects_non_linear_kind() {
        let json = r#"{ "kind": "random_forest", "weights": {} }"#;
        let err = LinearClassifier::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            NatLogError::Classifier(ClassifierError::UnsupportedKind(ref kind)) if kind == "random_forest"
        ));
    }

    #[test]
    fn test_rejects_unknown_label() {
        let json = r#"{ "kind": "linear", "weights": { "maybe": { "f": 1.0 } } }"#;
        assert!(matches!(
            LinearClassifier::from_json(json),
            Err(NatLogError::Classifier(ClassifierError::UnknownLabel(_)))
        ));
    }

    #[cfg(feature = "native")]
    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clauses.json");
        std::fs::write(
            &path,
            r#"{ "kind": "linear", "weights": { "split": { "simple&edge:ccomp": 1.0 } } }"#,
        )
        .unwrap();
        let classifier = LinearClassifier::from_file(&path).unwrap();
        assert_eq!(classifier.weight_count(), 1);
    }
}
