//! Deletion probabilities from label defaults and attachment affinities.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::traits::DeletionWeights;
use crate::error::{Result, WeightsError};
use crate::graph::{DependencyGraph, Edge, short_relation};

/// Affinity at which a deletion becomes impossible, unless configured.
pub const DEFAULT_AFFINITY_PROBABILITY_CAP: f64 = 1.0 / 3.0;

const KEY_SEPARATOR: &str = "|";

/// Serialized affinity tables.
///
/// Keys join lowercase lemmas with `|`:
///
/// ```json
/// {
///   "pp": { "eat|with": 0.05, "eat|with|fork": 0.2 },
///   "obj": { "eat": 0.3, "put|on": 0.9 },
///   "modifier": { "eat|advmod": 0.1 },
///   "defaults": { "tmod": 0.8 }
/// }
/// ```
///
/// - `pp`: `verb|preposition` or `verb|preposition|object`, where the
///   object is the verb's direct object, if it has one.
/// - `obj`: `verb` or `verb|preposition`, where the preposition is a
///   prepositional sibling of the object.
/// - `modifier`: `governor|label` for any other arc.
/// - `defaults`: deletion probability per arc label, overriding the
///   built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffinityModel {
    /// Verb-preposition(-object) affinities.
    pub pp: BTreeMap<String, f64>,
    /// Verb-object affinities.
    pub obj: BTreeMap<String, f64>,
    /// Governor-modifier affinities.
    pub modifier: BTreeMap<String, f64>,
    /// Label deletion probabilities.
    pub defaults: BTreeMap<String, f64>,
}

type PpKey = (String, String, Option<String>);
type ObjKey = (String, Option<String>);

/// Natural-logic deletion weights.
///
/// An affinity `a` turns into the deletion probability `1 - min(1, a / cap)`:
/// the more a word attracts its dependent, the less likely the dependent may
/// go. Arcs without an affinity entry fall back to a per-label default.
#[derive(Debug, Clone, PartialEq)]
pub struct NaturalLogicWeights {
    cap: f64,
    pp: HashMap<PpKey, f64>,
    obj: HashMap<ObjKey, f64>,
    modifier: HashMap<(String, String), f64>,
    defaults: HashMap<String, f64>,
}

impl Default for NaturalLogicWeights {
    fn default() -> Self {
        Self {
            cap: DEFAULT_AFFINITY_PROBABILITY_CAP,
            pp: HashMap::new(),
            obj: HashMap::new(),
            modifier: HashMap::new(),
            defaults: HashMap::new(),
        }
    }
}

fn is_prepositional(label: &str) -> bool {
    label.starts_with("prep") || matches!(short_relation(label), "nmod" | "obl")
}

fn lemma(graph: &DependencyGraph, vertex: usize) -> String {
    graph
        .token(vertex)
        .map_or_else(String::new, |t| t.lemma.to_lowercase())
}

/// The preposition of a prepositional arc: the label suffix when there is
/// one, else a `case` dependent, else the dependent itself for bare `prep`.
fn preposition_of(graph: &DependencyGraph, edge: &Edge) -> Option<String> {
    let label = edge.relation.as_str();
    if let Some((_, prep)) = label.split_once(':').or_else(|| label.split_once('_')) {
        return Some(prep.to_lowercase());
    }
    if let Some(case) = graph.outgoing(edge.dependent).find(|e| e.relation == "case") {
        return Some(lemma(graph, case.dependent));
    }
    (label == "prep").then(|| lemma(graph, edge.dependent))
}

fn split_key(key: &str, parts: std::ops::RangeInclusive<usize>) -> std::result::Result<Vec<String>, WeightsError> {
    let fields: Vec<String> = key
        .split(KEY_SEPARATOR)
        .map(|part| part.trim().to_lowercase())
        .collect();
    if !parts.contains(&fields.len()) || fields.iter().any(String::is_empty) {
        return Err(WeightsError::MalformedKey(key.to_string()));
    }
    Ok(fields)
}

fn check_probability(label: &str, probability: f64) -> std::result::Result<f64, WeightsError> {
    if (0.0..=1.0).contains(&probability) {
        Ok(probability)
    } else {
        Err(WeightsError::InvalidProbability {
            label: label.to_string(),
            probability,
        })
    }
}

fn join_key(parts: &[&str]) -> String {
    parts.join(KEY_SEPARATOR)
}

impl NaturalLogicWeights {
    /// Create weights with no affinities.
    ///
    /// # Errors
    ///
    /// Returns [`WeightsError::InvalidCap`] unless `cap` is finite and positive.
    pub fn new(cap: f64) -> std::result::Result<Self, WeightsError> {
        if !cap.is_finite() || cap <= 0.0 {
            return Err(WeightsError::InvalidCap(cap));
        }
        Ok(Self {
            cap,
            ..Self::default()
        })
    }

    /// The affinity cap.
    #[must_use]
    pub fn cap(&self) -> f64 {
        self.cap
    }

    /// Add a verb-preposition affinity, optionally specific to the verb's
    /// direct object.
    #[must_use]
    pub fn with_pp_affinity(mut self, verb: &str, prep: &str, obj: Option<&str>, affinity: f64) -> Self {
        self.pp.insert(
            (verb.to_lowercase(), prep.to_lowercase(), obj.map(str::to_lowercase)),
            affinity,
        );
        self
    }

    /// Add a verb-object affinity, optionally specific to a prepositional
    /// sibling.
    #[must_use]
    pub fn with_obj_affinity(mut self, verb: &str, prep: Option<&str>, affinity: f64) -> Self {
        self.obj
            .insert((verb.to_lowercase(), prep.map(str::to_lowercase)), affinity);
        self
    }

    /// Add a governor-modifier affinity.
    #[must_use]
    pub fn with_modifier_affinity(mut self, governor: &str, label: &str, affinity: f64) -> Self {
        self.modifier
            .insert((governor.to_lowercase(), label.to_string()), affinity);
        self
    }

    /// Override the default deletion probability of a label.
    ///
    /// # Errors
    ///
    /// Returns [`WeightsError::InvalidProbability`] unless `probability` is
    /// in `[0, 1]`.
    pub fn with_default(
        mut self,
        label: &str,
        probability: f64,
    ) -> std::result::Result<Self, WeightsError> {
        let probability = check_probability(label, probability)?;
        self.defaults.insert(label.to_string(), probability);
        Ok(self)
    }

    /// Build weights from serialized tables.
    ///
    /// # Errors
    ///
    /// Fails on a bad cap, on a key with the wrong number of parts, or on a
    /// label default outside `[0, 1]`.
    pub fn from_model(model: &AffinityModel, cap: f64) -> std::result::Result<Self, WeightsError> {
        let mut weights = Self::new(cap)?;
        for (key, &affinity) in &model.pp {
            let mut parts = split_key(key, 2..=3)?.into_iter();
            let (Some(verb), Some(prep)) = (parts.next(), parts.next()) else {
                return Err(WeightsError::MalformedKey(key.clone()));
            };
            weights.pp.insert((verb, prep, parts.next()), affinity);
        }
        for (key, &affinity) in &model.obj {
            let mut parts = split_key(key, 1..=2)?.into_iter();
            let Some(verb) = parts.next() else {
                return Err(WeightsError::MalformedKey(key.clone()));
            };
            weights.obj.insert((verb, parts.next()), affinity);
        }
        for (key, &affinity) in &model.modifier {
            let mut parts = key.splitn(2, KEY_SEPARATOR);
            match (parts.next(), parts.next()) {
                (Some(governor), Some(label)) if !governor.is_empty() && !label.is_empty() => {
                    weights
                        .modifier
                        .insert((governor.to_lowercase(), label.to_string()), affinity);
                }
                _ => return Err(WeightsError::MalformedKey(key.clone())),
            }
        }
        for (label, &probability) in &model.defaults {
            let probability = check_probability(label, probability)?;
            weights.defaults.insert(label.clone(), probability);
        }
        Ok(weights)
    }

    /// The serialized tables of these weights.
    #[must_use]
    pub fn to_model(&self) -> AffinityModel {
        AffinityModel {
            pp: self
                .pp
                .iter()
                .map(|((verb, prep, obj), &a)| {
                    let key = match obj {
                        Some(obj) => join_key(&[verb.as_str(), prep.as_str(), obj.as_str()]),
                        None => join_key(&[verb.as_str(), prep.as_str()]),
                    };
                    (key, a)
                })
                .collect(),
            obj: self
                .obj
                .iter()
                .map(|((verb, prep), &a)| {
                    let key = match prep {
                        Some(prep) => join_key(&[verb.as_str(), prep.as_str()]),
                        None => verb.clone(),
                    };
                    (key, a)
                })
                .collect(),
            modifier: self
                .modifier
                .iter()
                .map(|((governor, label), &a)| (join_key(&[governor.as_str(), label.as_str()]), a))
                .collect(),
            defaults: self.defaults.iter().map(|(l, &p)| (l.clone(), p)).collect(),
        }
    }

    /// Load weights from JSON tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or the tables are rejected.
    pub fn from_json(json: &str, cap: f64) -> Result<Self> {
        let model: AffinityModel = serde_json::from_str(json)?;
        Ok(Self::from_model(&model, cap)?)
    }

    /// Load weights from a JSON file (native only).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the tables are rejected.
    #[cfg(feature = "native")]
    pub fn from_file(path: impl AsRef<std::path::Path>, cap: f64) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content, cap)
    }

    /// Deletion probability for an affinity, always in `[0, 1]`.
    ///
    /// Negative affinities saturate at 1; a NaN affinity blocks deletion.
    #[must_use]
    pub fn affinity_probability(&self, affinity: f64) -> f64 {
        let probability = 1.0 - affinity / self.cap;
        if probability.is_nan() {
            return 0.0;
        }
        probability.clamp(0.0, 1.0)
    }

    fn pp_probability(&self, graph: &DependencyGraph, edge: &Edge, neighbors: &[&Edge]) -> Option<f64> {
        let verb = lemma(graph, edge.governor);
        let prep = preposition_of(graph, edge)?;
        let obj = neighbors
            .iter()
            .find(|n| n.relation.contains("obj"))
            .map(|n| lemma(graph, n.dependent));
        obj.and_then(|obj| self.pp.get(&(verb.clone(), prep.clone(), Some(obj))))
            .or_else(|| self.pp.get(&(verb, prep, None)))
            .map(|&a| self.affinity_probability(a))
    }

    fn obj_probability(&self, graph: &DependencyGraph, edge: &Edge, neighbors: &[&Edge]) -> Option<f64> {
        let verb = lemma(graph, edge.governor);
        let prep = neighbors
            .iter()
            .filter(|n| is_prepositional(&n.relation))
            .find_map(|n| preposition_of(graph, n));
        prep.and_then(|prep| self.obj.get(&(verb.clone(), Some(prep))))
            .or_else(|| self.obj.get(&(verb, None)))
            .map(|&a| self.affinity_probability(a))
    }
}

impl DeletionWeights for NaturalLogicWeights {
    fn deletion_probability(&self, graph: &DependencyGraph, edge: &Edge, neighbors: &[&Edge]) -> f64 {
        let label = edge.relation.as_str();
        let estimate = if is_prepositional(label) {
            self.pp_probability(graph, edge, neighbors)
        } else if label.contains("obj") {
            self.obj_probability(graph, edge, neighbors)
        } else {
            self.modifier
                .get(&(lemma(graph, edge.governor), label.to_string()))
                .map(|&a| self.affinity_probability(a))
        };
        estimate.unwrap_or_else(|| self.label_probability(label))
    }

    fn label_probability(&self, label: &str) -> f64 {
        if let Some(&p) = self.defaults.get(label) {
            return p;
        }
        if is_prepositional(label) {
            0.9
        } else if label.contains("obj") {
            0.0
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EAT: &str = "\
1 Cats cat NNS 2 nsubj
2 eat eat VBP 0 root
3 mice mouse NNS 2 dobj
4 with with IN 5 case
5 forks fork NNS 2 nmod:with
6 quietly quietly RB 2 advmod";

    fn eat() -> DependencyGraph {
        DependencyGraph::from_conll(EAT).unwrap()
    }

    fn siblings<'a>(graph: &'a DependencyGraph, edge: &Edge) -> Vec<&'a Edge> {
        graph.outgoing(edge.governor).filter(|e| *e != edge).collect()
    }

    fn probability(weights: &NaturalLogicWeights, edge: &Edge) -> f64 {
        let graph = eat();
        let neighbors = siblings(&graph, edge);
        weights.deletion_probability(&graph, edge, &neighbors)
    }

    #[test]
    fn test_label_defaults() {
        let weights = NaturalLogicWeights::default();
        assert_eq!(weights.cap(), DEFAULT_AFFINITY_PROBABILITY_CAP);
        assert_eq!(weights.label_probability("prep"), 0.9);
        assert_eq!(weights.label_probability("nmod:with"), 0.9);
        assert_eq!(weights.label_probability("dobj"), 0.0);
        assert_eq!(weights.label_probability("amod"), 1.0);
        assert_eq!(weights.label_probability("det"), 1.0);
        let weights = weights.with_default("amod", 0.5).unwrap();
        assert_eq!(weights.label_probability("amod"), 0.5);
    }

    #[test]
    fn test_modifier_affinity() {
        let weights = NaturalLogicWeights::default().with_modifier_affinity("eat", "advmod", 0.1);
        let p = probability(&weights, &Edge::new(1, 5, "advmod"));
        assert!((p - 0.7).abs() < 1e-9);
        let other = NaturalLogicWeights::default().with_modifier_affinity("drink", "advmod", 0.1);
        assert_eq!(probability(&other, &Edge::new(1, 5, "advmod")), 1.0);
    }

    #[test]
    fn test_pp_affinity_uses_object_sibling() {
        let edge = Edge::new(1, 4, "nmod:with");
        assert_eq!(probability(&NaturalLogicWeights::default(), &edge), 0.9);

        let weights = NaturalLogicWeights::default().with_pp_affinity("eat", "with", None, 1.0 / 6.0);
        assert!((probability(&weights, &edge) - 0.5).abs() < 1e-9);

        let weights = weights.with_pp_affinity("eat", "with", Some("mouse"), 1.0);
        assert_eq!(probability(&weights, &edge), 0.0);
    }

    #[test]
    fn test_obj_affinity_uses_prepositional_sibling() {
        let edge = Edge::new(1, 2, "dobj");
        assert_eq!(probability(&NaturalLogicWeights::default(), &edge), 0.0);

        let weights = NaturalLogicWeights::default().with_obj_affinity("eat", None, 0.0);
        assert_eq!(probability(&weights, &edge), 1.0);

        let weights = weights.with_obj_affinity("eat", Some("with"), 0.5);
        assert_eq!(probability(&weights, &edge), 0.0);
    }

    #[test]
    fn test_negative_affinity_saturates() {
        let weights = NaturalLogicWeights::default().with_modifier_affinity("eat", "advmod", -0.1);
        assert_eq!(probability(&weights, &Edge::new(1, 5, "advmod")), 1.0);
        assert_eq!(weights.affinity_probability(-10.0), 1.0);
        assert_eq!(weights.affinity_probability(10.0), 0.0);
        assert_eq!(weights.affinity_probability(f64::NAN), 0.0);
        assert_eq!(weights.affinity_probability(f64::NEG_INFINITY), 1.0);
    }

    #[test]
    fn test_out_of_range_defaults_are_rejected() {
        assert!(matches!(
            NaturalLogicWeights::default().with_default("det", 7.0),
            Err(WeightsError::InvalidProbability { label, .. }) if label == "det"
        ));
        assert!(NaturalLogicWeights::default().with_default("det", -0.5).is_err());
        assert!(NaturalLogicWeights::default().with_default("det", f64::NAN).is_err());
        assert!(NaturalLogicWeights::default().with_default("det", 1.0).is_ok());

        let err = NaturalLogicWeights::from_json(r#"{"defaults":{"det":7.0}}"#, 1.0).unwrap_err();
        assert!(matches!(
            err,
            crate::error::NatLogError::Weights(WeightsError::InvalidProbability { .. })
        ));
    }

    #[test]
    fn test_invalid_cap() {
        assert!(matches!(
            NaturalLogicWeights::new(0.0),
            Err(WeightsError::InvalidCap(_))
        ));
        assert!(NaturalLogicWeights::new(f64::NAN).is_err());
        assert_eq!(NaturalLogicWeights::new(0.5).unwrap().cap(), 0.5);
    }

    #[test]
    fn test_json_tables() {
        let json = r#"{
            "pp": { "eat|with": 0.05, "eat|with|mouse": 0.2 },
            "obj": { "eat": 0.3 },
            "modifier": { "eat|advmod": 0.1 },
            "defaults": { "tmod": 0.8 }
        }"#;
        let weights = NaturalLogicWeights::from_json(json, 1.0).unwrap();
        assert!((probability(&weights, &Edge::new(1, 4, "nmod:with")) - 0.8).abs() < 1e-9);
        assert!((probability(&weights, &Edge::new(1, 2, "dobj")) - 0.7).abs() < 1e-9);
        assert!((probability(&weights, &Edge::new(1, 5, "advmod")) - 0.9).abs() < 1e-9);
        assert_eq!(weights.label_probability("tmod"), 0.8);

        let restored = NaturalLogicWeights::from_model(&weights.to_model(), 1.0).unwrap();
        assert_eq!(restored, weights);
    }

    #[test]
    fn test_malformed_keys() {
        let model = AffinityModel {
            pp: BTreeMap::from([("eat".to_string(), 0.1)]),
            ..Default::default()
        };
        assert!(matches!(
            NaturalLogicWeights::from_model(&model, 1.0),
            Err(WeightsError::MalformedKey(key)) if key == "eat"
        ));
        let model = AffinityModel {
            modifier: BTreeMap::from([("eat|".to_string(), 0.1)]),
            ..Default::default()
        };
        assert!(NaturalLogicWeights::from_model(&model, 1.0).is_err());
    }

    #[cfg(feature = "native")]
    #[test]
    fn test_weights_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("affinities.json");
        std::fs::write(&path, r#"{ "modifier": { "eat|advmod": 0.1 } }"#).unwrap();
        let weights = NaturalLogicWeights::from_file(&path, DEFAULT_AFFINITY_PROBABILITY_CAP).unwrap();
        assert!((probability(&weights, &Edge::new(1, 5, "advmod")) - 0.7).abs() < 1e-9);
    }
}
