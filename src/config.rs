//! Configuration management for `oxinli`.

use serde::{Deserialize, Serialize};

/// Global configuration for `oxinli`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NatLogConfig {
    /// Clause splitter configuration.
    #[serde(default)]
    pub clause: ClauseSplitterConfig,
    /// Forward entailment configuration.
    #[serde(default)]
    pub entailment: EntailmentConfig,
    /// Pipeline configuration.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Configuration for the clause splitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClauseSplitterConfig {
    /// Maximum number of states popped from the frontier.
    pub max_ticks: usize,
    /// Minimum probability of a clause returned by `top_clauses`.
    pub threshold: f64,
    /// Maximum number of clauses returned by `top_clauses`.
    pub max_clauses: usize,
    /// Whether the input sentence is asserted true.
    pub assume_truth: bool,
}

impl Default for ClauseSplitterConfig {
    fn default() -> Self {
        Self {
            max_ticks: 1000,
            threshold: 0.1,
            max_clauses: 32,
            assume_truth: true,
        }
    }
}

impl ClauseSplitterConfig {
    /// Set the tick budget.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: usize) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Set the probability threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the maximum number of clauses.
    #[must_use]
    pub fn with_max_clauses(mut self, max_clauses: usize) -> Self {
        self.max_clauses = max_clauses;
        self
    }

    /// Set whether the input sentence is asserted true.
    #[must_use]
    pub fn with_assume_truth(mut self, assume_truth: bool) -> Self {
        self.assume_truth = assume_truth;
        self
    }
}

/// Configuration for the forward entailment search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntailmentConfig {
    /// Maximum number of fragments produced per clause.
    pub max_results: usize,
    /// Maximum number of states popped from the stack.
    pub max_ticks: usize,
    /// Whether the premise clause is asserted true.
    pub premise_truth: bool,
    /// Affinity at which a deletion becomes impossible.
    pub affinity_probability_cap: f64,
}

impl Default for EntailmentConfig {
    fn default() -> Self {
        Self {
            max_results: 1000,
            max_ticks: 100_000,
            premise_truth: true,
            affinity_probability_cap: 1.0 / 3.0,
        }
    }
}

impl EntailmentConfig {
    /// Set the result cap.
    #[must_use]
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Set the tick budget.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: usize) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Set the truth of the premise.
    #[must_use]
    pub fn with_premise_truth(mut self, premise_truth: bool) -> Self {
        self.premise_truth = premise_truth;
        self
    }

    /// Set the affinity cap.
    #[must_use]
    pub fn with_affinity_probability_cap(mut self, cap: f64) -> Self {
        self.affinity_probability_cap = cap;
        self
    }
}

/// Configuration for the end-to-end pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Split sentences into clauses before entailment.
    pub split_clauses: bool,
    /// Maximum number of entailed fragments kept per clause.
    pub entailments_per_clause: usize,
    /// Also produce fragments with single non-privative adjectives removed.
    pub adjective_entailments: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            split_clauses: true,
            entailments_per_clause: 1000,
            adjective_entailments: true,
        }
    }
}

impl PipelineConfig {
    /// Enable or disable clause splitting.
    #[must_use]
    pub fn with_split_clauses(mut self, split_clauses: bool) -> Self {
        self.split_clauses = split_clauses;
        self
    }

    /// Set the per-clause fragment cap.
    #[must_use]
    pub fn with_entailments_per_clause(mut self, limit: usize) -> Self {
        self.entailments_per_clause = limit;
        self
    }

    /// Enable or disable adjective entailments.
    #[must_use]
    pub fn with_adjective_entailments(mut self, enabled: bool) -> Self {
        self.adjective_entailments = enabled;
        self
    }
}

impl NatLogConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file (native only).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[cfg(feature = "native")]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file (native only).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    #[cfg(feature = "native")]
    pub fn to_file(&self, path: impl AsRef<std::path::Path>) -> crate::error::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Serialize configuration to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> crate::error::Result<String> {
        let content = serde_json::to_string_pretty(self)?;
        Ok(content)
    }

    /// Set clause splitter configuration.
    #[must_use]
    pub fn with_clause(mut self, clause: ClauseSplitterConfig) -> Self {
        self.clause = clause;
        self
    }

    /// Set entailment configuration.
    #[must_use]
    pub fn with_entailment(mut self, entailment: EntailmentConfig) -> Self {
        self.entailment = entailment;
        self
    }

    /// Set pipeline configuration.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Check that every setting is usable.
    ///
    /// # Errors
    ///
    /// Returns [`NatLogError::Config`](crate::error::NatLogError::Config)
    /// naming the first bad setting.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::NatLogError;

        if !(0.0..=1.0).contains(&self.clause.threshold) {
            return Err(NatLogError::Config(format!(
                "clause.threshold must be in [0, 1], got {}",
                self.clause.threshold
            )));
        }
        if self.entailment.affinity_probability_cap <= 0.0 {
            return Err(NatLogError::Config(format!(
                "entailment.affinity_probability_cap must be positive, got {}",
                self.entailment.affinity_probability_cap
            )));
        }
        if self.clause.max_ticks == 0 || self.entailment.max_ticks == 0 {
            return Err(NatLogError::Config("tick budgets must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NatLogConfig::default();
        assert_eq!(config.clause.max_ticks, 1000);
        assert_eq!(config.clause.threshold, 0.1);
        assert_eq!(config.clause.max_clauses, 32);
        assert_eq!(config.entailment.max_ticks, 100_000);
        assert_eq!(config.entailment.max_results, 1000);
        assert!((config.entailment.affinity_probability_cap - 1.0 / 3.0).abs() < 1e-12);
        assert!(config.pipeline.split_clauses);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = NatLogConfig::new()
            .with_clause(ClauseSplitterConfig::default().with_max_clauses(4))
            .with_entailment(EntailmentConfig::default().with_premise_truth(false))
            .with_pipeline(PipelineConfig {
                adjective_entailments: false,
                ..Default::default()
            });

        assert_eq!(config.clause.max_clauses, 4);
        assert!(!config.entailment.premise_truth);
        assert!(!config.pipeline.adjective_entailments);
    }

    #[test]
    fn test_config_serialization() {
        let config = NatLogConfig::default();
        let json = config.to_json().unwrap();
        let parsed = NatLogConfig::from_json(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed = NatLogConfig::from_json(r#"{ "clause": { "threshold": 0.5 } }"#).unwrap();
        assert_eq!(parsed.clause.threshold, 0.5);
        assert_eq!(parsed.clause.max_clauses, 32);
        assert_eq!(parsed.entailment, EntailmentConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = NatLogConfig::new().with_clause(ClauseSplitterConfig::default().with_threshold(1.5));
        assert!(bad.validate().is_err());
        let bad = NatLogConfig::new()
            .with_entailment(EntailmentConfig::default().with_affinity_probability_cap(0.0));
        assert!(bad.validate().is_err());
    }

    #[cfg(feature = "native")]
    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oxinli.json");
        let config = NatLogConfig::new().with_clause(ClauseSplitterConfig::default().with_max_ticks(50));
        config.to_file(&path).unwrap();
        assert_eq!(NatLogConfig::from_file(&path).unwrap(), config);
    }
}
