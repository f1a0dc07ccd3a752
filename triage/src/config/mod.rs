//! Configuration model
//!
//! Everything that parameterizes classification, priority estimation,
//! scoring, caching and batching. Field names serialize in camelCase so
//! existing configuration documents and downstream consumers keep working.
//!
//! ```text
//! Configuration
//!   ├─ rules / customRules        → classify::matcher
//!   ├─ minConfidence / maxCategories / confidenceThresholds → classify::resolver
//!   ├─ priorityEstimation         → priority
//!   ├─ categoryWeights / priorityWeights / scoringAlgorithm → scoring
//!   └─ performance                → cache, batch
//! ```

mod defaults;
mod loader;

pub use loader::{load_config, load_config_or_minimal, parse_config, ConfigFormat};

use crate::error::{TriageError, TriageResult};
use crate::issue::{Category, Priority};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Weight used when a category or priority is missing from a weight table.
pub const DEFAULT_WEIGHT: f64 = 0.5;

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    /// Classifications below this confidence are discarded before ranking
    pub min_confidence: f64,
    /// Maximum number of ranked classifications kept per issue
    pub max_categories: usize,
    /// Standard rule set
    pub rules: Vec<ClassificationRule>,
    /// Repository- or user-supplied rules, evaluated after `rules`
    pub custom_rules: Vec<ClassificationRule>,
    pub category_weights: WeightTable,
    pub priority_weights: WeightTable,
    /// Per-category clamp and adjustment factor
    pub confidence_thresholds: HashMap<Category, ConfidenceThreshold>,
    pub priority_estimation: PriorityEstimationConfig,
    /// `None` falls back to the fixed default score breakdown
    pub scoring_algorithm: Option<ScoringAlgorithm>,
    pub performance: PerformanceConfig,
}

impl Default for Configuration {
    /// Built-in rule set with the balanced scoring algorithm.
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            max_categories: 3,
            rules: defaults::standard_rules(),
            custom_rules: Vec::new(),
            category_weights: defaults::category_weights(),
            priority_weights: defaults::priority_weights(),
            confidence_thresholds: HashMap::new(),
            priority_estimation: PriorityEstimationConfig::default(),
            scoring_algorithm: Some(ScoringAlgorithm::balanced()),
            performance: PerformanceConfig::default(),
        }
    }
}

impl Configuration {
    /// Minimal configuration used when a supplied configuration cannot be
    /// loaded: no rules, conservative thresholds, fixed default scoring.
    pub fn minimal() -> Self {
        Self {
            min_confidence: 0.5,
            max_categories: 1,
            rules: Vec::new(),
            custom_rules: Vec::new(),
            category_weights: WeightTable::default(),
            priority_weights: WeightTable::default(),
            confidence_thresholds: HashMap::new(),
            priority_estimation: PriorityEstimationConfig::default(),
            scoring_algorithm: None,
            performance: PerformanceConfig::default(),
        }
    }

    /// Standard rules followed by custom rules, in declaration order.
    pub fn all_rules(&self) -> impl Iterator<Item = &ClassificationRule> {
        self.rules.iter().chain(self.custom_rules.iter())
    }

    /// Append a custom rule
    pub fn with_custom_rule(mut self, rule: ClassificationRule) -> Self {
        self.custom_rules.push(rule);
        self
    }

    /// Check value ranges and rule-id uniqueness.
    pub fn validate(&self) -> TriageResult<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(TriageError::validation(format!(
                "minConfidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }

        let mut seen = HashSet::new();
        for rule in self.all_rules() {
            if rule.id.trim().is_empty() {
                return Err(TriageError::validation(format!(
                    "rule '{}' has an empty id",
                    rule.name
                )));
            }
            if !seen.insert(rule.id.as_str()) {
                return Err(TriageError::validation(format!(
                    "duplicate rule id '{}'",
                    rule.id
                )));
            }
            if !rule.weight.is_finite() || rule.weight < 0.0 {
                return Err(TriageError::validation(format!(
                    "rule '{}' has invalid weight {}",
                    rule.id, rule.weight
                )));
            }
        }

        for (category, threshold) in &self.confidence_thresholds {
            threshold.validate().map_err(|msg| {
                TriageError::validation(format!("confidenceThresholds.{category}: {msg}"))
            })?;
        }

        for rule in &self.priority_estimation.rules {
            if let Some(min) = rule.conditions.min_confidence {
                if !(0.0..=1.0).contains(&min) {
                    return Err(TriageError::validation(format!(
                        "priority rule '{}' has minConfidence {} outside [0, 1]",
                        rule.id, min
                    )));
                }
            }
        }

        if let Some(algorithm) = &self.scoring_algorithm {
            let w = &algorithm.weights;
            if [w.category, w.priority, w.recency, w.custom]
                .iter()
                .any(|v| !v.is_finite() || *v < 0.0)
            {
                return Err(TriageError::validation(format!(
                    "scoring algorithm '{}' has a negative or non-finite weight",
                    algorithm.name
                )));
            }
        }

        let batch = &self.performance.batch_processing;
        if batch.batch_size == 0 {
            return Err(TriageError::validation("batchSize must be at least 1"));
        }
        if batch.parallelism == 0 {
            return Err(TriageError::validation("parallelism must be at least 1"));
        }

        Ok(())
    }

    /// Apply `TRIAGE_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup. Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("TRIAGE_MIN_CONFIDENCE").and_then(|v| v.parse().ok()) {
            self.min_confidence = v;
        }
        if let Some(v) = lookup("TRIAGE_MAX_CATEGORIES").and_then(|v| v.parse().ok()) {
            self.max_categories = v;
        }
        if let Some(v) = lookup("TRIAGE_CACHE_ENABLED") {
            self.performance.caching.enabled = v.to_lowercase() == "true" || v == "1";
        }
        if let Some(v) = lookup("TRIAGE_CACHE_TTL_SECS").and_then(|v| v.parse().ok()) {
            self.performance.caching.ttl = v;
        }
        if let Some(v) = lookup("TRIAGE_BATCH_SIZE").and_then(|v| v.parse().ok()) {
            self.performance.batch_processing.batch_size = v;
        }
        if let Some(v) = lookup("TRIAGE_PARALLELISM").and_then(|v| v.parse().ok()) {
            self.performance.batch_processing.parallelism = v;
        }
    }
}

/// Category or priority name → weight, with a [`DEFAULT_WEIGHT`] fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightTable(HashMap<String, f64>);

impl WeightTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl AsRef<str>, weight: f64) -> Self {
        self.insert(key, weight);
        self
    }

    pub fn insert(&mut self, key: impl AsRef<str>, weight: f64) {
        self.0.insert(key.as_ref().to_lowercase(), weight);
    }

    /// Weight for `key`, or [`DEFAULT_WEIGHT`] when absent or non-finite.
    pub fn weight_or_default(&self, key: &str) -> f64 {
        self.0
            .get(&key.to_lowercase())
            .copied()
            .filter(|w| w.is_finite())
            .unwrap_or(DEFAULT_WEIGHT)
    }

    pub fn category(&self, category: Category) -> f64 {
        self.weight_or_default(category.as_str())
    }

    pub fn priority(&self, priority: Priority) -> f64 {
        self.weight_or_default(priority.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A single classification rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRule {
    pub id: String,
    pub name: String,
    pub category: Category,
    /// Multiplies the raw match score
    #[serde(default = "default_rule_weight")]
    pub weight: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub conditions: RuleConditions,
}

fn default_rule_weight() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl ClassificationRule {
    /// Create an enabled rule with weight 1.0 and no conditions.
    pub fn new(id: &str, name: &str, category: Category) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category,
            weight: 1.0,
            enabled: true,
            conditions: RuleConditions::default(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn title_keywords(mut self, keywords: &[&str]) -> Self {
        self.conditions.title_keywords = to_strings(keywords);
        self
    }

    pub fn body_keywords(mut self, keywords: &[&str]) -> Self {
        self.conditions.body_keywords = to_strings(keywords);
        self
    }

    pub fn labels(mut self, labels: &[&str]) -> Self {
        self.conditions.labels = to_strings(labels);
        self
    }

    pub fn title_patterns(mut self, patterns: &[&str]) -> Self {
        self.conditions.title_patterns = to_strings(patterns);
        self
    }

    pub fn body_patterns(mut self, patterns: &[&str]) -> Self {
        self.conditions.body_patterns = to_strings(patterns);
        self
    }

    pub fn exclude_keywords(mut self, keywords: &[&str]) -> Self {
        self.conditions.exclude_keywords = to_strings(keywords);
        self
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Match conditions. An empty list means the clause is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleConditions {
    pub title_keywords: Vec<String>,
    pub body_keywords: Vec<String>,
    /// Substring-matched against existing labels
    pub labels: Vec<String>,
    /// Regexes, optionally in `/body/flags` form
    pub title_patterns: Vec<String>,
    pub body_patterns: Vec<String>,
    /// Any match in title or body zeroes the rule
    pub exclude_keywords: Vec<String>,
}

/// Per-category confidence clamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceThreshold {
    pub min_confidence: f64,
    pub max_confidence: f64,
    #[serde(default = "default_rule_weight")]
    pub adjustment_factor: f64,
}

impl ConfidenceThreshold {
    pub fn new(min_confidence: f64, max_confidence: f64, adjustment_factor: f64) -> Self {
        Self {
            min_confidence,
            max_confidence,
            adjustment_factor,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.min_confidence)
            || !(0.0..=1.0).contains(&self.max_confidence)
        {
            return Err("bounds must be within [0, 1]".to_string());
        }
        if self.min_confidence > self.max_confidence {
            return Err(format!(
                "minConfidence {} exceeds maxConfidence {}",
                self.min_confidence, self.max_confidence
            ));
        }
        if !self.adjustment_factor.is_finite() || self.adjustment_factor < 0.0 {
            return Err(format!(
                "adjustmentFactor {} must be a non-negative number",
                self.adjustment_factor
            ));
        }
        Ok(())
    }
}

/// Priority estimation settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriorityEstimationConfig {
    /// Evaluated in order; first enabled rule whose conditions hold wins
    pub rules: Vec<PriorityRule>,
    /// Used when nothing else decides. Defaults to `low`.
    pub fallback_priority: Option<Priority>,
}

impl PriorityEstimationConfig {
    pub fn fallback(&self) -> Priority {
        self.fallback_priority.unwrap_or(Priority::Low)
    }
}

/// A configurable priority rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityRule {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub conditions: PriorityConditions,
    pub result_priority: Priority,
    #[serde(default = "default_rule_weight")]
    pub weight: f64,
}

impl PriorityRule {
    pub fn new(id: &str, result_priority: Priority) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            enabled: true,
            conditions: PriorityConditions::default(),
            result_priority,
            weight: 1.0,
        }
    }

    pub fn with_conditions(mut self, conditions: PriorityConditions) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Priority rule clauses. All specified clauses must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriorityConditions {
    /// Categories to overlap with the issue's classifications
    pub categories: Vec<Category>,
    /// Required overlap with `categories` (defaults to 1)
    pub min_category_matches: Option<usize>,
    /// At least one must appear in title or body
    pub keywords: Vec<String>,
    /// All must be present on the issue
    pub labels: Vec<String>,
    pub min_age_days: Option<i64>,
    /// Highest classification confidence must reach this
    pub min_confidence: Option<f64>,
}

/// Named weight table for the scoring engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringAlgorithm {
    pub name: String,
    pub weights: ScoringWeights,
    #[serde(default)]
    pub custom_factors: Vec<CustomFactor>,
}

impl ScoringAlgorithm {
    /// 40/40/10/10 over category/priority/recency/custom.
    pub fn balanced() -> Self {
        Self {
            name: "balanced".to_string(),
            weights: ScoringWeights {
                category: 40.0,
                priority: 40.0,
                recency: 10.0,
                custom: 10.0,
            },
            custom_factors: Vec::new(),
        }
    }

    pub fn with_factor(mut self, factor: CustomFactor) -> Self {
        self.custom_factors.push(factor);
        self
    }
}

/// Relative weights, conventionally summing toward 100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub category: f64,
    pub priority: f64,
    pub recency: f64,
    pub custom: f64,
}

/// Extra scoring term configured per deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFactor {
    pub name: String,
    pub weight: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl CustomFactor {
    pub fn new(name: &str, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            weight,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerformanceConfig {
    pub caching: CachingConfig,
    pub batch_processing: BatchProcessingConfig,
    /// Per-rule evaluation budget in milliseconds (0 = unlimited)
    pub rule_time_budget_ms: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            caching: CachingConfig::default(),
            batch_processing: BatchProcessingConfig::default(),
            rule_time_budget_ms: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachingConfig {
    pub enabled: bool,
    /// Entry lifetime in seconds
    pub ttl: u64,
}

impl Default for CachingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchProcessingConfig {
    pub batch_size: usize,
    pub parallelism: usize,
}

impl Default for BatchProcessingConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            parallelism: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Configuration::default();
        config.validate().unwrap();
        assert!(!config.rules.is_empty());
        assert!(Configuration::minimal().validate().is_ok());
        assert!(Configuration::minimal().rules.is_empty());
    }

    #[test]
    fn test_weight_table_defaults_missing_keys() {
        let table = WeightTable::new().with("Security", 1.0);
        assert_eq!(table.category(Category::Security), 1.0);
        assert_eq!(table.category(Category::Wontfix), DEFAULT_WEIGHT);
        assert_eq!(table.weight_or_default("not-a-category"), DEFAULT_WEIGHT);
    }

    #[test]
    fn test_weight_table_ignores_non_finite() {
        let table = WeightTable::new().with("bug", f64::NAN);
        assert_eq!(table.category(Category::Bug), DEFAULT_WEIGHT);
    }

    #[test]
    fn test_validate_rejects_duplicate_rule_ids() {
        let config = Configuration::minimal()
            .with_custom_rule(ClassificationRule::new("r1", "one", Category::Bug))
            .with_custom_rule(ClassificationRule::new("r1", "two", Category::Feature));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate rule id 'r1'"));
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut config = Configuration::minimal();
        config
            .confidence_thresholds
            .insert(Category::Bug, ConfidenceThreshold::new(0.8, 0.2, 1.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_parallelism() {
        let mut config = Configuration::minimal();
        config.performance.batch_processing.parallelism = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_min_confidence() {
        let mut config = Configuration::minimal();
        config.min_confidence = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_apply_parsed_values() {
        let vars: HashMap<&str, &str> = [
            ("TRIAGE_MIN_CONFIDENCE", "0.6"),
            ("TRIAGE_CACHE_ENABLED", "false"),
            ("TRIAGE_CACHE_TTL_SECS", "5"),
            ("TRIAGE_PARALLELISM", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = Configuration::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.min_confidence, 0.6);
        assert!(!config.performance.caching.enabled);
        assert_eq!(config.performance.caching.ttl, 5);
        assert_eq!(config.performance.batch_processing.parallelism, 4);
    }

    #[test]
    fn test_rule_deserializes_with_defaults() {
        let json = r#"{
            "id": "sec",
            "name": "Security",
            "category": "security",
            "conditions": { "titleKeywords": ["cve"] }
        }"#;
        let rule: ClassificationRule = serde_json::from_str(json).unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.weight, 1.0);
        assert_eq!(rule.conditions.title_keywords, vec!["cve"]);
        assert!(rule.conditions.body_patterns.is_empty());
    }

    #[test]
    fn test_fallback_priority_defaults_to_low() {
        assert_eq!(PriorityEstimationConfig::default().fallback(), Priority::Low);
    }
}
