//! Classification resolver
//!
//! Runs every enabled rule, filters, adjusts, ranks and truncates the
//! results, and picks the primary category.

use super::matcher::{MatchInput, RuleMatcher, RuleSet};
use super::thresholds::apply_thresholds;
use super::CategoryClassification;
use crate::config::Configuration;
use crate::issue::{Category, Issue};
use crate::priority::parse_priority_label;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Ranked classification outcome for one issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub primary_category: Category,
    pub primary_confidence: f64,
    /// Sorted by descending confidence, at most `maxCategories` long
    pub classifications: Vec<CategoryClassification>,
    /// Enabled rules evaluated
    pub rules_applied: usize,
    /// Rules that produced a non-zero confidence
    pub rules_matched: usize,
}

impl Resolution {
    fn empty(rules_applied: usize, rules_matched: usize) -> Self {
        Self {
            primary_category: Category::DEFAULT,
            primary_confidence: 0.0,
            classifications: Vec::new(),
            rules_applied,
            rules_matched,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClassificationResolver {
    matcher: RuleMatcher,
}

impl ClassificationResolver {
    pub fn new(matcher: RuleMatcher) -> Self {
        Self { matcher }
    }

    pub fn resolve(&self, issue: &Issue, rules: &RuleSet, config: &Configuration) -> Resolution {
        let input = MatchInput::new(issue);

        let candidates: Vec<CategoryClassification> = rules
            .rules()
            .iter()
            .map(|rule| self.matcher.evaluate(rule, &input))
            .collect();
        let rules_applied = candidates.len();
        let rules_matched = candidates.iter().filter(|c| c.confidence > 0.0).count();

        let passing: Vec<CategoryClassification> = candidates
            .into_iter()
            .filter(|c| c.confidence > 0.0 && c.confidence >= config.min_confidence)
            .collect();

        let mut ranked = apply_thresholds(passing, &config.confidence_thresholds);
        // stable: equal confidences keep rule declaration order
        ranked.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        });
        ranked.truncate(config.max_categories);

        let mut resolution = match ranked.first() {
            Some(top) => Resolution {
                primary_category: top.category,
                primary_confidence: top.confidence,
                classifications: Vec::new(),
                rules_applied,
                rules_matched,
            },
            None => Resolution::empty(rules_applied, rules_matched),
        };
        resolution.classifications = ranked;

        if config.max_categories > 0 {
            annotate_priority_label(issue, &mut resolution.classifications);
        }

        debug!(
            issue = issue.number,
            primary = %resolution.primary_category,
            confidence = resolution.primary_confidence,
            kept = resolution.classifications.len(),
            rules_applied,
            rules_matched,
            "Resolved classification"
        );
        resolution
    }
}

/// Note an explicit priority label on the top classification, creating a
/// zero-confidence default entry if nothing else matched.
fn annotate_priority_label(issue: &Issue, classifications: &mut Vec<CategoryClassification>) {
    let Some((label, priority)) = issue
        .labels
        .iter()
        .find_map(|l| parse_priority_label(l).map(|p| (l, p)))
    else {
        return;
    };

    let reason = format!("Priority label present: \"{label}\" ({priority})");
    match classifications.first_mut() {
        Some(top) => top.reasons.push(reason),
        None => {
            let mut placeholder = CategoryClassification::placeholder(Category::DEFAULT);
            placeholder.reasons.push(reason);
            classifications.push(placeholder);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClassificationRule, ConfidenceThreshold};

    fn config_with(rules: Vec<ClassificationRule>) -> Configuration {
        let mut config = Configuration::minimal();
        config.min_confidence = 0.2;
        config.max_categories = 3;
        config.custom_rules = rules;
        config
    }

    fn resolve(config: &Configuration, issue: &Issue) -> Resolution {
        ClassificationResolver::default().resolve(issue, &RuleSet::compile(config), config)
    }

    #[test]
    fn test_ranks_by_confidence() {
        let config = config_with(vec![
            ClassificationRule::new("feat", "Feature", Category::Feature).title_keywords(&["add"]),
            ClassificationRule::new("bug", "Bug", Category::Bug)
                .title_keywords(&["crash"])
                .labels(&["bug"]),
        ]);
        let issue = Issue::new(1, 1, "Add guard for crash").with_labels(["bug"]);
        let r = resolve(&config, &issue);

        assert_eq!(r.primary_category, Category::Bug);
        assert!((r.primary_confidence - 0.7).abs() < 1e-9);
        assert_eq!(r.classifications.len(), 2);
        assert_eq!(r.classifications[1].category, Category::Feature);
        assert_eq!(r.rules_applied, 2);
        assert_eq!(r.rules_matched, 2);
    }

    #[test]
    fn test_ties_keep_declaration_order() {
        let config = config_with(vec![
            ClassificationRule::new("a", "A", Category::Refactor).title_keywords(&["cleanup"]),
            ClassificationRule::new("b", "B", Category::Test).title_keywords(&["cleanup"]),
            ClassificationRule::new("c", "C", Category::CiCd).title_keywords(&["cleanup"]),
        ]);
        let r = resolve(&config, &Issue::new(1, 1, "cleanup"));
        let order: Vec<_> = r.classifications.iter().map(|c| c.category).collect();
        assert_eq!(order, vec![Category::Refactor, Category::Test, Category::CiCd]);
    }

    #[test]
    fn test_min_confidence_filters_before_ranking() {
        let mut config = config_with(vec![
            ClassificationRule::new("weak", "Weak", Category::Documentation)
                .body_keywords(&["docs"]),
            ClassificationRule::new("strong", "Strong", Category::Bug).labels(&["bug"]),
        ]);
        config.min_confidence = 0.3;
        let issue = Issue::new(1, 1, "x").with_body("see docs").with_labels(["bug"]);
        let r = resolve(&config, &issue);
        assert_eq!(r.classifications.len(), 1);
        assert_eq!(r.primary_category, Category::Bug);
    }

    #[test]
    fn test_truncates_to_max_categories() {
        let mut config = config_with(
            (0..5)
                .map(|i| {
                    ClassificationRule::new(&format!("r{i}"), "R", Category::Bug)
                        .title_keywords(&["x"])
                })
                .collect(),
        );
        config.max_categories = 2;
        let r = resolve(&config, &Issue::new(1, 1, "x"));
        assert_eq!(r.classifications.len(), 2);
    }

    #[test]
    fn test_zero_max_categories_yields_default() {
        let mut config = config_with(vec![
            ClassificationRule::new("bug", "Bug", Category::Bug).title_keywords(&["crash"]),
        ]);
        config.max_categories = 0;
        let issue = Issue::new(1, 1, "crash").with_labels(["priority: high"]);
        let r = resolve(&config, &issue);
        assert!(r.classifications.is_empty());
        assert_eq!(r.primary_category, Category::DEFAULT);
        assert_eq!(r.primary_confidence, 0.0);
    }

    #[test]
    fn test_disabled_rules_never_contribute() {
        let config = config_with(vec![ClassificationRule::new("bug", "Bug", Category::Bug)
            .title_keywords(&["crash"])
            .with_enabled(false)]);
        let r = resolve(&config, &Issue::new(1, 1, "crash"));
        assert!(r.classifications.is_empty());
        assert_eq!(r.rules_applied, 0);
        assert_eq!(r.primary_category, Category::Question);
    }

    #[test]
    fn test_zero_min_confidence_still_drops_non_matches() {
        let mut config = config_with(vec![
            ClassificationRule::new("bug", "Bug", Category::Bug).title_keywords(&["crash"]),
        ]);
        config.min_confidence = 0.0;
        let r = resolve(&config, &Issue::new(1, 1, "unrelated"));
        assert!(r.classifications.is_empty());
        assert_eq!(r.primary_category, Category::DEFAULT);
    }

    #[test]
    fn test_thresholds_reorder_results() {
        let mut config = config_with(vec![
            ClassificationRule::new("bug", "Bug", Category::Bug).labels(&["bug"]),
            ClassificationRule::new("perf", "Perf", Category::Performance)
                .title_keywords(&["slow"]),
        ]);
        config
            .confidence_thresholds
            .insert(Category::Performance, ConfidenceThreshold::new(0.1, 1.0, 2.0));
        let issue = Issue::new(1, 1, "slow").with_labels(["bug"]);
        let r = resolve(&config, &issue);
        assert_eq!(r.primary_category, Category::Performance);
        assert!((r.primary_confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_priority_label_annotates_top_classification() {
        let config = config_with(vec![
            ClassificationRule::new("bug", "Bug", Category::Bug).labels(&["bug"]),
        ]);
        let issue = Issue::new(1, 1, "x").with_labels(["bug", "Priority:High"]);
        let r = resolve(&config, &issue);
        assert_eq!(r.primary_category, Category::Bug);
        let last = r.classifications[0].reasons.last().unwrap();
        assert!(last.contains("Priority:High"));
    }

    #[test]
    fn test_priority_label_synthesizes_placeholder() {
        let config = config_with(vec![]);
        let issue = Issue::new(1, 1, "x").with_labels(["priority: critical"]);
        let r = resolve(&config, &issue);
        assert_eq!(r.classifications.len(), 1);
        assert_eq!(r.classifications[0].category, Category::DEFAULT);
        assert_eq!(r.classifications[0].confidence, 0.0);
        assert_eq!(r.primary_category, Category::DEFAULT);
        assert_eq!(r.primary_confidence, 0.0);
    }
}
