//! Priority estimation
//!
//! Precedence, first match wins:
//!
//! ```text
//! 1. label        "priority: critical|high|medium|low" on the issue
//! 2. rule         first enabled PriorityRule whose clauses all hold
//! 3. heuristic    security > 0.7 → critical, bug > 0.7 | performance → high,
//!                 feature | enhancement → medium
//! 4. fallback     fallbackPriority (default low)
//! ```

use crate::classify::CategoryClassification;
use crate::config::{PriorityConditions, PriorityEstimationConfig, PriorityRule};
use crate::issue::{Category, Issue, Priority};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Confidence above which security and bug classifications escalate priority.
pub const ESCALATION_CONFIDENCE: f64 = 0.7;

/// Multiplier applied to the mean classification confidence.
const PRIORITY_CONFIDENCE_BOOST: f64 = 1.2;

/// Which precedence tier decided the priority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PrioritySource {
    Label { label: String },
    Rule {
        #[serde(rename = "ruleId")]
        rule_id: String,
    },
    Heuristic,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityEstimate {
    pub priority: Priority,
    pub confidence: f64,
    pub source: PrioritySource,
}

/// Parse `priority: high`, `Priority:High`, `type/priority : low` style labels.
///
/// Only critical, high, medium and low are recognised. Every occurrence of
/// `priority` is tried, so `priority/ops priority: high` still parses.
pub fn parse_priority_label(label: &str) -> Option<Priority> {
    let lower = label.to_lowercase();
    lower
        .match_indices("priority")
        .find_map(|(idx, keyword)| priority_after(&lower[idx + keyword.len()..]))
}

fn priority_after(rest: &str) -> Option<Priority> {
    let rest = rest.trim_start().strip_prefix(':')?.trim_start();
    let word: String = rest.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    match word.as_str() {
        "critical" => Some(Priority::Critical),
        "high" => Some(Priority::High),
        "medium" => Some(Priority::Medium),
        "low" => Some(Priority::Low),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct PriorityEstimator {
    config: PriorityEstimationConfig,
}

impl PriorityEstimator {
    pub fn new(config: PriorityEstimationConfig) -> Self {
        Self { config }
    }

    /// Estimate priority for an issue given its ranked classifications.
    pub fn estimate(
        &self,
        issue: &Issue,
        classifications: &[CategoryClassification],
        now: DateTime<Utc>,
    ) -> PriorityEstimate {
        let confidence = priority_confidence(classifications);

        if let Some((label, priority)) = issue
            .labels
            .iter()
            .find_map(|l| parse_priority_label(l).map(|p| (l.clone(), p)))
        {
            return PriorityEstimate {
                priority,
                confidence,
                source: PrioritySource::Label { label },
            };
        }

        if let Some(rule) = self
            .config
            .rules
            .iter()
            .find(|r| r.enabled && rule_holds(r, issue, classifications, now))
        {
            return PriorityEstimate {
                priority: rule.result_priority,
                confidence,
                source: PrioritySource::Rule {
                    rule_id: rule.id.clone(),
                },
            };
        }

        match self.heuristic(classifications) {
            Some(priority) => PriorityEstimate {
                priority,
                confidence,
                source: PrioritySource::Heuristic,
            },
            None => PriorityEstimate {
                priority: self.config.fallback(),
                confidence,
                source: PrioritySource::Fallback,
            },
        }
    }

    fn heuristic(&self, classifications: &[CategoryClassification]) -> Option<Priority> {
        let has = |category: Category, min: Option<f64>| {
            classifications
                .iter()
                .any(|c| c.category == category && min.map_or(c.confidence > 0.0, |m| c.confidence > m))
        };

        if has(Category::Security, Some(ESCALATION_CONFIDENCE)) {
            Some(Priority::Critical)
        } else if has(Category::Bug, Some(ESCALATION_CONFIDENCE)) || has(Category::Performance, None)
        {
            Some(Priority::High)
        } else if has(Category::Feature, None) || has(Category::Enhancement, None) {
            Some(Priority::Medium)
        } else {
            None
        }
    }
}

/// `min(1, mean(confidence) * 1.2)`, or 0 with nothing classified.
pub fn priority_confidence(classifications: &[CategoryClassification]) -> f64 {
    if classifications.is_empty() {
        return 0.0;
    }
    let mean =
        classifications.iter().map(|c| c.confidence).sum::<f64>() / classifications.len() as f64;
    (mean * PRIORITY_CONFIDENCE_BOOST).clamp(0.0, 1.0)
}

fn rule_holds(
    rule: &PriorityRule,
    issue: &Issue,
    classifications: &[CategoryClassification],
    now: DateTime<Utc>,
) -> bool {
    let c: &PriorityConditions = &rule.conditions;

    if !c.categories.is_empty() {
        let required = c.min_category_matches.unwrap_or(1);
        let overlap = c
            .categories
            .iter()
            .filter(|cat| classifications.iter().any(|cls| cls.category == **cat))
            .count();
        if overlap < required {
            return false;
        }
    }

    if !c.keywords.is_empty() {
        let text = format!("{} {}", issue.title, issue.body_text()).to_lowercase();
        if !c.keywords.iter().any(|k| text.contains(&k.to_lowercase())) {
            return false;
        }
    }

    if !c.labels.is_empty() {
        let labels = issue.labels_lower();
        if !c
            .labels
            .iter()
            .all(|want| labels.iter().any(|l| *l == want.to_lowercase()))
        {
            return false;
        }
    }

    if let Some(min_age) = c.min_age_days {
        if issue.age_days(now) < min_age {
            return false;
        }
    }

    if let Some(min_conf) = c.min_confidence {
        let best = classifications
            .iter()
            .map(|cls| cls.confidence)
            .fold(0.0_f64, f64::max);
        if best < min_conf {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn cls(category: Category, confidence: f64) -> CategoryClassification {
        CategoryClassification {
            confidence,
            ..CategoryClassification::placeholder(category)
        }
    }

    fn estimate(issue: &Issue, classifications: &[CategoryClassification]) -> PriorityEstimate {
        PriorityEstimator::default().estimate(issue, classifications, Utc::now())
    }

    #[test]
    fn test_parse_priority_label_variants() {
        assert_eq!(parse_priority_label("priority: high"), Some(Priority::High));
        assert_eq!(parse_priority_label("priority:critical"), Some(Priority::Critical));
        assert_eq!(parse_priority_label("Priority:  Low"), Some(Priority::Low));
        assert_eq!(parse_priority_label("area/priority: medium"), Some(Priority::Medium));
        assert_eq!(parse_priority_label("priority"), None);
        assert_eq!(parse_priority_label("priority: urgent"), None);
        assert_eq!(parse_priority_label("high priority"), None);
        assert_eq!(
            parse_priority_label("priority/ops priority: high"),
            Some(Priority::High)
        );
        assert_eq!(parse_priority_label("priority/ops"), None);
    }

    #[test]
    fn test_label_overrides_everything() {
        let issue = Issue::new(1, 1, "typo").with_labels(["priority: critical"]);
        let est = estimate(&issue, &[cls(Category::Documentation, 0.9)]);
        assert_eq!(est.priority, Priority::Critical);
        assert_eq!(
            est.source,
            PrioritySource::Label {
                label: "priority: critical".into()
            }
        );
    }

    #[test]
    fn test_heuristic_tiers() {
        let issue = Issue::new(1, 1, "x");
        assert_eq!(estimate(&issue, &[cls(Category::Security, 0.8)]).priority, Priority::Critical);
        assert_eq!(estimate(&issue, &[cls(Category::Security, 0.5)]).priority, Priority::Low);
        assert_eq!(estimate(&issue, &[cls(Category::Bug, 0.75)]).priority, Priority::High);
        assert_eq!(estimate(&issue, &[cls(Category::Bug, 0.7)]).priority, Priority::Low);
        assert_eq!(estimate(&issue, &[cls(Category::Performance, 0.3)]).priority, Priority::High);
        assert_eq!(estimate(&issue, &[cls(Category::Enhancement, 0.3)]).priority, Priority::Medium);
        assert_eq!(estimate(&issue, &[cls(Category::Question, 0.9)]).source, PrioritySource::Fallback);
    }

    #[test]
    fn test_empty_classifications_use_configured_fallback() {
        let config = PriorityEstimationConfig {
            rules: vec![],
            fallback_priority: Some(Priority::Backlog),
        };
        let est = PriorityEstimator::new(config).estimate(&Issue::new(1, 1, "x"), &[], Utc::now());
        assert_eq!(est.priority, Priority::Backlog);
        assert_eq!(est.confidence, 0.0);
    }

    #[test]
    fn test_rule_requires_all_clauses() {
        let now = Utc::now();
        let rule = PriorityRule::new("stale-bug", Priority::High).with_conditions(PriorityConditions {
            categories: vec![Category::Bug],
            keywords: vec!["regression".into()],
            min_age_days: Some(14),
            ..Default::default()
        });
        let estimator = PriorityEstimator::new(PriorityEstimationConfig {
            rules: vec![rule],
            fallback_priority: None,
        });
        let classified = [cls(Category::Bug, 0.4)];

        let old = Issue::new(1, 1, "Regression in parser").with_created_at(now - Duration::days(30));
        let est = estimator.estimate(&old, &classified, now);
        assert_eq!(est.priority, Priority::High);
        assert_eq!(est.source, PrioritySource::Rule { rule_id: "stale-bug".into() });

        let young = Issue::new(2, 2, "Regression in parser").with_created_at(now - Duration::days(2));
        assert_eq!(estimator.estimate(&young, &classified, now).source, PrioritySource::Fallback);

        let no_kw = Issue::new(3, 3, "Parser").with_created_at(now - Duration::days(30));
        assert_ne!(estimator.estimate(&no_kw, &classified, now).priority, Priority::High);
    }

    #[test]
    fn test_first_enabled_rule_wins() {
        let estimator = PriorityEstimator::new(PriorityEstimationConfig {
            rules: vec![
                PriorityRule::new("off", Priority::Critical).with_enabled(false),
                PriorityRule::new("label", Priority::Medium).with_conditions(PriorityConditions {
                    labels: vec!["Customer".into()],
                    ..Default::default()
                }),
                PriorityRule::new("catch-all", Priority::Backlog),
            ],
            fallback_priority: None,
        });
        let issue = Issue::new(1, 1, "x").with_labels(["customer"]);
        let est = estimator.estimate(&issue, &[], Utc::now());
        assert_eq!(est.priority, Priority::Medium);

        let plain = Issue::new(2, 2, "x");
        assert_eq!(estimator.estimate(&plain, &[], Utc::now()).priority, Priority::Backlog);
    }

    #[test]
    fn test_rule_min_confidence_and_category_overlap() {
        let estimator = PriorityEstimator::new(PriorityEstimationConfig {
            rules: vec![PriorityRule::new("pair", Priority::Critical).with_conditions(
                PriorityConditions {
                    categories: vec![Category::Security, Category::Bug],
                    min_category_matches: Some(2),
                    min_confidence: Some(0.5),
                    ..Default::default()
                },
            )],
            fallback_priority: None,
        });
        let issue = Issue::new(1, 1, "x");
        let both = [cls(Category::Security, 0.6), cls(Category::Bug, 0.3)];
        assert_eq!(estimator.estimate(&issue, &both, Utc::now()).priority, Priority::Critical);

        let one = [cls(Category::Security, 0.6)];
        assert_eq!(estimator.estimate(&issue, &one, Utc::now()).source, PrioritySource::Fallback);

        let weak = [cls(Category::Security, 0.4), cls(Category::Bug, 0.3)];
        assert_eq!(estimator.estimate(&issue, &weak, Utc::now()).source, PrioritySource::Fallback);
    }

    #[test]
    fn test_priority_confidence_formula() {
        assert_eq!(priority_confidence(&[]), 0.0);
        let c = priority_confidence(&[cls(Category::Bug, 0.5), cls(Category::Feature, 0.3)]);
        assert!((c - 0.48).abs() < 1e-9);
        assert_eq!(priority_confidence(&[cls(Category::Bug, 0.9)]), 1.0);
    }
}
