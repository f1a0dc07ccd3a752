//! Classification pipeline
//!
//! Turns an issue's title, body and labels into ranked, confidence-weighted
//! category assignments.
//!
//! ```text
//! Issue ──► RuleSet (compiled rules + custom rules)
//!             │  matcher: additive keyword/label/pattern score × weight, clamped
//!             ▼
//!           candidates ─► minConfidence filter ─► thresholds ─► stable sort ─► truncate
//!             ▼
//!           Resolution { primary category, ranked classifications }
//! ```

pub mod matcher;
pub mod pattern;
pub mod resolver;
pub mod thresholds;

pub use matcher::{CompiledRule, MatchInput, RuleMatcher, RuleSet};
pub use pattern::{compile_pattern, split_delimiters, PatternParts};
pub use resolver::{ClassificationResolver, Resolution};
pub use thresholds::apply_thresholds;

use crate::issue::Category;
use serde::{Deserialize, Serialize};

/// Outcome of applying one rule to one issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryClassification {
    pub category: Category,
    /// Always within [0, 1]
    pub confidence: f64,
    /// Human-readable match explanations, in evaluation order
    pub reasons: Vec<String>,
    /// Title/body keywords that matched
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
}

impl CategoryClassification {
    /// A zero-confidence entry with no rule attached.
    pub fn placeholder(category: Category) -> Self {
        Self {
            category,
            confidence: 0.0,
            reasons: Vec::new(),
            keywords: Vec::new(),
            rule_id: None,
            rule_name: None,
        }
    }
}
