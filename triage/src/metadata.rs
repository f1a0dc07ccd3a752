//! Structural facts about an issue, reported alongside its classification.

use crate::issue::Issue;
use serde::{Deserialize, Serialize};

const REPRODUCTION_MARKERS: &[&str] = &[
    "steps to reproduce",
    "to reproduce",
    "reproduction steps",
    "repro steps",
    "how to reproduce",
];

const EXPECTED_MARKERS: &[&str] = &[
    "expected behavior",
    "expected behaviour",
    "expected result",
    "expected outcome",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueMetadata {
    pub title_length: usize,
    pub body_length: usize,
    pub has_code_blocks: bool,
    pub has_reproduction_steps: bool,
    pub has_expected_behavior: bool,
    pub label_count: usize,
    pub labels: Vec<String>,
    pub rules_applied: usize,
    pub rules_matched: usize,
}

impl IssueMetadata {
    /// Lengths are in characters, not bytes.
    pub fn extract(issue: &Issue, rules_applied: usize, rules_matched: usize) -> Self {
        let body = issue.body_text();
        let body_lower = body.to_lowercase();
        Self {
            title_length: issue.title.chars().count(),
            body_length: body.chars().count(),
            has_code_blocks: body.contains("```"),
            has_reproduction_steps: REPRODUCTION_MARKERS.iter().any(|m| body_lower.contains(m)),
            has_expected_behavior: EXPECTED_MARKERS.iter().any(|m| body_lower.contains(m)),
            label_count: issue.labels.len(),
            labels: issue.labels.clone(),
            rules_applied,
            rules_matched,
        }
    }
}
