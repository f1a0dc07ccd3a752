//! Per-category confidence adjustment.

use super::CategoryClassification;
use crate::config::ConfidenceThreshold;
use crate::issue::Category;
use std::collections::HashMap;

/// Scale each classification by its category's adjustment factor and clamp
/// it into the category's `[minConfidence, maxConfidence]` window.
///
/// Classifications whose scaled confidence falls below the window are
/// dropped. Categories without a threshold entry pass through untouched.
pub fn apply_thresholds(
    classifications: Vec<CategoryClassification>,
    thresholds: &HashMap<Category, ConfidenceThreshold>,
) -> Vec<CategoryClassification> {
    if thresholds.is_empty() {
        return classifications;
    }

    classifications
        .into_iter()
        .filter_map(|mut c| {
            let Some(t) = thresholds.get(&c.category) else {
                return Some(c);
            };
            let adjusted = c.confidence * t.adjustment_factor;
            if adjusted < t.min_confidence {
                return None;
            }
            c.confidence = adjusted.min(t.max_confidence).clamp(0.0, 1.0);
            Some(c)
        })
        .collect()
}
