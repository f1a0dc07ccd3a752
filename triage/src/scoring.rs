//! Ranking score
//!
//! ```text
//! category = categoryWeights[primary]   (default 0.5) × weights.category
//! priority = priorityWeights[estimated] (default 0.5) × weights.priority
//! recency  = 0
//! custom   = Σ enabled factor weights × weights.custom   (weights.custom > 0)
//! score    = round(Σ × 10) / 10, clamped to [0, 100]
//! ```

use crate::config::Configuration;
use crate::issue::{Category, Priority};
use serde::{Deserialize, Serialize};

pub const MAX_SCORE: f64 = 100.0;

/// Values used when no scoring algorithm is configured.
const UNCONFIGURED_COMPONENT: f64 = 25.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub category: f64,
    pub priority: f64,
    /// Always 0.0
    pub recency: f64,
    pub custom: f64,
}

impl ScoreBreakdown {
    pub fn unconfigured() -> Self {
        Self {
            category: UNCONFIGURED_COMPONENT,
            priority: UNCONFIGURED_COMPONENT,
            recency: 0.0,
            custom: 0.0,
        }
    }

    pub fn total(&self) -> f64 {
        self.category + self.priority + self.recency + self.custom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub value: f64,
    pub breakdown: ScoreBreakdown,
}

pub struct ScoringEngine;

impl ScoringEngine {
    pub fn score(category: Category, priority: Priority, config: &Configuration) -> Score {
        let breakdown = match &config.scoring_algorithm {
            None => ScoreBreakdown::unconfigured(),
            Some(algorithm) => {
                let w = algorithm.weights;
                let custom = if w.custom > 0.0 {
                    algorithm
                        .custom_factors
                        .iter()
                        .filter(|f| f.enabled)
                        .map(|f| f.weight)
                        .sum::<f64>()
                        * w.custom
                } else {
                    0.0
                };
                ScoreBreakdown {
                    category: config.category_weights.category(category) * w.category,
                    priority: config.priority_weights.priority(priority) * w.priority,
                    recency: 0.0,
                    custom,
                }
            }
        };

        Score {
            value: round_score(breakdown.total()),
            breakdown,
        }
    }
}

/// One decimal place, clamped to `[0, MAX_SCORE]`; NaN maps to 0.
pub fn round_score(raw: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    ((raw * 10.0).round() / 10.0).clamp(0.0, MAX_SCORE)
}
