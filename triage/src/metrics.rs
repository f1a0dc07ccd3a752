//! Batch aggregation and reporting.

use crate::engine::IssueClassification;
use crate::issue::{Category, Issue, Priority};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One classified issue in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredTask {
    pub issue_id: u64,
    pub issue_number: u64,
    pub title: String,
    pub classification: IssueClassification,
}

impl ScoredTask {
    pub fn new(issue: &Issue, classification: IssueClassification) -> Self {
        Self {
            issue_id: issue.id,
            issue_number: issue.number,
            title: issue.title.clone(),
            classification,
        }
    }

    pub fn score(&self) -> f64 {
        self.classification.score
    }
}

/// Per-item timing over a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub average_processing_time_ms: f64,
    pub min_processing_time_ms: f64,
    pub max_processing_time_ms: f64,
    /// Items per second over the whole batch wall time
    pub throughput: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    /// Mean primary confidence
    pub average_confidence: f64,
    pub category_distribution: BTreeMap<Category, usize>,
    pub priority_distribution: BTreeMap<Priority, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    /// In input order
    pub tasks: Vec<ScoredTask>,
    pub total_analyzed: usize,
    pub average_score: f64,
    pub processing_time_ms: f64,
    /// Engine-lifetime cache hit rate at the end of the batch
    pub cache_hit_rate: f64,
    /// Tasks whose classification failed and carry the unclassified default
    pub failed_tasks: usize,
    pub performance_metrics: PerformanceMetrics,
    pub quality_metrics: QualityMetrics,
}

impl BatchResult {
    pub fn from_tasks(tasks: Vec<ScoredTask>, processing_time_ms: f64, cache_hit_rate: f64) -> Self {
        let n = tasks.len();
        if n == 0 {
            return Self {
                processing_time_ms,
                cache_hit_rate,
                ..Self::default()
            };
        }
        let count = n as f64;

        let times: Vec<f64> = tasks
            .iter()
            .map(|t| t.classification.processing_time_ms)
            .collect();
        let throughput = if processing_time_ms > 0.0 {
            count / (processing_time_ms / 1000.0)
        } else {
            0.0
        };
        let performance_metrics = PerformanceMetrics {
            average_processing_time_ms: times.iter().sum::<f64>() / count,
            min_processing_time_ms: times.iter().copied().fold(f64::INFINITY, f64::min),
            max_processing_time_ms: times.iter().copied().fold(0.0, f64::max),
            throughput,
        };

        let mut quality_metrics = QualityMetrics {
            average_confidence: tasks
                .iter()
                .map(|t| t.classification.primary_confidence)
                .sum::<f64>()
                / count,
            ..QualityMetrics::default()
        };
        for task in &tasks {
            *quality_metrics
                .category_distribution
                .entry(task.classification.primary_category)
                .or_default() += 1;
            *quality_metrics
                .priority_distribution
                .entry(task.classification.estimated_priority)
                .or_default() += 1;
        }

        Self {
            failed_tasks: 0,
            average_score: tasks.iter().map(ScoredTask::score).sum::<f64>() / count,
            total_analyzed: n,
            tasks,
            processing_time_ms,
            cache_hit_rate,
            performance_metrics,
            quality_metrics,
        }
    }

    /// Highest scores first; ties by ascending issue number.
    pub fn top_tasks(&self, n: usize) -> Vec<&ScoredTask> {
        let mut ranked: Vec<&ScoredTask> = self.tasks.iter().collect();
        ranked.sort_by(|a, b| {
            b.score()
                .partial_cmp(&a.score())
                .unwrap_or(Ordering::Equal)
                .then(a.issue_number.cmp(&b.issue_number))
        });
        ranked.truncate(n);
        ranked
    }

    /// Markdown summary with the top `top` tasks.
    pub fn format_report(&self, top: usize) -> String {
        let mut report = String::new();

        report.push_str("# Triage Results\n\n");

        report.push_str("## Summary\n\n");
        report.push_str(&format!(
            "| Metric | Value |\n\
             |--------|-------|\n\
             | Issues Analyzed | {} |\n\
             | Average Score | {:.1} |\n\
             | Average Confidence | {:.2} |\n\
             | Cache Hit Rate | {:.1}% |\n\
             | Failed | {} |\n\n",
            self.total_analyzed,
            self.average_score,
            self.quality_metrics.average_confidence,
            self.cache_hit_rate * 100.0,
            self.failed_tasks
        ));

        report.push_str("## Performance\n\n");
        report.push_str(&format!(
            "- Total Time: {:.1}ms\n\
             - Avg Per Issue: {:.3}ms\n\
             - Min / Max: {:.3}ms / {:.3}ms\n\
             - Throughput: {:.1} issues/s\n\n",
            self.processing_time_ms,
            self.performance_metrics.average_processing_time_ms,
            self.performance_metrics.min_processing_time_ms,
            self.performance_metrics.max_processing_time_ms,
            self.performance_metrics.throughput
        ));

        if !self.quality_metrics.category_distribution.is_empty() {
            report.push_str("## Categories\n\n");
            report.push_str("| Category | Issues |\n|----------|--------|\n");
            for (category, count) in &self.quality_metrics.category_distribution {
                report.push_str(&format!("| {category} | {count} |\n"));
            }
            report.push('\n');
        }

        if !self.quality_metrics.priority_distribution.is_empty() {
            report.push_str("## Priorities\n\n");
            report.push_str("| Priority | Issues |\n|----------|--------|\n");
            for (priority, count) in &self.quality_metrics.priority_distribution {
                report.push_str(&format!("| {priority} | {count} |\n"));
            }
            report.push('\n');
        }

        let ranked = self.top_tasks(top);
        if !ranked.is_empty() {
            report.push_str("## Top Tasks\n\n");
            report.push_str(
                "| # | Issue | Title | Category | Priority | Score |\n\
                 |---|-------|-------|----------|----------|-------|\n",
            );
            for (rank, task) in ranked.iter().enumerate() {
                report.push_str(&format!(
                    "| {} | #{} | {} | {} | {} | {:.1} |\n",
                    rank + 1,
                    task.issue_number,
                    task.title.replace('|', "\\|"),
                    task.classification.primary_category,
                    task.classification.estimated_priority,
                    task.score()
                ));
            }
            report.push('\n');
        }

        report
    }
}
