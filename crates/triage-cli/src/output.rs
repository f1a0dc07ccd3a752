//! Report rendering for stdout.

use anyhow::{Context, Result};
use serde::Serialize;
use triage::{BatchResult, ScoredTask};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TopTasksReport<'a> {
    total_analyzed: usize,
    average_score: f64,
    processing_time_ms: f64,
    cache_hit_rate: f64,
    failed_tasks: usize,
    top_tasks: Vec<&'a ScoredTask>,
}

pub fn render(result: &BatchResult, top: usize, json: bool) -> Result<String> {
    if !json {
        return Ok(result.format_report(top));
    }
    let report = TopTasksReport {
        total_analyzed: result.total_analyzed,
        average_score: result.average_score,
        processing_time_ms: result.processing_time_ms,
        cache_hit_rate: result.cache_hit_rate,
        failed_tasks: result.failed_tasks,
        top_tasks: result.top_tasks(top),
    };
    serde_json::to_string_pretty(&report).context("Failed to serialize triage report")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_by_default() {
        let out = render(&BatchResult::default(), 5, false).unwrap();
        assert!(out.starts_with("# Triage Results"));
    }

    #[test]
    fn test_json_report_shape() {
        let out = render(&BatchResult::default(), 5, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["totalAnalyzed"], 0);
        assert_eq!(value["failedTasks"], 0);
        assert!(value["topTasks"].as_array().unwrap().is_empty());
    }
}
