//! Issue sources
//!
//! Where issues come from is outside the engine. A source failure degrades
//! to a caller-supplied fallback dataset instead of aborting the run.

use crate::error::TriageResult;
use crate::issue::Issue;
use crate::resilience::DegradedResponse;
use async_trait::async_trait;
use tracing::{info, warn};

#[async_trait]
pub trait IssueSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_issues(&self) -> TriageResult<Vec<Issue>>;
}

/// Fetch from `source`, serving `fallback` as `Unavailable` on error.
pub async fn fetch_with_fallback(
    source: &dyn IssueSource,
    fallback: Vec<Issue>,
) -> DegradedResponse<Vec<Issue>> {
    match source.fetch_issues().await {
        Ok(issues) => {
            info!(source = source.name(), count = issues.len(), "Fetched issues");
            DegradedResponse::full(issues, source.name())
        }
        Err(e) => {
            warn!(
                source = source.name(),
                error = %e,
                recoverable = e.is_recoverable(),
                fallback = fallback.len(),
                "Issue source failed, serving fallback dataset"
            );
            DegradedResponse::unavailable(fallback, &e.to_string())
        }
    }
}

/// Fixed in-memory dataset.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    name: String,
    issues: Vec<Issue>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, issues: Vec<Issue>) -> Self {
        Self {
            name: name.into(),
            issues,
        }
    }
}

#[async_trait]
impl IssueSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_issues(&self) -> TriageResult<Vec<Issue>> {
        Ok(self.issues.clone())
    }
}
