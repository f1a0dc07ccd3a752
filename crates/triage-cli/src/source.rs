//! JSON file issue source.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use triage::{Issue, IssueSource, TriageError, TriageResult};

/// Accepts a bare array of issues or an `{ "issues": [...] }` envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum IssueDump {
    Bare(Vec<Issue>),
    Envelope { issues: Vec<Issue> },
}

#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    name: String,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }
}

#[async_trait]
impl IssueSource for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_issues(&self) -> TriageResult<Vec<Issue>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| TriageError::source(&self.name, e.to_string()))?;
        let dump: IssueDump = serde_json::from_str(&content)
            .map_err(|e| TriageError::source(&self.name, format!("invalid issue JSON: {e}")))?;
        Ok(match dump {
            IssueDump::Bare(issues) => issues,
            IssueDump::Envelope { issues } => issues,
        })
    }
}
