//! Issue-tracker records and the fixed category / priority vocabularies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Open/closed state of an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    #[default]
    Open,
    Closed,
}

/// Issue-tracker item as supplied by the tracker client. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub state: IssueState,
    #[serde(default = "Utc::now", alias = "created_at")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now", alias = "updated_at")]
    pub updated_at: DateTime<Utc>,
    /// Label names, in tracker order. Accepts plain strings or `{ "name": .. }` objects.
    #[serde(default, deserialize_with = "deserialize_labels")]
    pub labels: Vec<String>,
}

impl Issue {
    /// Create an open issue with no body or labels, created now.
    pub fn new(id: u64, number: u64, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            number,
            title: title.into(),
            body: None,
            state: IssueState::Open,
            created_at: now,
            updated_at: now,
            labels: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = self.updated_at.max(created_at);
        self
    }

    /// Body text, empty when absent
    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }

    /// Whole days elapsed since creation (never negative)
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days().max(0)
    }

    /// Lowercased label names
    pub fn labels_lower(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.to_lowercase()).collect()
    }
}

fn deserialize_labels<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LabelRepr {
        Name(String),
        Object { name: String },
    }

    let raw: Option<Vec<LabelRepr>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|l| match l {
            LabelRepr::Name(name) | LabelRepr::Object { name } => name,
        })
        .collect())
}

/// Repository an issue belongs to. Part of the cache key and the
/// per-repository configuration lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryContext {
    pub owner: String,
    pub repo: String,
}

impl RepositoryContext {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// `owner/repo`
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl std::fmt::Display for RepositoryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Classification categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Bug,
    Security,
    Feature,
    Enhancement,
    Performance,
    Documentation,
    Question,
    Duplicate,
    Invalid,
    Wontfix,
    HelpWanted,
    GoodFirstIssue,
    Refactor,
    Test,
    CiCd,
    Dependencies,
}

impl Category {
    /// Category reported when nothing matches
    pub const DEFAULT: Category = Category::Question;

    pub const ALL: [Category; 16] = [
        Self::Bug,
        Self::Security,
        Self::Feature,
        Self::Enhancement,
        Self::Performance,
        Self::Documentation,
        Self::Question,
        Self::Duplicate,
        Self::Invalid,
        Self::Wontfix,
        Self::HelpWanted,
        Self::GoodFirstIssue,
        Self::Refactor,
        Self::Test,
        Self::CiCd,
        Self::Dependencies,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bug => "bug",
            Self::Security => "security",
            Self::Feature => "feature",
            Self::Enhancement => "enhancement",
            Self::Performance => "performance",
            Self::Documentation => "documentation",
            Self::Question => "question",
            Self::Duplicate => "duplicate",
            Self::Invalid => "invalid",
            Self::Wontfix => "wontfix",
            Self::HelpWanted => "help-wanted",
            Self::GoodFirstIssue => "good-first-issue",
            Self::Refactor => "refactor",
            Self::Test => "test",
            Self::CiCd => "ci-cd",
            Self::Dependencies => "dependencies",
        }
    }

    /// Parse a category name, mapping anything unknown to [`Category::DEFAULT`].
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|_| {
            tracing::warn!(category = raw, "Unknown category, using default");
            Self::DEFAULT
        })
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '_', '/'], "-");
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&raw))
    }
}

/// Estimated priority, most urgent first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
    Backlog,
}

impl Priority {
    pub const ALL: [Priority; 5] = [
        Self::Critical,
        Self::High,
        Self::Medium,
        Self::Low,
        Self::Backlog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Backlog => "backlog",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| format!("unknown priority: {s}"))
    }
}
