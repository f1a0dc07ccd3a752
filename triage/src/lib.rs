//! Issue triage engine
//!
//! Classifies issue-tracker items into categories with confidences, estimates
//! their priority, scores them for ranking and aggregates batch metrics.
//!
//! # Pipeline
//!
//! ```text
//! Issue ─► classify (rules → ranked categories)
//!            ─► priority (label → custom rule → heuristic → fallback)
//!            ─► scoring (weighted category/priority/custom terms, 0..100)
//!            ─► metadata
//!        = IssueClassification  (cached per issue id / repository)
//!
//! Vec<Issue> ─► BatchCoordinator (JoinSet fan-out) ─► BatchResult
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use triage::{BatchCoordinator, Configuration, Issue, TriageEngine};
//!
//! # async fn run() {
//! let engine = Arc::new(TriageEngine::new(Configuration::default()));
//! let issue = Issue::new(1, 42, "App crashes on startup").with_labels(["bug"]);
//! let result = engine.classify(&issue, None).await;
//! println!("{} / {} / {}", result.primary_category, result.estimated_priority, result.score);
//!
//! let batch = BatchCoordinator::new(engine).run(vec![issue], None).await;
//! println!("{}", batch.format_report(10));
//! # }
//! ```

pub mod batch;
pub mod cache;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod issue;
pub mod metadata;
pub mod metrics;
pub mod priority;
pub mod resilience;
pub mod scoring;
pub mod source;

pub use batch::BatchCoordinator;
pub use classify::{CategoryClassification, Resolution};
pub use config::{load_config, load_config_or_minimal, Configuration};
pub use engine::{ConfigProvider, EngineStats, IssueClassification, TriageEngine};
pub use error::{PatternError, TriageError, TriageResult};
pub use issue::{Category, Issue, IssueState, Priority, RepositoryContext};
pub use metadata::IssueMetadata;
pub use metrics::{BatchResult, ScoredTask};
pub use priority::{PriorityEstimate, PrioritySource};
pub use resilience::{DegradationLevel, DegradedResponse};
pub use scoring::ScoreBreakdown;
pub use source::{fetch_with_fallback, IssueSource, StaticSource};
