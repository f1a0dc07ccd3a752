//! Issue triage CLI
//!
//! Classifies an issue dump and prints the top-ranked tasks.
//!
//! # Usage
//!
//! ```bash
//! # Markdown report of the ten highest-scoring issues
//! triage --issues issues.json
//!
//! # Repository-scoped run with a custom rule file, JSON output
//! triage --issues issues.json --config triage.toml --owner acme --repo widgets --top 20 --json
//! ```
//!
//! Configuration precedence: file (`--config`) or built-in defaults, then
//! `TRIAGE_*` environment overrides. Logs go to stderr; set `RUST_LOG` to
//! adjust verbosity.

mod output;
mod source;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use triage::{
    fetch_with_fallback, load_config_or_minimal, BatchCoordinator, Configuration,
    RepositoryContext, TriageEngine,
};

use crate::source::JsonFileSource;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file with an array of issues (or `{ "issues": [...] }`)
    #[arg(long)]
    issues: PathBuf,

    /// Rule/weight configuration (.toml, .yaml, .yml or .json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of top-ranked tasks to print
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Repository owner, scopes the result cache
    #[arg(long, requires = "repo")]
    owner: Option<String>,

    /// Repository name
    #[arg(long, requires = "owner")]
    repo: Option<String>,

    /// Emit JSON instead of a markdown report
    #[arg(long, default_value_t = false)]
    json: bool,
}

impl Args {
    fn repository(&self) -> Option<RepositoryContext> {
        match (&self.owner, &self.repo) {
            (Some(owner), Some(repo)) => Some(RepositoryContext::new(owner, repo)),
            _ => None,
        }
    }
}

/// File config (falling back to the minimal rule set when unreadable) or
/// defaults, then env overrides.
fn resolve_config(path: Option<&Path>) -> Configuration {
    let mut config = match path {
        Some(path) => {
            let loaded = load_config_or_minimal(path);
            for warning in &loaded.warnings {
                tracing::warn!(level = %loaded.level, "{warning}");
            }
            loaded.into_payload()
        }
        None => Configuration::default(),
    };
    config.apply_env_overrides();
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "triage=info,triage_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = resolve_config(args.config.as_deref());
    config
        .validate()
        .context("Configuration invalid after environment overrides")?;

    let source = JsonFileSource::new(&args.issues);
    let fetched = fetch_with_fallback(&source, Vec::new()).await;
    if fetched.is_degraded() {
        bail!(
            "Could not load issues from {}: {}",
            args.issues.display(),
            fetched.warnings.join("; ")
        );
    }
    let issues = fetched.into_payload();

    tracing::info!(
        issues = issues.len(),
        rules = config.all_rules().count(),
        repo = ?args.repository().map(|r| r.slug()),
        "Starting triage"
    );

    let engine = Arc::new(TriageEngine::new(config));
    let coordinator = BatchCoordinator::new(engine);
    let result = coordinator
        .run_with_progress(issues, args.repository(), |done, total| {
            tracing::debug!(done, total, "Triage progress");
        })
        .await;

    println!("{}", output::render(&result, args.top, args.json)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_args_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_owner_requires_repo() {
        let res = Args::try_parse_from(["triage", "--issues", "a.json", "--owner", "acme"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["triage", "--issues", "a.json"]).unwrap();
        assert_eq!(args.top, 10);
        assert!(!args.json);
        assert!(args.repository().is_none());
    }

    #[test]
    fn test_repository_context() {
        let args = Args::try_parse_from([
            "triage", "--issues", "a.json", "--owner", "acme", "--repo", "widgets",
        ])
        .unwrap();
        assert_eq!(args.repository().unwrap().slug(), "acme/widgets");
    }

    #[test]
    fn test_resolve_config_without_file_uses_defaults() {
        let config = resolve_config(None);
        assert!(config.all_rules().count() > 0);
    }

    #[test]
    fn test_resolve_config_reads_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "minConfidence = 0.45\nmaxCategories = 2").unwrap();
        let config = resolve_config(Some(file.path()));
        assert_eq!(config.max_categories, 2);
    }

    #[test]
    fn test_resolve_config_unreadable_file_falls_back_to_minimal() {
        let config = resolve_config(Some(Path::new("/nonexistent/triage.toml")));
        assert_eq!(config.all_rules().count(), 0);
    }
}
