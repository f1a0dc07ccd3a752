//! Batch coordinator
//!
//! ```text
//! issues ─► chunks of batchSize ─► up to `parallelism` sub-batches
//!                                    │  JoinSet::spawn × N, Semaphore-guarded
//!                                    ▼
//!                                  sub-batch results, re-ordered by index
//!                                  (unreturned issues → unclassified default)
//!                                    ▼
//!                                  progress(processed, total) per batch
//! ```

use crate::engine::TriageEngine;
use crate::issue::{Issue, RepositoryContext};
use crate::metrics::{BatchResult, ScoredTask};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct BatchCoordinator {
    engine: Arc<TriageEngine>,
    batch_size: usize,
    parallelism: usize,
}

impl BatchCoordinator {
    /// Batch size and parallelism come from the engine's base configuration.
    pub fn new(engine: Arc<TriageEngine>) -> Self {
        let batch = engine.config().performance.batch_processing;
        Self {
            engine,
            batch_size: batch.batch_size.max(1),
            parallelism: batch.parallelism.max(1),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn engine(&self) -> &Arc<TriageEngine> {
        &self.engine
    }

    pub async fn run(&self, issues: Vec<Issue>, ctx: Option<RepositoryContext>) -> BatchResult {
        self.run_with_progress(issues, ctx, |_, _| {}).await
    }

    /// Classify every issue, calling `on_progress(processed, total)` after
    /// each batch. Tasks come back in input order.
    pub async fn run_with_progress<F>(
        &self,
        issues: Vec<Issue>,
        ctx: Option<RepositoryContext>,
        mut on_progress: F,
    ) -> BatchResult
    where
        F: FnMut(usize, usize) + Send,
    {
        let started = Instant::now();
        let total = issues.len();
        let ctx = ctx.map(Arc::new);
        let sem = Arc::new(Semaphore::new(self.parallelism));
        let mut tasks: Vec<ScoredTask> = Vec::with_capacity(total);

        info!(
            total,
            batch_size = self.batch_size,
            parallelism = self.parallelism,
            "Starting triage batch"
        );

        let mut failed = 0;

        for (batch_index, batch) in issues.chunks(self.batch_size).enumerate() {
            let sub_size = batch.len().div_ceil(self.parallelism).max(1);
            let subs: Vec<&[Issue]> = batch.chunks(sub_size).collect();
            let mut join_set: JoinSet<(usize, Vec<ScoredTask>)> = JoinSet::new();

            for (index, sub) in subs.iter().enumerate() {
                let sem = sem.clone();
                let engine = self.engine.clone();
                let ctx = ctx.clone();
                let sub = sub.to_vec();

                join_set.spawn(async move {
                    let Ok(_permit) = sem.acquire_owned().await else {
                        return (index, Vec::new());
                    };
                    let mut out = Vec::with_capacity(sub.len());
                    for issue in &sub {
                        let classification = engine.classify(issue, ctx.as_deref()).await;
                        out.push(ScoredTask::new(issue, classification));
                    }
                    (index, out)
                });
            }

            let mut parts: Vec<Vec<ScoredTask>> = vec![Vec::new(); subs.len()];
            while let Some(res) = join_set.join_next().await {
                match res {
                    Ok((index, part)) => {
                        if let Some(slot) = parts.get_mut(index) {
                            *slot = part;
                        }
                    }
                    Err(e) => warn!(batch = batch_index, error = %e, "Triage worker panicked"),
                }
            }

            // Issues a worker did not return get the unclassified default.
            for (sub, mut part) in subs.iter().zip(parts) {
                if part.len() < sub.len() {
                    let missing = &sub[part.len()..];
                    failed += missing.len();
                    warn!(
                        batch = batch_index,
                        missing = missing.len(),
                        "Substituting unclassified results"
                    );
                    part.extend(
                        missing
                            .iter()
                            .map(|issue| ScoredTask::new(issue, self.engine.unclassified(issue))),
                    );
                }
                tasks.extend(part);
            }

            let processed = tasks.len();
            debug!(batch = batch_index, processed, total, "Batch complete");
            on_progress(processed, total);
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let mut result =
            BatchResult::from_tasks(tasks, elapsed_ms, self.engine.cache_hit_rate());
        result.failed_tasks = failed;
        info!(
            analyzed = result.total_analyzed,
            failed,
            average_score = result.average_score,
            elapsed_ms,
            "Triage batch finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::engine::ConfigProvider;
    use crate::issue::Category;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Panics on its first lookup, then defers to the base configuration.
    struct FailsOnce {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ConfigProvider for FailsOnce {
        async fn config_for(&self, _ctx: &RepositoryContext) -> Option<Arc<Configuration>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("provider unavailable");
            }
            None
        }
    }

    fn issues(n: u64) -> Vec<Issue> {
        (1..=n)
            .map(|i| {
                let title = if i % 2 == 0 { "App crash on save" } else { "Add dark mode feature" };
                Issue::new(i, i, title)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_preserves_input_order() {
        let engine = Arc::new(TriageEngine::default());
        let coordinator = BatchCoordinator::new(engine)
            .with_batch_size(4)
            .with_parallelism(3);
        let result = coordinator.run(issues(11), None).await;
        let numbers: Vec<u64> = result.tasks.iter().map(|t| t.issue_number).collect();
        assert_eq!(numbers, (1..=11).collect::<Vec<_>>());
        assert_eq!(result.total_analyzed, 11);
    }

    #[tokio::test]
    async fn test_progress_reported_per_batch() {
        let engine = Arc::new(TriageEngine::default());
        let coordinator = BatchCoordinator::new(engine).with_batch_size(4);
        let mut seen = Vec::new();
        coordinator
            .run_with_progress(issues(10), None, |done, total| seen.push((done, total)))
            .await;
        assert_eq!(seen, vec![(4, 10), (8, 10), (10, 10)]);
    }

    #[tokio::test]
    async fn test_average_score_is_mean() {
        let engine = Arc::new(TriageEngine::default());
        let result = BatchCoordinator::new(engine).run(issues(6), None).await;
        let mean = result.tasks.iter().map(|t| t.score()).sum::<f64>() / 6.0;
        assert!((result.average_score - mean).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let engine = Arc::new(TriageEngine::default());
        let mut calls = 0;
        let result = BatchCoordinator::new(engine)
            .run_with_progress(vec![], None, |_, _| calls += 1)
            .await;
        assert_eq!(result.total_analyzed, 0);
        assert_eq!(result.average_score, 0.0);
        assert!(result.tasks.is_empty());
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_settings_from_config() {
        let mut config = Configuration::default();
        config.performance.batch_processing.batch_size = 7;
        config.performance.batch_processing.parallelism = 2;
        let coordinator = BatchCoordinator::new(Arc::new(TriageEngine::new(config)));
        assert_eq!(coordinator.batch_size, 7);
        assert_eq!(coordinator.parallelism, 2);
    }

    #[tokio::test]
    async fn test_repeat_batch_hits_cache() {
        let engine = Arc::new(TriageEngine::default());
        let coordinator = BatchCoordinator::new(engine);
        coordinator.run(issues(4), None).await;
        let second = coordinator.run(issues(4), None).await;
        assert!(second.tasks.iter().all(|t| t.classification.cache_hit));
        assert_eq!(second.cache_hit_rate, 0.5);
    }

    #[tokio::test]
    async fn test_failed_sub_batch_keeps_every_issue() {
        let engine = TriageEngine::default().with_config_provider(Arc::new(FailsOnce {
            calls: AtomicUsize::new(0),
        }));
        let coordinator = BatchCoordinator::new(Arc::new(engine))
            .with_batch_size(4)
            .with_parallelism(2);
        let ctx = RepositoryContext::new("acme", "widgets");
        let mut seen = Vec::new();

        let result = coordinator
            .run_with_progress(issues(4), Some(ctx), |done, total| seen.push((done, total)))
            .await;

        assert_eq!(result.total_analyzed, 4);
        assert_eq!(result.failed_tasks, 2);
        assert_eq!(seen, vec![(4, 4)]);
        let numbers: Vec<u64> = result.tasks.iter().map(|t| t.issue_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        let unclassified = result
            .tasks
            .iter()
            .filter(|t| t.classification.primary_category == Category::DEFAULT)
            .count();
        assert_eq!(unclassified, 2);
    }
}
