//! Triage engine
//!
//! Owns the compiled rule set for its base configuration, compiled profiles
//! for per-repository configurations, the result cache and the lifetime
//! counters. Share one instance behind an `Arc`.

use crate::cache::{ttl_from_secs, CacheKey, ResultCache};
use crate::classify::{CategoryClassification, ClassificationResolver, RuleMatcher, RuleSet};
use crate::config::Configuration;
use crate::issue::{Category, Issue, Priority, RepositoryContext};
use crate::metadata::IssueMetadata;
use crate::priority::{PriorityEstimator, PrioritySource};
use crate::scoring::{ScoreBreakdown, ScoringEngine};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Full triage outcome for one issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueClassification {
    pub primary_category: Category,
    pub primary_confidence: f64,
    pub classifications: Vec<CategoryClassification>,
    pub estimated_priority: Priority,
    pub priority_confidence: f64,
    pub priority_source: PrioritySource,
    pub score: f64,
    pub score_breakdown: ScoreBreakdown,
    pub metadata: IssueMetadata,
    pub processing_time_ms: f64,
    pub cache_hit: bool,
}

/// Supplies repository-specific configuration.
///
/// Returning `None` means the engine's base configuration applies.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    async fn config_for(&self, ctx: &RepositoryContext) -> Option<Arc<Configuration>>;
}

/// Lifetime counters, reset by [`TriageEngine::clear_cache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub total_processed: u64,
    pub total_cache_hits: u64,
    pub total_processing_time_ms: f64,
}

impl EngineStats {
    pub fn cache_hit_rate(&self) -> f64 {
        if self.total_processed == 0 {
            0.0
        } else {
            self.total_cache_hits as f64 / self.total_processed as f64
        }
    }

    pub fn average_processing_time_ms(&self) -> f64 {
        if self.total_processed == 0 {
            0.0
        } else {
            self.total_processing_time_ms / self.total_processed as f64
        }
    }
}

/// A configuration with its compiled rules.
#[derive(Debug)]
struct Profile {
    config: Arc<Configuration>,
    rules: RuleSet,
    resolver: ClassificationResolver,
    estimator: PriorityEstimator,
}

impl Profile {
    fn build(config: Arc<Configuration>) -> Self {
        let rules = RuleSet::compile(&config);
        if !rules.pattern_errors().is_empty() {
            warn!(
                invalid = rules.pattern_errors().len(),
                "Skipping invalid rule patterns"
            );
        }
        let resolver =
            ClassificationResolver::new(RuleMatcher::new(config.performance.rule_time_budget_ms));
        let estimator = PriorityEstimator::new(config.priority_estimation.clone());
        Self {
            config,
            rules,
            resolver,
            estimator,
        }
    }

    fn classify(&self, issue: &Issue) -> IssueClassification {
        let resolution = self.resolver.resolve(issue, &self.rules, &self.config);
        let priority = self
            .estimator
            .estimate(issue, &resolution.classifications, Utc::now());
        let score = ScoringEngine::score(
            resolution.primary_category,
            priority.priority,
            &self.config,
        );
        let metadata =
            IssueMetadata::extract(issue, resolution.rules_applied, resolution.rules_matched);

        IssueClassification {
            primary_category: resolution.primary_category,
            primary_confidence: resolution.primary_confidence,
            classifications: resolution.classifications,
            estimated_priority: priority.priority,
            priority_confidence: priority.confidence,
            priority_source: priority.source,
            score: score.value,
            score_breakdown: score.breakdown,
            metadata,
            processing_time_ms: 0.0,
            cache_hit: false,
        }
    }
}

pub struct TriageEngine {
    base: Arc<Profile>,
    profiles: RwLock<HashMap<String, Arc<Profile>>>,
    provider: Option<Arc<dyn ConfigProvider>>,
    cache: ResultCache<IssueClassification>,
    stats: Mutex<EngineStats>,
}

impl std::fmt::Debug for TriageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriageEngine")
            .field("rules", &self.base.rules.len())
            .field("cached", &self.cache.len())
            .field("has_provider", &self.provider.is_some())
            .finish()
    }
}

impl Default for TriageEngine {
    fn default() -> Self {
        Self::new(Configuration::default())
    }
}

impl TriageEngine {
    pub fn new(config: Configuration) -> Self {
        let base = Profile::build(Arc::new(config));
        info!(
            rules = base.rules.len(),
            disabled = base.rules.disabled_count(),
            caching = base.config.performance.caching.enabled,
            "Triage engine ready"
        );
        Self {
            base: Arc::new(base),
            profiles: RwLock::new(HashMap::new()),
            provider: None,
            cache: ResultCache::new(),
            stats: Mutex::new(EngineStats::default()),
        }
    }

    pub fn with_config_provider(mut self, provider: Arc<dyn ConfigProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Base configuration. Cache and batch settings always come from here.
    pub fn config(&self) -> &Configuration {
        &self.base.config
    }

    pub async fn classify(
        &self,
        issue: &Issue,
        ctx: Option<&RepositoryContext>,
    ) -> IssueClassification {
        let started = Instant::now();
        let caching = self.base.config.performance.caching;
        let ttl = ttl_from_secs(caching.ttl);
        let key = CacheKey::new(issue.id, ctx);

        if caching.enabled {
            if let Some(mut hit) = self.cache.get(&key, ttl) {
                hit.cache_hit = true;
                hit.processing_time_ms = elapsed_ms(started);
                self.record(hit.processing_time_ms, true);
                debug!(key = %key, "Classification cache hit");
                return hit;
            }
        }

        let profile = self.profile_for(ctx).await;
        let mut result = profile.classify(issue);
        result.processing_time_ms = elapsed_ms(started);

        if caching.enabled {
            self.cache.insert(key, result.clone());
        }
        self.record(result.processing_time_ms, false);

        debug!(
            issue = issue.number,
            category = %result.primary_category,
            priority = %result.estimated_priority,
            score = result.score,
            elapsed_ms = result.processing_time_ms,
            "Classified issue"
        );
        result
    }

    /// Default-category result for an issue whose classification failed:
    /// no classifications, fallback priority, unconfigured-rule score.
    pub fn unclassified(&self, issue: &Issue) -> IssueClassification {
        let config = &self.base.config;
        let priority = config.priority_estimation.fallback();
        let score = ScoringEngine::score(Category::DEFAULT, priority, config);
        IssueClassification {
            primary_category: Category::DEFAULT,
            primary_confidence: 0.0,
            classifications: Vec::new(),
            estimated_priority: priority,
            priority_confidence: 0.0,
            priority_source: PrioritySource::Fallback,
            score: score.value,
            score_breakdown: score.breakdown,
            metadata: IssueMetadata::extract(issue, 0, 0),
            processing_time_ms: 0.0,
            cache_hit: false,
        }
    }

    /// Empty the cache and reset the lifetime counters.
    pub fn clear_cache(&self) {
        self.cache.clear();
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner) = EngineStats::default();
        info!("Classification cache cleared");
    }

    pub fn cleanup_expired_cache(&self) -> usize {
        self.cache
            .cleanup_expired(ttl_from_secs(self.base.config.performance.caching.ttl))
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    pub fn stats(&self) -> EngineStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn cache_hit_rate(&self) -> f64 {
        self.stats().cache_hit_rate()
    }

    fn record(&self, elapsed_ms: f64, cache_hit: bool) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.total_processed += 1;
        stats.total_processing_time_ms += elapsed_ms;
        if cache_hit {
            stats.total_cache_hits += 1;
        }
    }

    /// Resolve the compiled profile for a repository, compiling once per
    /// distinct provider configuration.
    async fn profile_for(&self, ctx: Option<&RepositoryContext>) -> Arc<Profile> {
        let (Some(ctx), Some(provider)) = (ctx, self.provider.as_ref()) else {
            return Arc::clone(&self.base);
        };
        let Some(config) = provider.config_for(ctx).await else {
            return Arc::clone(&self.base);
        };

        let slug = ctx.slug();
        {
            let profiles = self.profiles.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = profiles.get(&slug) {
                if Arc::ptr_eq(&existing.config, &config) {
                    return Arc::clone(existing);
                }
            }
        }

        if let Err(e) = config.validate() {
            warn!(repo = %slug, error = %e, "Repository configuration invalid, using base");
            return Arc::clone(&self.base);
        }

        let profile = Arc::new(Profile::build(config));
        debug!(repo = %slug, rules = profile.rules.len(), "Compiled repository profile");
        self.profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(slug, Arc::clone(&profile));
        profile
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassificationRule;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticProvider {
        config: Arc<Configuration>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ConfigProvider for StaticProvider {
        async fn config_for(&self, ctx: &RepositoryContext) -> Option<Arc<Configuration>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (ctx.owner == "acme").then(|| Arc::clone(&self.config))
        }
    }

    fn docs_only() -> Configuration {
        let mut config = Configuration::minimal();
        config.min_confidence = 0.1;
        config.custom_rules = vec![ClassificationRule::new("docs", "Docs", Category::Documentation)
            .title_keywords(&["crash"])];
        config
    }

    #[tokio::test]
    async fn test_cache_hit_replays_result() {
        let engine = TriageEngine::default();
        let issue = Issue::new(1, 10, "App crashes on startup").with_labels(["bug"]);

        let first = engine.classify(&issue, None).await;
        let second = engine.classify(&issue, None).await;

        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(first.primary_category, second.primary_category);
        assert_eq!(first.estimated_priority, second.estimated_priority);
        assert_eq!(first.score, second.score);

        let stats = engine.stats();
        assert_eq!(stats.total_processed, 2);
        assert_eq!(stats.total_cache_hits, 1);
        assert_eq!(engine.cache_hit_rate(), 0.5);
    }

    #[tokio::test]
    async fn test_unbounded_ttl_classifies_and_caches() {
        let mut config = Configuration::default();
        config.performance.caching.ttl = u64::MAX;
        config.validate().unwrap();
        let engine = TriageEngine::new(config);
        let issue = Issue::new(1, 1, "App crash").with_labels(["bug"]);

        let first = engine.classify(&issue, None).await;
        assert_eq!(first.primary_category, Category::Bug);
        assert!(engine.classify(&issue, None).await.cache_hit);
        assert_eq!(engine.cleanup_expired_cache(), 0);
    }

    #[tokio::test]
    async fn test_cache_disabled_never_hits() {
        let mut config = Configuration::default();
        config.performance.caching.enabled = false;
        let engine = TriageEngine::new(config);
        let issue = Issue::new(1, 1, "crash");
        engine.classify(&issue, None).await;
        assert!(!engine.classify(&issue, None).await.cache_hit);
        assert_eq!(engine.cached_entries(), 0);
    }

    #[tokio::test]
    async fn test_repository_context_scopes_cache() {
        let engine = TriageEngine::default();
        let issue = Issue::new(1, 1, "crash");
        let ctx = RepositoryContext::new("acme", "widgets");
        engine.classify(&issue, None).await;
        assert!(!engine.classify(&issue, Some(&ctx)).await.cache_hit);
        assert!(engine.classify(&issue, Some(&ctx)).await.cache_hit);
    }

    #[tokio::test]
    async fn test_clear_cache_resets_counters() {
        let engine = TriageEngine::default();
        let issue = Issue::new(1, 1, "crash");
        engine.classify(&issue, None).await;
        engine.classify(&issue, None).await;
        engine.clear_cache();
        assert_eq!(engine.stats(), EngineStats::default());
        assert!(!engine.classify(&issue, None).await.cache_hit);
    }

    #[tokio::test]
    async fn test_provider_config_applies_per_repository() {
        let provider = Arc::new(StaticProvider {
            config: Arc::new(docs_only()),
            calls: AtomicUsize::new(0),
        });
        let mut base = Configuration::default();
        base.performance.caching.enabled = false;
        let engine = TriageEngine::new(base).with_config_provider(provider.clone());
        let issue = Issue::new(1, 1, "App crash").with_labels(["bug"]);

        let acme = RepositoryContext::new("acme", "widgets");
        let other = RepositoryContext::new("other", "widgets");

        let scoped = engine.classify(&issue, Some(&acme)).await;
        assert_eq!(scoped.primary_category, Category::Documentation);
        let fallback = engine.classify(&issue, Some(&other)).await;
        assert_eq!(fallback.primary_category, Category::Bug);

        engine.classify(&issue, Some(&acme)).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(engine.profiles.read().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_classification_serializes_camel_case() {
        let engine = TriageEngine::default();
        let result = engine.classify(&Issue::new(1, 1, "crash"), None).await;
        let json = serde_json::to_value(&result).unwrap();
        for field in [
            "primaryCategory",
            "primaryConfidence",
            "estimatedPriority",
            "priorityConfidence",
            "scoreBreakdown",
            "processingTimeMs",
            "cacheHit",
        ] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
    }

    #[test]
    fn test_unclassified_uses_defaults() {
        let engine = TriageEngine::default();
        let issue = Issue::new(3, 3, "Anything").with_body("```x```");
        let r = engine.unclassified(&issue);
        assert_eq!(r.primary_category, Category::DEFAULT);
        assert_eq!(r.primary_confidence, 0.0);
        assert!(r.classifications.is_empty());
        assert_eq!(r.estimated_priority, Priority::Low);
        assert_eq!(r.priority_source, PrioritySource::Fallback);
        assert!(r.metadata.has_code_blocks);
        assert_eq!(engine.stats(), EngineStats::default());
    }

    #[test]
    fn test_stats_rates_with_no_traffic() {
        let stats = EngineStats::default();
        assert_eq!(stats.cache_hit_rate(), 0.0);
        assert_eq!(stats.average_processing_time_ms(), 0.0);
    }
}
