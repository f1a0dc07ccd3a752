//! In-memory TTL cache for classification results.
//!
//! Entries are keyed by issue id, scoped by `owner/repo` when a repository
//! context is supplied. Expired entries read as misses and are evicted on
//! access; [`ResultCache::cleanup_expired`] sweeps the rest.

use crate::issue::RepositoryContext;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// TTL in seconds as a [`Duration`], saturating at [`Duration::MAX`].
pub fn ttl_from_secs(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(issue_id: u64, ctx: Option<&RepositoryContext>) -> Self {
        match ctx {
            Some(ctx) => Self(format!("{}#{issue_id}", ctx.slug())),
            None => Self(issue_id.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    /// Valid while `now - stored_at < ttl`; a zero TTL is never valid.
    fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.stored_at) < ttl
    }
}

#[derive(Debug)]
pub struct ResultCache<V> {
    entries: RwLock<HashMap<CacheKey, CacheEntry<V>>>,
}

impl<V> Default for ResultCache<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V: Clone> ResultCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey, ttl: Duration) -> Option<V> {
        self.get_at(key, ttl, Utc::now())
    }

    pub fn get_at(&self, key: &CacheKey, ttl: Duration, now: DateTime<Utc>) -> Option<V> {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.is_fresh(ttl, now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // re-check: another writer may have refreshed it
        if let Some(entry) = entries.get(key) {
            if entry.is_fresh(ttl, now) {
                return Some(entry.value.clone());
            }
            entries.remove(key);
            debug!(key = %key, "Evicted expired cache entry");
        }
        None
    }

    pub fn insert(&self, key: CacheKey, value: V) {
        self.insert_at(key, value, Utc::now());
    }

    pub fn insert_at(&self, key: CacheKey, value: V, stored_at: DateTime<Utc>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, CacheEntry { value, stored_at });
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn cleanup_expired(&self, ttl: Duration) -> usize {
        self.cleanup_expired_at(ttl, Utc::now())
    }

    pub fn cleanup_expired_at(&self, ttl: Duration, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(ttl, now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, remaining = entries.len(), "Swept expired cache entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
