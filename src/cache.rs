//! Tagged caching for repository reads.
//!
//! [`CachedRepo`] decorates a [`Repo`], memoizing read methods through a
//! [`CacheStore`] and invalidating the repository's tag on every write.
//! Invalidation is fail-soft: a store that cannot invalidate logs a warning
//! and the write still succeeds. Concurrent readers may repopulate a stale
//! value between an invalidation and a write commit; entries expire on TTL
//! regardless, and the backing store stays the arbiter of consistency.

use async_trait::async_trait;
use sea_orm::EntityTrait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::RepoError;
use crate::filtering::conditions::ConditionOp;
use crate::repository::{Page, Repo, RepoResource};

/// Error from a cache backend. Never surfaced to repository callers; logged
/// and treated as a miss (reads) or skipped invalidation (writes).
#[derive(Debug, Clone)]
pub struct CacheError {
    pub message: String,
}

impl CacheError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CacheError {}

/// Narrow interface over the host cache store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    async fn put(
        &self,
        key: &str,
        value: Value,
        ttl: Duration,
        tags: &[String],
    ) -> Result<(), CacheError>;

    async fn forget(&self, key: &str) -> Result<(), CacheError>;

    /// Drop every entry carrying `tag`. Stores without tag support should
    /// return an error; callers fall back to [`CacheStore::forget_prefix`].
    async fn flush_tag(&self, tag: &str) -> Result<(), CacheError>;

    /// Best-effort pattern deletion for stores without tag support.
    async fn forget_prefix(&self, prefix: &str) -> Result<(), CacheError>;

    fn supports_tags(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Instant,
    tags: Vec<String>,
}

/// In-memory tagged cache store with per-entry expiry.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    tag_index: RwLock<HashMap<String, HashSet<String>>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone()))
    }

    async fn put(
        &self,
        key: &str,
        value: Value,
        ttl: Duration,
        tags: &[String],
    ) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        let mut tag_index = self.tag_index.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
                tags: tags.to_vec(),
            },
        );
        for tag in tags {
            tag_index
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
        Ok(())
    }

    async fn forget(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        let mut tag_index = self.tag_index.write().await;
        if let Some(entry) = entries.remove(key) {
            for tag in &entry.tags {
                if let Some(keys) = tag_index.get_mut(tag) {
                    keys.remove(key);
                }
            }
        }
        Ok(())
    }

    async fn flush_tag(&self, tag: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        let mut tag_index = self.tag_index.write().await;
        if let Some(keys) = tag_index.remove(tag) {
            for key in keys {
                entries.remove(&key);
            }
        }
        Ok(())
    }

    async fn forget_prefix(&self, prefix: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }
}

/// Cache behavior knobs.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl: Duration,
    /// Methods eligible for memoization. Anything else always runs the
    /// producer directly.
    pub allowed_methods: Vec<&'static str>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(30 * 60),
            allowed_methods: vec!["all", "find", "find_where", "paginate"],
        }
    }
}

/// Build the cache key for one call:
/// `{resource}@{method}-{args}[-{criteria fingerprint}]`.
#[must_use]
pub fn cache_key(resource: &str, method: &str, args: &str, criteria: &str) -> String {
    if criteria.is_empty() {
        format!("{resource}@{method}-{args}")
    } else {
        format!("{resource}@{method}-{args}-{criteria}")
    }
}

/// Caching decorator around [`Repo`].
pub struct CachedRepo<R: RepoResource> {
    repo: Repo<R>,
    store: std::sync::Arc<dyn CacheStore>,
    config: CacheConfig,
    skip_cache: AtomicBool,
}

impl<R: RepoResource> CachedRepo<R>
where
    <R::Entity as EntityTrait>::Model: DeserializeOwned,
{
    #[must_use]
    pub fn new(repo: Repo<R>, store: std::sync::Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self {
            repo,
            store,
            config,
            skip_cache: AtomicBool::new(false),
        }
    }

    /// Access the wrapped repository (criteria stack, presenter, ...).
    pub fn repo(&mut self) -> &mut Repo<R> {
        &mut self.repo
    }

    /// Skip the cache lookup for the next eligible read, then reset. The
    /// fresh result still refreshes the stored entry.
    pub fn skip_cache(&mut self) -> &mut Self {
        self.skip_cache.store(true, Ordering::Relaxed);
        self
    }

    fn key(&self, method: &str, args: &str) -> String {
        cache_key(
            R::RESOURCE_NAME,
            method,
            args,
            &self.repo.criteria_fingerprint(),
        )
    }

    fn cacheable(&self, method: &str) -> bool {
        self.config.enabled && self.config.allowed_methods.contains(&method)
    }

    async fn remember<T, F, Fut>(
        &self,
        method: &str,
        args: &str,
        producer: F,
    ) -> Result<T, RepoError>
    where
        T: serde::Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RepoError>>,
    {
        if !self.cacheable(method) {
            return producer().await;
        }

        let key = self.key(method, args);
        // The skip flag covers one read only: it bypasses the lookup, but
        // the fresh result still replaces the stored entry below.
        let skip = self.skip_cache.swap(false, Ordering::Relaxed);
        if !skip {
            match self.store.get(&key).await {
                Ok(Some(cached)) => {
                    if let Ok(value) = serde_json::from_value(cached) {
                        return Ok(value);
                    }
                    // Shape drift between releases; treat as a miss.
                    tracing::warn!(key = %key, "Discarding undecodable cache entry");
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Cache read failed; running producer");
                }
            }
        }

        let produced = producer().await?;
        let tags = vec![R::RESOURCE_NAME.to_string()];
        match serde_json::to_value(&produced) {
            Ok(value) => {
                if let Err(e) = self.store.put(&key, value, self.config.ttl, &tags).await {
                    tracing::warn!(key = %key, error = %e, "Cache write failed");
                }
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache serialization failed");
            }
        }
        Ok(produced)
    }

    /// Invalidate every cached read for this resource. Fail-soft: failures
    /// are logged, never raised.
    async fn invalidate(&self) {
        if self.store.supports_tags() {
            if let Err(e) = self.store.flush_tag(R::RESOURCE_NAME).await {
                tracing::warn!(
                    tag = R::RESOURCE_NAME,
                    error = %e,
                    "Tag flush failed; falling back to prefix deletion"
                );
                self.invalidate_by_prefix().await;
            }
        } else {
            self.invalidate_by_prefix().await;
        }
    }

    async fn invalidate_by_prefix(&self) {
        let prefix = format!("{}@", R::RESOURCE_NAME);
        if let Err(e) = self.store.forget_prefix(&prefix).await {
            tracing::warn!(prefix = %prefix, error = %e, "Cache invalidation failed");
        }
    }

    // ---- cached reads ------------------------------------------------------

    pub async fn all(&self) -> Result<Vec<<R::Entity as EntityTrait>::Model>, RepoError> {
        self.remember("all", "[]", || self.repo.all()).await
    }

    pub async fn find(&self, id: Uuid) -> Result<<R::Entity as EntityTrait>::Model, RepoError> {
        self.remember("find", &format!("[{id}]"), || self.repo.find(id))
            .await
    }

    pub async fn find_where(
        &self,
        conditions: &[(&str, ConditionOp, &str)],
    ) -> Result<Vec<<R::Entity as EntityTrait>::Model>, RepoError> {
        let args = serde_json::to_string(
            &conditions
                .iter()
                .map(|(f, op, v)| (f.to_string(), op.as_str(), v.to_string()))
                .collect::<Vec<_>>(),
        )
        .unwrap_or_default();
        self.remember("find_where", &args, || self.repo.find_where(conditions))
            .await
    }

    pub async fn paginate(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<Page<<R::Entity as EntityTrait>::Model>, RepoError> {
        self.remember("paginate", &format!("[{page},{per_page}]"), || {
            self.repo.paginate(page, per_page)
        })
        .await
    }

    // ---- writes (delegate + invalidate) ------------------------------------

    pub async fn create(
        &mut self,
        input: R::Create,
    ) -> Result<<R::Entity as EntityTrait>::Model, RepoError> {
        let created = self.repo.create(input).await?;
        self.invalidate().await;
        Ok(created)
    }

    pub async fn update(
        &mut self,
        id: Uuid,
        input: R::Update,
    ) -> Result<<R::Entity as EntityTrait>::Model, RepoError> {
        let updated = self.repo.update(id, input).await?;
        self.invalidate().await;
        Ok(updated)
    }

    pub async fn delete(&mut self, id: Uuid) -> Result<Uuid, RepoError> {
        let deleted = self.repo.delete(id).await?;
        self.invalidate().await;
        Ok(deleted)
    }
}
