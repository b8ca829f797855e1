//! Cached tenant resolver
//!
//! The read path for tenant pages. Each operation is a read-through cache
//! lookup: at most one store query per (key, TTL window), with per-key
//! single-flight so concurrent misses for the same key collapse into one
//! query. Store and render failures are surfaced to the caller and never
//! cached, so the next call retries against the collaborator.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;

use siteforge_shared::{PostSummary, ResolverError, SiteRecord, StoreError};

use crate::render::ContentRenderer;

use super::cache::{CacheStats, CachedValue, TenantCache};
use super::store::{TenantKey, TenantStore};

/// A fully resolved post page: the record, its rendered body, and the other
/// published posts of the same site (newest first).
#[derive(Debug, Clone, Serialize)]
pub struct PostPage {
    #[serde(flatten)]
    pub post: siteforge_shared::PostRecord,
    pub body: crate::render::RenderedDocument,
    pub adjacent: Vec<PostSummary>,
}

/// Read-through resolver for tenant content.
pub struct TenantResolver {
    store: Arc<dyn TenantStore>,
    renderer: Arc<dyn ContentRenderer>,
    cache: TenantCache,
    /// Per-key refresh guards; holding a key's guard means its store query
    /// is yours to run.
    inflight: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
    root_domain: String,
    store_timeout: Duration,
}

impl TenantResolver {
    pub fn new(
        store: Arc<dyn TenantStore>,
        renderer: Arc<dyn ContentRenderer>,
        root_domain: impl Into<String>,
        cache_ttl: Duration,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            renderer,
            cache: TenantCache::new(cache_ttl),
            inflight: StdMutex::new(HashMap::new()),
            root_domain: root_domain.into(),
            store_timeout,
        }
    }

    fn metadata_key(domain: &str) -> String {
        format!("{domain}-metadata")
    }

    fn posts_key(domain: &str) -> String {
        format!("{domain}-posts")
    }

    fn page_key(domain: &str, slug: &str) -> String {
        format!("{domain}-{slug}")
    }

    /// Site metadata for a request domain, including the owning user.
    /// `Ok(None)` means the domain resolves to no site and is cached too.
    pub async fn get_site(&self, domain: &str) -> Result<Option<SiteRecord>, ResolverError> {
        let key = Self::metadata_key(domain);
        if let Some(CachedValue::Site(site)) = self.cache.get(&key) {
            return Ok(site);
        }

        let guard = self.flight_guard(&key);
        let _flight = guard.lock().await;
        // Another request may have refreshed the entry while we waited.
        if let Some(CachedValue::Site(site)) = self.cache.get(&key) {
            return Ok(site);
        }

        let tenant = TenantKey::derive(domain, &self.root_domain);
        let site = self.store_query(self.store.find_site(&tenant)).await?;
        self.cache.set(&key, CachedValue::Site(site.clone()));
        Ok(site)
    }

    /// Published posts for a request domain, newest first. An empty listing
    /// is a valid, cacheable result.
    pub async fn get_published_posts(
        &self,
        domain: &str,
    ) -> Result<Vec<PostSummary>, ResolverError> {
        let key = Self::posts_key(domain);
        if let Some(CachedValue::Posts(posts)) = self.cache.get(&key) {
            return Ok(posts);
        }

        let guard = self.flight_guard(&key);
        let _flight = guard.lock().await;
        if let Some(CachedValue::Posts(posts)) = self.cache.get(&key) {
            return Ok(posts);
        }

        let tenant = TenantKey::derive(domain, &self.root_domain);
        let posts = self
            .store_query(self.store.published_posts(&tenant))
            .await?;
        self.cache.set(&key, CachedValue::Posts(posts.clone()));
        Ok(posts)
    }

    /// A post by slug with its rendered body and adjacent-posts list.
    ///
    /// The render and the adjacent-posts fetch are independent and run
    /// concurrently; the page is only cached once both have succeeded, so a
    /// failed or cancelled sub-fetch never populates the entry.
    pub async fn get_post(
        &self,
        domain: &str,
        slug: &str,
    ) -> Result<Option<Arc<PostPage>>, ResolverError> {
        let key = Self::page_key(domain, slug);
        if let Some(CachedValue::Page(page)) = self.cache.get(&key) {
            return Ok(page);
        }

        let guard = self.flight_guard(&key);
        let _flight = guard.lock().await;
        if let Some(CachedValue::Page(page)) = self.cache.get(&key) {
            return Ok(page);
        }

        let tenant = TenantKey::derive(domain, &self.root_domain);
        let Some(post) = self.store_query(self.store.find_post(&tenant, slug)).await? else {
            self.cache.set(&key, CachedValue::Page(None));
            return Ok(None);
        };

        let raw = post.content.clone().unwrap_or_default();
        let (body, adjacent) = tokio::try_join!(
            async {
                self.renderer
                    .render(&raw)
                    .await
                    .map_err(|e| ResolverError::RenderFailure(e.to_string()))
            },
            self.store_query(self.store.published_posts_excluding(&tenant, post.id)),
        )?;

        let page = Arc::new(PostPage {
            post,
            body,
            adjacent,
        });
        self.cache.set(&key, CachedValue::Page(Some(page.clone())));
        Ok(Some(page))
    }

    /// Evict the metadata and listing entries for a domain. Called
    /// synchronously by any write path that mutates the site or its posts.
    pub fn invalidate_site(&self, domain: &str) {
        self.cache.invalidate(&Self::metadata_key(domain));
        self.cache.invalidate(&Self::posts_key(domain));
        tracing::debug!(domain, "invalidated site cache entries");
    }

    /// Evict a single post page entry.
    pub fn invalidate_post(&self, domain: &str, slug: &str) {
        self.cache.invalidate(&Self::page_key(domain, slug));
        tracing::debug!(domain, slug, "invalidated post cache entry");
    }

    /// Cache statistics for diagnostics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop expired cache entries and idle refresh guards.
    pub fn cleanup(&self) {
        self.cache.cleanup();
        let mut inflight = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        inflight.retain(|_, guard| Arc::strong_count(guard) > 1);
    }

    fn flight_guard(&self, key: &str) -> Arc<Mutex<()>> {
        let mut inflight = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        inflight.entry(key.to_string()).or_default().clone()
    }

    /// Run a store query under the configured timeout. Elapsing counts as
    /// the store being unavailable; the failure is surfaced, not cached.
    async fn store_query<T>(
        &self,
        query: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, ResolverError> {
        match tokio::time::timeout(self.store_timeout, query).await {
            Ok(result) => result.map_err(ResolverError::from),
            Err(_) => Err(ResolverError::StoreUnavailable(format!(
                "query exceeded {}ms",
                self.store_timeout.as_millis()
            ))),
        }
    }
}
