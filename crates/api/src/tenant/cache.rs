//! In-memory tenant cache with TTL
//!
//! Caches resolver results to reduce database queries for tenant pages.
//! Keys follow the `{domain}-metadata` / `{domain}-posts` / `{domain}-{slug}`
//! scheme; values cover all three read operations so the whole resolver
//! shares one keyed store. A cached `None` is a valid value (negative
//! caching), distinct from a key that is missing or expired.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use siteforge_shared::{PostSummary, SiteRecord};

use super::resolver::PostPage;

/// A cached resolver result.
#[derive(Debug, Clone)]
pub enum CachedValue {
    /// Site metadata; `None` records that the domain resolves to no site.
    Site(Option<SiteRecord>),
    /// Published post listing; empty is a valid, cacheable result.
    Posts(Vec<PostSummary>),
    /// Rendered post page; `None` records that the slug matched nothing.
    Page(Option<Arc<PostPage>>),
}

/// Cache entry with its insertion time.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: CachedValue,
    inserted_at: Instant,
}

impl CacheEntry {
    fn new(value: CachedValue) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() > ttl
    }
}

/// Thread-safe keyed cache. Reads of different keys never block each other;
/// an entry is inserted whole, so readers only ever observe complete values.
pub struct TenantCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl TenantCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Get the cached value for a key. An entry older than the TTL is
    /// never returned.
    pub fn get(&self, key: &str) -> Option<CachedValue> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(key)?;

        if entry.is_expired(self.ttl) {
            None
        } else {
            Some(entry.value.clone())
        }
    }

    /// Cache a value under a key, replacing any previous entry.
    pub fn set(&self, key: &str, value: CachedValue) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), CacheEntry::new(value));
        }
    }

    /// Evict a key. Missing keys are a no-op, never an error.
    pub fn invalidate(&self, key: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    /// Clear expired entries (call periodically for memory management)
    pub fn cleanup(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, entry| !entry.is_expired(self.ttl));
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        if let Ok(entries) = self.entries.read() {
            let total = entries.len();
            let expired = entries.values().filter(|e| e.is_expired(self.ttl)).count();
            CacheStats {
                total_entries: total,
                expired_entries: expired,
                active_entries: total - expired,
            }
        } else {
            CacheStats::default()
        }
    }
}

/// Cache statistics
#[derive(Default, Debug)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use siteforge_shared::{SiteId, SiteOwner, UserId};
    use std::thread::sleep;

    fn site(name: &str) -> SiteRecord {
        SiteRecord {
            id: SiteId::new(),
            subdomain: Some(name.to_string()),
            custom_domain: None,
            display_name: name.to_string(),
            description: None,
            image: None,
            image_blurhash: None,
            owner: SiteOwner {
                id: UserId::new(),
                display_name: None,
                image: None,
            },
        }
    }

    #[test]
    fn test_cache_get_set() {
        let cache = TenantCache::new(Duration::from_secs(900));

        assert!(cache.get("demo-metadata").is_none());

        cache.set("demo-metadata", CachedValue::Site(Some(site("demo"))));
        match cache.get("demo-metadata") {
            Some(CachedValue::Site(Some(record))) => {
                assert_eq!(record.display_name, "demo");
            }
            other => panic!("unexpected cache state: {other:?}"),
        }
    }

    #[test]
    fn test_cache_negative() {
        let cache = TenantCache::new(Duration::from_secs(900));

        // A domain that resolves to no site is still a cacheable answer.
        cache.set("unknown.io-metadata", CachedValue::Site(None));
        assert!(matches!(
            cache.get("unknown.io-metadata"),
            Some(CachedValue::Site(None))
        ));
    }

    #[test]
    fn test_cache_empty_listing_is_cacheable() {
        let cache = TenantCache::new(Duration::from_secs(900));

        cache.set("demo-posts", CachedValue::Posts(Vec::new()));
        assert!(matches!(
            cache.get("demo-posts"),
            Some(CachedValue::Posts(posts)) if posts.is_empty()
        ));
    }

    #[test]
    fn test_cache_expiration() {
        let cache = TenantCache::new(Duration::from_millis(50));

        cache.set("demo-metadata", CachedValue::Site(Some(site("demo"))));
        assert!(cache.get("demo-metadata").is_some());

        sleep(Duration::from_millis(60));
        assert!(cache.get("demo-metadata").is_none());
    }

    #[test]
    fn test_cache_invalidate() {
        let cache = TenantCache::new(Duration::from_secs(900));

        cache.set("demo-metadata", CachedValue::Site(Some(site("demo"))));
        cache.invalidate("demo-metadata");
        assert!(cache.get("demo-metadata").is_none());

        // Invalidating a key that was never cached is a no-op.
        cache.invalidate("never-cached");
    }

    #[test]
    fn test_cache_cleanup_retains_live_entries() {
        let cache = TenantCache::new(Duration::from_millis(50));

        cache.set("old-metadata", CachedValue::Site(None));
        sleep(Duration::from_millis(60));
        cache.set("fresh-metadata", CachedValue::Site(None));

        cache.cleanup();

        let stats = cache.stats();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.active_entries, 1);
    }
}
