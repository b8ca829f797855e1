//! Tenant data resolution
//!
//! This module serves tenant content (site metadata, posts) through a
//! read-through cache that avoids redundant database lookups under high
//! read concurrency:
//! - `TenantKey`: one query strategy per request domain
//! - `TenantCache`: keyed TTL store with negative caching
//! - `TenantResolver`: the read operations and their invalidation hooks

mod cache;
mod resolver;
mod store;

pub use cache::{CacheStats, CachedValue, TenantCache};
pub use resolver::{PostPage, TenantResolver};
pub use store::{PgTenantStore, TenantKey, TenantStore};
