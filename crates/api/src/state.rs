//! Shared application state

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::{JwtIntrospector, TokenIntrospector};
use crate::config::Config;
use crate::render::{ContentRenderer, MarkdownRenderer};
use crate::routing::HostRouter;
use crate::tenant::{PgTenantStore, TenantResolver, TenantStore};

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: PgPool,
    pub host_router: Arc<HostRouter>,
    pub resolver: Arc<TenantResolver>,
    pub introspector: Arc<dyn TokenIntrospector>,
}

impl AppState {
    /// Build state with the production collaborators.
    pub fn new(config: Config, pool: PgPool) -> Self {
        let store = Arc::new(PgTenantStore::new(pool.clone()));
        let renderer = Arc::new(MarkdownRenderer::new());
        let introspector = Arc::new(JwtIntrospector::new(&config.jwt_secret));
        Self::with_collaborators(config, pool, store, renderer, introspector)
    }

    /// Build state with explicit collaborators. Tests substitute stubs for
    /// the store, renderer, and token introspection.
    pub fn with_collaborators(
        config: Config,
        pool: PgPool,
        store: Arc<dyn TenantStore>,
        renderer: Arc<dyn ContentRenderer>,
        introspector: Arc<dyn TokenIntrospector>,
    ) -> Self {
        let host_router = HostRouter::new(
            config.app_host.as_str(),
            config.login_path.as_str(),
            config.production,
        );
        let resolver = TenantResolver::new(
            store,
            renderer,
            config.root_domain.as_str(),
            config.cache_ttl,
            config.store_timeout,
        );

        Self {
            config: Arc::new(config),
            pool,
            host_router: Arc::new(host_router),
            resolver: Arc::new(resolver),
            introspector,
        }
    }
}
