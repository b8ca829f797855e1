//! API routes

pub mod health;
pub mod pages;
pub mod posts;
pub mod sites;
pub mod tenant;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth::require_auth, routing::host_routing, state::AppState};

/// Every request domain a site is reachable under: its platform subdomain
/// and its custom domain. These are the cache key prefixes a write path
/// must evict.
pub(crate) fn site_domains(
    state: &AppState,
    subdomain: Option<&str>,
    custom_domain: Option<&str>,
) -> Vec<String> {
    let mut domains = Vec::new();
    if let Some(subdomain) = subdomain {
        domains.push(format!("{subdomain}.{}", state.config.root_domain));
    }
    if let Some(custom_domain) = custom_domain {
        domains.push(custom_domain.to_string());
    }
    domains
}

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // Management routes: the write paths that must invalidate the resolver
    // cache before returning success.
    let management = Router::new()
        .route(
            "/sites/:id",
            patch(sites::update_site).delete(sites::delete_site),
        )
        .route("/posts", post(posts::create_post))
        .route(
            "/posts/:id",
            patch(posts::update_post).delete(posts::delete_post),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        // Infrastructure endpoints, addressed directly (not rewritten)
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/api", management)
        // Internal applications the host router rewrites to
        .route("/home", get(pages::home))
        .route("/home/", get(pages::home))
        .route("/home/*rest", get(pages::home))
        .route("/app", get(pages::app_index))
        .route("/app/login", get(pages::app_login))
        .route("/app/*rest", get(pages::app_index))
        // Tenant content: /{domain} and /{domain}/{slug}
        .route("/:domain", get(tenant::site_index))
        .route("/:domain/", get(tenant::site_index))
        .route("/:domain/:slug", get(tenant::post_page))
        // Every request passes the host router before any handler runs
        .layer(middleware::from_fn_with_state(state.clone(), host_routing))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Credentials, TokenIntrospector};
    use crate::config::Config;
    use crate::render::MarkdownRenderer;
    use crate::tenant::{TenantKey, TenantStore};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use siteforge_shared::{
        PostId, PostRecord, PostSummary, SiteId, SiteOwner, SiteRecord, StoreError, UserId,
    };
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use std::time::Duration;
    use time::OffsetDateTime;
    use tower::ServiceExt;

    /// Store stub with one site ("demo.example.com") and one published post.
    struct FixtureStore;

    fn demo_site() -> SiteRecord {
        SiteRecord {
            id: SiteId(uuid::Uuid::from_u128(1)),
            subdomain: Some("demo".to_string()),
            custom_domain: None,
            display_name: "Demo".to_string(),
            description: None,
            image: None,
            image_blurhash: None,
            owner: SiteOwner {
                id: UserId::new(),
                display_name: Some("Ada".to_string()),
                image: None,
            },
        }
    }

    fn hello_post() -> PostRecord {
        PostRecord {
            id: PostId(uuid::Uuid::from_u128(2)),
            site_id: SiteId(uuid::Uuid::from_u128(1)),
            slug: "hello".to_string(),
            title: "Hello".to_string(),
            description: None,
            content: Some("# Hello".to_string()),
            image: None,
            image_blurhash: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            published: true,
        }
    }

    #[async_trait]
    impl TenantStore for FixtureStore {
        async fn find_site(&self, key: &TenantKey) -> Result<Option<SiteRecord>, StoreError> {
            Ok(matches!(key, TenantKey::Subdomain(label) if label == "demo")
                .then(demo_site))
        }

        async fn published_posts(&self, key: &TenantKey) -> Result<Vec<PostSummary>, StoreError> {
            Ok(match key {
                TenantKey::Subdomain(label) if label == "demo" => {
                    vec![PostSummary::from(hello_post())]
                }
                _ => Vec::new(),
            })
        }

        async fn find_post(
            &self,
            key: &TenantKey,
            slug: &str,
        ) -> Result<Option<PostRecord>, StoreError> {
            Ok(
                (matches!(key, TenantKey::Subdomain(label) if label == "demo")
                    && slug == "hello")
                    .then(hello_post),
            )
        }

        async fn published_posts_excluding(
            &self,
            _key: &TenantKey,
            _exclude: PostId,
        ) -> Result<Vec<PostSummary>, StoreError> {
            Ok(Vec::new())
        }
    }

    struct NoAuth;

    #[async_trait]
    impl TokenIntrospector for NoAuth {
        async fn is_authenticated(&self, _credentials: &Credentials) -> bool {
            false
        }
    }

    fn test_app() -> Router {
        let config = Config {
            bind_address: "127.0.0.1:0".to_string(),
            root_domain: "example.com".to_string(),
            app_host: "app".to_string(),
            login_path: "/login".to_string(),
            production: true,
            database_url: "postgres://unused".to_string(),
            database_max_connections: 1,
            store_timeout: Duration::from_secs(1),
            cache_ttl: Duration::from_secs(900),
            jwt_secret: "test-jwt-secret-must-be-at-least-32-chars".to_string(),
        };
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://unused@localhost/unused")
            .unwrap();
        let state = AppState::with_collaborators(
            config,
            pool,
            Arc::new(FixtureStore),
            Arc::new(MarkdownRenderer::new()),
            Arc::new(NoAuth),
        );
        create_router(state)
    }

    fn get_request(host: &str, path: &str) -> Request<Body> {
        Request::builder()
            .uri(path)
            .header(header::HOST, host)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_tenant_site_served_end_to_end() {
        let app = test_app();
        let response = app
            .oneshot(get_request("demo.example.com", "/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["site"]["display_name"], "Demo");
        assert_eq!(body["posts"][0]["slug"], "hello");
    }

    #[tokio::test]
    async fn test_tenant_post_page_served_end_to_end() {
        let app = test_app();
        let response = app
            .oneshot(get_request("demo.example.com", "/hello"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["slug"], "hello");
        assert!(body["body"]["html"]
            .as_str()
            .unwrap()
            .contains("<h1>Hello</h1>"));
    }

    #[tokio::test]
    async fn test_unknown_tenant_is_not_found_state() {
        let app = test_app();
        let response = app
            .oneshot(get_request("ghost.example.com", "/"))
            .await
            .unwrap();

        // A resolver miss is a renderable not-found, not an error page.
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_management_routes_require_auth() {
        let app = test_app();
        let request = Request::builder()
            .method("PATCH")
            .uri("/api/sites/00000000-0000-0000-0000-000000000001")
            .header(header::HOST, "demo.example.com")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
