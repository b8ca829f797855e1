//! Axum layer applying host routing decisions
//!
//! Runs the host router on every inbound request before any handler:
//! redirects short-circuit, rewrites swap the request URI in place and
//! expose the chosen target in a response header for diagnostics.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::auth::Credentials;
use crate::routing::{RouterDecision, RoutingContext};
use crate::state::AppState;

/// Response header carrying the internal rewrite target, so diagnostics can
/// see what routing decision was made independent of the dispatch.
pub const REWRITE_HEADER: &str = "x-rewrite";

/// Paths addressed directly rather than through host rewriting: the
/// management API and infrastructure probes.
fn is_passthrough(path: &str) -> bool {
    ["/api", "/health"]
        .iter()
        .any(|prefix| path == *prefix || path.starts_with(&format!("{prefix}/")))
}

pub async fn host_routing(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    if is_passthrough(req.uri().path()) {
        return next.run(req).await;
    }

    let ctx = routing_context(&req);
    let credentials = Credentials::from_headers(req.headers());
    let authenticated = state.introspector.is_authenticated(&credentials).await;

    match state.host_router.route(&ctx, authenticated) {
        RouterDecision::Redirect(location) => Redirect::temporary(&location).into_response(),
        RouterDecision::Rewrite(target) => {
            let rewritten = match ctx.query.as_deref() {
                Some(query) => format!("{}?{}", target.path(), query),
                None => target.path().to_string(),
            };

            match rewritten.parse::<Uri>() {
                Ok(uri) => *req.uri_mut() = uri,
                // Routing must never fail the request; dispatch unchanged.
                Err(err) => {
                    tracing::warn!(%err, uri = %rewritten, "unroutable rewrite target")
                }
            }

            let mut response = next.run(req).await;
            if let Ok(value) = HeaderValue::from_str(&rewritten) {
                response.headers_mut().insert(REWRITE_HEADER, value);
            }
            response
        }
    }
}

/// Derive the routing context once per request.
fn routing_context(req: &Request) -> RoutingContext {
    let query = req.uri().query().map(str::to_string);
    let host_override = query.as_deref().and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(key, _)| key == "host")
            .map(|(_, value)| value.into_owned())
    });

    RoutingContext {
        raw_host: req
            .headers()
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string),
        host_override,
        path: req.uri().path().to_string(),
        query,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenIntrospector;
    use crate::config::Config;
    use crate::render::MarkdownRenderer;
    use crate::tenant::{TenantKey, TenantStore};
    use async_trait::async_trait;
    use axum::{body::Body, middleware, Router};
    use siteforge_shared::{PostId, PostRecord, PostSummary, SiteRecord, StoreError};
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Store stub; the middleware itself never touches the store.
    struct NullStore;

    #[async_trait]
    impl TenantStore for NullStore {
        async fn find_site(&self, _key: &TenantKey) -> Result<Option<SiteRecord>, StoreError> {
            Ok(None)
        }
        async fn published_posts(
            &self,
            _key: &TenantKey,
        ) -> Result<Vec<PostSummary>, StoreError> {
            Ok(Vec::new())
        }
        async fn find_post(
            &self,
            _key: &TenantKey,
            _slug: &str,
        ) -> Result<Option<PostRecord>, StoreError> {
            Ok(None)
        }
        async fn published_posts_excluding(
            &self,
            _key: &TenantKey,
            _exclude: PostId,
        ) -> Result<Vec<PostSummary>, StoreError> {
            Ok(Vec::new())
        }
    }

    struct StubAuth {
        authenticated: bool,
    }

    #[async_trait]
    impl TokenIntrospector for StubAuth {
        async fn is_authenticated(&self, _credentials: &Credentials) -> bool {
            self.authenticated
        }
    }

    fn test_config(production: bool) -> Config {
        Config {
            bind_address: "127.0.0.1:0".to_string(),
            root_domain: "example.com".to_string(),
            app_host: "app".to_string(),
            login_path: "/login".to_string(),
            production,
            database_url: "postgres://unused".to_string(),
            database_max_connections: 1,
            store_timeout: Duration::from_secs(1),
            cache_ttl: Duration::from_secs(900),
            jwt_secret: "test-jwt-secret-must-be-at-least-32-chars".to_string(),
        }
    }

    fn test_app(production: bool, authenticated: bool) -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://unused@localhost/unused")
            .unwrap();
        let state = AppState::with_collaborators(
            test_config(production),
            pool,
            Arc::new(NullStore),
            Arc::new(MarkdownRenderer::new()),
            Arc::new(StubAuth { authenticated }),
        );

        async fn echo(req: Request) -> String {
            req.uri().to_string()
        }

        Router::new()
            .fallback(echo)
            .layer(middleware::from_fn_with_state(state, host_routing))
    }

    fn request(host: Option<&str>, uri: &str) -> Request {
        let mut builder = Request::builder().uri(uri);
        if let Some(host) = host {
            builder = builder.header(header::HOST, host);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_passthrough_paths() {
        assert!(is_passthrough("/api"));
        assert!(is_passthrough("/api/sites/abc"));
        assert!(is_passthrough("/health/ready"));

        assert!(!is_passthrough("/apiary"));
        assert!(!is_passthrough("/"));
        assert!(!is_passthrough("/blog/api"));
    }

    #[tokio::test]
    async fn test_tenant_host_rewrites_and_exposes_header() {
        let app = test_app(true, false);
        let response = app
            .oneshot(request(Some("demo.example.com"), "/blog/first"))
            .await
            .unwrap();

        assert_eq!(
            response
                .headers()
                .get(REWRITE_HEADER)
                .and_then(|h| h.to_str().ok()),
            Some("/demo.example.com/blog/first")
        );
        assert_eq!(
            body_string(response).await,
            "/demo.example.com/blog/first"
        );
    }

    #[tokio::test]
    async fn test_rewrite_preserves_query() {
        let app = test_app(true, false);
        let response = app
            .oneshot(request(Some("demo.example.com"), "/blog?page=2"))
            .await
            .unwrap();

        assert_eq!(body_string(response).await, "/demo.example.com/blog?page=2");
    }

    #[tokio::test]
    async fn test_app_host_unauthenticated_redirects_to_login() {
        let app = test_app(true, false);
        let response = app.oneshot(request(Some("app"), "/settings")).await.unwrap();

        assert!(response.status().is_redirection());
        assert_eq!(
            response
                .headers()
                .get(header::LOCATION)
                .and_then(|h| h.to_str().ok()),
            Some("/login")
        );
    }

    #[tokio::test]
    async fn test_app_host_authenticated_rewrites_under_app() {
        let app = test_app(true, true);
        let response = app.oneshot(request(Some("app"), "/settings")).await.unwrap();

        assert_eq!(body_string(response).await, "/app/settings");
    }

    #[tokio::test]
    async fn test_non_production_forces_host_override() {
        let app = test_app(false, false);
        let response = app
            .oneshot(request(Some("demo.localhost:3000"), "/"))
            .await
            .unwrap();

        assert!(response.status().is_redirection());
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|h| h.to_str().ok())
            .unwrap();
        assert!(location.contains("host=app"), "got {location}");
    }

    #[tokio::test]
    async fn test_missing_host_header_routes_to_home() {
        let app = test_app(true, false);
        let response = app.oneshot(request(None, "/about")).await.unwrap();

        assert_eq!(body_string(response).await, "/home/about");
    }

    #[tokio::test]
    async fn test_override_parameter_simulates_tenant_host() {
        let app = test_app(true, false);
        let response = app
            .oneshot(request(Some("localhost:3000"), "/?host=demo.example.com"))
            .await
            .unwrap();

        assert_eq!(
            body_string(response).await,
            "/demo.example.com/?host=demo.example.com"
        );
    }
}
