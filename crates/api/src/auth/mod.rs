//! Authentication seam for Siteforge
//!
//! The host router and the write-path routes only ever need a yes/no answer,
//! so token introspection is a narrow trait. The production implementation
//! validates platform-issued JWTs; tests substitute a fixed stub.

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::{error::ApiError, state::AppState};

/// Request credentials as presented by the client. Opaque to the router;
/// only introspection implementations look inside.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub token: Option<String>,
}

impl Credentials {
    /// Extract credentials from request headers: a bearer token, or the
    /// `session` cookie set by the login flow.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::to_string);

        let token = bearer.or_else(|| {
            headers
                .get(header::COOKIE)
                .and_then(|h| h.to_str().ok())
                .and_then(session_cookie)
        });

        Self { token }
    }
}

fn session_cookie(cookies: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == "session").then(|| value.to_string())
    })
}

/// Token introspection collaborator. Returns a boolean and nothing else.
#[async_trait]
pub trait TokenIntrospector: Send + Sync {
    async fn is_authenticated(&self, credentials: &Credentials) -> bool;
}

/// JWT claims checked during introspection
#[derive(Debug, Deserialize)]
struct Claims {
    #[allow(dead_code)]
    sub: String,
    #[allow(dead_code)]
    exp: i64,
}

/// Validates platform-issued HS256 session tokens.
pub struct JwtIntrospector {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIntrospector {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

#[async_trait]
impl TokenIntrospector for JwtIntrospector {
    async fn is_authenticated(&self, credentials: &Credentials) -> bool {
        let Some(token) = &credentials.token else {
            return false;
        };
        decode::<Claims>(token, &self.decoding_key, &self.validation).is_ok()
    }
}

/// Middleware guarding the write-path routes.
pub async fn require_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let credentials = Credentials::from_headers(req.headers());
    if !state.introspector.is_authenticated(&credentials).await {
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(req).await)
}
