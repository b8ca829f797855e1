//! Error types for Siteforge

use thiserror::Error;

/// Errors surfaced by the persistent store collaborator.
///
/// A failed lookup is `Ok(None)` at the store level, never an error; this
/// type only covers the store itself being unreachable or broken.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Errors surfaced by the tenant resolver.
///
/// `NotFound` is deliberately not here: a valid lookup with no matching
/// tenant or post is `Ok(None)`, a normal cacheable outcome. These variants
/// are never cached, so the next call retries against the collaborator.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// The store query failed or timed out. Retryable.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The content renderer rejected the post body.
    #[error("render failure: {0}")]
    RenderFailure(String),
}

impl From<StoreError> for ResolverError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => ResolverError::StoreUnavailable(msg),
        }
    }
}
