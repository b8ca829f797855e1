//! Public tenant content endpoints
//!
//! The read path for tenant pages, reached after the host router rewrites a
//! tenant domain to `/{domain}/...`. All data comes through the resolver
//! cache; a domain or slug that resolves to nothing is a 404, while a store
//! outage surfaces as a retryable 503.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use siteforge_shared::{PostSummary, SiteRecord};

use crate::{error::ApiError, state::AppState, tenant::PostPage};

#[derive(Serialize)]
pub struct SiteIndexResponse {
    pub site: SiteRecord,
    pub posts: Vec<PostSummary>,
}

/// Site landing page data: metadata plus the published post listing.
pub async fn site_index(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> Result<Json<SiteIndexResponse>, ApiError> {
    let site = state
        .resolver
        .get_site(&domain)
        .await?
        .ok_or(ApiError::NotFound)?;
    let posts = state.resolver.get_published_posts(&domain).await?;

    Ok(Json(SiteIndexResponse { site, posts }))
}

/// A single post page: the record, rendered body, and adjacent posts.
pub async fn post_page(
    State(state): State<AppState>,
    Path((domain, slug)): Path<(String, String)>,
) -> Result<Json<PostPage>, ApiError> {
    let page = state
        .resolver
        .get_post(&domain, &slug)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(page.as_ref().clone()))
}
