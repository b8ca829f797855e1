//! Post management routes (write path)
//!
//! Every mutation evicts the affected resolver cache entries synchronously
//! before returning: the site-level listing keys, and the page key for both
//! the old and new slug when a post is renamed.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, routes::site_domains, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub site_id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
    pub image_blurhash: Option<String>,
    pub published: Option<bool>,
}

/// Post row joined with the domains of its site, enough to compute which
/// cache keys a mutation touches.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PostWriteResult {
    pub id: Uuid,
    pub slug: String,
    #[serde(skip)]
    pub subdomain: Option<String>,
    #[serde(skip)]
    pub custom_domain: Option<String>,
}

fn invalidate_post_keys(state: &AppState, result: &PostWriteResult, slugs: &[&str]) {
    for domain in site_domains(
        state,
        result.subdomain.as_deref(),
        result.custom_domain.as_deref(),
    ) {
        state.resolver.invalidate_site(&domain);
        for slug in slugs {
            state.resolver.invalidate_post(&domain, slug);
        }
    }
}

/// Create a post. The site's listing entries are evicted so the new post
/// shows up immediately once published.
pub async fn create_post(
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostWriteResult>), ApiError> {
    let created: PostWriteResult = sqlx::query_as(
        r#"
        WITH created AS (
            INSERT INTO posts (site_id, slug, title, description, content, published)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, site_id, slug
        )
        SELECT c.id, c.slug, s.subdomain, s.custom_domain
        FROM created c
        JOIN sites s ON s.id = c.site_id
        "#,
    )
    .bind(req.site_id)
    .bind(&req.slug)
    .bind(&req.title)
    .bind(&req.description)
    .bind(&req.content)
    .bind(req.published)
    .fetch_one(&state.pool)
    .await?;

    invalidate_post_keys(&state, &created, &[created.slug.as_str()]);

    tracing::info!(post_id = %created.id, site_id = %req.site_id, "post created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a post and evict stale cache entries.
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<Json<PostWriteResult>, ApiError> {
    let before: PostWriteResult = sqlx::query_as(
        r#"
        SELECT p.id, p.slug, s.subdomain, s.custom_domain
        FROM posts p
        JOIN sites s ON p.site_id = s.id
        WHERE p.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ApiError::NotFound)?;

    let after: PostWriteResult = sqlx::query_as(
        r#"
        WITH updated AS (
            UPDATE posts
            SET slug = COALESCE($2, slug),
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                content = COALESCE($5, content),
                image = COALESCE($6, image),
                image_blurhash = COALESCE($7, image_blurhash),
                published = COALESCE($8, published),
                updated_at = now()
            WHERE id = $1
            RETURNING id, site_id, slug
        )
        SELECT u.id, u.slug, s.subdomain, s.custom_domain
        FROM updated u
        JOIN sites s ON s.id = u.site_id
        "#,
    )
    .bind(id)
    .bind(req.slug)
    .bind(req.title)
    .bind(req.description)
    .bind(req.content)
    .bind(req.image)
    .bind(req.image_blurhash)
    .bind(req.published)
    .fetch_one(&state.pool)
    .await?;

    // Evict the page under the old slug too; a renamed post must not keep
    // serving from its previous key.
    invalidate_post_keys(&state, &after, &[before.slug.as_str(), after.slug.as_str()]);

    tracing::info!(post_id = %id, "post updated");
    Ok(Json(after))
}

/// Delete a post and evict its cache entries.
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PostWriteResult>, ApiError> {
    let deleted: PostWriteResult = sqlx::query_as(
        r#"
        WITH deleted AS (
            DELETE FROM posts
            WHERE id = $1
            RETURNING id, site_id, slug
        )
        SELECT d.id, d.slug, s.subdomain, s.custom_domain
        FROM deleted d
        JOIN sites s ON s.id = d.site_id
        "#,
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(ApiError::NotFound)?;

    invalidate_post_keys(&state, &deleted, &[deleted.slug.as_str()]);

    tracing::info!(post_id = %id, "post deleted");
    Ok(Json(deleted))
}
