//! Site management routes (write path)
//!
//! Mutations evict the resolver cache for every domain the site is
//! reachable under before returning success, otherwise a reader could
//! observe pre-edit data for up to the full TTL window.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, routes::site_domains, state::AppState};

#[derive(Debug, Deserialize)]
pub struct UpdateSiteRequest {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub image_blurhash: Option<String>,
    pub subdomain: Option<String>,
    pub custom_domain: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SiteDomains {
    pub id: Uuid,
    pub subdomain: Option<String>,
    pub custom_domain: Option<String>,
}

/// A subdomain is a single lowercase label; anything else belongs in the
/// custom-domain column.
fn validate_subdomain(subdomain: &str) -> Result<(), ApiError> {
    let valid = !subdomain.is_empty()
        && subdomain
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid {
        return Err(ApiError::Validation(format!(
            "invalid subdomain: {subdomain}"
        )));
    }
    Ok(())
}

/// Update site settings and evict stale cache entries.
pub async fn update_site(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSiteRequest>,
) -> Result<Json<SiteDomains>, ApiError> {
    if let Some(subdomain) = &req.subdomain {
        validate_subdomain(subdomain)?;
    }

    let before: SiteDomains =
        sqlx::query_as("SELECT id, subdomain, custom_domain FROM sites WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or(ApiError::NotFound)?;

    let after: SiteDomains = sqlx::query_as(
        r#"
        UPDATE sites
        SET display_name = COALESCE($2, display_name),
            description = COALESCE($3, description),
            image = COALESCE($4, image),
            image_blurhash = COALESCE($5, image_blurhash),
            subdomain = COALESCE($6, subdomain),
            custom_domain = COALESCE($7, custom_domain),
            updated_at = now()
        WHERE id = $1
        RETURNING id, subdomain, custom_domain
        "#,
    )
    .bind(id)
    .bind(req.display_name)
    .bind(req.description)
    .bind(req.image)
    .bind(req.image_blurhash)
    .bind(req.subdomain)
    .bind(req.custom_domain)
    .fetch_one(&state.pool)
    .await?;

    // Old and new domains both evict: a renamed site must not serve stale
    // content under either name.
    for domains in [&before, &after] {
        for domain in site_domains(
            &state,
            domains.subdomain.as_deref(),
            domains.custom_domain.as_deref(),
        ) {
            state.resolver.invalidate_site(&domain);
        }
    }

    tracing::info!(site_id = %id, "site updated");
    Ok(Json(after))
}

/// Delete a site and evict its cache entries.
pub async fn delete_site(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SiteDomains>, ApiError> {
    let deleted: SiteDomains =
        sqlx::query_as("DELETE FROM sites WHERE id = $1 RETURNING id, subdomain, custom_domain")
            .bind(id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or(ApiError::NotFound)?;

    for domain in site_domains(
        &state,
        deleted.subdomain.as_deref(),
        deleted.custom_domain.as_deref(),
    ) {
        state.resolver.invalidate_site(&domain);
    }

    tracing::info!(site_id = %id, "site deleted");
    Ok(Json(deleted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_subdomain() {
        assert!(validate_subdomain("demo").is_ok());
        assert!(validate_subdomain("my-site-42").is_ok());

        assert!(validate_subdomain("").is_err());
        assert!(validate_subdomain("Demo").is_err());
        assert!(validate_subdomain("a.b").is_err());
        assert!(validate_subdomain("white space").is_err());
    }
}
