//! Tenant store collaborator
//!
//! Narrow read interface over the persistent store. The Postgres
//! implementation keys every lookup off a `TenantKey`, so a request domain
//! maps to exactly one query strategy: subdomain label or custom domain,
//! never both.

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use siteforge_shared::{
    PostId, PostRecord, PostSummary, SiteId, SiteOwner, SiteRecord, StoreError, UserId,
};

/// Normalized tenant identifier derived from a request domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TenantKey {
    /// Subdomain label under the platform root domain (e.g. "demo").
    Subdomain(String),
    /// Fully qualified custom domain (e.g. "custom.io").
    CustomDomain(String),
}

impl TenantKey {
    /// Derive the key for a request domain: strip the root-domain suffix if
    /// present, otherwise treat the whole domain as a custom domain.
    ///
    /// Shared by all resolver reads so the same input domain always yields
    /// the same key.
    pub fn derive(domain: &str, root_domain: &str) -> Self {
        let suffix = format!(".{root_domain}");
        match domain.strip_suffix(&suffix) {
            Some(label) => TenantKey::Subdomain(label.to_string()),
            None => TenantKey::CustomDomain(domain.to_string()),
        }
    }
}

/// Read interface the resolver depends on. Assumes equality lookups and
/// ordering by creation timestamp; a failed lookup is `Ok(None)`, not an
/// error.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Site for a tenant key, including the owning user.
    async fn find_site(&self, key: &TenantKey) -> Result<Option<SiteRecord>, StoreError>;

    /// Published posts for a tenant, newest first.
    async fn published_posts(&self, key: &TenantKey) -> Result<Vec<PostSummary>, StoreError>;

    /// Post by slug under a tenant, published or not.
    async fn find_post(
        &self,
        key: &TenantKey,
        slug: &str,
    ) -> Result<Option<PostRecord>, StoreError>;

    /// Published posts for a tenant excluding one post, newest first.
    async fn published_posts_excluding(
        &self,
        key: &TenantKey,
        exclude: PostId,
    ) -> Result<Vec<PostSummary>, StoreError>;
}

/// Postgres-backed tenant store.
#[derive(Clone)]
pub struct PgTenantStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct SiteRow {
    id: Uuid,
    subdomain: Option<String>,
    custom_domain: Option<String>,
    display_name: String,
    description: Option<String>,
    image: Option<String>,
    image_blurhash: Option<String>,
    owner_id: Uuid,
    owner_name: Option<String>,
    owner_image: Option<String>,
}

impl From<SiteRow> for SiteRecord {
    fn from(row: SiteRow) -> Self {
        Self {
            id: SiteId(row.id),
            subdomain: row.subdomain,
            custom_domain: row.custom_domain,
            display_name: row.display_name,
            description: row.description,
            image: row.image,
            image_blurhash: row.image_blurhash,
            owner: SiteOwner {
                id: UserId(row.owner_id),
                display_name: row.owner_name,
                image: row.owner_image,
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    site_id: Uuid,
    slug: String,
    title: String,
    description: Option<String>,
    content: Option<String>,
    image: Option<String>,
    image_blurhash: Option<String>,
    created_at: OffsetDateTime,
    published: bool,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: PostId(row.id),
            site_id: SiteId(row.site_id),
            slug: row.slug,
            title: row.title,
            description: row.description,
            content: row.content,
            image: row.image,
            image_blurhash: row.image_blurhash,
            created_at: row.created_at,
            published: row.published,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostSummaryRow {
    slug: String,
    title: String,
    description: Option<String>,
    image: Option<String>,
    image_blurhash: Option<String>,
    created_at: OffsetDateTime,
}

impl From<PostSummaryRow> for PostSummary {
    fn from(row: PostSummaryRow) -> Self {
        Self {
            slug: row.slug,
            title: row.title,
            description: row.description,
            image: row.image,
            image_blurhash: row.image_blurhash,
            created_at: row.created_at,
        }
    }
}

impl PgTenantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// WHERE fragment and bind value for a tenant key. Exactly one per key.
    fn site_predicate(key: &TenantKey) -> (&'static str, &str) {
        match key {
            TenantKey::Subdomain(label) => ("s.subdomain = $1", label.as_str()),
            TenantKey::CustomDomain(domain) => ("s.custom_domain = $1", domain.as_str()),
        }
    }
}

#[async_trait]
impl TenantStore for PgTenantStore {
    async fn find_site(&self, key: &TenantKey) -> Result<Option<SiteRecord>, StoreError> {
        let (predicate, value) = Self::site_predicate(key);
        let sql = format!(
            r#"
            SELECT s.id, s.subdomain, s.custom_domain, s.display_name, s.description,
                   s.image, s.image_blurhash,
                   u.id AS owner_id, u.display_name AS owner_name, u.image AS owner_image
            FROM sites s
            JOIN users u ON s.user_id = u.id
            WHERE {predicate}
            "#
        );

        let row: Option<SiteRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(SiteRecord::from))
    }

    async fn published_posts(&self, key: &TenantKey) -> Result<Vec<PostSummary>, StoreError> {
        let (predicate, value) = Self::site_predicate(key);
        let sql = format!(
            r#"
            SELECT p.slug, p.title, p.description, p.image, p.image_blurhash, p.created_at
            FROM posts p
            JOIN sites s ON p.site_id = s.id
            WHERE {predicate} AND p.published = TRUE
            ORDER BY p.created_at DESC
            "#
        );

        let rows: Vec<PostSummaryRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(PostSummary::from).collect())
    }

    async fn find_post(
        &self,
        key: &TenantKey,
        slug: &str,
    ) -> Result<Option<PostRecord>, StoreError> {
        let (predicate, value) = Self::site_predicate(key);
        let sql = format!(
            r#"
            SELECT p.id, p.site_id, p.slug, p.title, p.description, p.content,
                   p.image, p.image_blurhash, p.created_at, p.published
            FROM posts p
            JOIN sites s ON p.site_id = s.id
            WHERE {predicate} AND p.slug = $2
            "#
        );

        let row: Option<PostRow> = sqlx::query_as(&sql)
            .bind(value)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(PostRecord::from))
    }

    async fn published_posts_excluding(
        &self,
        key: &TenantKey,
        exclude: PostId,
    ) -> Result<Vec<PostSummary>, StoreError> {
        let (predicate, value) = Self::site_predicate(key);
        let sql = format!(
            r#"
            SELECT p.slug, p.title, p.description, p.image, p.image_blurhash, p.created_at
            FROM posts p
            JOIN sites s ON p.site_id = s.id
            WHERE {predicate} AND p.published = TRUE AND p.id <> $2
            ORDER BY p.created_at DESC
            "#
        );

        let rows: Vec<PostSummaryRow> = sqlx::query_as(&sql)
            .bind(value)
            .bind(exclude.0)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(PostSummary::from).collect())
    }
}
