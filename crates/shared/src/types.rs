//! Common types used across Siteforge

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// ID Wrappers
// =============================================================================

/// Site ID wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct SiteId(pub Uuid);

impl SiteId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SiteId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for SiteId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Post ID wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct PostId(pub Uuid);

impl PostId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PostId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for PostId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// User ID wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

// =============================================================================
// Tenant Records
// =============================================================================

/// The user who owns a site, embedded in site lookups so tenant pages can
/// show author information without a second query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteOwner {
    pub id: UserId,
    pub display_name: Option<String>,
    pub image: Option<String>,
}

/// A tenant site, addressable by platform subdomain or custom domain.
///
/// Loaded from the persistent store as an immutable snapshot; mutation goes
/// through the write-path routes, never through cached copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub id: SiteId,
    /// Subdomain label under the platform root domain (e.g. "demo").
    pub subdomain: Option<String>,
    /// Fully qualified custom domain (e.g. "blog.company.com").
    pub custom_domain: Option<String>,
    pub display_name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub image_blurhash: Option<String>,
    pub owner: SiteOwner,
}

/// A post belonging to a site. `content` holds the raw body; rendering
/// happens at read time through the content renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: PostId,
    pub site_id: SiteId,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
    pub image_blurhash: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub published: bool,
}

/// Listing projection of a post (no content body).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub image_blurhash: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<PostRecord> for PostSummary {
    fn from(post: PostRecord) -> Self {
        Self {
            slug: post.slug,
            title: post.title,
            description: post.description,
            image: post.image,
            image_blurhash: post.image_blurhash,
            created_at: post.created_at,
        }
    }
}
