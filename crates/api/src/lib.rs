//! Siteforge API Library
//!
//! This crate contains the API server components for Siteforge: the host
//! router every request passes through, and the cached tenant resolver
//! backing the tenant content pages.

pub mod auth;
pub mod config;
pub mod error;
pub mod render;
pub mod routes;
pub mod routing;
pub mod state;
pub mod tenant;

pub use config::Config;
pub use error::ApiError;
pub use routing::{HostRouter, RouteTarget, RouterDecision, RoutingContext};
pub use state::AppState;
pub use tenant::{TenantCache, TenantKey, TenantResolver};
