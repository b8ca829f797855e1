//! Internal application page endpoints
//!
//! Requests land here after the host router rewrites them under `/home` or
//! `/app`. Presentation is owned by the frontend; these endpoints identify
//! which internal application a request was dispatched to.

use axum::Json;
use serde_json::{json, Value};

/// Root application pages (`/home/*`).
pub async fn home() -> Json<Value> {
    Json(json!({
        "application": "home",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Dashboard index (`/app/*`), reachable only through the login gate.
pub async fn app_index() -> Json<Value> {
    Json(json!({
        "application": "app",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Login page (`/app/login`), the one dashboard path open to
/// unauthenticated requests.
pub async fn app_login() -> Json<Value> {
    Json(json!({
        "application": "app",
        "page": "login",
    }))
}
