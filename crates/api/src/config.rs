//! Application configuration

use std::env;
use std::time::Duration;

/// Default cache TTL for tenant data (15 minutes)
const DEFAULT_CACHE_TTL_SECS: u64 = 900;

/// Application configuration loaded from environment variables.
/// Loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,
    /// Platform root domain, e.g. "example.com" for *.example.com tenants
    pub root_domain: String,
    /// Sentinel host identifying the internal application (e.g. "app")
    pub app_host: String,
    /// Login page path under the application host
    pub login_path: String,
    /// Whether real DNS-based subdomains can be relied on. Injected, never
    /// inferred from other signals.
    pub production: bool,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,
    /// Upper bound on a single tenant store query
    pub store_timeout: Duration,

    // Tenant cache
    pub cache_ttl: Duration,

    // Authentication
    pub jwt_secret: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Server
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            root_domain: env::var("ROOT_DOMAIN").unwrap_or_else(|_| "localhost".to_string()),
            app_host: env::var("APP_HOST").unwrap_or_else(|_| "app".to_string()),
            login_path: env::var("LOGIN_PATH").unwrap_or_else(|_| "/login".to_string()),
            production: env::var("ENVIRONMENT")
                .map(|v| v == "production")
                .unwrap_or(false),

            // Database
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            store_timeout: Duration::from_millis(
                env::var("STORE_TIMEOUT_MS")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .unwrap_or(5000),
            ),

            // Tenant cache
            cache_ttl: Duration::from_secs(
                env::var("CACHE_TTL_SECS")
                    .unwrap_or_else(|_| DEFAULT_CACHE_TTL_SECS.to_string())
                    .parse()
                    .unwrap_or(DEFAULT_CACHE_TTL_SECS),
            ),

            // Authentication
            jwt_secret: {
                let secret =
                    env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
                // Session tokens are HS256; a short key makes them forgeable
                if secret.len() < 32 {
                    return Err(ConfigError::WeakSecret(
                        "JWT_SECRET must be at least 32 characters",
                    ));
                }
                secret
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Weak secret: {0}")]
    WeakSecret(&'static str),
}
