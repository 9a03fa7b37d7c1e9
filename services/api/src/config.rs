//! Application configuration from environment variables

use serde::Serialize;

/// Deployment environment; controls how much detail internal errors expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// Lifetime of issued bearer tokens in days
    pub token_ttl_days: i64,
    /// CORS origin allow-list
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    /// Create a new AppConfig from environment variables
    ///
    /// # Environment Variables
    /// - `APP_ENV`: `production` or anything else for development
    /// - `HTTP_BIND`: bind address (default: "0.0.0.0:3000")
    /// - `AUTH_TOKEN_TTL_DAYS`: token lifetime in days (default: 30)
    /// - `CORS_ALLOWED_ORIGINS`: comma-separated origin list
    pub fn from_env() -> Self {
        let bind_addr =
            std::env::var("HTTP_BIND").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let token_ttl_days = std::env::var("AUTH_TOKEN_TTL_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                    "http://localhost:4173".to_string(),
                ]
            });

        Self {
            environment: Environment::from_env(),
            bind_addr,
            token_ttl_days,
            cors_allowed_origins,
        }
    }
}
