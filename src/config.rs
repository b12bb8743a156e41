// src/config.rs
//! Env-driven application settings. `.env` is loaded in `main` (dotenvy);
//! this module only reads the process environment.

pub const ENV_GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const ENV_PINECONE_API_KEY: &str = "PINECONE_API_KEY";
pub const ENV_PINECONE_HOST: &str = "PINECONE_HOST";
pub const ENV_APP_ENV: &str = "APP_ENV";
pub const ENV_CORS_ORIGINS: &str = "CORS_ORIGINS";
pub const ENV_RATE_LIMIT_REQUESTS: &str = "RATE_LIMIT_REQUESTS";

pub const DEFAULT_APP_ENV: &str = "development";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_RATE_LIMIT_REQUESTS: usize = 100;

#[derive(Debug, Clone)]
pub struct Settings {
    pub google_api_key: String,
    pub pinecone_api_key: String,
    pub pinecone_host: String,
    pub app_env: String,
    pub cors_origins: Vec<String>,
    pub rate_limit_requests: usize,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            google_api_key: std::env::var(ENV_GOOGLE_API_KEY).unwrap_or_default(),
            pinecone_api_key: std::env::var(ENV_PINECONE_API_KEY).unwrap_or_default(),
            pinecone_host: std::env::var(ENV_PINECONE_HOST).unwrap_or_default(),
            app_env: std::env::var(ENV_APP_ENV).unwrap_or_else(|_| DEFAULT_APP_ENV.to_string()),
            cors_origins: parse_origins(std::env::var(ENV_CORS_ORIGINS).ok()),
            rate_limit_requests: parse_limit(std::env::var(ENV_RATE_LIMIT_REQUESTS).ok()),
        }
    }

    pub fn gemini_configured(&self) -> bool {
        !self.google_api_key.is_empty()
    }

    pub fn index_configured(&self) -> bool {
        !self.pinecone_api_key.is_empty() && !self.pinecone_host.is_empty()
    }
}

// Comma-separated list; empty entries dropped.
fn parse_origins(raw: Option<String>) -> Vec<String> {
    let raw = match raw {
        Some(s) if !s.trim().is_empty() => s,
        _ => return vec![DEFAULT_CORS_ORIGIN.to_string()],
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_limit(raw: Option<String>) -> usize {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_RATE_LIMIT_REQUESTS)
}
