use std::env;
use tracing::warn;

use crate::auth::TokenConfig;
use crate::shared::AppError;

/// Process configuration read from the environment
#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    /// In-memory repositories are used when absent
    pub database_url: Option<String>,
    pub cors_origins: Vec<String>,
    /// `(id, name)` of a super admin to ensure exists at startup
    pub seed_super_admin: Option<(String, String)>,
    pub token_config: TokenConfig,
}

fn parse_seed(raw: &str) -> Result<(String, String), AppError> {
    match raw.split_once(':') {
        Some((id, name)) if !id.trim().is_empty() && !name.trim().is_empty() => {
            Ok((id.trim().to_string(), name.trim().to_string()))
        }
        _ => Err(AppError::Validation(format!(
            "SEED_SUPER_ADMIN must look like id:name, got '{}'",
            raw
        ))),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        if database_url.is_none() {
            warn!("DATABASE_URL not set; using in-memory storage");
        }

        Ok(Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            database_url,
            cors_origins: parse_origins(
                &env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".to_string()),
            ),
            seed_super_admin: env::var("SEED_SUPER_ADMIN")
                .ok()
                .map(|raw| parse_seed(&raw))
                .transpose()?,
            token_config: TokenConfig::new(),
        })
    }
}
