use std::{env, str::FromStr};

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::model::attendance::LabelLocale;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,
    pub reset_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_reset_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub upload_dir: String,
    pub log_dir: String,
    pub log_level: String,
    pub label_locale: LabelLocale,

    /// Administrator created at startup when no identity has this email.
    pub bootstrap_admin_email: Option<String>,
    pub bootstrap_admin_password: Option<String>,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_or<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("{key} is invalid"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            db_max_connections: parsed_or("DB_MAX_CONNECTIONS", "10")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parsed_or("ACCESS_TOKEN_TTL", "900")?, // 15 min
            refresh_token_ttl: parsed_or("REFRESH_TOKEN_TTL", "604800")?, // 7 days
            reset_token_ttl: parsed_or("RESET_TOKEN_TTL", "600")?,

            rate_login_per_min: parsed_or("RATE_LOGIN_PER_MIN", "60")?,
            rate_refresh_per_min: parsed_or("RATE_REFRESH_PER_MIN", "30")?,
            rate_reset_per_min: parsed_or("RATE_RESET_PER_MIN", "10")?,
            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", "1000")?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            label_locale: parsed_or("LABEL_LOCALE", "en")?,

            bootstrap_admin_email: optional("BOOTSTRAP_ADMIN_EMAIL"),
            bootstrap_admin_password: optional("BOOTSTRAP_ADMIN_PASSWORD"),
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: String::new(),
            db_max_connections: 1,
            jwt_secret: "test-secret".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            reset_token_ttl: 600,
            rate_login_per_min: 1000,
            rate_refresh_per_min: 1000,
            rate_reset_per_min: 1000,
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            upload_dir: std::env::temp_dir().display().to_string(),
            log_dir: "logs".to_string(),
            log_level: "debug".to_string(),
            label_locale: LabelLocale::En,
            bootstrap_admin_email: None,
            bootstrap_admin_password: None,
        }
    }
}
