/// Configuration management
///
/// Loads configuration from environment variables (and a `.env` file when
/// present).
///
/// # Environment Variables
///
/// | Variable | Default |
/// |----------|---------|
/// | `DATABASE_URL` | required |
/// | `DATABASE_MAX_CONNECTIONS` | 10 |
/// | `API_HOST` | `0.0.0.0` |
/// | `API_PORT` | 8080 |
/// | `SESSION_SECRET` | required, at least 32 characters |
/// | `SESSION_TTL_HOURS` | 24 |
/// | `UPLOAD_DIR` | `uploads` |
/// | `MAX_UPLOAD_BYTES` | 10 MiB |
/// | `CORS_ORIGINS` | `*` (comma separated) |
/// | `PRODUCTION` | `false` (enables HSTS and secure cookies) |

use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use storefront_shared::db::pool::DatabaseConfig as PoolConfig;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const MIN_SECRET_LEN: usize = 32;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub uploads: UploadConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// `*` allows any origin
    pub cors_origins: Vec<String>,

    /// HSTS header and `Secure` session cookie
    pub production: bool,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Session token configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// HS256 signing secret
    pub secret: String,

    /// Token and cookie lifetime
    pub ttl_hours: i64,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_bytes: usize,
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns error if a required variable is missing or a value is invalid
    pub fn from_env() -> Result<Self> {
        // .env is optional
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;
        let secret = lookup("SESSION_SECRET").context("SESSION_SECRET must be set")?;

        if secret.len() < MIN_SECRET_LEN {
            bail!("SESSION_SECRET must be at least {} characters", MIN_SECRET_LEN);
        }

        let ttl_hours: i64 = parse_or(&lookup, "SESSION_TTL_HOURS", 24)?;
        if ttl_hours < 1 {
            bail!("SESSION_TTL_HOURS must be at least 1");
        }

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let production = lookup("PRODUCTION")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Config {
            api: ApiConfig {
                host: lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "API_PORT", 8080)?,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            },
            session: SessionConfig { secret, ttl_hours },
            uploads: UploadConfig {
                dir: lookup("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("uploads")),
                max_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            },
        })
    }

    /// Gets the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Pool settings for `storefront_shared::db::pool::create_pool`
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            ..PoolConfig::default()
        }
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session.ttl_hours)
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        None => Ok(default),
    }
}
