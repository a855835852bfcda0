use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }
}

/// Where per-session entity caches are mirrored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    File,
    Redis,
}

impl StorageKind {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "redis" => Ok(Self::Redis),
            other => bail!("Unknown SESSION_STORAGE '{}' (expected memory, file or redis)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Marketplace API
    pub api_base_url: String,
    pub api_timeout_seconds: u64,

    // Auth
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,

    // Session storage
    pub session_storage: StorageKind,
    pub session_storage_dir: PathBuf,
    pub redis_url: String,
    pub session_ttl_seconds: u64,

    // Load policy
    pub project_cache_ttl: Duration,
    pub rate_limit_retry_delay: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        // CORS
        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Marketplace API
        let api_base_url =
            env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:5000/api".to_string());
        url::Url::parse(&api_base_url).context("API_BASE_URL must be a valid URL")?;
        let api_timeout_seconds = parse_or("API_TIMEOUT_SECONDS", 30);

        // Auth
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let jwt_issuer = env::var("JWT_ISSUER").ok().filter(|s| !s.is_empty());

        // Session storage
        let session_storage = StorageKind::parse(
            &env::var("SESSION_STORAGE").unwrap_or_else(|_| "memory".to_string()),
        )?;
        let session_storage_dir = env::var("SESSION_STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".sessions"));
        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://redis:6379/0".to_string());
        let session_ttl_seconds = parse_or("SESSION_TTL_SECONDS", 86_400);

        // Load policy
        let project_cache_ttl = Duration::from_millis(parse_or("PROJECT_CACHE_TTL_MS", 30_000));
        let rate_limit_retry_delay =
            Duration::from_millis(parse_or("RATE_LIMIT_RETRY_MS", 5_000));

        Ok(Settings {
            env,
            server_addr,
            cors_allow_origins,
            api_base_url,
            api_timeout_seconds,
            jwt_secret,
            jwt_issuer,
            session_storage,
            session_storage_dir,
            redis_url,
            session_ttl_seconds,
            project_cache_ttl,
            rate_limit_retry_delay,
        })
    }
}

fn parse_or(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parsing_defaults_to_dev() {
        assert_eq!(Environment::from_str("production"), Environment::Prod);
        assert_eq!(Environment::from_str("STAGING"), Environment::Staging);
        assert_eq!(Environment::from_str("anything"), Environment::Dev);
    }

    #[test]
    fn storage_kind_rejects_unknown_values() {
        assert_eq!(StorageKind::parse("Redis").unwrap(), StorageKind::Redis);
        assert!(StorageKind::parse("local").is_err());
    }
}
