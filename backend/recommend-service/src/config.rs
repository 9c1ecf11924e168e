/// Configuration management for Recommend Service
///
/// Loads configuration from environment variables with development defaults.
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Ingestion pipeline configuration
    pub ingest: IngestConfig,
    /// Recommendation engine configuration
    pub recommendation: RecommendationConfig,
    /// Static identification fields echoed in responses
    pub identity: IdentityConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
}

/// Ingestion pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Pending posts per flush transaction
    pub batch_size: usize,
}

/// Recommendation engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    /// TTL for cached recommendation lists, in seconds
    pub cache_ttl_secs: u64,
    /// Which user the scoring channels attribute to
    pub attribution: AttributionMode,
}

/// Scoring attribution mode.
///
/// `Seed` reproduces the historical behavior: every channel keys off the
/// author of the seed user's own posts, so scores collapse onto the seed.
/// `Counterparty` scores the authors of posts that reference the seed
/// (replies to it, reposts of it) instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributionMode {
    Seed,
    Counterparty,
}

impl AttributionMode {
    fn parse(value: &str) -> Result<Self, String> {
        match value {
            "seed" => Ok(AttributionMode::Seed),
            "counterparty" => Ok(AttributionMode::Counterparty),
            other => Err(format!(
                "RECOMMENDATION_ATTRIBUTION must be 'seed' or 'counterparty', got '{}'",
                other
            )),
        }
    }
}

/// Static identification fields carried verbatim in every response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub team_id: String,
    pub account_id: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        Ok(Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                host: std::env::var("RECOMMEND_SERVICE_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("RECOMMEND_SERVICE_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8086),
            },
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/ripple".to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(10),
            },
            ingest: IngestConfig {
                batch_size: parse_env_or_default("INGEST_BATCH_SIZE", 1_000)?,
            },
            recommendation: RecommendationConfig {
                cache_ttl_secs: parse_env_or_default("RECOMMENDATION_CACHE_TTL_SECS", 300)?,
                attribution: match std::env::var("RECOMMENDATION_ATTRIBUTION") {
                    Ok(value) => AttributionMode::parse(&value)?,
                    Err(_) => AttributionMode::Seed,
                },
            },
            identity: IdentityConfig {
                team_id: std::env::var("TEAM_ID").unwrap_or_else(|_| "ripple".to_string()),
                account_id: std::env::var("TEAM_ACCOUNT_ID").unwrap_or_else(|_| "0".to_string()),
            },
        })
    }
}

fn parse_env_or_default<T: std::str::FromStr>(key: &str, default: T) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}
