/// Configuration management for Article Service
///
/// Loads configuration from environment variables (and `.env` when present).
use crate::services::policy::{
    VoteWeighting, ARTICLES_PER_PAGE, GROUP_CACHE_TTL_SECONDS, ONE_WEEK_IN_SECONDS,
    VOTE_WEIGHT_DIVISOR,
};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub redis: RedisConfig,
    pub ranking: RankingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub service_name: String,
    /// Application environment (development, staging, production)
    pub app_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL (redis://host:port/db)
    pub url: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Optional prefix for every key, e.g. `staging`
    pub key_namespace: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    pub vote_window_secs: i64,
    pub vote_weight_divisor: i64,
    pub vote_weighting: VoteWeighting,
    pub articles_per_page: u32,
    pub group_cache_ttl_secs: i64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            vote_window_secs: ONE_WEEK_IN_SECONDS,
            vote_weight_divisor: VOTE_WEIGHT_DIVISOR,
            vote_weighting: VoteWeighting::Constant,
            articles_per_page: ARTICLES_PER_PAGE,
            group_cache_ttl_secs: GROUP_CACHE_TTL_SECONDS,
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    5
}

/// Parse an optional variable, failing loudly when it is set but malformed.
fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} has an invalid value {:?}: {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let service = ServiceConfig {
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "article-service".to_string()),
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        };

        let redis = RedisConfig {
            url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            connect_timeout_secs: parse_var(
                "REDIS_CONNECT_TIMEOUT_SECS",
                default_connect_timeout_secs(),
            )?,
            key_namespace: env::var("REDIS_KEY_NAMESPACE")
                .ok()
                .filter(|ns| !ns.trim().is_empty()),
        };

        let defaults = RankingConfig::default();
        let ranking = RankingConfig {
            vote_window_secs: parse_var("VOTE_WINDOW_SECS", defaults.vote_window_secs)?,
            vote_weight_divisor: parse_var("VOTE_WEIGHT_DIVISOR", defaults.vote_weight_divisor)?,
            vote_weighting: parse_var("VOTE_WEIGHTING", defaults.vote_weighting)?,
            articles_per_page: parse_var("ARTICLES_PER_PAGE", defaults.articles_per_page)?,
            group_cache_ttl_secs: parse_var(
                "GROUP_CACHE_TTL_SECS",
                defaults.group_cache_ttl_secs,
            )?,
        };

        Ok(Config {
            service,
            redis,
            ranking,
        })
    }
}
