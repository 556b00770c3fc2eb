use crate::config::RankingConfig;
use crate::error::ServiceError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const ONE_WEEK_IN_SECONDS: i64 = 7 * 24 * 60 * 60;
pub const VOTE_WEIGHT_DIVISOR: i64 = 200;
pub const ARTICLES_PER_PAGE: u32 = 25;
pub const GROUP_CACHE_TTL_SECONDS: i64 = 60;

/// How much score a vote is worth depending on when it is cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoteWeighting {
    /// Every eligible vote adds the full weight.
    #[default]
    Constant,
    /// The weight shrinks linearly with the article's age and reaches zero
    /// at the end of the eligibility window.
    LinearDecay,
}

impl FromStr for VoteWeighting {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "constant" => Ok(Self::Constant),
            "linear-decay" | "linear_decay" => Ok(Self::LinearDecay),
            other => Err(ServiceError::InvalidInput(format!(
                "unknown vote weighting '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankingPolicy {
    pub vote_window_secs: i64,
    pub vote_weight: f64,
    pub weighting: VoteWeighting,
    pub articles_per_page: u32,
    pub group_cache_ttl_secs: i64,
}

impl Default for RankingPolicy {
    fn default() -> Self {
        Self {
            vote_window_secs: ONE_WEEK_IN_SECONDS,
            vote_weight: (ONE_WEEK_IN_SECONDS / VOTE_WEIGHT_DIVISOR) as f64,
            weighting: VoteWeighting::Constant,
            articles_per_page: ARTICLES_PER_PAGE,
            group_cache_ttl_secs: GROUP_CACHE_TTL_SECONDS,
        }
    }
}

impl RankingPolicy {
    /// Submissions at or before this time are closed for voting at `now`.
    ///
    /// The window is open at its start and closed at its end, so voting stops
    /// at the same second the vote ledger expires.
    pub fn cutoff(&self, now: i64) -> i64 {
        now - self.vote_window_secs
    }

    /// Score added by a vote cast at `now` on an article posted at `posted_at`.
    pub fn weight_at(&self, posted_at: i64, now: i64) -> f64 {
        match self.weighting {
            VoteWeighting::Constant => self.vote_weight,
            VoteWeighting::LinearDecay => {
                let age = (now - posted_at).clamp(0, self.vote_window_secs);
                let remaining = (self.vote_window_secs - age) as f64;
                self.vote_weight * remaining / self.vote_window_secs as f64
            }
        }
    }
}

impl TryFrom<&RankingConfig> for RankingPolicy {
    type Error = ServiceError;

    fn try_from(config: &RankingConfig) -> Result<Self, Self::Error> {
        if config.vote_window_secs <= 0 {
            return Err(ServiceError::InvalidInput(
                "vote window must be positive".to_string(),
            ));
        }
        if config.vote_weight_divisor <= 0 {
            return Err(ServiceError::InvalidInput(
                "vote weight divisor must be positive".to_string(),
            ));
        }
        if config.articles_per_page == 0 {
            return Err(ServiceError::InvalidInput(
                "articles per page must be positive".to_string(),
            ));
        }
        if config.group_cache_ttl_secs <= 0 {
            return Err(ServiceError::InvalidInput(
                "group cache ttl must be positive".to_string(),
            ));
        }

        Ok(Self {
            vote_window_secs: config.vote_window_secs,
            vote_weight: (config.vote_window_secs / config.vote_weight_divisor) as f64,
            weighting: config.vote_weighting,
            articles_per_page: config.articles_per_page,
            group_cache_ttl_secs: config.group_cache_ttl_secs,
        })
    }
}
