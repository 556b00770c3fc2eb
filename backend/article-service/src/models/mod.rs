use crate::error::{ServiceError, ServiceResult};
use crate::keys::fields;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// A hydrated article record. `id` is the record's store key (`article:{n}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub link: String,
    pub poster: String,
    /// Submission time, epoch seconds
    pub time: i64,
    pub votes: i64,
}

impl Article {
    /// Build an article from its hash fields.
    pub fn from_fields(key: &str, mut hash: HashMap<String, String>) -> ServiceResult<Self> {
        let mut take = |field: &str| {
            hash.remove(field).ok_or_else(|| ServiceError::CorruptRecord {
                key: key.to_string(),
                reason: format!("missing field '{}'", field),
            })
        };

        let title = take(fields::TITLE)?;
        let link = take(fields::LINK)?;
        let poster = take(fields::POSTER)?;
        let time = take(fields::TIME)?;
        let votes = take(fields::VOTES)?;

        Ok(Self {
            id: key.to_string(),
            title,
            link,
            poster,
            time: parse_field(key, fields::TIME, &time)?,
            votes: parse_field(key, fields::VOTES, &votes)?,
        })
    }
}

fn parse_field(key: &str, field: &str, raw: &str) -> ServiceResult<i64> {
    raw.parse().map_err(|_| ServiceError::CorruptRecord {
        key: key.to_string(),
        reason: format!("field '{}' is not an integer: {:?}", field, raw),
    })
}

/// Submission request. Inputs are trimmed on construction.
#[derive(Debug, Clone, Validate)]
pub struct NewArticle {
    #[validate(length(min = 1, message = "author is required"))]
    pub author: String,
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[validate(
        length(min = 1, message = "link is required"),
        url(message = "link must be a valid URL")
    )]
    pub link: String,
}

impl NewArticle {
    pub fn new(
        author: impl Into<String>,
        title: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            author: author.into().trim().to_string(),
            title: title.into().trim().to_string(),
            link: link.into().trim().to_string(),
        }
    }
}

/// Sorted set used as a ranking criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderIndex {
    /// Decaying vote score
    #[default]
    Score,
    /// Submission time, newest first
    Time,
}

impl OrderIndex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Score => "score",
            Self::Time => "time",
        }
    }
}

impl fmt::Display for OrderIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderIndex {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "score" => Ok(Self::Score),
            "time" => Ok(Self::Time),
            other => Err(ServiceError::InvalidInput(format!(
                "unknown order index '{}'",
                other
            ))),
        }
    }
}

/// Result of a vote. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VoteOutcome {
    /// New voter; `votes` is the record's count after the increment.
    Counted { votes: i64 },
    /// Voter already in the ledger.
    AlreadyVoted,
    /// The eligibility window has closed.
    NotEligible,
    /// No time index entry for the article key.
    UnknownArticle,
}

impl VoteOutcome {
    pub fn is_counted(&self) -> bool {
        matches!(self, Self::Counted { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Counted { .. } => "counted",
            Self::AlreadyVoted => "already_voted",
            Self::NotEligible => "not_eligible",
            Self::UnknownArticle => "unknown_article",
        }
    }
}

/// Inclusive rank range for a 1-based page, `None` when the page is 0.
pub fn page_bounds(page: u32, per_page: u32) -> Option<(isize, isize)> {
    if page == 0 || per_page == 0 {
        return None;
    }
    let start = (page as isize - 1) * per_page as isize;
    Some((start, start + per_page as isize - 1))
}
