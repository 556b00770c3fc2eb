//! Time-decaying vote ranking for user-submitted articles.
//!
//! Articles, vote ledgers and ranking indexes live in Redis (or the in-process
//! [`store::MemoryStore`]); [`RankingService`] is the only writer.

pub mod clock;
pub mod config;
pub mod error;
pub mod keys;
pub mod metrics;
pub mod models;
pub mod services;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{ServiceError, ServiceResult, StoreError, StoreResult};
pub use keys::KeySpace;
pub use metrics::RankingMetrics;
pub use models::{Article, NewArticle, OrderIndex, VoteOutcome};
pub use services::{RankingPolicy, RankingService, VoteWeighting};
pub use store::{ArticleStore, MemoryStore, RedisStore};
