//! Key-value store contract used by the ranking engine.
//!
//! Each method maps onto a single atomic Redis command. The batch methods
//! (`write_article`, `record_vote`) default to issuing those commands one by
//! one; backends that have a native atomic batch override them.

mod memory;
mod redis_store;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

use crate::error::StoreResult;
use async_trait::async_trait;
use std::collections::HashMap;

/// Everything written when an article is submitted, after its id is known.
#[derive(Debug, Clone)]
pub struct ArticleWrite {
    pub voted_key: String,
    pub author: String,
    pub voted_ttl_secs: i64,
    pub article_key: String,
    pub fields: Vec<(&'static str, String)>,
    pub score_key: String,
    pub score: f64,
    pub time_key: String,
    pub posted_at: i64,
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// INCR; returns the post-increment value.
    async fn incr(&self, key: &str) -> StoreResult<i64>;

    /// SADD of one member; true iff the member was newly added.
    async fn sadd(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// EXPIRE; a missing key is left alone.
    async fn expire(&self, key: &str, seconds: i64) -> StoreResult<()>;

    async fn exists(&self, key: &str) -> StoreResult<bool>;

    async fn hset_all(&self, key: &str, fields: &[(&'static str, String)]) -> StoreResult<()>;

    /// HGETALL; empty map when the key does not exist.
    async fn hget_all(&self, key: &str) -> StoreResult<HashMap<String, String>>;

    async fn hincr(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64>;

    async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<()>;

    /// ZINCRBY; returns the new score.
    async fn zincr(&self, key: &str, member: &str, delta: f64) -> StoreResult<f64>;

    async fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>>;

    /// ZREVRANGE over inclusive ranks, Redis index semantics.
    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>>;

    /// ZINTERSTORE with AGGREGATE MAX. Plain sets count as score 1.
    /// Returns the cardinality of the stored result.
    async fn zinterstore_max(&self, dest: &str, sources: &[&str]) -> StoreResult<usize>;

    /// Seed ledger, record and both indexes for a new article.
    async fn write_article(&self, write: &ArticleWrite) -> StoreResult<()> {
        self.sadd(&write.voted_key, &write.author).await?;
        self.expire(&write.voted_key, write.voted_ttl_secs).await?;
        self.hset_all(&write.article_key, &write.fields).await?;
        self.zadd(&write.score_key, &write.article_key, write.score)
            .await?;
        self.zadd(&write.time_key, &write.article_key, write.posted_at as f64)
            .await?;
        Ok(())
    }

    /// Apply a counted vote: bump the score and the record's vote count.
    /// Returns the new vote count.
    async fn record_vote(
        &self,
        score_key: &str,
        article_key: &str,
        votes_field: &str,
        weight: f64,
    ) -> StoreResult<i64> {
        self.zincr(score_key, article_key, weight).await?;
        self.hincr(article_key, votes_field, 1).await
    }
}
