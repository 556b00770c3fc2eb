use super::{ArticleStore, ArticleWrite};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, RedisError};
use std::collections::HashMap;
use tracing::debug;

/// Redis-backed store.
///
/// `ConnectionManager` is cheap to clone and multiplexes one connection, so
/// each call clones it instead of holding a lock.
#[derive(Clone)]
pub struct RedisStore {
    redis: ConnectionManager,
}

impl RedisStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    pub fn from_pool(pool: &redis_utils::RedisPool) -> Self {
        Self::new(pool.manager())
    }
}

fn classify(key: &str, err: RedisError) -> StoreError {
    if err.code() == Some("WRONGTYPE") {
        StoreError::WrongType {
            key: key.to_string(),
        }
    } else {
        StoreError::Redis(err)
    }
}

/// HINCRBY on a non-numeric field replies `ERR hash value is not an integer`.
fn classify_hincr(key: &str, field: &str, err: RedisError) -> StoreError {
    let not_integer = err
        .detail()
        .is_some_and(|detail| detail.contains("not an integer"));
    if not_integer {
        StoreError::NotAnInteger {
            key: key.to_string(),
            field: field.to_string(),
        }
    } else {
        classify(key, err)
    }
}

#[async_trait]
impl ArticleStore for RedisStore {
    async fn incr(&self, key: &str) -> StoreResult<i64> {
        self.redis
            .clone()
            .incr(key, 1)
            .await
            .map_err(|e| classify(key, e))
    }

    async fn sadd(&self, key: &str, member: &str) -> StoreResult<bool> {
        let added: i64 = self
            .redis
            .clone()
            .sadd(key, member)
            .await
            .map_err(|e| classify(key, e))?;
        Ok(added == 1)
    }

    async fn expire(&self, key: &str, seconds: i64) -> StoreResult<()> {
        let _: bool = self
            .redis
            .clone()
            .expire(key, seconds)
            .await
            .map_err(|e| classify(key, e))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.redis
            .clone()
            .exists(key)
            .await
            .map_err(|e| classify(key, e))
    }

    async fn hset_all(&self, key: &str, fields: &[(&'static str, String)]) -> StoreResult<()> {
        let _: () = self
            .redis
            .clone()
            .hset_multiple(key, fields)
            .await
            .map_err(|e| classify(key, e))?;
        Ok(())
    }

    async fn hget_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        self.redis
            .clone()
            .hgetall(key)
            .await
            .map_err(|e| classify(key, e))
    }

    async fn hincr(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        self.redis
            .clone()
            .hincr(key, field, delta)
            .await
            .map_err(|e| classify_hincr(key, field, e))
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<()> {
        let _: i64 = self
            .redis
            .clone()
            .zadd(key, member, score)
            .await
            .map_err(|e| classify(key, e))?;
        Ok(())
    }

    async fn zincr(&self, key: &str, member: &str, delta: f64) -> StoreResult<f64> {
        self.redis
            .clone()
            .zincr(key, member, delta)
            .await
            .map_err(|e| classify(key, e))
    }

    async fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        self.redis
            .clone()
            .zscore(key, member)
            .await
            .map_err(|e| classify(key, e))
    }

    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>> {
        self.redis
            .clone()
            .zrevrange(key, start, stop)
            .await
            .map_err(|e| classify(key, e))
    }

    async fn zinterstore_max(&self, dest: &str, sources: &[&str]) -> StoreResult<usize> {
        let mut conn = self.redis.clone();
        // ZINTERSTORE dest numkeys key [key ...] AGGREGATE MAX
        redis::cmd("ZINTERSTORE")
            .arg(dest)
            .arg(sources.len())
            .arg(sources)
            .arg("AGGREGATE")
            .arg("MAX")
            .query_async(&mut conn)
            .await
            .map_err(|e| classify(dest, e))
    }

    async fn write_article(&self, write: &ArticleWrite) -> StoreResult<()> {
        let mut conn = self.redis.clone();
        let mut pipe = redis::pipe();
        pipe.atomic()
            .sadd(&write.voted_key, &write.author)
            .ignore()
            .expire(&write.voted_key, write.voted_ttl_secs)
            .ignore()
            .hset_multiple(&write.article_key, &write.fields)
            .ignore()
            .zadd(&write.score_key, &write.article_key, write.score)
            .ignore()
            .zadd(&write.time_key, &write.article_key, write.posted_at)
            .ignore();

        pipe.query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| classify(&write.article_key, e))?;

        debug!(article = %write.article_key, "Article write pipeline committed");
        Ok(())
    }

    async fn record_vote(
        &self,
        score_key: &str,
        article_key: &str,
        votes_field: &str,
        weight: f64,
    ) -> StoreResult<i64> {
        let mut conn = self.redis.clone();
        let mut pipe = redis::pipe();
        pipe.atomic()
            .zincr(score_key, article_key, weight)
            .ignore()
            .hincr(article_key, votes_field, 1);

        let (votes,): (i64,) = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| classify_hincr(article_key, votes_field, e))?;
        Ok(votes)
    }
}
