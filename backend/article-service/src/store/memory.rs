use super::{ArticleStore, ArticleWrite};
use crate::clock::{Clock, SystemClock};
use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
enum Value {
    Int(i64),
    Set(HashSet<String>),
    Hash(HashMap<String, String>),
    ZSet(HashMap<String, f64>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    /// Epoch second at which the key disappears
    expires_at: Option<i64>,
}

#[derive(Debug, Default)]
struct Db {
    entries: HashMap<String, Entry>,
}

impl Db {
    /// Live entry for `key`, evicting it first if it has expired.
    fn live(&mut self, key: &str, now: i64) -> Option<&mut Entry> {
        let expired = matches!(
            self.entries.get(key),
            Some(Entry { expires_at: Some(at), .. }) if *at <= now
        );
        if expired {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    fn peek(&mut self, key: &str, now: i64) -> Option<&Value> {
        match self.live(key, now) {
            Some(entry) => Some(&entry.value),
            None => None,
        }
    }

    fn value_or_insert(&mut self, key: &str, now: i64, init: fn() -> Value) -> &mut Value {
        self.live(key, now);
        &mut self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry {
                value: init(),
                expires_at: None,
            })
            .value
    }

    fn int_mut(&mut self, key: &str, now: i64) -> StoreResult<&mut i64> {
        match self.value_or_insert(key, now, || Value::Int(0)) {
            Value::Int(n) => Ok(n),
            _ => Err(wrong_type(key)),
        }
    }

    fn set_mut(&mut self, key: &str, now: i64) -> StoreResult<&mut HashSet<String>> {
        match self.value_or_insert(key, now, || Value::Set(HashSet::new())) {
            Value::Set(set) => Ok(set),
            _ => Err(wrong_type(key)),
        }
    }

    fn hash_mut(&mut self, key: &str, now: i64) -> StoreResult<&mut HashMap<String, String>> {
        match self.value_or_insert(key, now, || Value::Hash(HashMap::new())) {
            Value::Hash(hash) => Ok(hash),
            _ => Err(wrong_type(key)),
        }
    }

    fn zset_mut(&mut self, key: &str, now: i64) -> StoreResult<&mut HashMap<String, f64>> {
        match self.value_or_insert(key, now, || Value::ZSet(HashMap::new())) {
            Value::ZSet(zset) => Ok(zset),
            _ => Err(wrong_type(key)),
        }
    }

    /// Members and scores of a set or sorted set; sets score 1.
    fn scored_members(&mut self, key: &str, now: i64) -> StoreResult<HashMap<String, f64>> {
        match self.peek(key, now) {
            None => Ok(HashMap::new()),
            Some(Value::ZSet(zset)) => Ok(zset.clone()),
            Some(Value::Set(set)) => Ok(set.iter().map(|m| (m.clone(), 1.0)).collect()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    fn incr(&mut self, key: &str, now: i64) -> StoreResult<i64> {
        let n = self.int_mut(key, now)?;
        *n += 1;
        Ok(*n)
    }

    fn sadd(&mut self, key: &str, member: &str, now: i64) -> StoreResult<bool> {
        Ok(self.set_mut(key, now)?.insert(member.to_string()))
    }

    fn expire(&mut self, key: &str, seconds: i64, now: i64) {
        if let Some(entry) = self.live(key, now) {
            entry.expires_at = Some(now + seconds);
        }
    }

    fn hset_all(
        &mut self,
        key: &str,
        fields: &[(&'static str, String)],
        now: i64,
    ) -> StoreResult<()> {
        let hash = self.hash_mut(key, now)?;
        for (field, value) in fields {
            hash.insert(field.to_string(), value.clone());
        }
        Ok(())
    }

    fn hincr(&mut self, key: &str, field: &str, delta: i64, now: i64) -> StoreResult<i64> {
        let hash = self.hash_mut(key, now)?;
        let current = match hash.get(field) {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| StoreError::NotAnInteger {
                    key: key.to_string(),
                    field: field.to_string(),
                })?,
            None => 0,
        };
        let next = current + delta;
        hash.insert(field.to_string(), next.to_string());
        Ok(next)
    }

    fn zadd(&mut self, key: &str, member: &str, score: f64, now: i64) -> StoreResult<()> {
        self.zset_mut(key, now)?.insert(member.to_string(), score);
        Ok(())
    }

    fn zincr(&mut self, key: &str, member: &str, delta: f64, now: i64) -> StoreResult<f64> {
        let score = self
            .zset_mut(key, now)?
            .entry(member.to_string())
            .or_insert(0.0);
        *score += delta;
        Ok(*score)
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::WrongType {
        key: key.to_string(),
    }
}

/// Redis ZREVRANGE order: score descending, equal scores by member descending.
fn rev_rank_order(a: &(String, f64), b: &(String, f64)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.0.cmp(&a.0))
}

/// Resolve Redis-style inclusive rank bounds (negative counts from the end).
fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (start + len).max(0) } else { start };
    let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

/// In-process store with the same semantics as the Redis commands it stands
/// in for, including lazy key expiry driven by an injected [`Clock`].
pub struct MemoryStore {
    db: Mutex<Db>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            db: Mutex::new(Db::default()),
            clock,
        }
    }

    /// Remaining lifetime of a key in seconds, `None` if missing or persistent.
    pub async fn ttl(&self, key: &str) -> Option<i64> {
        let now = self.clock.now();
        let mut db = self.db.lock().await;
        db.live(key, now)
            .and_then(|entry| entry.expires_at)
            .map(|at| at - now)
    }

    /// Members of a plain set, unordered.
    pub async fn smembers(&self, key: &str) -> StoreResult<HashSet<String>> {
        let now = self.clock.now();
        let mut db = self.db.lock().await;
        match db.peek(key, now) {
            None => Ok(HashSet::new()),
            Some(Value::Set(set)) => Ok(set.clone()),
            Some(_) => Err(wrong_type(key)),
        }
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let now = self.clock.now();
        self.db.lock().await.incr(key, now)
    }

    async fn sadd(&self, key: &str, member: &str) -> StoreResult<bool> {
        let now = self.clock.now();
        self.db.lock().await.sadd(key, member, now)
    }

    async fn expire(&self, key: &str, seconds: i64) -> StoreResult<()> {
        let now = self.clock.now();
        self.db.lock().await.expire(key, seconds, now);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let now = self.clock.now();
        Ok(self.db.lock().await.live(key, now).is_some())
    }

    async fn hset_all(&self, key: &str, fields: &[(&'static str, String)]) -> StoreResult<()> {
        let now = self.clock.now();
        self.db.lock().await.hset_all(key, fields, now)
    }

    async fn hget_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let now = self.clock.now();
        let mut db = self.db.lock().await;
        match db.peek(key, now) {
            None => Ok(HashMap::new()),
            Some(Value::Hash(hash)) => Ok(hash.clone()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn hincr(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        let now = self.clock.now();
        self.db.lock().await.hincr(key, field, delta, now)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<()> {
        let now = self.clock.now();
        self.db.lock().await.zadd(key, member, score, now)
    }

    async fn zincr(&self, key: &str, member: &str, delta: f64) -> StoreResult<f64> {
        let now = self.clock.now();
        self.db.lock().await.zincr(key, member, delta, now)
    }

    async fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        let now = self.clock.now();
        let mut db = self.db.lock().await;
        match db.peek(key, now) {
            None => Ok(None),
            Some(Value::ZSet(zset)) => Ok(zset.get(member).copied()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>> {
        let now = self.clock.now();
        let mut db = self.db.lock().await;
        let mut ranked: Vec<(String, f64)> = match db.peek(key, now) {
            None => return Ok(Vec::new()),
            Some(Value::ZSet(zset)) => zset.iter().map(|(m, s)| (m.clone(), *s)).collect(),
            Some(_) => return Err(wrong_type(key)),
        };
        ranked.sort_by(rev_rank_order);

        Ok(match resolve_range(ranked.len(), start, stop) {
            Some((from, to)) => ranked
                .into_iter()
                .skip(from)
                .take(to - from + 1)
                .map(|(member, _)| member)
                .collect(),
            None => Vec::new(),
        })
    }

    async fn zinterstore_max(&self, dest: &str, sources: &[&str]) -> StoreResult<usize> {
        let now = self.clock.now();
        let mut db = self.db.lock().await;

        let mut result: Option<HashMap<String, f64>> = None;
        for source in sources {
            let members = db.scored_members(source, now)?;
            result = Some(match result {
                None => members,
                Some(acc) => acc
                    .into_iter()
                    .filter_map(|(member, score)| {
                        members.get(&member).map(|other| (member, score.max(*other)))
                    })
                    .collect(),
            });
        }

        // Like Redis: the destination is replaced, and an empty result leaves no key.
        let result = result.unwrap_or_default();
        db.entries.remove(dest);
        let size = result.len();
        if size > 0 {
            db.entries.insert(
                dest.to_string(),
                Entry {
                    value: Value::ZSet(result),
                    expires_at: None,
                },
            );
        }
        Ok(size)
    }

    async fn write_article(&self, write: &ArticleWrite) -> StoreResult<()> {
        let now = self.clock.now();
        let mut db = self.db.lock().await;
        db.sadd(&write.voted_key, &write.author, now)?;
        db.expire(&write.voted_key, write.voted_ttl_secs, now);
        db.hset_all(&write.article_key, &write.fields, now)?;
        db.zadd(&write.score_key, &write.article_key, write.score, now)?;
        db.zadd(
            &write.time_key,
            &write.article_key,
            write.posted_at as f64,
            now,
        )?;
        Ok(())
    }

    async fn record_vote(
        &self,
        score_key: &str,
        article_key: &str,
        votes_field: &str,
        weight: f64,
    ) -> StoreResult<i64> {
        let now = self.clock.now();
        let mut db = self.db.lock().await;
        db.zincr(score_key, article_key, weight, now)?;
        db.hincr(article_key, votes_field, 1, now)
    }
}
