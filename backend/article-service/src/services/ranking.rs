use super::policy::RankingPolicy;
use crate::clock::{Clock, SystemClock};
use crate::error::{ServiceError, ServiceResult};
use crate::keys::{fields, KeySpace};
use crate::metrics::RankingMetrics;
use crate::models::{page_bounds, Article, NewArticle, OrderIndex, VoteOutcome};
use crate::store::{ArticleStore, ArticleWrite};
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

/// Article ranking over an [`ArticleStore`].
///
/// The service keeps no mutable state of its own: every operation is a short
/// sequence of atomic store calls. Those sequences are not transactional as a
/// whole. A failure after the vote ledger insert but before the score/vote
/// increments leaves that vote recorded but uncounted, and retrying the same
/// vote will not count it.
pub struct RankingService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    keys: KeySpace,
    policy: RankingPolicy,
    metrics: RankingMetrics,
}

impl<S> Clone for RankingService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
            keys: self.keys.clone(),
            policy: self.policy.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<S: ArticleStore> RankingService<S> {
    pub fn new(store: Arc<S>, policy: RankingPolicy) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            keys: KeySpace::new(),
            policy,
            metrics: RankingMetrics::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_keys(mut self, keys: KeySpace) -> Self {
        self.keys = keys;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    pub fn policy(&self) -> &RankingPolicy {
        &self.policy
    }

    /// Store key of an article id, as accepted by [`Self::article_vote`].
    pub fn article_key(&self, id: u64) -> String {
        self.keys.article(id)
    }

    /// Submit an article; the author's vote is counted implicitly.
    pub async fn post_article(&self, article: NewArticle) -> ServiceResult<u64> {
        article.validate()?;

        let next = self.store.incr(&self.keys.article_counter()).await?;
        let id = u64::try_from(next).map_err(|_| ServiceError::CorruptRecord {
            key: self.keys.article_counter(),
            reason: format!("id counter returned {}", next),
        })?;

        let now = self.clock.now();
        let article_key = self.keys.article(id);
        let write = ArticleWrite {
            voted_key: self.keys.voted(id),
            author: article.author.clone(),
            voted_ttl_secs: self.policy.vote_window_secs,
            article_key: article_key.clone(),
            fields: vec![
                (fields::TITLE, article.title),
                (fields::LINK, article.link),
                (fields::POSTER, article.author),
                (fields::TIME, now.to_string()),
                (fields::VOTES, "1".to_string()),
            ],
            score_key: self.keys.score_index(),
            score: now as f64 + self.policy.vote_weight,
            time_key: self.keys.time_index(),
            posted_at: now,
        };
        self.store.write_article(&write).await?;

        self.metrics.record_post();
        info!(article_id = id, article = %article_key, "Article posted");
        Ok(id)
    }

    /// Cast `voter`'s vote on `article_key` (`article:{id}`).
    ///
    /// Late and repeated votes are normal outcomes, not errors.
    pub async fn article_vote(&self, voter: &str, article_key: &str) -> ServiceResult<VoteOutcome> {
        let voter = voter.trim();
        if voter.is_empty() {
            return Err(ServiceError::InvalidInput("voter is required".to_string()));
        }
        let id = self.keys.article_id(article_key).ok_or_else(|| {
            ServiceError::InvalidInput(format!("not an article key: {:?}", article_key))
        })?;

        let outcome = self.cast_vote(voter, id, article_key).await?;
        self.metrics.record_vote(outcome.label());
        match outcome {
            VoteOutcome::Counted { votes } => {
                debug!(article = %article_key, voter = %voter, votes, "Vote counted")
            }
            other => debug!(
                article = %article_key,
                voter = %voter,
                outcome = other.label(),
                "Vote not counted"
            ),
        }
        Ok(outcome)
    }

    /// [`Self::article_vote`] by numeric id.
    pub async fn vote_for(&self, voter: &str, id: u64) -> ServiceResult<VoteOutcome> {
        let key = self.keys.article(id);
        self.article_vote(voter, &key).await
    }

    async fn cast_vote(
        &self,
        voter: &str,
        id: u64,
        article_key: &str,
    ) -> ServiceResult<VoteOutcome> {
        let now = self.clock.now();
        let posted_at = match self
            .store
            .zscore(&self.keys.time_index(), article_key)
            .await?
        {
            Some(time) => time as i64,
            None => return Ok(VoteOutcome::UnknownArticle),
        };
        if posted_at <= self.policy.cutoff(now) {
            return Ok(VoteOutcome::NotEligible);
        }

        // SADD is the only serialization point between concurrent voters.
        if !self.store.sadd(&self.keys.voted(id), voter).await? {
            return Ok(VoteOutcome::AlreadyVoted);
        }

        let weight = self.policy.weight_at(posted_at, now);
        let votes = self
            .store
            .record_vote(&self.keys.score_index(), article_key, fields::VOTES, weight)
            .await?;
        Ok(VoteOutcome::Counted { votes })
    }

    /// Read back one article record.
    pub async fn get_article(&self, id: u64) -> ServiceResult<Option<Article>> {
        let key = self.keys.article(id);
        let hash = self.store.hget_all(&key).await?;
        if hash.is_empty() {
            return Ok(None);
        }
        Article::from_fields(&key, hash).map(Some)
    }

    /// One page (1-based) of articles from a global order index, best first.
    pub async fn get_articles(&self, page: u32, order: OrderIndex) -> ServiceResult<Vec<Article>> {
        let key = self.keys.order(order);
        self.articles_by_rank(&key, page).await
    }

    async fn articles_by_rank(&self, order_key: &str, page: u32) -> ServiceResult<Vec<Article>> {
        let Some((start, end)) = page_bounds(page, self.policy.articles_per_page) else {
            return Ok(Vec::new());
        };

        let ids = self.store.zrevrange(order_key, start, end).await?;
        let mut articles = Vec::with_capacity(ids.len());
        for id in ids {
            let hash = self.store.hget_all(&id).await?;
            if hash.is_empty() {
                warn!(article = %id, index = %order_key, "Indexed article has no record, skipping");
                continue;
            }
            articles.push(Article::from_fields(&id, hash)?);
        }
        Ok(articles)
    }

    /// Add an article to each group. Group rank caches are left to expire.
    ///
    /// Labels are stored byte for byte, so `"tech"` and `" tech "` are two
    /// groups. Only the empty label is rejected.
    pub async fn add_groups(&self, id: u64, groups: &[&str]) -> ServiceResult<()> {
        let groups = validate_groups(groups)?;
        let article_key = self.keys.article(id);
        for group in &groups {
            self.store.sadd(&self.keys.group(group), &article_key).await?;
        }
        debug!(article = %article_key, ?groups, "Article added to groups");
        Ok(())
    }

    /// One page of a group's articles ranked by `order`.
    ///
    /// Served from a materialized intersection that lives for the policy's
    /// cache TTL. Two callers racing on a cold cache both rebuild it with the
    /// same result.
    pub async fn get_group_articles(
        &self,
        group: &str,
        page: u32,
        order: OrderIndex,
    ) -> ServiceResult<Vec<Article>> {
        if group.is_empty() {
            return Ok(Vec::new());
        }
        let cache_key = self.keys.group_cache(order, group);

        if self.store.exists(&cache_key).await? {
            self.metrics.record_cache_hit(order.as_str());
            debug!(cache = %cache_key, "Group rank cache hit");
        } else {
            let group_key = self.keys.group(group);
            let order_key = self.keys.order(order);
            let size = self
                .store
                .zinterstore_max(&cache_key, &[group_key.as_str(), order_key.as_str()])
                .await?;
            self.store
                .expire(&cache_key, self.policy.group_cache_ttl_secs)
                .await?;
            self.metrics.record_cache_rebuild(order.as_str());
            debug!(cache = %cache_key, size, "Group rank cache rebuilt");
        }

        self.articles_by_rank(&cache_key, page).await
    }
}

fn validate_groups<'a>(groups: &[&'a str]) -> ServiceResult<Vec<&'a str>> {
    if groups.is_empty() {
        return Err(ServiceError::InvalidInput(
            "at least one group is required".to_string(),
        ));
    }
    groups
        .iter()
        .map(|&group| {
            if group.is_empty() {
                Err(ServiceError::InvalidInput(
                    "group label is required".to_string(),
                ))
            } else {
                Ok(group)
            }
        })
        .collect()
}
