//! Ranking metrics for observability

use prometheus::{Counter, CounterVec, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<RankingMetricsInner> = OnceLock::new();

struct RankingMetricsInner {
    articles_posted: Counter,
    votes: CounterVec,
    group_cache: CounterVec,
}

impl RankingMetricsInner {
    fn new() -> Self {
        Self {
            articles_posted: Counter::with_opts(Opts::new(
                "article_ranking_articles_posted_total",
                "Total articles submitted",
            ))
            .expect("valid metric definition"),
            votes: CounterVec::new(
                Opts::new("article_ranking_votes_total", "Total votes by outcome"),
                &["outcome"],
            )
            .expect("valid metric definition"),
            group_cache: CounterVec::new(
                Opts::new(
                    "article_ranking_group_cache_total",
                    "Group rank cache lookups by result",
                ),
                &["order", "result"],
            )
            .expect("valid metric definition"),
        }
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.articles_posted.clone()))?;
        registry.register(Box::new(self.votes.clone()))?;
        registry.register(Box::new(self.group_cache.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> &'static RankingMetricsInner {
    METRICS.get_or_init(RankingMetricsInner::new)
}

#[derive(Clone, Default)]
pub struct RankingMetrics;

impl RankingMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Register metrics with a Prometheus registry
    pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
        get_metrics().register(registry)
    }

    pub fn record_post(&self) {
        get_metrics().articles_posted.inc();
    }

    pub fn record_vote(&self, outcome: &str) {
        get_metrics().votes.with_label_values(&[outcome]).inc();
    }

    pub fn record_cache_hit(&self, order: &str) {
        get_metrics()
            .group_cache
            .with_label_values(&[order, "hit"])
            .inc();
    }

    pub fn record_cache_rebuild(&self, order: &str) {
        get_metrics()
            .group_cache
            .with_label_values(&[order, "rebuild"])
            .inc();
    }
}
