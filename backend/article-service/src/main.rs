use anyhow::{Context, Result};
use article_service::{
    Article, Config, KeySpace, NewArticle, OrderIndex, RankingMetrics, RankingPolicy,
    RankingService, RedisStore,
};
use prometheus::{Encoder, TextEncoder};
use redis_utils::RedisPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}

fn log_articles(label: &str, articles: &[Article]) {
    info!(count = articles.len(), "{}", label);
    for article in articles {
        info!(
            id = %article.id,
            title = %article.title,
            link = %article.link,
            poster = %article.poster,
            time = article.time,
            votes = article.votes,
            "  article"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env().context("failed to load configuration")?;
    info!(
        service = %config.service.service_name,
        env = %config.service.app_env,
        "Starting article ranking walkthrough"
    );

    RankingMetrics::register(prometheus::default_registry())
        .context("failed to register ranking metrics")?;

    let pool = RedisPool::connect_with_timeout(
        &config.redis.url,
        Duration::from_secs(config.redis.connect_timeout_secs),
    )
    .await?;

    let policy = RankingPolicy::try_from(&config.ranking)?;
    let keys = config
        .redis
        .key_namespace
        .as_deref()
        .map(KeySpace::with_namespace)
        .unwrap_or_default();
    let service =
        RankingService::new(Arc::new(RedisStore::from_pool(&pool)), policy).with_keys(keys);

    let id = service
        .post_article(NewArticle::new("username", "A title", "http://www.qq.com"))
        .await?;
    info!(article_id = id, "We posted a new article");
    if let Some(article) = service.get_article(id).await? {
        info!(record = %serde_json::to_string(&article)?, "Its record looks like");
    }

    let outcome = service.vote_for("other_user", id).await?;
    info!(outcome = ?outcome, "We voted for the article");

    let top = service.get_articles(1, OrderIndex::Score).await?;
    log_articles("The currently highest-scoring articles are", &top);

    service.add_groups(id, &["new-group"]).await?;
    let grouped = service
        .get_group_articles("new-group", 1, OrderIndex::Score)
        .await?;
    log_articles(
        "We added the article to a new group, other articles include",
        &grouped,
    );

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&prometheus::gather(), &mut buffer)
        .context("failed to encode metrics")?;
    debug!(metrics = %String::from_utf8_lossy(&buffer), "Ranking metrics");

    Ok(())
}
