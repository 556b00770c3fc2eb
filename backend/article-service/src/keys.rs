//! Store key schema
//!
//! Every key the ranking engine touches is built here.
//! Key format (without namespace):
//! - `article:`          id counter
//! - `article:{id}`      article record (hash)
//! - `voted:{id}`        vote ledger (set)
//! - `score:` / `time:`  order indexes (sorted sets)
//! - `group:{label}`     group membership (set)
//! - `{order}{label}`    group rank cache, e.g. `score:news`
//!
//! With a namespace every key gets a `{namespace}:` prefix.

use crate::models::OrderIndex;

/// Hash field names of an article record.
pub mod fields {
    pub const TITLE: &str = "title";
    pub const LINK: &str = "link";
    pub const POSTER: &str = "poster";
    pub const TIME: &str = "time";
    pub const VOTES: &str = "votes";
}

const ARTICLE: &str = "article:";
const VOTED: &str = "voted:";
const SCORE: &str = "score:";
const TIME: &str = "time:";
const GROUP: &str = "group:";

/// Key builder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix every key with `{namespace}:`. An empty namespace is ignored.
    pub fn with_namespace(namespace: &str) -> Self {
        let namespace = namespace.trim().trim_end_matches(':');
        if namespace.is_empty() {
            Self::default()
        } else {
            Self {
                prefix: format!("{}:", namespace),
            }
        }
    }

    /// Shared id counter.
    pub fn article_counter(&self) -> String {
        format!("{}{}", self.prefix, ARTICLE)
    }

    /// Format: article:{id}
    pub fn article(&self, id: u64) -> String {
        format!("{}{}{}", self.prefix, ARTICLE, id)
    }

    /// Format: voted:{id}
    pub fn voted(&self, id: u64) -> String {
        format!("{}{}{}", self.prefix, VOTED, id)
    }

    pub fn score_index(&self) -> String {
        format!("{}{}", self.prefix, SCORE)
    }

    pub fn time_index(&self) -> String {
        format!("{}{}", self.prefix, TIME)
    }

    pub fn order(&self, order: OrderIndex) -> String {
        match order {
            OrderIndex::Score => self.score_index(),
            OrderIndex::Time => self.time_index(),
        }
    }

    /// Format: group:{label}
    pub fn group(&self, label: &str) -> String {
        format!("{}{}{}", self.prefix, GROUP, label)
    }

    /// Group rank cache for an order index.
    /// Format: score:{label} or time:{label}
    pub fn group_cache(&self, order: OrderIndex, label: &str) -> String {
        format!("{}{}", self.order(order), label)
    }

    /// Extract the numeric id from an article key built by this key space.
    pub fn article_id(&self, article_key: &str) -> Option<u64> {
        article_key
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix(ARTICLE)?
            .parse()
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keys() {
        let keys = KeySpace::new();
        assert_eq!(keys.article_counter(), "article:");
        assert_eq!(keys.article(7), "article:7");
        assert_eq!(keys.voted(7), "voted:7");
        assert_eq!(keys.score_index(), "score:");
        assert_eq!(keys.time_index(), "time:");
        assert_eq!(keys.group("news"), "group:news");
    }

    #[test]
    fn test_group_cache_key_per_order() {
        let keys = KeySpace::new();
        assert_eq!(keys.group_cache(OrderIndex::Score, "news"), "score:news");
        assert_eq!(keys.group_cache(OrderIndex::Time, "news"), "time:news");
        assert_ne!(
            keys.group_cache(OrderIndex::Score, "news"),
            keys.group("news")
        );
    }

    #[test]
    fn test_namespace_prefix() {
        let keys = KeySpace::with_namespace("demo:");
        assert_eq!(keys.article(1), "demo:article:1");
        assert_eq!(keys.group_cache(OrderIndex::Score, "rust"), "demo:score:rust");

        assert_eq!(KeySpace::with_namespace("  "), KeySpace::new());
    }

    #[test]
    fn test_article_id_round_trip() {
        let keys = KeySpace::with_namespace("demo");
        assert_eq!(keys.article_id(&keys.article(42)), Some(42));
        assert_eq!(keys.article_id("article:42"), None);
        assert_eq!(keys.article_id("demo:article:"), None);
        assert_eq!(keys.article_id("demo:voted:42"), None);
        assert_eq!(KeySpace::new().article_id("article:abc"), None);
    }
}
