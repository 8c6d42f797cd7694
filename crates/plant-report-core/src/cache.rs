//! Short-lived store of finished analyses.
//!
//! Lets a client ask for a report by `id` instead of posting the whole
//! result and data URI back. Entries expire after the configured TTL and
//! the least recently used ones are evicted beyond `max_entries`.

use std::time::Duration;

use moka::future::Cache;
use tracing::debug;
use uuid::Uuid;

use crate::Analysis;
use crate::config::CacheConfig;

/// In-memory analysis cache keyed by random UUIDs.
#[derive(Clone)]
pub struct AnalysisCache {
    cache: Cache<String, Analysis>,
}

impl AnalysisCache {
    pub fn new(max_entries: u64, ttl_seconds: u64) -> Self {
        let mut builder = Cache::builder().max_capacity(max_entries);

        if ttl_seconds > 0 {
            builder = builder.time_to_live(Duration::from_secs(ttl_seconds));
        }

        Self {
            cache: builder.build(),
        }
    }

    /// Build a cache if the config enables one.
    pub fn from_config(config: &CacheConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(config.max_entries, config.ttl_seconds))
    }

    /// Store an analysis and return its new id.
    pub async fn insert(&self, analysis: Analysis) -> String {
        let id = Uuid::new_v4().to_string();
        self.cache.insert(id.clone(), analysis).await;
        debug!("Cached analysis {}", id);
        id
    }

    pub async fn get(&self, id: &str) -> Option<Analysis> {
        self.cache.get(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(text: &str) -> Analysis {
        Analysis {
            result: text.to_string(),
            image: "data:image/png;base64,AAAA".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let cache = AnalysisCache::new(10, 60);
        let id = cache.insert(analysis("Ficus")).await;

        let hit = cache.get(&id).await;
        assert_eq!(hit.map(|a| a.result), Some("Ficus".to_string()));
        assert!(cache.get("unknown").await.is_none());
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let cache = AnalysisCache::new(10, 0);
        let a = cache.insert(analysis("a")).await;
        let b = cache.insert(analysis("b")).await;
        assert_ne!(a, b);
    }

    #[test]
    fn test_disabled_by_default() {
        assert!(AnalysisCache::from_config(&CacheConfig::default()).is_none());

        let enabled = CacheConfig {
            enabled: true,
            ..CacheConfig::default()
        };
        assert!(AnalysisCache::from_config(&enabled).is_some());
    }
}
