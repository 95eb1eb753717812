//! Platform adapter trait and fan-out registry.
//!
//! Each supported platform implements [`PlatformAdapter`] once; the
//! [`PlatformRegistry`] owns one adapter per platform and fans a search out
//! across them concurrently. Failure isolation is the registry's job, not
//! the adapters': any error or timeout in one adapter becomes an empty
//! result list for that platform and never touches its siblings.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;

use crate::config::Config;
use crate::models::{ContentItem, Platform, SearchOptions};

/// A platform capability: availability reporting plus a keyword search
/// returning normalized [`ContentItem`]s.
///
/// Adapters may fail by returning an empty list or by returning `Err`;
/// they must not retry internally — the registry decides what a failure
/// means. `is_available` is true only when the adapter's credentials are
/// present.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// True iff required credentials are configured. An unavailable
    /// adapter is never attempted.
    fn is_available(&self) -> bool;

    async fn search(&self, keyword: &str, opts: &SearchOptions) -> Result<Vec<ContentItem>>;
}

/// Owns the set of platform adapters and runs concurrent fan-out searches.
pub struct PlatformRegistry {
    adapters: Vec<Box<dyn PlatformAdapter>>,
    call_timeout: Duration,
}

impl PlatformRegistry {
    pub fn new(call_timeout: Duration) -> Self {
        Self {
            adapters: Vec::new(),
            call_timeout,
        }
    }

    /// Build the registry from injected configuration. Every platform gets
    /// an adapter; ones without credentials report unavailable.
    pub fn from_config(config: &Config) -> Self {
        use crate::connector_reddit::RedditAdapter;
        use crate::connector_twitter::TwitterAdapter;
        use crate::connector_youtube::YoutubeAdapter;

        let mut registry = Self::new(Duration::from_secs(config.retrieval.adapter_timeout_secs));
        registry.register(Box::new(RedditAdapter::new(config.platforms.reddit.clone())));
        registry.register(Box::new(YoutubeAdapter::new(
            config.platforms.youtube.clone(),
        )));
        registry.register(Box::new(TwitterAdapter::new(
            config.platforms.twitter.clone(),
        )));
        registry
    }

    pub fn register(&mut self, adapter: Box<dyn PlatformAdapter>) {
        self.adapters.push(adapter);
    }

    pub fn adapters(&self) -> &[Box<dyn PlatformAdapter>] {
        &self.adapters
    }

    fn find(&self, platform: Platform) -> Option<&dyn PlatformAdapter> {
        self.adapters
            .iter()
            .find(|a| a.platform() == platform)
            .map(|a| a.as_ref())
    }

    /// Platforms with a configured (credentialed) adapter.
    pub fn available_platforms(&self) -> Vec<Platform> {
        self.adapters
            .iter()
            .filter(|a| a.is_available())
            .map(|a| a.platform())
            .collect()
    }

    /// Search all requested platforms concurrently.
    ///
    /// One future per requested, available platform; unavailable platforms
    /// map to an empty list without an attempted call. Each call is bounded
    /// by the registry's per-call timeout, and any error or timeout is
    /// logged and converted to an empty list for that platform only. The
    /// fan-out completes when the slowest call completes.
    pub async fn fan_out_search(
        &self,
        keyword: &str,
        platforms: &[Platform],
        opts: &SearchOptions,
    ) -> HashMap<Platform, Vec<ContentItem>> {
        let calls = platforms.iter().copied().map(|platform| async move {
            let Some(adapter) = self.find(platform) else {
                return (platform, Vec::new());
            };
            if !adapter.is_available() {
                return (platform, Vec::new());
            }

            match tokio::time::timeout(self.call_timeout, adapter.search(keyword, opts)).await {
                Ok(Ok(items)) => (platform, items),
                Ok(Err(e)) => {
                    tracing::warn!(
                        platform = platform.as_str(),
                        error = %e,
                        "platform search failed"
                    );
                    (platform, Vec::new())
                }
                Err(_) => {
                    tracing::warn!(
                        platform = platform.as_str(),
                        timeout_secs = self.call_timeout.as_secs(),
                        "platform search timed out"
                    );
                    (platform, Vec::new())
                }
            }
        });

        join_all(calls).await.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use crate::models::Timeframe;

    fn item(platform: Platform, native_id: &str) -> ContentItem {
        ContentItem {
            id: format!("{}-{}", platform, native_id),
            platform,
            native_id: native_id.to_string(),
            author: "author".to_string(),
            title: None,
            content: "content".to_string(),
            url: "https://example.com".to_string(),
            thumbnail: None,
            metrics: HashMap::new(),
            momentum: None,
            published_at: Utc::now(),
            ingested_at: None,
            embedding: None,
        }
    }

    fn opts() -> SearchOptions {
        SearchOptions {
            timeframe: Timeframe::All,
            lang: None,
            region: None,
            limit: 25,
        }
    }

    struct StaticAdapter {
        platform: Platform,
        items: Vec<ContentItem>,
    }

    #[async_trait]
    impl PlatformAdapter for StaticAdapter {
        fn platform(&self) -> Platform {
            self.platform
        }
        fn is_available(&self) -> bool {
            true
        }
        async fn search(&self, _keyword: &str, _opts: &SearchOptions) -> Result<Vec<ContentItem>> {
            Ok(self.items.clone())
        }
    }

    struct FailingAdapter {
        platform: Platform,
    }

    #[async_trait]
    impl PlatformAdapter for FailingAdapter {
        fn platform(&self) -> Platform {
            self.platform
        }
        fn is_available(&self) -> bool {
            true
        }
        async fn search(&self, _keyword: &str, _opts: &SearchOptions) -> Result<Vec<ContentItem>> {
            anyhow::bail!("upstream exploded")
        }
    }

    struct SlowAdapter {
        platform: Platform,
    }

    #[async_trait]
    impl PlatformAdapter for SlowAdapter {
        fn platform(&self) -> Platform {
            self.platform
        }
        fn is_available(&self) -> bool {
            true
        }
        async fn search(&self, _keyword: &str, _opts: &SearchOptions) -> Result<Vec<ContentItem>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![item(self.platform, "too-late")])
        }
    }

    struct UnavailableAdapter {
        platform: Platform,
        attempted: Arc<AtomicBool>,
    }

    #[async_trait]
    impl PlatformAdapter for UnavailableAdapter {
        fn platform(&self) -> Platform {
            self.platform
        }
        fn is_available(&self) -> bool {
            false
        }
        async fn search(&self, _keyword: &str, _opts: &SearchOptions) -> Result<Vec<ContentItem>> {
            self.attempted.store(true, Ordering::SeqCst);
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_fan_out_collects_all_platforms() {
        let mut registry = PlatformRegistry::new(Duration::from_secs(5));
        registry.register(Box::new(StaticAdapter {
            platform: Platform::Reddit,
            items: vec![item(Platform::Reddit, "r1"), item(Platform::Reddit, "r2")],
        }));
        registry.register(Box::new(StaticAdapter {
            platform: Platform::Youtube,
            items: vec![item(Platform::Youtube, "y1")],
        }));

        let results = registry
            .fan_out_search("ai", &[Platform::Reddit, Platform::Youtube], &opts())
            .await;

        assert_eq!(results[&Platform::Reddit].len(), 2);
        assert_eq!(results[&Platform::Youtube].len(), 1);
    }

    #[tokio::test]
    async fn test_one_failing_adapter_does_not_break_siblings() {
        let mut registry = PlatformRegistry::new(Duration::from_secs(5));
        registry.register(Box::new(FailingAdapter {
            platform: Platform::Reddit,
        }));
        registry.register(Box::new(StaticAdapter {
            platform: Platform::Youtube,
            items: vec![item(Platform::Youtube, "y1"), item(Platform::Youtube, "y2")],
        }));

        let results = registry
            .fan_out_search("ai", &[Platform::Reddit, Platform::Youtube], &opts())
            .await;

        assert!(results[&Platform::Reddit].is_empty());
        assert_eq!(results[&Platform::Youtube].len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_adapter_times_out_to_empty() {
        let mut registry = PlatformRegistry::new(Duration::from_secs(2));
        registry.register(Box::new(SlowAdapter {
            platform: Platform::Twitter,
        }));
        registry.register(Box::new(StaticAdapter {
            platform: Platform::Reddit,
            items: vec![item(Platform::Reddit, "r1")],
        }));

        let results = registry
            .fan_out_search("ai", &[Platform::Twitter, Platform::Reddit], &opts())
            .await;

        assert!(results[&Platform::Twitter].is_empty());
        assert_eq!(results[&Platform::Reddit].len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_adapter_never_attempted() {
        let attempted = Arc::new(AtomicBool::new(false));
        let mut registry = PlatformRegistry::new(Duration::from_secs(5));
        registry.register(Box::new(UnavailableAdapter {
            platform: Platform::Twitter,
            attempted: attempted.clone(),
        }));

        let results = registry
            .fan_out_search("ai", &[Platform::Twitter], &opts())
            .await;

        assert!(results[&Platform::Twitter].is_empty());
        assert!(!attempted.load(Ordering::SeqCst));
        assert!(registry.available_platforms().is_empty());
    }

    #[tokio::test]
    async fn test_unrequested_platform_not_in_results() {
        let mut registry = PlatformRegistry::new(Duration::from_secs(5));
        registry.register(Box::new(StaticAdapter {
            platform: Platform::Reddit,
            items: vec![item(Platform::Reddit, "r1")],
        }));
        registry.register(Box::new(StaticAdapter {
            platform: Platform::Youtube,
            items: vec![item(Platform::Youtube, "y1")],
        }));

        let results = registry.fan_out_search("ai", &[Platform::Reddit], &opts()).await;
        assert_eq!(results.len(), 1);
        assert!(results.contains_key(&Platform::Reddit));
    }
}
