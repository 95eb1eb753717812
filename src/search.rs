//! Tiered retrieval orchestrator.
//!
//! One pass per request: normalize the requested platform set, try a
//! vector-similarity lookup in the local store, fall back to a lexical
//! match when no embedding can be produced, and fail over to a live
//! concurrent fetch across the platform adapters. All three tiers share
//! one filter-and-rank step, and every response is shaped the same way
//! regardless of which tier produced it.
//!
//! A vector candidate set that filters to empty goes straight to the live
//! fetch — a store miss after filtering is treated the same as no store
//! coverage, with no lexical retry in between.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::config::RetrievalConfig;
use crate::embedding::Embedder;
use crate::ingest;
use crate::models::{
    ContentItem, Platform, SearchOptions, Timeframe, TrendQuery, TrendSearchRequest,
    TrendSearchResponse,
};
use crate::momentum;
use crate::store;
use crate::traits::PlatformRegistry;

/// The engine's entry point. Owns nothing durable — the pool is the
/// persistence gateway's handle and the registry holds the adapters.
pub struct TrendEngine {
    pool: SqlitePool,
    registry: Arc<PlatformRegistry>,
    embedder: Arc<dyn Embedder>,
    retrieval: RetrievalConfig,
}

impl TrendEngine {
    pub fn new(
        pool: SqlitePool,
        registry: Arc<PlatformRegistry>,
        embedder: Arc<dyn Embedder>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            pool,
            registry,
            embedder,
            retrieval,
        }
    }

    pub fn registry(&self) -> &PlatformRegistry {
        &self.registry
    }

    /// Run one trend search: local store first, live fetch as the last
    /// tier. Live-fetched results trigger a background persistence pass
    /// that never blocks or fails the response.
    pub async fn search(&self, req: &TrendSearchRequest) -> Result<TrendSearchResponse> {
        let now = Utc::now();
        let available = self.registry.available_platforms();
        let platforms = normalize_platforms(&req.platforms, &available);
        let timeframe = Timeframe::parse(&req.timeframe);
        let cutoff = timeframe.cutoff(now);
        let limit = req.limit.unwrap_or(self.retrieval.default_limit).max(1);
        let candidate_k = self.retrieval.candidate_k.max(limit);

        match self.embedder.embed(&req.keyword).await {
            Ok(query_vec) => {
                let candidates = store::vector_search(&self.pool, &query_vec, candidate_k).await?;
                let ranked = filter_and_rank(candidates, cutoff, &platforms, limit, now);
                if !ranked.is_empty() {
                    tracing::debug!(keyword = %req.keyword, tier = "vector", "store hit");
                    return Ok(shape_response(&req.keyword, platforms, ranked, now));
                }
            }
            Err(e) => {
                // Embedding unavailable: degrade to a lexical store match
                tracing::debug!(keyword = %req.keyword, error = %e, "embedding unavailable, trying lexical match");
                let candidates = store::lexical_search(&self.pool, &req.keyword, candidate_k).await?;
                let ranked = filter_and_rank(candidates, cutoff, &platforms, limit, now);
                if !ranked.is_empty() {
                    tracing::debug!(keyword = %req.keyword, tier = "lexical", "store hit");
                    return Ok(shape_response(&req.keyword, platforms, ranked, now));
                }
            }
        }

        // Live fetch across the requested platforms
        tracing::debug!(keyword = %req.keyword, tier = "live", platforms = ?platforms, "store miss, fetching live");
        let opts = SearchOptions {
            timeframe,
            lang: req.lang.clone(),
            region: req.region.clone(),
            limit: self.retrieval.fetch_limit,
        };
        let by_platform = self
            .registry
            .fan_out_search(&req.keyword, &platforms, &opts)
            .await;

        let mut items: Vec<ContentItem> = Vec::new();
        for platform in &platforms {
            if let Some(fetched) = by_platform.get(platform) {
                items.extend(fetched.iter().cloned());
            }
        }

        let items = dedup_first_wins(items);
        let ranked = filter_and_rank(items, cutoff, &platforms, limit, now);
        let response = shape_response(&req.keyword, platforms.clone(), ranked, now);

        // Fire-and-forget persistence of what this query surfaced. Failures
        // are logged inside the task and never reach the caller.
        let record = TrendQuery {
            id: Uuid::new_v4().to_string(),
            keyword: req.keyword.clone(),
            platforms,
            timeframe: timeframe.as_token().to_string(),
            lang: req.lang.clone(),
            region: req.region.clone(),
            requester: req.requester.clone(),
            created_at: now,
        };
        let pool = self.pool.clone();
        let embedder = self.embedder.clone();
        let results = response.results.clone();
        tokio::spawn(async move {
            ingest::persist_results(&pool, embedder.as_ref(), &record, &results).await;
        });

        Ok(response)
    }
}

/// Normalize requested platform tokens against the available set.
///
/// Tokens parse case-insensitively ("x" → twitter); unknown tokens are
/// dropped. An empty or fully-unsupported request falls back to all
/// available platforms — never an error.
pub fn normalize_platforms(requested: &[String], available: &[Platform]) -> Vec<Platform> {
    let mut seen = HashSet::new();
    let normalized: Vec<Platform> = requested
        .iter()
        .filter_map(|token| Platform::parse(token))
        .filter(|p| available.contains(p))
        .filter(|p| seen.insert(*p))
        .collect();

    if normalized.is_empty() {
        available.to_vec()
    } else {
        normalized
    }
}

/// The filter-and-rank step shared by all three retrieval tiers: timeframe
/// cutoff, platform membership, lazy momentum fill, sort by momentum
/// descending (stable, no secondary key), then the result limit.
pub fn filter_and_rank(
    mut items: Vec<ContentItem>,
    cutoff: Option<DateTime<Utc>>,
    platforms: &[Platform],
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<ContentItem> {
    if let Some(cutoff) = cutoff {
        items.retain(|item| item.published_at >= cutoff);
    }
    items.retain(|item| platforms.contains(&item.platform));

    for item in &mut items {
        if item.momentum.is_none() {
            item.momentum = Some(momentum::score(item.published_at, &item.metrics, now));
        }
    }

    items.sort_by(|a, b| {
        b.momentum
            .partial_cmp(&a.momentum)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    items.truncate(limit);
    items
}

/// Drop repeated (platform, native_id) pairs, keeping the first occurrence.
fn dedup_first_wins(items: Vec<ContentItem>) -> Vec<ContentItem> {
    let mut seen: HashSet<(Platform, String)> = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert((item.platform, item.native_id.clone())))
        .collect()
}

/// Build the response payload. Text bounds are applied here so callers see
/// the same shapes whether the data came from the store or a live fetch.
fn shape_response(
    keyword: &str,
    platforms: Vec<Platform>,
    results: Vec<ContentItem>,
    searched_at: DateTime<Utc>,
) -> TrendSearchResponse {
    let results: Vec<ContentItem> = results.into_iter().map(ContentItem::truncated).collect();
    TrendSearchResponse {
        keyword: keyword.to_string(),
        platforms,
        total_results: results.len(),
        results,
        searched_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::HashMap;

    fn item(platform: Platform, native_id: &str, age_hours: i64, likes: f64) -> ContentItem {
        let now = Utc::now();
        ContentItem {
            id: format!("{}-{}", platform, native_id),
            platform,
            native_id: native_id.to_string(),
            author: "author".to_string(),
            title: None,
            content: "content".to_string(),
            url: "https://example.com".to_string(),
            thumbnail: None,
            metrics: HashMap::from([("likes".to_string(), likes)]),
            momentum: None,
            published_at: now - Duration::hours(age_hours),
            ingested_at: None,
            embedding: None,
        }
    }

    #[test]
    fn test_normalize_platforms_aliases_and_case() {
        let available = vec![Platform::Reddit, Platform::Twitter];
        let requested = vec!["X".to_string(), "REDDIT".to_string()];
        assert_eq!(
            normalize_platforms(&requested, &available),
            vec![Platform::Twitter, Platform::Reddit]
        );
    }

    #[test]
    fn test_normalize_platforms_empty_falls_back_to_available() {
        let available = vec![Platform::Reddit, Platform::Youtube];
        assert_eq!(normalize_platforms(&[], &available), available);
        // Fully-unsupported request also falls back, never errors
        let junk = vec!["myspace".to_string()];
        assert_eq!(normalize_platforms(&junk, &available), available);
    }

    #[test]
    fn test_normalize_platforms_intersects_with_available() {
        let available = vec![Platform::Reddit];
        let requested = vec!["reddit".to_string(), "youtube".to_string()];
        assert_eq!(normalize_platforms(&requested, &available), vec![Platform::Reddit]);
    }

    #[test]
    fn test_filter_and_rank_applies_cutoff() {
        let now = Utc::now();
        let items = vec![
            item(Platform::Reddit, "fresh", 1, 10.0),
            item(Platform::Reddit, "stale", 48, 10.0),
        ];
        let cutoff = Timeframe::Day.cutoff(now);
        let ranked = filter_and_rank(items, cutoff, &[Platform::Reddit], 10, now);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].native_id, "fresh");
    }

    #[test]
    fn test_filter_and_rank_no_cutoff_keeps_everything() {
        let now = Utc::now();
        let items = vec![
            item(Platform::Reddit, "fresh", 1, 10.0),
            item(Platform::Reddit, "ancient", 24 * 400, 10.0),
        ];
        let ranked = filter_and_rank(items, None, &[Platform::Reddit], 10, now);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_filter_and_rank_drops_unrequested_platforms() {
        let now = Utc::now();
        let items = vec![
            item(Platform::Reddit, "r", 1, 10.0),
            item(Platform::Twitter, "t", 1, 10.0),
        ];
        let ranked = filter_and_rank(items, None, &[Platform::Reddit], 10, now);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].platform, Platform::Reddit);
    }

    #[test]
    fn test_filter_and_rank_sorts_by_momentum_desc_and_limits() {
        let now = Utc::now();
        // Same age, increasing engagement
        let items = vec![
            item(Platform::Reddit, "low", 2, 10.0),
            item(Platform::Reddit, "high", 2, 1000.0),
            item(Platform::Reddit, "mid", 2, 100.0),
        ];
        let ranked = filter_and_rank(items, None, &[Platform::Reddit], 2, now);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].native_id, "high");
        assert_eq!(ranked[1].native_id, "mid");
        assert!(ranked[0].momentum.unwrap() >= ranked[1].momentum.unwrap());
    }

    #[test]
    fn test_filter_and_rank_keeps_precomputed_momentum() {
        let now = Utc::now();
        let mut precomputed = item(Platform::Reddit, "pre", 2, 1.0);
        precomputed.momentum = Some(777.0);
        let ranked = filter_and_rank(vec![precomputed], None, &[Platform::Reddit], 10, now);
        assert_eq!(ranked[0].momentum, Some(777.0));
    }

    #[test]
    fn test_dedup_first_wins() {
        let mut a = item(Platform::Reddit, "dup", 1, 10.0);
        a.author = "first".to_string();
        let mut b = item(Platform::Reddit, "dup", 1, 999.0);
        b.author = "second".to_string();
        let c = item(Platform::Youtube, "dup", 1, 5.0);

        let deduped = dedup_first_wins(vec![a, b, c]);
        assert_eq!(deduped.len(), 2, "same native id on another platform survives");
        assert_eq!(deduped[0].author, "first");
    }

    #[test]
    fn test_shape_response_truncates_uniformly() {
        let now = Utc::now();
        let mut long = item(Platform::Reddit, "long", 1, 10.0);
        long.content = "x".repeat(crate::models::MAX_CONTENT_CHARS + 100);
        let response = shape_response("ai", vec![Platform::Reddit], vec![long], now);
        assert_eq!(response.total_results, 1);
        assert_eq!(
            response.results[0].content.chars().count(),
            crate::models::MAX_CONTENT_CHARS
        );
    }
}
