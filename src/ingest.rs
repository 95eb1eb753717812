//! Background persistence of live-fetched content.
//!
//! Runs after the response has already been returned: records the trend
//! query, then walks the result set with a per-request dedup scope and
//! upserts each surviving item independently. Every failure here is logged
//! and skipped — nothing in this module can affect the caller's response.

use std::collections::HashSet;

use anyhow::Result;
use sqlx::SqlitePool;

use crate::embedding::Embedder;
use crate::models::{ContentItem, Platform, TrendQuery};
use crate::store;

/// Persist one query's results: the write-once [`TrendQuery`] record plus
/// an idempotent upsert per content item.
///
/// The dedup set lives for exactly this call — first occurrence of a
/// (platform, native_id) pair wins, later duplicates are skipped.
pub async fn persist_results(
    pool: &SqlitePool,
    embedder: &dyn Embedder,
    record: &TrendQuery,
    items: &[ContentItem],
) {
    if let Err(e) = store::insert_trend_query(pool, record).await {
        tracing::warn!(keyword = %record.keyword, error = %e, "failed to record trend query");
    }

    let mut seen: HashSet<(Platform, String)> = HashSet::new();
    for item in items {
        if !seen.insert((item.platform, item.native_id.clone())) {
            continue;
        }
        if item.native_id.is_empty() || item.content.is_empty() {
            tracing::warn!(platform = item.platform.as_str(), "skipping item with empty key or content");
            continue;
        }
        if let Err(e) = persist_item(pool, embedder, &record.id, item).await {
            tracing::warn!(
                platform = item.platform.as_str(),
                native_id = %item.native_id,
                error = %e,
                "failed to persist content item"
            );
        }
    }
}

async fn persist_item(
    pool: &SqlitePool,
    embedder: &dyn Embedder,
    query_id: &str,
    item: &ContentItem,
) -> Result<()> {
    let exists = store::exists_by_key(pool, item.platform, &item.native_id).await?;

    let mut item = item.clone().truncated();

    // Embed new content from title+content. Non-fatal: an item without an
    // embedding is still stored and reachable lexically.
    if !exists && item.embedding.is_none() {
        let text = match &item.title {
            Some(title) => format!("{}\n{}", title, item.content),
            None => item.content.clone(),
        };
        match embedder.embed(&text).await {
            Ok(vec) => item.embedding = Some(vec),
            Err(e) => {
                tracing::debug!(
                    platform = item.platform.as_str(),
                    native_id = %item.native_id,
                    error = %e,
                    "embedding skipped for new item"
                );
            }
        }
    }

    let content_id = store::upsert_item(pool, &item).await?;
    store::link_query_item(pool, query_id, &content_id).await?;

    Ok(())
}
