//! Persistence gateway over SQLite.
//!
//! Exclusive owner of durable state: vector-similarity and lexical queries
//! over stored content, the upsert-with-conflict protocol keyed on
//! (platform, native_id), trend-query records, and the history/trending
//! read paths.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{ContentItem, Platform, TrendQuery};

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<ContentItem> {
    let platform_str: String = row.get("platform");
    let platform = Platform::parse(&platform_str)
        .ok_or_else(|| anyhow::anyhow!("stored item has unknown platform: {}", platform_str))?;

    let metrics_json: String = row.get("metrics_json");
    let metrics: HashMap<String, f64> = serde_json::from_str(&metrics_json).unwrap_or_default();

    let embedding: Option<Vec<u8>> = row.get("embedding");

    Ok(ContentItem {
        id: row.get("id"),
        platform,
        native_id: row.get("native_id"),
        author: row.get("author"),
        title: row.get("title"),
        content: row.get("content"),
        url: row.get("url"),
        thumbnail: row.get("thumbnail"),
        metrics,
        momentum: Some(row.get::<f64, _>("momentum")),
        published_at: ts_to_datetime(row.get("published_at")),
        ingested_at: Some(ts_to_datetime(row.get("ingested_at"))),
        embedding: embedding.map(|b| blob_to_vec(&b)),
    })
}

fn ts_to_datetime(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).single().unwrap_or_else(Utc::now)
}

/// Nearest-neighbor content lookup by cosine similarity against the query
/// embedding. Loads stored vectors and ranks in Rust.
pub async fn vector_search(
    pool: &SqlitePool,
    query_vec: &[f32],
    candidate_limit: usize,
) -> Result<Vec<ContentItem>> {
    let rows = sqlx::query("SELECT * FROM content_items WHERE embedding IS NOT NULL")
        .fetch_all(pool)
        .await?;

    let mut scored: Vec<(f32, ContentItem)> = Vec::with_capacity(rows.len());
    for row in &rows {
        let item = row_to_item(row)?;
        let similarity = item
            .embedding
            .as_deref()
            .map(|v| cosine_similarity(query_vec, v))
            .unwrap_or(0.0);
        scored.push((similarity, item));
    }

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(candidate_limit);

    Ok(scored.into_iter().map(|(_, item)| item).collect())
}

/// Case-insensitive substring match over title and content, ordered by
/// stored momentum descending.
pub async fn lexical_search(
    pool: &SqlitePool,
    keyword: &str,
    limit: usize,
) -> Result<Vec<ContentItem>> {
    let needle = format!("%{}%", keyword.to_lowercase());
    let rows = sqlx::query(
        r#"
        SELECT * FROM content_items
        WHERE lower(content) LIKE ?1 OR lower(COALESCE(title, '')) LIKE ?1
        ORDER BY momentum DESC
        LIMIT ?2
        "#,
    )
    .bind(&needle)
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_item).collect()
}

pub async fn exists_by_key(pool: &SqlitePool, platform: Platform, native_id: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM content_items WHERE platform = ? AND native_id = ?")
            .bind(platform.as_str())
            .bind(native_id)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

/// Insert-or-update keyed on (platform, native_id).
///
/// On conflict only the volatile fields change — metrics, momentum,
/// embedding, updated_at. Author, title, content, and published_at are
/// facts about the origin content and stay untouched.
///
/// Returns the stored row's id (the existing id on conflict).
pub async fn upsert_item(pool: &SqlitePool, item: &ContentItem) -> Result<String> {
    let existing_id: Option<String> =
        sqlx::query_scalar("SELECT id FROM content_items WHERE platform = ? AND native_id = ?")
            .bind(item.platform.as_str())
            .bind(&item.native_id)
            .fetch_optional(pool)
            .await?;

    let row_id = existing_id.unwrap_or_else(|| item.id.clone());
    let now = Utc::now().timestamp();
    let metrics_json = serde_json::to_string(&item.metrics)?;
    let embedding_blob = item.embedding.as_deref().map(vec_to_blob);

    sqlx::query(
        r#"
        INSERT INTO content_items
            (id, platform, native_id, author, title, content, url, thumbnail,
             metrics_json, momentum, published_at, ingested_at, updated_at, embedding)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(platform, native_id) DO UPDATE SET
            metrics_json = excluded.metrics_json,
            momentum = excluded.momentum,
            embedding = COALESCE(excluded.embedding, content_items.embedding),
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&row_id)
    .bind(item.platform.as_str())
    .bind(&item.native_id)
    .bind(&item.author)
    .bind(&item.title)
    .bind(&item.content)
    .bind(&item.url)
    .bind(&item.thumbnail)
    .bind(&metrics_json)
    .bind(item.momentum.unwrap_or(0.0))
    .bind(item.published_at.timestamp())
    .bind(item.ingested_at.unwrap_or_else(Utc::now).timestamp())
    .bind(now)
    .bind(embedding_blob)
    .execute(pool)
    .await?;

    Ok(row_id)
}

pub async fn insert_trend_query(pool: &SqlitePool, query: &TrendQuery) -> Result<()> {
    let platforms_json = serde_json::to_string(&query.platforms)?;
    sqlx::query(
        r#"
        INSERT INTO trend_queries (id, keyword, platforms_json, timeframe, lang, region, requester, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&query.id)
    .bind(&query.keyword)
    .bind(&platforms_json)
    .bind(&query.timeframe)
    .bind(&query.lang)
    .bind(&query.region)
    .bind(&query.requester)
    .bind(query.created_at.timestamp())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn link_query_item(pool: &SqlitePool, query_id: &str, content_id: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO trend_query_items (query_id, content_id) VALUES (?, ?)")
        .bind(query_id)
        .bind(content_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Recent trend queries, newest first, optionally scoped to one requester.
pub async fn trend_history(
    pool: &SqlitePool,
    requester: Option<&str>,
    limit: usize,
) -> Result<Vec<TrendQuery>> {
    let rows = match requester {
        Some(who) => {
            sqlx::query(
                "SELECT * FROM trend_queries WHERE requester = ? ORDER BY created_at DESC LIMIT ?",
            )
            .bind(who)
            .bind(limit as i64)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query("SELECT * FROM trend_queries ORDER BY created_at DESC LIMIT ?")
                .bind(limit as i64)
                .fetch_all(pool)
                .await?
        }
    };

    rows.iter()
        .map(|row| {
            let platforms_json: String = row.get("platforms_json");
            let platforms: Vec<Platform> =
                serde_json::from_str(&platforms_json).unwrap_or_default();
            Ok(TrendQuery {
                id: row.get("id"),
                keyword: row.get("keyword"),
                platforms,
                timeframe: row.get("timeframe"),
                lang: row.get("lang"),
                region: row.get("region"),
                requester: row.get("requester"),
                created_at: ts_to_datetime(row.get("created_at")),
            })
        })
        .collect()
}

/// Most-queried keywords over a recent window, by query count descending.
pub async fn top_keywords_in_window(
    pool: &SqlitePool,
    window: Duration,
    limit: usize,
) -> Result<Vec<(String, i64)>> {
    let since = (Utc::now() - window).timestamp();
    let rows = sqlx::query(
        r#"
        SELECT keyword, COUNT(*) AS query_count
        FROM trend_queries
        WHERE created_at >= ?
        GROUP BY keyword
        ORDER BY query_count DESC, keyword ASC
        LIMIT ?
        "#,
    )
    .bind(since)
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| (row.get("keyword"), row.get("query_count")))
        .collect())
}
