//! Core data models used throughout Trendscout.
//!
//! These types represent the normalized content items, trend queries, and
//! search payloads that flow through the retrieval and persistence pipeline.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Maximum stored/returned length of `content`, in characters.
pub const MAX_CONTENT_CHARS: usize = 2000;
/// Maximum stored/returned length of `title`, in characters.
pub const MAX_TITLE_CHARS: usize = 300;
/// Result limit applied when the caller does not request one.
pub const DEFAULT_LIMIT: usize = 50;
/// Hard ceiling on the result limit, enforced at the HTTP/CLI boundary.
pub const MAX_LIMIT: usize = 100;

/// A supported content platform.
///
/// The canonical wire form is the lowercase name; [`Platform::parse`]
/// additionally accepts the `"x"` alias for twitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Reddit,
    Youtube,
    Twitter,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Reddit, Platform::Youtube, Platform::Twitter];

    /// Parse a platform token, case-insensitively. `"x"` normalizes to
    /// twitter. Unknown tokens return `None` and are skipped by the
    /// orchestrator rather than treated as errors.
    pub fn parse(token: &str) -> Option<Platform> {
        match token.trim().to_lowercase().as_str() {
            "reddit" => Some(Platform::Reddit),
            "youtube" => Some(Platform::Youtube),
            "twitter" | "x" => Some(Platform::Twitter),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Reddit => "reddit",
            Platform::Youtube => "youtube",
            Platform::Twitter => "twitter",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested lookback window for `published_at`.
///
/// Unrecognized tokens fall back to [`Timeframe::All`] (no cutoff).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    Hour,
    Day,
    Week,
    Month,
    Year,
    All,
}

impl Timeframe {
    pub fn parse(token: &str) -> Timeframe {
        match token.trim().to_lowercase().as_str() {
            "1h" => Timeframe::Hour,
            "24h" => Timeframe::Day,
            "7d" => Timeframe::Week,
            "30d" => Timeframe::Month,
            "1y" => Timeframe::Year,
            _ => Timeframe::All,
        }
    }

    pub fn as_token(&self) -> &'static str {
        match self {
            Timeframe::Hour => "1h",
            Timeframe::Day => "24h",
            Timeframe::Week => "7d",
            Timeframe::Month => "30d",
            Timeframe::Year => "1y",
            Timeframe::All => "all",
        }
    }

    /// The earliest accepted `published_at` for this timeframe, or `None`
    /// when no cutoff applies.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let window = match self {
            Timeframe::Hour => Duration::hours(1),
            Timeframe::Day => Duration::hours(24),
            Timeframe::Week => Duration::days(7),
            Timeframe::Month => Duration::days(30),
            Timeframe::Year => Duration::days(365),
            Timeframe::All => return None,
        };
        Some(now - window)
    }
}

/// A piece of platform content, normalized to one schema.
///
/// The pair (`platform`, `native_id`) is the natural key: it is unique
/// across the store and is the sole basis for dedup and upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    /// System-assigned opaque identifier.
    pub id: String,
    pub platform: Platform,
    /// The platform's own identifier (post id, video id, tweet id).
    pub native_id: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Named engagement counters; keys vary by platform.
    pub metrics: HashMap<String, f64>,
    /// Recency-decayed popularity as of evaluation time. Recomputed when
    /// absent, refreshed on re-ingestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub momentum: Option<f64>,
    /// When the platform says the content was created.
    pub published_at: DateTime<Utc>,
    /// When this system first stored the item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingested_at: Option<DateTime<Utc>>,
    /// Fixed-dimensionality content embedding; absent until computed.
    #[serde(skip_serializing)]
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl ContentItem {
    /// Apply the storage length bounds to `content` and `title`.
    ///
    /// Called both when shaping a response and before persisting, so
    /// callers see the same shapes regardless of retrieval path.
    pub fn truncated(mut self) -> Self {
        self.content = truncate_chars(&self.content, MAX_CONTENT_CHARS);
        if let Some(title) = self.title.take() {
            self.title = Some(truncate_chars(&title, MAX_TITLE_CHARS));
        }
        self
    }
}

/// Truncate to at most `max` characters, appending a trailing marker when
/// anything was cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// A record of one top-level search session. Write-once, never updated,
/// persisted best-effort outside the request's critical path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendQuery {
    pub id: String,
    pub keyword: String,
    pub platforms: Vec<Platform>,
    pub timeframe: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Incoming search request, as received from the HTTP or CLI boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct TrendSearchRequest {
    pub keyword: String,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub timeframe: String,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub requester: Option<String>,
}

/// The search response payload, identical for store-sourced and
/// live-fetched results.
#[derive(Debug, Clone, Serialize)]
pub struct TrendSearchResponse {
    pub keyword: String,
    pub platforms: Vec<Platform>,
    pub results: Vec<ContentItem>,
    pub total_results: usize,
    pub searched_at: DateTime<Utc>,
}

/// Options handed to platform adapters for a live search.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub timeframe: Timeframe,
    pub lang: Option<String>,
    pub region: Option<String>,
    /// Per-platform fetch count, not the final result limit.
    pub limit: usize,
}
