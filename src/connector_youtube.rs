//! YouTube platform adapter.
//!
//! Two-step fetch: the Data API search endpoint for matching videos, then
//! the videos endpoint for their statistics (view/like/comment counts).

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::config::YoutubeConfig;
use crate::models::{ContentItem, Platform, SearchOptions};
use crate::traits::PlatformAdapter;

const SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";
const VIDEOS_URL: &str = "https://www.googleapis.com/youtube/v3/videos";

pub struct YoutubeAdapter {
    config: Option<YoutubeConfig>,
    client: reqwest::Client,
}

impl YoutubeAdapter {
    pub fn new(config: Option<YoutubeConfig>) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: VideoId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct VideoId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "channelTitle")]
    channel_title: String,
    #[serde(rename = "publishedAt")]
    published_at: DateTime<Utc>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Deserialize, Default)]
struct Thumbnails {
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Deserialize, Default)]
struct Statistics {
    #[serde(rename = "viewCount")]
    view_count: Option<String>,
    #[serde(rename = "likeCount")]
    like_count: Option<String>,
    #[serde(rename = "commentCount")]
    comment_count: Option<String>,
}

fn count(raw: &Option<String>) -> f64 {
    raw.as_deref()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
        .max(0.0)
}

#[async_trait]
impl PlatformAdapter for YoutubeAdapter {
    fn platform(&self) -> Platform {
        Platform::Youtube
    }

    fn is_available(&self) -> bool {
        self.config.is_some()
    }

    async fn search(&self, keyword: &str, opts: &SearchOptions) -> Result<Vec<ContentItem>> {
        let Some(config) = &self.config else {
            bail!("youtube adapter has no credentials configured");
        };

        let mut params: Vec<(String, String)> = vec![
            ("part".to_string(), "snippet".to_string()),
            ("type".to_string(), "video".to_string()),
            ("order".to_string(), "viewCount".to_string()),
            ("q".to_string(), keyword.to_string()),
            ("maxResults".to_string(), opts.limit.min(50).to_string()),
            ("key".to_string(), config.api_key.clone()),
        ];
        if let Some(cutoff) = opts.timeframe.cutoff(Utc::now()) {
            params.push(("publishedAfter".to_string(), cutoff.to_rfc3339()));
        }
        if let Some(region) = &opts.region {
            params.push(("regionCode".to_string(), region.clone()));
        }
        if let Some(lang) = &opts.lang {
            params.push(("relevanceLanguage".to_string(), lang.clone()));
        }

        let search: SearchResponse = self
            .client
            .get(SEARCH_URL)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("youtube search response malformed")?;

        let hits: Vec<(String, Snippet)> = search
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id.map(|id| (id, item.snippet)))
            .collect();

        if hits.is_empty() {
            return Ok(Vec::new());
        }

        // Second call for engagement counters
        let ids: Vec<&str> = hits.iter().map(|(id, _)| id.as_str()).collect();
        let videos: VideosResponse = self
            .client
            .get(VIDEOS_URL)
            .query(&[
                ("part", "statistics"),
                ("id", &ids.join(",")),
                ("key", &config.api_key),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("youtube videos response malformed")?;

        let stats: HashMap<String, Statistics> = videos
            .items
            .into_iter()
            .map(|v| (v.id, v.statistics))
            .collect();

        Ok(hits
            .into_iter()
            .filter_map(|(id, snippet)| {
                let statistics = stats.get(&id);
                video_to_item(id, snippet, statistics)
            })
            .collect())
    }
}

fn video_to_item(
    video_id: String,
    snippet: Snippet,
    statistics: Option<&Statistics>,
) -> Option<ContentItem> {
    if video_id.is_empty() {
        return None;
    }

    let content = if snippet.description.trim().is_empty() {
        snippet.title.clone()
    } else {
        snippet.description.clone()
    };
    if content.trim().is_empty() {
        return None;
    }

    let mut metrics = HashMap::new();
    if let Some(stats) = statistics {
        metrics.insert("views".to_string(), count(&stats.view_count));
        metrics.insert("likes".to_string(), count(&stats.like_count));
        metrics.insert("comments".to_string(), count(&stats.comment_count));
    }

    let thumbnail = snippet
        .thumbnails
        .medium
        .as_ref()
        .or(snippet.thumbnails.default.as_ref())
        .map(|t| t.url.clone());

    Some(ContentItem {
        id: Uuid::new_v4().to_string(),
        platform: Platform::Youtube,
        native_id: video_id.clone(),
        author: snippet.channel_title,
        title: Some(snippet.title),
        content,
        url: format!("https://www.youtube.com/watch?v={}", video_id),
        thumbnail,
        metrics,
        // Left for the engine's fallback scorer
        momentum: None,
        published_at: snippet.published_at,
        ingested_at: None,
        embedding: None,
    })
}
