//! Reddit platform adapter.
//!
//! Authenticates with the client-credentials OAuth flow and searches
//! `oauth.reddit.com/search` sorted by top score. The access token is
//! cached per adapter instance with its expiry; refresh is a plain
//! check-then-fetch-then-overwrite — overlapping requests may refresh
//! twice and the latest write wins, which is fine because refresh is
//! idempotent.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::RedditConfig;
use crate::models::{ContentItem, Platform, SearchOptions, Timeframe};
use crate::momentum;
use crate::traits::PlatformAdapter;

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const SEARCH_URL: &str = "https://oauth.reddit.com/search.json";

/// Refresh this long before the reported expiry.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub(crate) struct CachedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct RedditAdapter {
    config: Option<RedditConfig>,
    client: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl RedditAdapter {
    pub fn new(config: Option<RedditConfig>) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            token: Mutex::new(None),
        }
    }

    async fn cached_token(&self) -> Option<String> {
        let guard = self.token.lock().await;
        guard
            .as_ref()
            .filter(|t| t.expires_at > Utc::now())
            .map(|t| t.access_token.clone())
    }

    async fn store_token(&self, token: CachedToken) {
        // Overwrite-with-latest; concurrent refreshes are tolerated
        *self.token.lock().await = Some(token);
    }

    async fn bearer_token(&self, config: &RedditConfig) -> Result<String> {
        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: i64,
        }

        let resp: TokenResponse = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&config.client_id, Some(&config.client_secret))
            .header("User-Agent", &config.user_agent)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("reddit token response malformed")?;

        let token = CachedToken {
            access_token: resp.access_token.clone(),
            expires_at: Utc::now()
                + Duration::seconds((resp.expires_in - TOKEN_EXPIRY_MARGIN_SECS).max(0)),
        };
        self.store_token(token).await;

        Ok(resp.access_token)
    }
}

fn reddit_t(timeframe: Timeframe) -> &'static str {
    match timeframe {
        Timeframe::Hour => "hour",
        Timeframe::Day => "day",
        Timeframe::Week => "week",
        Timeframe::Month => "month",
        Timeframe::Year => "year",
        Timeframe::All => "all",
    }
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: RedditPost,
}

#[derive(Debug, Deserialize)]
struct RedditPost {
    id: String,
    title: String,
    #[serde(default)]
    selftext: String,
    author: String,
    permalink: String,
    created_utc: f64,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    num_comments: f64,
    #[serde(default)]
    thumbnail: Option<String>,
}

fn post_to_item(post: RedditPost) -> Option<ContentItem> {
    if post.id.is_empty() {
        return None;
    }

    let content = if post.selftext.trim().is_empty() {
        post.title.clone()
    } else {
        post.selftext.clone()
    };
    if content.trim().is_empty() {
        return None;
    }

    let published_at = Utc
        .timestamp_opt(post.created_utc as i64, 0)
        .single()
        .unwrap_or_else(Utc::now);

    let metrics = HashMap::from([
        ("upvotes".to_string(), post.score.max(0.0)),
        ("comments".to_string(), post.num_comments.max(0.0)),
    ]);

    // Reddit refinement: comments signal discussion, weigh them double
    // when precomputing momentum. The engine's fallback stays unweighted.
    let weighted = HashMap::from([
        ("upvotes".to_string(), post.score.max(0.0)),
        ("comments".to_string(), post.num_comments.max(0.0) * 2.0),
    ]);
    let score = momentum::score(published_at, &weighted, Utc::now());

    let thumbnail = post
        .thumbnail
        .filter(|t| t.starts_with("http"));

    Some(ContentItem {
        id: Uuid::new_v4().to_string(),
        platform: Platform::Reddit,
        native_id: post.id,
        author: post.author,
        title: Some(post.title),
        content,
        url: format!("https://www.reddit.com{}", post.permalink),
        thumbnail,
        metrics,
        momentum: Some(score),
        published_at,
        ingested_at: None,
        embedding: None,
    })
}

#[async_trait]
impl PlatformAdapter for RedditAdapter {
    fn platform(&self) -> Platform {
        Platform::Reddit
    }

    fn is_available(&self) -> bool {
        self.config.is_some()
    }

    async fn search(&self, keyword: &str, opts: &SearchOptions) -> Result<Vec<ContentItem>> {
        let Some(config) = &self.config else {
            bail!("reddit adapter has no credentials configured");
        };

        let token = self.bearer_token(config).await?;

        let listing: Listing = self
            .client
            .get(SEARCH_URL)
            .bearer_auth(&token)
            .header("User-Agent", &config.user_agent)
            .query(&[
                ("q", keyword),
                ("sort", "top"),
                ("t", reddit_t(opts.timeframe)),
                ("limit", &opts.limit.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("reddit search response malformed")?;

        Ok(listing
            .data
            .children
            .into_iter()
            .filter_map(|child| post_to_item(child.data))
            .collect())
    }
}
