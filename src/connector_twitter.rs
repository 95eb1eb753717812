//! Twitter platform adapter.
//!
//! Uses the v2 recent-search endpoint with a bearer token. The `"x"`
//! platform alias is handled upstream by `Platform::parse`; this adapter
//! only ever sees the canonical platform.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::config::TwitterConfig;
use crate::models::{ContentItem, Platform, SearchOptions, Timeframe};
use crate::traits::PlatformAdapter;

const SEARCH_URL: &str = "https://api.twitter.com/2/tweets/search/recent";

pub struct TwitterAdapter {
    config: Option<TwitterConfig>,
    client: reqwest::Client,
}

impl TwitterAdapter {
    pub fn new(config: Option<TwitterConfig>) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    #[serde(default)]
    includes: Includes,
}

#[derive(Debug, Deserialize, Default)]
struct Includes {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
    author_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    public_metrics: PublicMetrics,
}

#[derive(Debug, Deserialize, Default)]
struct PublicMetrics {
    #[serde(default)]
    like_count: f64,
    #[serde(default)]
    retweet_count: f64,
    #[serde(default)]
    reply_count: f64,
    #[serde(default)]
    quote_count: f64,
}

fn tweet_to_item(tweet: Tweet, users: &HashMap<String, String>) -> Option<ContentItem> {
    if tweet.id.is_empty() || tweet.text.trim().is_empty() {
        return None;
    }

    let username = tweet
        .author_id
        .as_ref()
        .and_then(|id| users.get(id))
        .cloned()
        .unwrap_or_else(|| "unknown".to_string());

    let metrics = HashMap::from([
        ("likes".to_string(), tweet.public_metrics.like_count.max(0.0)),
        (
            "retweets".to_string(),
            tweet.public_metrics.retweet_count.max(0.0),
        ),
        (
            "replies".to_string(),
            tweet.public_metrics.reply_count.max(0.0),
        ),
        (
            "quotes".to_string(),
            tweet.public_metrics.quote_count.max(0.0),
        ),
    ]);

    Some(ContentItem {
        id: Uuid::new_v4().to_string(),
        platform: Platform::Twitter,
        native_id: tweet.id.clone(),
        author: username.clone(),
        title: None,
        content: tweet.text,
        url: format!("https://twitter.com/{}/status/{}", username, tweet.id),
        thumbnail: None,
        metrics,
        momentum: None,
        published_at: tweet.created_at.unwrap_or_else(Utc::now),
        ingested_at: None,
        embedding: None,
    })
}

#[async_trait]
impl PlatformAdapter for TwitterAdapter {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    fn is_available(&self) -> bool {
        self.config.is_some()
    }

    async fn search(&self, keyword: &str, opts: &SearchOptions) -> Result<Vec<ContentItem>> {
        let Some(config) = &self.config else {
            bail!("twitter adapter has no credentials configured");
        };

        let mut query = keyword.to_string();
        if let Some(lang) = &opts.lang {
            query.push_str(&format!(" lang:{}", lang));
        }

        // v2 API requires max_results in [10, 100]
        let max_results = opts.limit.clamp(10, 100).to_string();

        let mut params: Vec<(String, String)> = vec![
            ("query".to_string(), query),
            ("max_results".to_string(), max_results),
            (
                "tweet.fields".to_string(),
                "public_metrics,created_at,author_id".to_string(),
            ),
            ("expansions".to_string(), "author_id".to_string()),
            ("user.fields".to_string(), "username".to_string()),
        ];

        // The recent-search index only covers ~7 days; only narrow further
        // for the sub-week timeframes.
        if matches!(opts.timeframe, Timeframe::Hour | Timeframe::Day) {
            if let Some(cutoff) = opts.timeframe.cutoff(Utc::now()) {
                params.push(("start_time".to_string(), cutoff.to_rfc3339()));
            }
        }

        let response: SearchResponse = self
            .client
            .get(SEARCH_URL)
            .bearer_auth(&config.bearer_token)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("twitter search response malformed")?;

        let users: HashMap<String, String> = response
            .includes
            .users
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect();

        Ok(response
            .data
            .into_iter()
            .filter_map(|tweet| tweet_to_item(tweet, &users))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_adapter_reports_unavailable() {
        assert!(!TwitterAdapter::new(None).is_available());
        let config = TwitterConfig {
            bearer_token: "t".to_string(),
        };
        assert!(TwitterAdapter::new(Some(config)).is_available());
    }

    #[test]
    fn test_tweet_normalization() {
        let users = HashMap::from([("u1".to_string(), "alice".to_string())]);
        let tweet = Tweet {
            id: "123".to_string(),
            text: "hot take about ai".to_string(),
            author_id: Some("u1".to_string()),
            created_at: Some(Utc::now()),
            public_metrics: PublicMetrics {
                like_count: 10.0,
                retweet_count: 2.0,
                reply_count: 1.0,
                quote_count: 0.0,
            },
        };
        let item = tweet_to_item(tweet, &users).unwrap();
        assert_eq!(item.platform, Platform::Twitter);
        assert_eq!(item.author, "alice");
        assert_eq!(item.url, "https://twitter.com/alice/status/123");
        assert_eq!(item.metrics["likes"], 10.0);
        assert!(item.title.is_none());
    }

    #[test]
    fn test_tweet_with_unknown_author() {
        let tweet = Tweet {
            id: "9".to_string(),
            text: "text".to_string(),
            author_id: Some("missing".to_string()),
            created_at: None,
            public_metrics: PublicMetrics::default(),
        };
        let item = tweet_to_item(tweet, &HashMap::new()).unwrap();
        assert_eq!(item.author, "unknown");
    }

    #[test]
    fn test_empty_tweet_skipped() {
        let tweet = Tweet {
            id: "1".to_string(),
            text: "   ".to_string(),
            author_id: None,
            created_at: None,
            public_metrics: PublicMetrics::default(),
        };
        assert!(tweet_to_item(tweet, &HashMap::new()).is_none());
    }
}
