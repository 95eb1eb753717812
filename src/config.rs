use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub platforms: PlatformsConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Result limit when the caller does not request one.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Local-store candidate pool size; leaves room for timeframe and
    /// platform filtering before the final limit is applied.
    #[serde(default = "default_candidate_k")]
    pub candidate_k: usize,
    /// Items requested from each platform during a live fetch.
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
    /// Ceiling on a single adapter call. A slow platform degrades to an
    /// empty result for that platform instead of stalling the fan-out.
    #[serde(default = "default_adapter_timeout")]
    pub adapter_timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            candidate_k: default_candidate_k(),
            fetch_limit: default_fetch_limit(),
            adapter_timeout_secs: default_adapter_timeout(),
        }
    }
}

fn default_limit() -> usize {
    crate::models::DEFAULT_LIMIT
}
fn default_candidate_k() -> usize {
    200
}
fn default_fetch_limit() -> usize {
    25
}
fn default_adapter_timeout() -> u64 {
    8
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

/// Per-platform credentials. A platform with no config section has no
/// adapter credentials and reports itself unavailable — it is skipped,
/// never attempted.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PlatformsConfig {
    pub reddit: Option<RedditConfig>,
    pub youtube: Option<YoutubeConfig>,
    pub twitter: Option<TwitterConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedditConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    format!("trendscout/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Deserialize, Clone)]
pub struct YoutubeConfig {
    pub api_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TwitterConfig {
    pub bearer_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.retrieval.default_limit < 1 || config.retrieval.default_limit > crate::models::MAX_LIMIT
    {
        anyhow::bail!(
            "retrieval.default_limit must be in [1, {}]",
            crate::models::MAX_LIMIT
        );
    }

    if config.retrieval.candidate_k < config.retrieval.default_limit {
        anyhow::bail!("retrieval.candidate_k must be >= retrieval.default_limit");
    }

    if config.retrieval.adapter_timeout_secs == 0 {
        anyhow::bail!("retrieval.adapter_timeout_secs must be > 0");
    }

    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_minimal_config_defaults() {
        let f = write_config(
            r#"
[db]
path = "/tmp/trends.sqlite"

[server]
bind = "127.0.0.1:7431"
"#,
        );
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.retrieval.default_limit, 50);
        assert_eq!(config.embedding.provider, "disabled");
        assert!(!config.embedding.is_enabled());
        assert!(config.platforms.reddit.is_none());
    }

    #[test]
    fn test_enabled_embedding_requires_model_and_dims() {
        let f = write_config(
            r#"
[db]
path = "/tmp/trends.sqlite"

[server]
bind = "127.0.0.1:7431"

[embedding]
provider = "openai"
"#,
        );
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn test_limit_bounds_validated() {
        let f = write_config(
            r#"
[db]
path = "/tmp/trends.sqlite"

[server]
bind = "127.0.0.1:7431"

[retrieval]
default_limit = 500
"#,
        );
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn test_platform_credentials_parsed() {
        let f = write_config(
            r#"
[db]
path = "/tmp/trends.sqlite"

[server]
bind = "127.0.0.1:7431"

[platforms.reddit]
client_id = "id"
client_secret = "secret"

[platforms.youtube]
api_key = "key"
"#,
        );
        let config = load_config(f.path()).unwrap();
        assert!(config.platforms.reddit.is_some());
        assert!(config.platforms.youtube.is_some());
        assert!(config.platforms.twitter.is_none());
    }
}
