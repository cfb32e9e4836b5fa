use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use airtable_client::MAX_RECORDS_PER_REQUEST;

/// TOML-backed tunables. Every section and key is optional; a missing
/// file yields `Config::default()`. Secrets stay as env vars (`Secrets`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub scout: ScoutConfig,
    pub discovery: DiscoveryConfig,
    pub extraction: ExtractionConfig,
    pub sync: SyncConfig,
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoutConfig {
    /// Processed in order.
    pub topics: Vec<String>,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            topics: vec![
                "personal finance".to_string(),
                "financial literacy".to_string(),
                "money management".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    pub search_url: String,
    pub max_scrolls: u32,
    pub max_links_per_topic: usize,
    pub initial_settle_ms: u64,
    pub scroll_pause_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            search_url: "https://www.youtube.com/results".to_string(),
            max_scrolls: 2,
            max_links_per_topic: 1000,
            initial_settle_ms: 3000,
            scroll_pause_ms: 2000,
        }
    }
}

impl DiscoveryConfig {
    pub fn initial_settle(&self) -> Duration {
        Duration::from_millis(self.initial_settle_ms)
    }

    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractionConfig {
    /// Pause after every navigation.
    pub settle_delay_ms: u64,
    /// Pause after scrolling a profile page.
    pub scroll_settle_ms: u64,
    /// Bounded wait for each structural query.
    pub field_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 4000,
            scroll_settle_ms: 2000,
            field_timeout_secs: 15,
        }
    }
}

impl ExtractionConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    pub fn field_timeout(&self) -> Duration {
        Duration::from_secs(self.field_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    pub table: String,
    pub chunk_size: usize,
    pub retry_count: u32,
    pub retry_delay_ms: u64,
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
    /// Append-only JSON-lines file for chunks that exhausted their retries.
    pub failure_log: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            table: "Finance_Channels".to_string(),
            chunk_size: MAX_RECORDS_PER_REQUEST,
            retry_count: 3,
            retry_delay_ms: 2000,
            jitter_min_ms: 800,
            jitter_max_ms: 1500,
            failure_log: PathBuf::from("failed_batches.json"),
        }
    }
}

impl SyncConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub headless: bool,
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: false,
            args: webdriver_client::Capabilities::default().args,
        }
    }
}

impl Config {
    /// Clamp tunables into the ranges the pipeline relies on.
    pub fn normalize(&mut self) {
        let chunk = self.sync.chunk_size.clamp(1, MAX_RECORDS_PER_REQUEST);
        if chunk != self.sync.chunk_size {
            tracing::warn!(
                configured = self.sync.chunk_size,
                using = chunk,
                "sync.chunk_size out of range"
            );
            self.sync.chunk_size = chunk;
        }
        if self.sync.retry_count == 0 {
            tracing::warn!("sync.retry_count must be at least 1, using 1");
            self.sync.retry_count = 1;
        }
        if self.sync.jitter_min_ms > self.sync.jitter_max_ms {
            std::mem::swap(&mut self.sync.jitter_min_ms, &mut self.sync.jitter_max_ms);
        }
        self.scout.topics.retain(|t| !t.trim().is_empty());
    }
}

/// Load and parse a TOML config file. A missing file means defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?
    } else {
        tracing::info!(path = %path.display(), "No config file found, using defaults");
        Config::default()
    };
    config.normalize();
    Ok(config)
}

/// Credentials and endpoints loaded from the environment (and `.env`).
#[derive(Clone)]
pub struct Secrets {
    pub airtable_api_key: String,
    pub airtable_base_id: String,
    pub webdriver_url: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let secrets = Self {
            airtable_api_key: std::env::var("AIRTABLE_API_KEY")
                .context("AIRTABLE_API_KEY environment variable is required")?,
            airtable_base_id: std::env::var("AIRTABLE_BASE_ID")
                .context("AIRTABLE_BASE_ID environment variable is required")?,
            webdriver_url: std::env::var("WEBDRIVER_URL").ok(),
        };

        secrets.log_keys();
        Ok(secrets)
    }

    fn log_keys(&self) {
        tracing::info!("Secrets loaded:");
        tracing::info!("  AIRTABLE_API_KEY: {}", preview(&self.airtable_api_key));
        tracing::info!("  AIRTABLE_BASE_ID: {}", preview(&self.airtable_base_id));
        tracing::info!(
            "  WEBDRIVER_URL: {}",
            self.webdriver_url.as_deref().unwrap_or("<not set>")
        );
    }
}

/// First five characters of a secret plus its length in characters.
fn preview(val: &str) -> String {
    let n = val.chars().take(5).map(char::len_utf8).sum::<usize>();
    format!("{}...({} chars)", &val[..n], val.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_counts_characters_not_bytes() {
        assert_eq!(preview("ключ12345"), "ключ1...(9 chars)");
        assert_eq!(preview("key"), "key...(3 chars)");
    }

    #[test]
    fn defaults_are_production_values() {
        let config = Config::default();
        assert_eq!(config.discovery.max_scrolls, 2);
        assert_eq!(config.discovery.max_links_per_topic, 1000);
        assert_eq!(config.extraction.field_timeout(), Duration::from_secs(15));
        assert_eq!(config.sync.chunk_size, 10);
        assert_eq!(config.sync.retry_count, 3);
        assert_eq!(config.sync.retry_delay(), Duration::from_secs(2));
        assert_eq!(config.sync.table, "Finance_Channels");
        assert_eq!(config.scout.topics.len(), 3);
        assert_eq!(
            config.browser.args,
            vec!["--disable-gpu", "--no-sandbox", "--mute-audio"]
        );
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [scout]
            topics = ["index fund investing"]

            [discovery]
            max_scrolls = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.scout.topics, vec!["index fund investing"]);
        assert_eq!(config.discovery.max_scrolls, 5);
        assert_eq!(config.discovery.max_links_per_topic, 1000);
        assert_eq!(config.sync.chunk_size, 10);
    }

    #[test]
    fn unknown_keys_rejected() {
        let parsed = toml::from_str::<Config>(
            r#"
            [sync]
            batch = 10
            "#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn normalize_clamps_sync_tunables() {
        let mut config = Config::default();
        config.sync.chunk_size = 50;
        config.sync.retry_count = 0;
        config.sync.jitter_min_ms = 900;
        config.sync.jitter_max_ms = 100;
        config.scout.topics = vec!["budgeting".into(), "  ".into()];

        config.normalize();

        assert_eq!(config.sync.chunk_size, 10);
        assert_eq!(config.sync.retry_count, 1);
        assert_eq!((config.sync.jitter_min_ms, config.sync.jitter_max_ms), (100, 900));
        assert_eq!(config.scout.topics, vec!["budgeting"]);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.sync.chunk_size, 10);
    }

    #[test]
    fn file_on_disk_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scout.toml");
        std::fs::write(&path, "[sync]\nchunk_size = 0\ntable = \"Channels\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.sync.table, "Channels");
        assert_eq!(config.sync.chunk_size, 1);
    }
}
