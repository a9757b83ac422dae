//! Retrieval configuration via `sift.toml`
//!
//! A single flat file holds the paging policy shared by every scan a
//! session opens, plus an optional `[remote]` section describing the search
//! endpoint. Missing keys fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::search_types::DOC_FIELD;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "sift.toml";

/// Continuation strategy used to page through a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// `from`/`size` pagination. Stateless, bounded by the max result window.
    Offset,
    /// Server-side scroll context. Snapshot-isolated, must be released.
    #[default]
    Scroll,
    /// `search_after` on the last sort-key tuple. Stateless, unbounded depth.
    SearchAfter,
}

impl Strategy {
    /// Config name of the strategy
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Offset => "offset",
            Strategy::Scroll => "scroll",
            Strategy::SearchAfter => "search_after",
        }
    }
}

/// Connection settings for a remote search endpoint.
///
/// Persisted in `sift.toml` under the `[remote]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteConfig {
    /// Base URL of the cluster (e.g. "http://localhost:9200")
    pub endpoint: String,
    /// Optional API key, sent as `Authorization: ApiKey <key>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Request timeout in milliseconds (default: 30000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl RemoteConfig {
    /// Create remote settings for `endpoint` with the default timeout
    pub fn new(endpoint: impl Into<String>) -> Self {
        RemoteConfig {
            endpoint: endpoint.into(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
        }
    }

    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_page_size() -> usize {
    10
}

fn default_keep_alive_ms() -> u64 {
    60_000
}

fn default_tie_breaker() -> bool {
    true
}

fn default_tie_breaker_field() -> String {
    DOC_FIELD.to_string()
}

fn default_max_result_window() -> usize {
    10_000
}

/// Paging policy loaded from `sift.toml`.
///
/// # Example
///
/// ```toml
/// page_size = 10
/// scroll_keep_alive_ms = 60000
/// tie_breaker = true
/// strategy = "scroll"
///
/// # [remote]
/// # endpoint = "http://localhost:9200"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    /// Matches requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Scroll keep-alive in milliseconds, renewed by every scroll call.
    #[serde(default = "default_keep_alive_ms")]
    pub scroll_keep_alive_ms: u64,
    /// Append a tie-breaker to the sort of search-after scans.
    #[serde(default = "default_tie_breaker")]
    pub tie_breaker: bool,
    /// Field used as the tie-breaker.
    #[serde(default = "default_tie_breaker_field")]
    pub tie_breaker_field: String,
    /// Remote ceiling on `from + size` for offset paging.
    #[serde(default = "default_max_result_window")]
    pub max_result_window: usize,
    /// Strategy used by `SearchSession::sequence`.
    #[serde(default)]
    pub strategy: Strategy,
    /// Optional remote endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            scroll_keep_alive_ms: default_keep_alive_ms(),
            tie_breaker: default_tie_breaker(),
            tie_breaker_field: default_tie_breaker_field(),
            max_result_window: default_max_result_window(),
            strategy: Strategy::default(),
            remote: None,
        }
    }
}

impl RetrievalConfig {
    /// Builder: set the page size
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Builder: set the scroll keep-alive
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.scroll_keep_alive_ms = u64::try_from(keep_alive.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Builder: toggle the search-after tie-breaker
    pub fn with_tie_breaker(mut self, enabled: bool) -> Self {
        self.tie_breaker = enabled;
        self
    }

    /// Builder: set the tie-breaker field
    pub fn with_tie_breaker_field(mut self, field: impl Into<String>) -> Self {
        self.tie_breaker_field = field.into();
        self
    }

    /// Builder: set the max result window
    pub fn with_max_result_window(mut self, max: usize) -> Self {
        self.max_result_window = max;
        self
    }

    /// Builder: set the default strategy
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Builder: set the remote endpoint
    pub fn with_remote(mut self, remote: RemoteConfig) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Scroll keep-alive as a `Duration`
    pub fn scroll_keep_alive(&self) -> Duration {
        Duration::from_millis(self.scroll_keep_alive_ms)
    }

    /// Check the settings are usable together.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the page size or keep-alive is zero, the
    /// page size exceeds the max result window, or the tie-breaker field is empty.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Config("page_size must be greater than 0".into()));
        }
        if self.scroll_keep_alive_ms == 0 {
            return Err(Error::Config(
                "scroll_keep_alive_ms must be greater than 0".into(),
            ));
        }
        if self.page_size > self.max_result_window {
            return Err(Error::Config(format!(
                "page_size {} exceeds max_result_window {}",
                self.page_size, self.max_result_window
            )));
        }
        if self.tie_breaker_field.is_empty() {
            return Err(Error::Config("tie_breaker_field must not be empty".into()));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# sift retrieval configuration
#
# Matches requested per page (default: 10)
page_size = 10

# Scroll keep-alive in milliseconds, renewed on every scroll call (default: 60000)
scroll_keep_alive_ms = 60000

# Append a tie-breaker sort for search_after scans (default: true)
# Without one, matches with equal sort values can be skipped or repeated
# across page boundaries.
tie_breaker = true
tie_breaker_field = "_doc"

# Ceiling on from + size for offset paging (default: 10000)
max_result_window = 10000

# Strategy: "offset", "scroll" (default) or "search_after"
strategy = "scroll"

# Remote search endpoint.
# [remote]
# endpoint = "http://localhost:9200"
# api_key = "your-api-key"      # optional
# timeout_ms = 30000             # optional, default 30000
"#
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: RetrievalConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
