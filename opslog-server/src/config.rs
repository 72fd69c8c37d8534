// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use anyhow::Result;
use opslog_core::ScanPolicy;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Opslog Server Configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    /// HTTP listen address (e.g., "127.0.0.1:47200")
    #[serde(default = "default_http_addr")]
    pub listen_addr: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    File,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "file" => Ok(StorageBackend::File),
            other => anyhow::bail!("Unknown storage backend: {}", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// JSON file holding every entry (file backend only)
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SlackConfig {
    /// Shared secret sent with every slash command
    #[serde(default)]
    pub verification_token: String,

    /// Bot token used for chat.postMessage / chat.delete
    #[serde(default)]
    pub oauth_token: String,

    /// Web API base URL
    #[serde(default = "default_slack_api_url")]
    pub api_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimelineConfig {
    /// Datadog API key; the timeline sink is disabled without one
    pub api_key: Option<String>,

    #[serde(default = "default_datadog_api_url")]
    pub api_url: String,
}

impl TimelineConfig {
    pub fn enabled(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    #[serde(default)]
    pub scan: ScanPolicy,

    /// Count used by `show` / `showall` without an argument
    #[serde(default = "default_show_count")]
    pub default_show_count: usize,

    /// Longest accepted command text, in characters
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
}

// Default values
fn default_http_addr() -> String {
    "127.0.0.1:47200".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_data_file() -> PathBuf {
    PathBuf::from("./opslog-data/opslog.json")
}

fn default_slack_api_url() -> String {
    "https://slack.com/api".to_string()
}

fn default_datadog_api_url() -> String {
    "https://api.datadoghq.com".to_string()
}

fn default_show_count() -> usize {
    10
}

fn default_max_text_chars() -> usize {
    400
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_http_addr(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_file: default_data_file(),
        }
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            verification_token: String::new(),
            oauth_token: String::new(),
            api_url: default_slack_api_url(),
        }
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_datadog_api_url(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            scan: ScanPolicy::default(),
            default_show_count: default_show_count(),
            max_text_chars: default_max_text_chars(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - OPSLOG_HTTP_ADDR: HTTP listen address (default: 127.0.0.1:47200)
    /// - OPSLOG_STORE: Storage backend, `memory` or `file` (default: file)
    /// - OPSLOG_DATA_FILE: Data file path (default: ./opslog-data/opslog.json)
    /// - OPSLOG_MAX_TEXT_CHARS: Longest accepted command text (default: 400)
    /// - SLACK_VERIFICATION_TOKEN: Slash command shared secret
    /// - SLACK_OAUTH_TOKEN: Bot token for the Web API
    /// - SLACK_API_URL: Web API base URL (default: https://slack.com/api)
    /// - DATADOG_API_KEY: Enables the Datadog timeline sink
    /// - DATADOG_API_URL: Datadog API base URL (default: https://api.datadoghq.com)
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load configuration with priority: env > file > defaults
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let mut config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            } else {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
        } else {
            Self::default()
        };

        config.apply_env();
        Ok(config)
    }

    /// Overwrite fields whose environment variable is set.
    fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("OPSLOG_HTTP_ADDR") {
            self.server.listen_addr = addr;
        }

        if let Ok(backend) = std::env::var("OPSLOG_STORE") {
            match backend.parse() {
                Ok(val) => self.storage.backend = val,
                Err(e) => tracing::warn!("Ignoring OPSLOG_STORE: {}", e),
            }
        }

        if let Ok(path) = std::env::var("OPSLOG_DATA_FILE") {
            self.storage.data_file = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("OPSLOG_MAX_TEXT_CHARS") {
            if let Ok(val) = max.parse() {
                self.retrieval.max_text_chars = val;
            }
        }

        if let Ok(token) = std::env::var("SLACK_VERIFICATION_TOKEN") {
            self.slack.verification_token = token;
        }

        if let Ok(token) = std::env::var("SLACK_OAUTH_TOKEN") {
            self.slack.oauth_token = token;
        }

        if let Ok(url) = std::env::var("SLACK_API_URL") {
            self.slack.api_url = url;
        }

        if let Ok(key) = std::env::var("DATADOG_API_KEY") {
            self.timeline.api_key = Some(key);
        }

        if let Ok(url) = std::env::var("DATADOG_API_URL") {
            self.timeline.api_url = url;
        }
    }

    /// Parse listen address as SocketAddr
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(self.server.listen_addr.parse()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        if self.slack.verification_token.is_empty() {
            anyhow::bail!("Slack verification token is not configured");
        }

        if self.slack.oauth_token.is_empty() {
            tracing::warn!("Slack OAuth token is empty; chat API calls will be rejected");
        }

        self.retrieval.scan.validate()?;

        if self.retrieval.max_text_chars == 0 {
            anyhow::bail!("max_text_chars must be positive");
        }

        Ok(())
    }
}
