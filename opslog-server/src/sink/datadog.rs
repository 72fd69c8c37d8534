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

use async_trait::async_trait;
use opslog_core::{EventRecord, OpslogError, Result};
use serde_json::json;
use tracing::debug;

use super::TimelineSink;

/// Posts opslog entries to the Datadog event stream.
pub struct DatadogTimeline {
    http: reqwest::Client,
    api_key: String,
    api_url: String,
}

impl DatadogTimeline {
    pub fn new(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Timeline tags for an entry: app, channel and user first, then the
/// entry's own tags.
pub fn event_tags(record: &EventRecord) -> Vec<String> {
    let mut tags = Vec::with_capacity(record.tags.len() + 3);
    tags.push("app:opslog".to_string());
    tags.push(format!("channel:{}", record.channel));
    tags.push(format!("user:{}", record.user));
    tags.extend(record.tags.iter().cloned());
    tags
}

#[async_trait]
impl TimelineSink for DatadogTimeline {
    async fn post_event(&self, title: &str, tags: &[String]) -> Result<()> {
        let url = format!("{}/api/v1/events", self.api_url);
        let body = json!({
            "title": title,
            "text": title,
            "tags": tags,
            "source_type_name": "opslog",
        });

        let response = self
            .http
            .post(&url)
            .header("DD-API-KEY", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| OpslogError::sink(format!("datadog: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OpslogError::sink(format!("datadog returned HTTP {}", status)));
        }

        debug!(title, "Posted timeline event");
        Ok(())
    }
}
