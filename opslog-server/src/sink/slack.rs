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

//! Slack Web API chat sink
//!
//! Payloads become Block Kit messages:
//! - annotations: divider, title section, context row of `*key:* value`
//! - items: divider, title section, divider, item sections

use async_trait::async_trait;
use opslog_core::{MessagePayload, OpslogError, PayloadBody, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::ChatSink;

/// Slack rejects section text longer than this.
pub const SECTION_TEXT_LIMIT: usize = 3000;

/// Slack rejects context blocks with more elements than this.
const CONTEXT_ELEMENT_LIMIT: usize = 10;

/// Item sections per message. Slack allows 50 blocks; a list also carries
/// two dividers, the title and the overflow line.
pub const ITEM_SECTION_LIMIT: usize = 46;

pub struct SlackClient {
    http: reqwest::Client,
    token: String,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

impl SlackClient {
    pub fn new(token: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn call(&self, method: &str, body: Value) -> Result<ApiResponse> {
        let url = format!("{}/{}", self.api_url, method);
        debug!(method, "Calling Slack API");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| OpslogError::sink(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OpslogError::sink(format!("{} returned HTTP {}", method, status)));
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| OpslogError::sink(format!("invalid {} response: {}", method, e)))?;

        if !parsed.ok {
            let reason = parsed.error.unwrap_or_else(|| "unknown_error".to_string());
            warn!(method, %reason, "Slack API call rejected");
            return Err(OpslogError::sink(reason));
        }

        Ok(parsed)
    }
}

#[async_trait]
impl ChatSink for SlackClient {
    async fn post_message(&self, channel: &str, payload: &MessagePayload) -> Result<String> {
        let body = json!({
            "channel": channel,
            "text": payload.fallback_text(),
            "blocks": blocks(payload),
        });
        self.call("chat.postMessage", body)
            .await?
            .ts
            .ok_or_else(|| OpslogError::sink("chat.postMessage returned no ts"))
    }

    async fn post_ephemeral(
        &self,
        channel: &str,
        recipient: &str,
        payload: &MessagePayload,
    ) -> Result<()> {
        let body = json!({
            "channel": channel,
            "user": recipient,
            "text": payload.fallback_text(),
            "blocks": blocks(payload),
        });
        self.call("chat.postEphemeral", body).await?;
        Ok(())
    }

    async fn delete_message(&self, channel: &str, message_ref: &str) -> Result<()> {
        let body = json!({
            "channel": channel,
            "ts": message_ref,
        });
        self.call("chat.delete", body).await?;
        Ok(())
    }
}

fn mrkdwn(text: impl Into<String>) -> Value {
    json!({ "type": "mrkdwn", "text": text.into() })
}

fn section(text: impl Into<String>) -> Value {
    json!({ "type": "section", "text": mrkdwn(text) })
}

fn divider() -> Value {
    json!({ "type": "divider" })
}

/// Block Kit layout for a payload.
pub fn blocks(payload: &MessagePayload) -> Vec<Value> {
    let mut out = vec![divider()];
    // Empty section text is rejected by Slack
    if !payload.title.is_empty() {
        out.push(section(payload.title.clone()));
    }

    match &payload.body {
        PayloadBody::Annotations(annotations) => {
            let elements: Vec<Value> = annotations
                .iter()
                .map(|a| mrkdwn(format!("*{}:* {}", a.key, a.value)))
                .collect();
            for chunk in elements.chunks(CONTEXT_ELEMENT_LIMIT) {
                out.push(json!({ "type": "context", "elements": chunk }));
            }
        }
        PayloadBody::Items(items) => {
            out.push(divider());
            let packed = pack(items, SECTION_TEXT_LIMIT);
            let shown = packed.len().min(ITEM_SECTION_LIMIT);
            let omitted: usize = packed[shown..].iter().map(|(_, count)| count).sum();
            out.extend(packed.into_iter().take(shown).map(|(text, _)| section(text)));
            if omitted > 0 {
                out.push(section(format!("…and {} more", omitted)));
            }
        }
    }

    out
}

/// Join items with newlines into chunks of at most `limit` characters.
///
/// An item that alone exceeds `limit` is cut at a character boundary.
pub fn pack_sections(items: &[String], limit: usize) -> Vec<String> {
    pack(items, limit).into_iter().map(|(text, _)| text).collect()
}

/// Packed sections paired with the number of items each holds.
fn pack(items: &[String], limit: usize) -> Vec<(String, usize)> {
    let mut sections = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    let mut current_items = 0usize;

    for item in items {
        let item: String = item.chars().take(limit).collect();
        let item_len = item.chars().count();
        let joined_len = if current_items == 0 {
            item_len
        } else {
            current_len + 1 + item_len
        };

        if joined_len > limit {
            sections.push((std::mem::take(&mut current), current_items));
            current_len = 0;
            current_items = 0;
        }

        if current_items > 0 {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(&item);
        current_len += item_len;
        current_items += 1;
    }

    if current_items > 0 {
        sections.push((current, current_items));
    }
    sections
}
