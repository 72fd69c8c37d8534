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

//! Outbound sinks
//!
//! The dispatcher only sees these traits. Concrete clients:
//! - [`SlackClient`]: chat messages via the Slack Web API
//! - [`DatadogTimeline`]: timeline events via the Datadog events API

pub mod datadog;
pub mod slack;

use async_trait::async_trait;
use opslog_core::{MessagePayload, Result};

pub use datadog::DatadogTimeline;
pub use slack::SlackClient;

/// Chat platform message API.
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Post `payload` to `channel` and return the message ref used for later
    /// deletion.
    async fn post_message(&self, channel: &str, payload: &MessagePayload) -> Result<String>;

    /// Post `payload` visible only to `recipient`.
    async fn post_ephemeral(
        &self,
        channel: &str,
        recipient: &str,
        payload: &MessagePayload,
    ) -> Result<()>;

    async fn delete_message(&self, channel: &str, message_ref: &str) -> Result<()>;
}

/// Event timeline service. Failures are reported to the caller but never
/// abort the primary flow.
#[async_trait]
pub trait TimelineSink: Send + Sync {
    async fn post_event(&self, title: &str, tags: &[String]) -> Result<()>;
}
