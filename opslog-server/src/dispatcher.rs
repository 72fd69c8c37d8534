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

//! Slash command dispatcher
//!
//! Turns one decoded slash command into store reads/writes and chat sink
//! calls. Every outcome, including failures, ends as optional reply text for
//! the invoking user.

use opslog_core::{
    render_ack, render_help, render_list, EventRecord, OpslogError, Result,
};
use opslog_query::RetrievalEngine;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::sink::{datadog::event_tags, ChatSink, TimelineSink};

/// `channel_name` Slack sends for direct messages.
pub const DIRECT_MESSAGE_CHANNEL: &str = "directmessage";

/// Form fields of a slash command request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlashCommand {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub channel_name: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    DeleteLast,
    Show(usize),
    ShowAll(usize),
    Search(String),
    SearchAll(String),
    NewEntry,
}

impl Command {
    /// Classify command text. Matching is case-sensitive on the trimmed text;
    /// anything unrecognised is a new entry.
    pub fn parse(text: &str, default_count: usize) -> Result<Self> {
        let text = text.trim();

        let command = match text {
            "help" => Command::Help,
            "deletelast" => Command::DeleteLast,
            "show" => Command::Show(default_count),
            "showall" => Command::ShowAll(default_count),
            _ => {
                if let Some(count) = text.strip_prefix("show ").and_then(digits) {
                    Command::Show(parse_count(count)?)
                } else if let Some(count) = text.strip_prefix("showall ").and_then(digits) {
                    Command::ShowAll(parse_count(count)?)
                } else if let Some(query) = text.strip_prefix("search ") {
                    Command::Search(query.to_string())
                } else if let Some(query) = text.strip_prefix("searchall ") {
                    Command::SearchAll(query.to_string())
                } else {
                    Command::NewEntry
                }
            }
        };

        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::DeleteLast => "deletelast",
            Command::Show(_) => "show",
            Command::ShowAll(_) => "showall",
            Command::Search(_) => "search",
            Command::SearchAll(_) => "searchall",
            Command::NewEntry => "new_entry",
        }
    }
}

fn digits(s: &str) -> Option<&str> {
    (!s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())).then_some(s)
}

fn parse_count(s: &str) -> Result<usize> {
    s.parse()
        .map_err(|_| OpslogError::validation(format!("{} is not a valid number of entries", s)))
}

/// Reply for the transport layer. `Empty` means "200 with no body".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResponse {
    Empty,
    Text(String),
}

impl CommandResponse {
    pub fn text(&self) -> Option<&str> {
        match self {
            CommandResponse::Empty => None,
            CommandResponse::Text(text) => Some(text),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub verification_token: String,
    pub max_text_chars: usize,
    pub default_show_count: usize,
}

impl DispatchSettings {
    pub fn new(verification_token: impl Into<String>) -> Self {
        Self {
            verification_token: verification_token.into(),
            max_text_chars: 400,
            default_show_count: 10,
        }
    }
}

/// Executes slash commands against the store and chat sinks.
#[derive(Clone)]
pub struct Dispatcher {
    engine: RetrievalEngine,
    chat: Arc<dyn ChatSink>,
    timeline: Option<Arc<dyn TimelineSink>>,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(engine: RetrievalEngine, chat: Arc<dyn ChatSink>, settings: DispatchSettings) -> Self {
        Self {
            engine,
            chat,
            timeline: None,
            settings,
        }
    }

    pub fn with_timeline(mut self, timeline: Arc<dyn TimelineSink>) -> Self {
        self.timeline = Some(timeline);
        self
    }

    /// Run a command and fold any failure into reply text.
    pub async fn dispatch(&self, req: &SlashCommand) -> CommandResponse {
        info!(
            user = %req.user_name,
            channel = %req.channel_name,
            text = %req.text,
            "Slash command received"
        );

        match self.execute(req).await {
            Ok(Some(text)) => CommandResponse::Text(text),
            Ok(None) => CommandResponse::Empty,
            Err(e) => {
                match &e {
                    OpslogError::Store(_) | OpslogError::Sink(_) => {
                        error!(kind = e.kind(), user = %req.user_name, "Command failed: {}", e)
                    }
                    _ => warn!(kind = e.kind(), user = %req.user_name, "Command rejected: {}", e),
                }
                CommandResponse::Text(e.to_string())
            }
        }
    }

    /// Run a command. `Ok(None)` means the reply went through the chat sink.
    pub async fn execute(&self, req: &SlashCommand) -> Result<Option<String>> {
        if req.token != self.settings.verification_token {
            return Err(OpslogError::Auth);
        }

        let max = self.settings.max_text_chars;
        if req.text.chars().count() > max {
            return Err(OpslogError::validation(format!(
                "Message is over {} characters, Invalid.",
                max
            )));
        }

        let command = Command::parse(&req.text, self.settings.default_show_count)?;
        match command {
            Command::Help => {
                self.chat
                    .post_ephemeral(&req.channel_id, &req.user_id, &render_help())
                    .await?;
                Ok(None)
            }
            Command::DeleteLast => self.delete_last(req).await.map(Some),
            Command::Show(count) => {
                let events = self.engine.latest_by_channel(&req.channel_name, count).await?;
                let title = format!("*latest {} events in #{}*", events.len(), req.channel_name);
                self.send_list(req, &events, title).await
            }
            Command::ShowAll(count) => {
                let events = self.engine.latest_global(count).await?;
                let title = format!("*latest {} events across all channels*", events.len());
                self.send_list(req, &events, title).await
            }
            Command::Search(_) => Ok(Some("search current channel".to_string())),
            Command::SearchAll(_) => Ok(Some("search across all channels".to_string())),
            Command::NewEntry => self.new_entry(req).await,
        }
    }

    async fn send_list(
        &self,
        req: &SlashCommand,
        events: &[EventRecord],
        title: String,
    ) -> Result<Option<String>> {
        let payload = render_list(events, title, self.engine.now());
        self.chat
            .post_ephemeral(&req.channel_id, &req.user_id, &payload)
            .await?;
        Ok(None)
    }

    async fn delete_last(&self, req: &SlashCommand) -> Result<String> {
        let deleted = self.engine.delete_own_last(&req.user_name).await?;
        let mut reply = format!(
            "deleted your last opslog entry in {}",
            deleted.channel_display()
        );

        if !deleted.ack_ref.is_empty() {
            let target = if deleted.channel_ref.is_empty() {
                &req.channel_id
            } else {
                &deleted.channel_ref
            };
            if let Err(e) = self.chat.delete_message(target, &deleted.ack_ref).await {
                // Entry is already gone from the store; only the message is stale
                warn!(ack_ref = %deleted.ack_ref, "Failed to retract acknowledgment: {}", e);
                reply.push_str(&format!(
                    " (warning: could not remove the channel message: {})",
                    e
                ));
            }
        }

        Ok(reply)
    }

    async fn new_entry(&self, req: &SlashCommand) -> Result<Option<String>> {
        if req.channel_name == DIRECT_MESSAGE_CHANNEL {
            return Err(OpslogError::validation("No direct messages, Invalid."));
        }

        let mut record =
            EventRecord::build(&req.channel_name, &req.user_name, &req.text, self.engine.now())
                .with_user_ref(&req.user_id);

        let store = self.engine.store();
        store.put(record.clone()).await?;

        let ack_ref = self
            .chat
            .post_message(&req.channel_id, &render_ack(&record))
            .await?;

        record.ack_ref = ack_ref;
        record.channel_ref = req.channel_id.clone();
        store.put(record.clone()).await?;

        info!(
            user = %record.user,
            channel = %record.channel,
            occurred_at = record.occurred_at,
            tags = record.tags.len(),
            "Recorded opslog entry"
        );

        if let Some(timeline) = &self.timeline {
            if let Err(e) = timeline.post_event(&record.text, &event_tags(&record)).await {
                warn!("Timeline event not recorded: {}", e);
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fixed_commands() {
        assert_eq!(Command::parse("help", 10).unwrap(), Command::Help);
        assert_eq!(Command::parse("  deletelast ", 10).unwrap(), Command::DeleteLast);
        assert_eq!(Command::parse("show", 10).unwrap(), Command::Show(10));
        assert_eq!(Command::parse("show 3", 10).unwrap(), Command::Show(3));
        assert_eq!(Command::parse("showall", 7).unwrap(), Command::ShowAll(7));
        assert_eq!(Command::parse("showall 25", 10).unwrap(), Command::ShowAll(25));
    }

    #[test]
    fn test_parse_search() {
        assert_eq!(
            Command::parse("search db failover", 10).unwrap(),
            Command::Search("db failover".to_string())
        );
        assert_eq!(
            Command::parse("searchall x", 10).unwrap(),
            Command::SearchAll("x".to_string())
        );
    }

    #[test]
    fn test_parse_falls_through_to_new_entry() {
        for text in [
            "Help",
            "show abc",
            "show 3 4",
            "show -1",
            "showall me the logs",
            "deletelast please",
            "restarted api #svc:api",
            "search",
        ] {
            assert_eq!(Command::parse(text, 10).unwrap(), Command::NewEntry, "{}", text);
        }
    }

    #[test]
    fn test_parse_count_overflow_is_validation_error() {
        let err = Command::parse("show 99999999999999999999999", 10).unwrap_err();
        assert!(matches!(err, OpslogError::Validation(_)));
    }

    #[test]
    fn test_command_response_text() {
        assert_eq!(CommandResponse::Empty.text(), None);
        assert_eq!(CommandResponse::Text("hi".into()).text(), Some("hi"));
    }
}
