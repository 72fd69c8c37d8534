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

//! Opslog event record
//!
//! One logged occurrence. Records are keyed by `(channel, occurred_at)` and
//! secondarily indexed by `user`. Serialized attribute names match the
//! persisted table layout, with `DateTime` kept as a decimal string.

use serde::{Deserialize, Serialize};

use crate::tags::{extract_tags, strip_tags};
use crate::time::{absolute_time, relative_time};

/// Primary key of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub channel: String,
    pub occurred_at: i64,
}

impl EventKey {
    pub fn new(channel: impl Into<String>, occurred_at: i64) -> Self {
        Self {
            channel: channel.into(),
            occurred_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventRecord {
    /// Channel name the entry was logged in
    #[serde(rename = "Channel")]
    pub channel: String,

    /// Chat-side channel handle, empty until the ack is posted
    #[serde(rename = "ChannelID", default)]
    pub channel_ref: String,

    /// Display name of the author
    #[serde(rename = "User")]
    pub user: String,

    /// Chat-side user handle for mentions
    #[serde(rename = "UserID", default)]
    pub user_ref: String,

    /// Unix seconds at creation
    #[serde(rename = "DateTime", with = "unix_string")]
    pub occurred_at: i64,

    /// Body with tags removed
    #[serde(rename = "Text")]
    pub text: String,

    /// `key:value` tags in order of appearance
    #[serde(rename = "Tags", default)]
    pub tags: Vec<String>,

    /// Handle of the posted acknowledgment, used to retract it
    #[serde(rename = "AckTimestamp", default)]
    pub ack_ref: String,
}

impl EventRecord {
    /// Build a record from raw command text.
    ///
    /// Tags are extracted and stripped from `raw_text`. Length limits are the
    /// caller's concern.
    pub fn build(
        channel: impl Into<String>,
        user: impl Into<String>,
        raw_text: &str,
        now: i64,
    ) -> Self {
        let tags = extract_tags(raw_text);
        let text = strip_tags(raw_text, &tags);

        Self {
            channel: channel.into(),
            channel_ref: String::new(),
            user: user.into(),
            user_ref: String::new(),
            occurred_at: now,
            text,
            tags,
            ack_ref: String::new(),
        }
    }

    pub fn with_user_ref(mut self, user_ref: impl Into<String>) -> Self {
        self.user_ref = user_ref.into();
        self
    }

    pub fn key(&self) -> EventKey {
        EventKey::new(self.channel.clone(), self.occurred_at)
    }

    /// Mention form when a handle is known, `@name` otherwise.
    pub fn user_display(&self) -> String {
        if self.user_ref.is_empty() {
            format!("@{}", self.user)
        } else {
            format!("<@{}>", self.user_ref)
        }
    }

    /// Channel link when a handle is known, `#name` otherwise.
    pub fn channel_display(&self) -> String {
        if self.channel_ref.is_empty() {
            format!("#{}", self.channel)
        } else {
            format!("<#{}|{}>", self.channel_ref, self.channel)
        }
    }

    pub fn relative_time(&self, now: i64) -> String {
        relative_time(self.occurred_at, now)
    }

    pub fn absolute_time(&self) -> String {
        absolute_time(self.occurred_at)
    }
}

/// Serde adapter storing Unix seconds as a decimal string.
pub mod unix_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<i64>()
            .map_err(|e| de::Error::custom(format!("invalid DateTime '{}': {}", raw, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_extracts_and_strips() {
        let event = EventRecord::build("ops", "alice", "restarted db #host:db1 #env:prod", 1000);
        assert_eq!(event.channel, "ops");
        assert_eq!(event.user, "alice");
        assert_eq!(event.text, "restarted db");
        assert_eq!(event.tags, vec!["host:db1", "env:prod"]);
        assert_eq!(event.occurred_at, 1000);
        assert!(event.ack_ref.is_empty());
        assert!(event.channel_ref.is_empty());
    }

    #[test]
    fn test_display_forms_fall_back_to_names() {
        let mut event = EventRecord::build("ops", "alice", "hello", 1);
        assert_eq!(event.user_display(), "@alice");
        assert_eq!(event.channel_display(), "#ops");

        event.user_ref = "U123".to_string();
        event.channel_ref = "C456".to_string();
        assert_eq!(event.user_display(), "<@U123>");
        assert_eq!(event.channel_display(), "<#C456|ops>");
    }

    #[test]
    fn test_serialized_layout() {
        let event = EventRecord::build("ops", "alice", "hi #a:b", 1_600_000_000);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["Channel"], "ops");
        assert_eq!(json["DateTime"], "1600000000");
        assert_eq!(json["Tags"][0], "a:b");

        let back: EventRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_deserialize_without_optional_fields() {
        let json = r#"{"Channel":"ops","User":"bob","DateTime":"42","Text":"x"}"#;
        let event: EventRecord = serde_json::from_str(json).unwrap();
        assert_eq!(event.occurred_at, 42);
        assert!(event.tags.is_empty());
        assert!(event.ack_ref.is_empty());
    }

    #[test]
    fn test_deserialize_rejects_bad_timestamp() {
        let json = r#"{"Channel":"ops","User":"bob","DateTime":"soon","Text":"x"}"#;
        assert!(serde_json::from_str::<EventRecord>(json).is_err());
    }
}
