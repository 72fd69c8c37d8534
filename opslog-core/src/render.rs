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

//! Chat-agnostic message payloads
//!
//! A payload is a title plus either an ordered list of key/value annotations
//! (single entry acknowledgment) or an ordered list of text items (event
//! listings, help). Chat sinks decide how to lay these out.

use serde::{Deserialize, Serialize};

use crate::event::EventRecord;
use crate::tags::split_tag_for_display;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub key: String,
    pub value: String,
}

impl Annotation {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "entries", rename_all = "snake_case")]
pub enum PayloadBody {
    Annotations(Vec<Annotation>),
    Items(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub title: String,
    pub body: PayloadBody,
}

impl MessagePayload {
    /// Plain-text rendering, used as the notification fallback.
    pub fn fallback_text(&self) -> String {
        let mut out = self.title.clone();
        match &self.body {
            PayloadBody::Annotations(annotations) => {
                for a in annotations {
                    out.push_str(&format!("\n{}: {}", a.key, a.value));
                }
            }
            PayloadBody::Items(items) => {
                for item in items {
                    out.push('\n');
                    out.push_str(item);
                }
            }
        }
        out
    }
}

/// One display line for an entry.
pub fn render_event_line(event: &EventRecord, now: i64) -> String {
    let head = format!(
        "{} @ {} ({}) in {}",
        event.user_display(),
        event.absolute_time(),
        event.relative_time(now),
        event.channel_display()
    );

    if event.tags.is_empty() {
        format!("{}:\n{}", head, event.text)
    } else {
        format!("{} w/ [{}]:\n{}", head, event.tags.join(" "), event.text)
    }
}

/// Acknowledgment posted to the channel when an entry is recorded.
pub fn render_ack(event: &EventRecord) -> MessagePayload {
    let mut annotations = Vec::with_capacity(event.tags.len() + 1);
    annotations.push(Annotation::new("user", event.user.clone()));
    for tag in &event.tags {
        let (key, value) = split_tag_for_display(tag);
        annotations.push(Annotation::new(key, value));
    }

    MessagePayload {
        title: event.text.clone(),
        body: PayloadBody::Annotations(annotations),
    }
}

/// Numbered listing of entries under `title`.
pub fn render_list(events: &[EventRecord], title: impl Into<String>, now: i64) -> MessagePayload {
    let items = events
        .iter()
        .enumerate()
        .map(|(i, e)| format!("{}) {}", i + 1, render_event_line(e, now)))
        .collect();

    MessagePayload {
        title: title.into(),
        body: PayloadBody::Items(items),
    }
}

pub fn render_help() -> MessagePayload {
    let items = vec![
        "*/opslog <entry> [#<tag>:<value>]...*\n\tCreate a new opslog entry, optionally adding tags",
        "*/opslog deletelast*\n\tDelete the previous opslog entry created by you",
        "*/opslog show [x]*\n\tList the previous x opslog entries in the channel it's called from, defaults to 10",
        "*/opslog showall [x]*\n\tList the previous x opslog entries globally, defaults to 10",
        "*/opslog search <entry>*\n\tSearch for opslog entries in the channel it's called from (not yet available)",
        "*/opslog searchall <entry>*\n\tSearch for opslog entries globally (not yet available)",
    ];

    MessagePayload {
        title: "*help*".to_string(),
        body: PayloadBody::Items(items.into_iter().map(String::from).collect()),
    }
}
