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

//! Opslog Core
//!
//! Event record, inline tag grammar, chat payload rendering and the shared
//! error type.

pub mod config;
pub mod error;
pub mod event;
pub mod render;
pub mod tags;
pub mod time;

pub use config::{
    ScanPolicy, ScanPolicyError, DEFAULT_GROWTH_FACTOR, DEFAULT_INITIAL_WINDOW_SECS,
    DEFAULT_MAX_WINDOW_SECS,
};
pub use error::{OpslogError, Result};
pub use event::{EventKey, EventRecord};
pub use render::{
    render_ack, render_event_line, render_help, render_list, Annotation, MessagePayload,
    PayloadBody,
};
pub use tags::{extract_tags, split_tag_for_display, strip_tags, TAG_MARKER};
pub use time::{absolute_time, relative_time, Clock, FixedClock, SystemClock};
