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

//! Inline tag grammar
//!
//! Entries carry annotations of the form `#key:value` anywhere in their text.
//! Keys and values are ASCII word characters (`[A-Za-z0-9_]`). Tags are
//! stored without the marker, in order of appearance, duplicates included.

use regex::Regex;
use std::sync::LazyLock;

/// Character that introduces an inline tag.
pub const TAG_MARKER: char = '#';

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#[A-Za-z0-9_]+:[A-Za-z0-9_]+").expect("tag pattern is a valid regex")
});

/// Collect every `#key:value` annotation in `text`, marker stripped.
pub fn extract_tags(text: &str) -> Vec<String> {
    TAG_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().trim_start_matches(TAG_MARKER).to_string())
        .collect()
}

/// Remove every `#tag` occurrence for the given tags and trim the result.
///
/// `tags` must come from [`extract_tags`] on the same text. Longer tags are
/// removed first so that `a:b` cannot eat the front of `a:bc`. The result
/// never contains an annotation, including ones formed by joining the text
/// on either side of a removed tag.
pub fn strip_tags(text: &str, tags: &[String]) -> String {
    let mut ordered: Vec<&str> = tags.iter().map(String::as_str).collect();
    ordered.sort_by(|a, b| b.len().cmp(&a.len()));
    ordered.dedup();

    let mut stripped = text.to_string();
    for tag in ordered {
        let marked = format!("{}{}", TAG_MARKER, tag);
        stripped = stripped.replace(&marked, "");
    }

    // `#x#a:b:y` becomes `#x:y` once `#a:b` is gone
    while TAG_PATTERN.is_match(&stripped) {
        stripped = TAG_PATTERN.replace_all(&stripped, "").into_owned();
    }
    stripped.trim().to_string()
}

/// Split a stored tag into `(key, value)` on the first colon.
///
/// The value keeps any further colons. A tag without a colon yields an empty
/// value.
pub fn split_tag_for_display(tag: &str) -> (&str, &str) {
    tag.split_once(':').unwrap_or((tag, ""))
}
