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

use opslog_core::EventRecord;
use std::cmp::Reverse;

/// Order records newest first and keep at most `limit`.
///
/// The sort is stable: records sharing an `occurred_at` stay in the order the
/// store returned them.
pub fn newest_first(mut records: Vec<EventRecord>, limit: usize) -> Vec<EventRecord> {
    records.sort_by_key(|r| Reverse(r.occurred_at));
    records.truncate(limit);
    records
}
