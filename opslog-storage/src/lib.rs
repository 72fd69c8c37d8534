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

//! Opslog Storage Layer
//!
//! ## Layout
//!
//! - **Partition key**: channel name
//! - **Sort key**: `occurred_at` (Unix seconds)
//! - **Secondary index**: user name
//!
//! ## Usage
//!
//! ```rust,ignore
//! use opslog_storage::{EventStore, MemoryEventStore};
//!
//! let store = MemoryEventStore::new();
//! store.put(record).await?;
//! let recent = store.query_by_channel("ops").await?;
//! ```

pub mod event_store;
pub mod file_store;

pub use event_store::{EventStore, MemoryEventStore};
pub use file_store::FileEventStore;
