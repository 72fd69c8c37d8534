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

//! Error taxonomy shared by every opslog crate.

use thiserror::Error;

/// Errors surfaced while recording or retrieving opslog entries.
///
/// Every variant is eventually rendered back to the invoking user, so the
/// payload strings are written to be read by a human.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OpslogError {
    /// Shared-secret token did not match the configured value.
    #[error("Invalid token.")]
    Auth,

    /// Request rejected before any write was attempted.
    #[error("{0}")]
    Validation(String),

    /// Lookup found nothing (e.g. deletelast with no prior entry).
    #[error("{0}")]
    NotFound(String),

    /// Underlying store failure, message kept verbatim.
    #[error("Store error: {0}")]
    Store(String),

    /// Chat or timeline sink failure, message kept verbatim.
    #[error("Slack error: {0}")]
    Sink(String),
}

impl OpslogError {
    pub fn validation(msg: impl Into<String>) -> Self {
        OpslogError::Validation(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        OpslogError::Store(msg.into())
    }

    pub fn sink(msg: impl Into<String>) -> Self {
        OpslogError::Sink(msg.into())
    }

    /// Short machine-friendly label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            OpslogError::Auth => "auth",
            OpslogError::Validation(_) => "validation",
            OpslogError::NotFound(_) => "not_found",
            OpslogError::Store(_) => "store",
            OpslogError::Sink(_) => "sink",
        }
    }
}

pub type Result<T> = std::result::Result<T, OpslogError>;
