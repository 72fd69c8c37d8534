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

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// First lookback window for global queries (~22 hours).
pub const DEFAULT_INITIAL_WINDOW_SECS: i64 = 79_200;

/// Lookback beyond which history is not worth scanning (~4.47 years).
pub const DEFAULT_MAX_WINDOW_SECS: i64 = 140_976_000;

pub const DEFAULT_GROWTH_FACTOR: i64 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanPolicyError {
    #[error("initial_window_secs must be positive (got {0})")]
    InitialWindow(i64),

    #[error("growth_factor must be at least 2 (got {0})")]
    GrowthFactor(i64),

    #[error("max_window_secs ({max}) must not be below initial_window_secs ({initial})")]
    MaxWindow { initial: i64, max: i64 },
}

/// Widening-window policy for the global "latest N" scan.
///
/// The window starts at `initial_window_secs`, is multiplied by
/// `growth_factor` after each short scan, and stops widening once it exceeds
/// `max_window_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPolicy {
    #[serde(default = "default_initial_window")]
    pub initial_window_secs: i64,

    #[serde(default = "default_growth_factor")]
    pub growth_factor: i64,

    #[serde(default = "default_max_window")]
    pub max_window_secs: i64,
}

fn default_initial_window() -> i64 {
    DEFAULT_INITIAL_WINDOW_SECS
}

fn default_growth_factor() -> i64 {
    DEFAULT_GROWTH_FACTOR
}

fn default_max_window() -> i64 {
    DEFAULT_MAX_WINDOW_SECS
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            initial_window_secs: DEFAULT_INITIAL_WINDOW_SECS,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            max_window_secs: DEFAULT_MAX_WINDOW_SECS,
        }
    }
}

impl ScanPolicy {
    /// Create a validated policy with custom bounds.
    pub fn new(
        initial_window_secs: i64,
        growth_factor: i64,
        max_window_secs: i64,
    ) -> Result<Self, ScanPolicyError> {
        let policy = Self {
            initial_window_secs,
            growth_factor,
            max_window_secs,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), ScanPolicyError> {
        if self.initial_window_secs <= 0 {
            return Err(ScanPolicyError::InitialWindow(self.initial_window_secs));
        }
        if self.growth_factor < 2 {
            return Err(ScanPolicyError::GrowthFactor(self.growth_factor));
        }
        if self.max_window_secs < self.initial_window_secs {
            return Err(ScanPolicyError::MaxWindow {
                initial: self.initial_window_secs,
                max: self.max_window_secs,
            });
        }
        Ok(())
    }

    /// True once the window has grown past the cap (or saturated).
    pub fn exhausted(&self, window_secs: i64) -> bool {
        window_secs > self.max_window_secs || window_secs == i64::MAX
    }

    pub fn widen(&self, window_secs: i64) -> i64 {
        window_secs.saturating_mul(self.growth_factor)
    }

    /// Every window the scan would try, in order, if it never found enough.
    #[cfg(test)]
    pub(crate) fn windows(&self) -> Vec<i64> {
        let mut windows = vec![self.initial_window_secs];
        let mut window = self.initial_window_secs;
        while !self.exhausted(window) {
            window = self.widen(window);
            windows.push(window);
        }
        windows
    }
}
