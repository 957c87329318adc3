// Copyright 2025 Spcwatch Contributors (https://github.com/spcwatch)
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

//! Monitoring service configuration.
//!
//! Everything has a working default so the service runs with zero config; a
//! TOML file can override the cadence and supply a parameter catalog.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};
use crate::parameter::{ParameterCatalog, ParameterSpec};

/// Default rolling-history capacity in readings.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;
/// Drift analysis runs every this many ticks.
pub const DEFAULT_ANALYSIS_EVERY: u64 = 10;
/// Default tick period.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 2000;
/// Default per-(kind, parameter) alert cooldown.
pub const DEFAULT_ALERT_COOLDOWN_SECS: u64 = 300;
/// Default number of synthetic ticks replayed at startup.
pub const DEFAULT_BACKFILL_TICKS: usize = 200;

/// Monitoring scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Manufacturing line identifier stamped on synthetic readings.
    pub line: String,
    /// Tick period in milliseconds.
    pub tick_interval_ms: u64,
    /// Rolling history capacity.
    pub history_capacity: usize,
    /// Run drift analysis every Nth tick.
    pub analysis_every: u64,
    /// Alert dedup cooldown in seconds.
    pub alert_cooldown_secs: u64,
    /// Synthetic ticks replayed through the pipeline before live ticking.
    pub backfill_ticks: usize,
    /// Broadcast channel capacity for subscribers.
    pub channel_capacity: usize,
    /// Parameter catalog; empty means use the built-in catalog.
    #[serde(rename = "parameter")]
    pub parameters: Vec<ParameterSpec>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            line: "line-1".to_string(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            analysis_every: DEFAULT_ANALYSIS_EVERY,
            alert_cooldown_secs: DEFAULT_ALERT_COOLDOWN_SECS,
            backfill_ticks: DEFAULT_BACKFILL_TICKS,
            channel_capacity: 256,
            parameters: Vec::new(),
        }
    }
}

impl MonitorConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| MonitorError::Config(format!("read {}: {e}", path.as_ref().display())))?;
        let config: Self =
            toml::from_str(&raw).map_err(|e| MonitorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates cadence values and every configured parameter spec.
    pub fn validate(&self) -> Result<()> {
        if self.history_capacity == 0 {
            return Err(MonitorError::Config(
                "history_capacity must be positive".to_string(),
            ));
        }
        if self.analysis_every == 0 {
            return Err(MonitorError::Config(
                "analysis_every must be positive".to_string(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(MonitorError::Config(
                "tick_interval_ms must be positive".to_string(),
            ));
        }
        for spec in &self.parameters {
            spec.validate()?;
        }
        Ok(())
    }

    /// The configured catalog, or the built-in one when none was supplied.
    pub fn catalog(&self) -> Result<ParameterCatalog> {
        if self.parameters.is_empty() {
            Ok(ParameterCatalog::builtin())
        } else {
            ParameterCatalog::new(self.parameters.clone())
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn alert_cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.alert_cooldown_secs as i64)
    }
}
