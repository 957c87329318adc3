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

//! Error types shared across the monitoring pipeline.
//!
//! Analysis preconditions (short history, unseeded baselines) are *statuses*,
//! not errors; only caller mistakes and infrastructure failures surface here.

use thiserror::Error;
use uuid::Uuid;

/// Monitoring pipeline errors.
#[derive(Debug, Clone, Error)]
pub enum MonitorError {
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("unknown alert id: {0}")]
    UnknownAlert(Uuid),

    #[error("invalid parameter spec for '{name}': {reason}")]
    InvalidSpec { name: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("reading generator failed: {0}")]
    Generator(String),
}

/// Result type for spcwatch operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
