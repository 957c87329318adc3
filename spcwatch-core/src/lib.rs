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

//! Spcwatch Core
//!
//! Fundamental data structures for the process-monitoring pipeline:
//! parameter specifications, sensor readings, alert records, configuration,
//! and the shared error type.

pub mod alert;
pub mod config;
pub mod error;
pub mod parameter;
pub mod reading;

pub use alert::{Alert, AlertKind, AlertSeverity, YieldImpact};
pub use config::{MonitorConfig, DEFAULT_ANALYSIS_EVERY, DEFAULT_HISTORY_CAPACITY};
pub use error::{MonitorError, Result};
pub use parameter::{ParameterCatalog, ParameterSpec};
pub use reading::Reading;
