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

//! Spcwatch Analytics
//!
//! The statistical monitoring pipeline: per-reading SPC evaluation and zone
//! classification, batch capability indices, run rules, and the stateful
//! drift detector (CUSUM, EWMA, linear trend, mean shift).
//!
//! Everything here is in-memory arithmetic over bounded windows; degenerate
//! statistics (zero sigma, zero denominators) produce defined neutral values
//! rather than NaN or infinity.

pub mod capability;
pub mod cusum;
pub mod drift;
pub mod ewma;
pub mod rules;
pub mod shift;
pub mod spc;
pub mod trend;

pub use capability::{summarize, CapabilitySummary};
pub use cusum::{CusumOutcome, CusumState, CUSUM_DECISION_INTERVAL, CUSUM_SLACK};
pub use drift::{DriftDetector, DriftReport, DriftStatus, DriftVerdict, ParameterDrift};
pub use ewma::{EwmaOutcome, EwmaState, EWMA_CONTROL_WIDTH, EWMA_LAMBDA};
pub use rules::{check_run_rules, RunRule, RunRuleViolation};
pub use shift::{detect_shift, ShiftOutcome};
pub use spc::{evaluate, evaluate_value, SpcResult, SpcStatus, Zone};
pub use trend::{analyze_trend, TrendOutcome};
