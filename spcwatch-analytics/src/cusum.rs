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

//! Tabular two-sided CUSUM for detecting small sustained mean shifts.
//!
//! Standardized deviations accumulate into an upper and a lower statistic:
//!
//! ```text
//! z      = (v - baseline) / sigma
//! plus   = max(0, plus + z - k)
//! minus  = max(0, minus - z - k)
//! ```
//!
//! An alarm fires when either statistic exceeds the decision interval `h`.
//! On alarm both statistics reset to zero: a persistent shift is reported
//! once, then must re-accumulate past `h` before it is reported again. This
//! report-once policy is deliberate.
//!
//! The baseline is the mean of the first 20 samples seen for the parameter
//! and is fixed until the state is reset.
//!
//! # Reference
//!
//! Page, E.S. (1954). "Continuous inspection schemes", *Biometrika* 41(1-2).

use serde::{Deserialize, Serialize};

use crate::capability::mean;

/// Reference value (allowance) `k`, tuned to detect a 1-sigma shift.
pub const CUSUM_SLACK: f64 = 0.5;
/// Decision interval `h`.
pub const CUSUM_DECISION_INTERVAL: f64 = 5.0;
/// Warning threshold as a fraction of `h`.
pub const CUSUM_WARNING_FRACTION: f64 = 0.7;
/// Samples used to establish the baseline.
pub const CUSUM_BASELINE_SAMPLES: usize = 20;

/// Persistent CUSUM state for one parameter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CusumState {
    /// Upper cumulative sum; non-negative.
    pub plus: f64,
    /// Lower cumulative sum; non-negative.
    pub minus: f64,
    /// Mean of the first [`CUSUM_BASELINE_SAMPLES`] values; set once.
    pub baseline: Option<f64>,
}

/// CUSUM evaluation of one new value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CusumOutcome {
    /// Upper statistic after the update (before any alarm reset).
    pub plus: f64,
    /// Lower statistic after the update (before any alarm reset).
    pub minus: f64,
    pub baseline: f64,
    pub alarm: bool,
    pub warning: bool,
}

impl CusumState {
    /// Fixes the baseline from the earliest samples; no-op once set.
    pub fn seed_baseline(&mut self, values: &[f64]) {
        if self.baseline.is_none() && values.len() >= CUSUM_BASELINE_SAMPLES {
            self.baseline = Some(mean(&values[..CUSUM_BASELINE_SAMPLES]));
        }
    }

    /// Accumulates one value. Returns `None` until the baseline is seeded or
    /// when `sigma` is not positive.
    pub fn update(&mut self, value: f64, sigma: f64) -> Option<CusumOutcome> {
        let baseline = self.baseline?;
        if sigma <= 0.0 || !value.is_finite() {
            return None;
        }

        let z = (value - baseline) / sigma;
        self.plus = (self.plus + z - CUSUM_SLACK).max(0.0);
        self.minus = (self.minus - z - CUSUM_SLACK).max(0.0);

        let alarm = self.plus > CUSUM_DECISION_INTERVAL || self.minus > CUSUM_DECISION_INTERVAL;
        let warning_level = CUSUM_WARNING_FRACTION * CUSUM_DECISION_INTERVAL;
        let warning = !alarm && (self.plus > warning_level || self.minus > warning_level);

        let outcome = CusumOutcome {
            plus: self.plus,
            minus: self.minus,
            baseline,
            alarm,
            warning,
        };

        if alarm {
            // Report once, then re-accumulate.
            self.plus = 0.0;
            self.minus = 0.0;
        }

        Some(outcome)
    }

    /// Clears all state, forcing a fresh baseline on next seeding.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
