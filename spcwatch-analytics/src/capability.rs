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

//! Batch process-capability summary over a window of values.
//!
//! Uses the sample standard deviation (n−1 denominator). With a single
//! stream of individual values there are no rational subgroups, so `ppk`
//! equals `cpk` here.
//!
//! Every division is guarded: zero sigma yields zero indices, never NaN.

use serde::{Deserialize, Serialize};
use spcwatch_core::ParameterSpec;

/// Capability summary for one parameter over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySummary {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    /// Potential capability `(usl - lsl) / 6σ`.
    pub cp: f64,
    /// Actual capability `min((usl - mean)/3σ, (mean - lsl)/3σ)`.
    pub cpk: f64,
    /// Performance index; equals cpk for individual-value streams.
    pub ppk: f64,
    /// Percentage of window values outside the control limits.
    pub out_of_control_percent: f64,
    /// Percentage of window values outside the spec limits.
    pub out_of_spec_percent: f64,
}

impl CapabilitySummary {
    fn empty() -> Self {
        Self {
            mean: 0.0,
            std_dev: 0.0,
            min: 0.0,
            max: 0.0,
            range: 0.0,
            cp: 0.0,
            cpk: 0.0,
            ppk: 0.0,
            out_of_control_percent: 0.0,
            out_of_spec_percent: 0.0,
        }
    }
}

/// Sample mean; 0 for an empty slice.
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n−1 denominator); 0 when fewer than 2 values.
pub(crate) fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Summarizes a window of values against a parameter spec.
pub fn summarize(values: &[f64], spec: &ParameterSpec) -> CapabilitySummary {
    if values.is_empty() {
        return CapabilitySummary::empty();
    }

    let mean = mean(values);
    let std_dev = sample_std_dev(values);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let (cp, cpk) = if std_dev > 0.0 {
        let cp = (spec.usl - spec.lsl) / (6.0 * std_dev);
        let cpu = (spec.usl - mean) / (3.0 * std_dev);
        let cpl = (mean - spec.lsl) / (3.0 * std_dev);
        (cp, cpu.min(cpl))
    } else {
        (0.0, 0.0)
    };

    let n = values.len() as f64;
    let out_of_control = values
        .iter()
        .filter(|&&v| v > spec.ucl || v < spec.lcl)
        .count() as f64;
    let out_of_spec = values
        .iter()
        .filter(|&&v| v > spec.usl || v < spec.lsl)
        .count() as f64;

    CapabilitySummary {
        mean,
        std_dev,
        min,
        max,
        range: max - min,
        cp,
        cpk,
        ppk: cpk,
        out_of_control_percent: out_of_control / n * 100.0,
        out_of_spec_percent: out_of_spec / n * 100.0,
    }
}
