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

//! Linear-trend analysis over the recent window.
//!
//! Ordinary least-squares regression of the last [`TREND_WINDOW`] values
//! against their index. A trend is significant when the drift projected over
//! 100 readings exceeds the process sigma and the fit explains enough of the
//! variance (`r² > 0.3`). Given a significant trend, the number of readings
//! until the relevant control limit is crossed is projected from the slope.

use serde::{Deserialize, Serialize};
use spcwatch_core::ParameterSpec;

/// Values inspected by the regression.
pub const TREND_WINDOW: usize = 50;
/// Minimum samples for a meaningful fit.
pub const TREND_MIN_SAMPLES: usize = 10;
/// Minimum r² for significance.
pub const TREND_MIN_R_SQUARED: f64 = 0.3;
/// Horizon, in readings, over which slope is projected for the
/// significance test.
pub const TREND_PROJECTION_HORIZON: f64 = 100.0;

/// Result of trend analysis for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendOutcome {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Drift projected over [`TREND_PROJECTION_HORIZON`] readings.
    pub projected_drift: f64,
    pub significant: bool,
    /// Readings until the trend crosses the relevant control limit;
    /// populated only for significant trends, clamped to ≥ 0.
    pub readings_to_ooc: Option<f64>,
}

impl TrendOutcome {
    fn insignificant() -> Self {
        Self {
            slope: 0.0,
            intercept: 0.0,
            r_squared: 0.0,
            projected_drift: 0.0,
            significant: false,
            readings_to_ooc: None,
        }
    }
}

/// Fits the last [`TREND_WINDOW`] values and classifies the trend.
///
/// Fewer than [`TREND_MIN_SAMPLES`] values report `significant = false`
/// without error.
pub fn analyze_trend(values: &[f64], spec: &ParameterSpec) -> TrendOutcome {
    let start = values.len().saturating_sub(TREND_WINDOW);
    let window = &values[start..];
    let n = window.len();
    if n < TREND_MIN_SAMPLES {
        return TrendOutcome::insignificant();
    }

    // OLS of value against index 0..n.
    let nf = n as f64;
    let mean_x = (nf - 1.0) / 2.0;
    let mean_y = window.iter().sum::<f64>() / nf;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (i, &y) in window.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }
    if sxx == 0.0 {
        return TrendOutcome::insignificant();
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (i, &y) in window.iter().enumerate() {
        let fitted = intercept + slope * i as f64;
        ss_res += (y - fitted) * (y - fitted);
        ss_tot += (y - mean_y) * (y - mean_y);
    }
    let r_squared = if ss_tot == 0.0 {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    };

    let projected_drift = slope * TREND_PROJECTION_HORIZON;
    let sigma = spec.control_sigma();
    let significant = projected_drift.abs() > sigma && r_squared > TREND_MIN_R_SQUARED;

    let readings_to_ooc = if significant && slope != 0.0 {
        let current = *window.last().unwrap_or(&mean_y);
        let limit = if slope > 0.0 { spec.ucl } else { spec.lcl };
        Some(((limit - current) / slope).max(0.0))
    } else {
        None
    };

    TrendOutcome {
        slope,
        intercept,
        r_squared,
        projected_drift,
        significant,
        readings_to_ooc,
    }
}
