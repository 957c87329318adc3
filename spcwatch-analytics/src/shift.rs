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

//! Windowed mean-shift detection.
//!
//! Compares the mean of the "recent" window (last 30 values) against a
//! "baseline" window (the 30 values before that), normalized by the baseline
//! window's sample standard deviation. A shift is flagged when the two means
//! differ by more than 1.5 baseline sigmas.
//!
//! Stateless: recomputed fresh from the rolling history on every analysis.

use serde::{Deserialize, Serialize};

use crate::capability::{mean, sample_std_dev};

/// Width of the recent and baseline windows.
pub const SHIFT_WINDOW: usize = 30;
/// Detection threshold in baseline sigmas.
pub const SHIFT_THRESHOLD_SIGMAS: f64 = 1.5;

/// Result of mean-shift analysis for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShiftOutcome {
    pub baseline_mean: f64,
    pub recent_mean: f64,
    /// `(recent_mean - baseline_mean) / baseline_std_dev`; 0 when the
    /// baseline window is degenerate.
    pub shift_in_sigmas: f64,
    pub detected: bool,
}

impl ShiftOutcome {
    fn none() -> Self {
        Self {
            baseline_mean: 0.0,
            recent_mean: 0.0,
            shift_in_sigmas: 0.0,
            detected: false,
        }
    }
}

/// Compares the recent window against the preceding baseline window.
///
/// Needs more than [`SHIFT_WINDOW`] values to form both windows; the
/// baseline window is truncated when fewer than `2 × SHIFT_WINDOW` values
/// exist. A baseline with zero variance cannot be tested and reports
/// not-detected.
pub fn detect_shift(values: &[f64]) -> ShiftOutcome {
    if values.len() <= SHIFT_WINDOW {
        return ShiftOutcome::none();
    }

    let recent_start = values.len() - SHIFT_WINDOW;
    let baseline_start = recent_start.saturating_sub(SHIFT_WINDOW);
    let baseline = &values[baseline_start..recent_start];
    let recent = &values[recent_start..];

    if baseline.len() < 2 {
        return ShiftOutcome::none();
    }

    let baseline_mean = mean(baseline);
    let recent_mean = mean(recent);
    let baseline_std = sample_std_dev(baseline);

    if baseline_std == 0.0 {
        return ShiftOutcome {
            baseline_mean,
            recent_mean,
            shift_in_sigmas: 0.0,
            detected: false,
        };
    }

    let shift_in_sigmas = (recent_mean - baseline_mean) / baseline_std;
    ShiftOutcome {
        baseline_mean,
        recent_mean,
        shift_in_sigmas,
        detected: shift_in_sigmas.abs() > SHIFT_THRESHOLD_SIGMAS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Baseline with unit sample standard deviation around `center`.
    fn noisy_baseline(center: f64) -> Vec<f64> {
        (0..SHIFT_WINDOW)
            .map(|i| center + if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect()
    }

    #[test]
    fn test_too_short_history() {
        assert!(!detect_shift(&vec![25.0; SHIFT_WINDOW]).detected);
        assert_eq!(detect_shift(&[]).shift_in_sigmas, 0.0);
    }

    #[test]
    fn test_no_shift_for_stationary_series() {
        let mut values = noisy_baseline(25.0);
        values.extend(noisy_baseline(25.0));
        let out = detect_shift(&values);
        assert!(!out.detected);
        assert!(out.shift_in_sigmas.abs() < 1e-9);
    }

    #[test]
    fn test_shift_boundary_at_one_point_five_sigma() {
        // Baseline sample std dev is slightly above 1 (n−1 denominator), so
        // compute the exact boundary from it.
        let baseline = noisy_baseline(25.0);
        let sigma = sample_std_dev(&baseline);

        // Exactly at the boundary: not detected (strict inequality).
        let mut values = baseline.clone();
        values.extend(vec![25.0 + 1.5 * sigma; SHIFT_WINDOW]);
        let at = detect_shift(&values);
        assert!((at.shift_in_sigmas - 1.5).abs() < 1e-9);
        assert!(!at.detected);

        // Strictly beyond: detected.
        let mut values = baseline.clone();
        values.extend(vec![25.0 + 1.6 * sigma; SHIFT_WINDOW]);
        assert!(detect_shift(&values).detected);
    }

    #[test]
    fn test_downward_shift_detected() {
        let mut values = noisy_baseline(25.0);
        values.extend(vec![20.0; SHIFT_WINDOW]);
        let out = detect_shift(&values);
        assert!(out.detected);
        assert!(out.shift_in_sigmas < 0.0);
    }

    #[test]
    fn test_degenerate_baseline_not_detected() {
        // Constant baseline: zero variance, no NaN, no detection.
        let mut values = vec![25.0; SHIFT_WINDOW];
        values.extend(vec![30.0; SHIFT_WINDOW]);
        let out = detect_shift(&values);
        assert!(!out.detected);
        assert_eq!(out.shift_in_sigmas, 0.0);
        assert!(out.shift_in_sigmas.is_finite());
    }

    #[test]
    fn test_truncated_baseline_window() {
        // 40 values: baseline window is the first 10, recent the last 30.
        let mut values = noisy_baseline(25.0)[..10].to_vec();
        values.extend(vec![35.0; SHIFT_WINDOW]);
        let out = detect_shift(&values);
        assert!(out.detected);
        assert_eq!(out.recent_mean, 35.0);
    }

    #[test]
    fn test_windows_use_only_recent_sixty() {
        // Old data far away must not affect the comparison.
        let mut values = vec![100.0; 50];
        values.extend(noisy_baseline(25.0));
        values.extend(noisy_baseline(25.0));
        assert!(!detect_shift(&values).detected);
    }
}
