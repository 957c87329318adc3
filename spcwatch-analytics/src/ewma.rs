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

//! EWMA control chart for detecting small sustained drift.
//!
//! The smoothed statistic `ewma = λ·v + (1−λ)·ewma` is seeded at the process
//! target and compared against asymptotic control limits
//! `target ± L·σ·sqrt(λ/(2−λ))`. Unlike CUSUM there is no reset on alarm;
//! the statistic keeps tracking the process, which keeps the chart sensitive
//! to small shifts that persist.
//!
//! # Reference
//!
//! Roberts, S.W. (1959). "Control chart tests based on geometric moving
//! averages", *Technometrics* 1(3).

use serde::{Deserialize, Serialize};

/// Smoothing weight λ.
pub const EWMA_LAMBDA: f64 = 0.2;
/// Control-limit width multiplier L.
pub const EWMA_CONTROL_WIDTH: f64 = 3.0;
/// Warning band as a fraction of L.
pub const EWMA_WARNING_FRACTION: f64 = 0.7;

/// Persistent EWMA state for one parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EwmaState {
    /// Current smoothed value, seeded at target.
    pub ewma: f64,
    /// Process variance σ², from the control-limit sigma.
    pub variance: f64,
    target: f64,
}

/// EWMA evaluation of one new value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EwmaOutcome {
    pub ewma: f64,
    pub ucl: f64,
    pub lcl: f64,
    pub alarm: bool,
    pub warning: bool,
}

impl EwmaState {
    /// Seeds the statistic at target with variance σ².
    pub fn new(target: f64, sigma: f64) -> Self {
        Self {
            ewma: target,
            variance: sigma * sigma,
            target,
        }
    }

    /// Asymptotic control-limit half-width `L·σ·sqrt(λ/(2−λ))`.
    fn half_width(&self) -> f64 {
        EWMA_CONTROL_WIDTH * self.variance.sqrt() * (EWMA_LAMBDA / (2.0 - EWMA_LAMBDA)).sqrt()
    }

    /// Smooths one value in and evaluates the control limits.
    ///
    /// Non-finite values leave the statistic untouched and report no alarm.
    pub fn update(&mut self, value: f64) -> EwmaOutcome {
        if value.is_finite() {
            self.ewma = EWMA_LAMBDA * value + (1.0 - EWMA_LAMBDA) * self.ewma;
        }

        let half = self.half_width();
        let ucl = self.target + half;
        let lcl = self.target - half;
        let warning_half = EWMA_WARNING_FRACTION * half;

        let alarm = self.ewma > ucl || self.ewma < lcl;
        let warning = !alarm
            && (self.ewma > self.target + warning_half || self.ewma < self.target - warning_half);

        EwmaOutcome {
            ewma: self.ewma,
            ucl,
            lcl,
            alarm,
            warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_at_target() {
        let state = EwmaState::new(25.0, 0.667);
        assert_eq!(state.ewma, 25.0);
        assert!((state.variance - 0.667 * 0.667).abs() < 1e-12);
    }

    #[test]
    fn test_converges_to_constant_input_without_alarm() {
        // Input equal to target: ewma stays at target, never alarms.
        let mut state = EwmaState::new(25.0, 1.0);
        for _ in 0..200 {
            let out = state.update(25.0);
            assert!(!out.alarm);
            assert!(!out.warning);
        }
        assert!((state.ewma - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_converges_geometrically_to_shifted_input() {
        let mut state = EwmaState::new(0.0, 10.0);
        for _ in 0..100 {
            state.update(5.0);
        }
        assert!((state.ewma - 5.0).abs() < 1e-6, "ewma must converge to input");
    }

    #[test]
    fn test_sustained_shift_alarms() {
        // σ = 1 → half-width = 3·sqrt(0.2/1.8) = 1.0; a sustained +2σ shift
        // pushes the smoothed value through the band.
        let mut state = EwmaState::new(25.0, 1.0);
        let mut alarmed = false;
        for _ in 0..30 {
            if state.update(27.0).alarm {
                alarmed = true;
                break;
            }
        }
        assert!(alarmed);
    }

    #[test]
    fn test_warning_band_inside_alarm_band() {
        // Drive the statistic into (0.7·half, half): with σ=1 that band is
        // ewma ∈ (25.7, 26.0). A constant 25.9 input converges to 25.9.
        let mut state = EwmaState::new(25.0, 1.0);
        let mut last = state.update(25.9);
        for _ in 0..100 {
            last = state.update(25.9);
        }
        assert!(last.warning);
        assert!(!last.alarm);
    }

    #[test]
    fn test_non_finite_input_ignored() {
        let mut state = EwmaState::new(25.0, 1.0);
        state.update(26.0);
        let before = state.ewma;
        let out = state.update(f64::NAN);
        assert_eq!(state.ewma, before);
        assert!(!out.alarm);
    }

    #[test]
    fn test_asymptotic_limits() {
        let state = EwmaState::new(10.0, 3.0);
        let expected_half = 3.0 * 3.0 * (0.2_f64 / 1.8).sqrt();
        let mut state = state;
        let out = state.update(10.0);
        assert!((out.ucl - (10.0 + expected_half)).abs() < 1e-9);
        assert!((out.lcl - (10.0 - expected_half)).abs() < 1e-9);
    }
}
