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

//! Stateful drift detection over the rolling history.
//!
//! One [`DriftDetector`] instance owns the per-parameter CUSUM/EWMA state for
//! a monitored line; construct one per line at startup and inject it into
//! the scheduler rather than holding process-wide singletons.
//!
//! The CUSUM/EWMA sigma is derived from the control-limit width
//! (`(ucl − lcl) / 6`), not estimated from the sample. This conflates limit
//! width with process sigma and may understate true variability, but the
//! alarm thresholds are calibrated against it, so it is preserved as is.
//!
//! Accumulation is gated on the newest reading id: re-running detection over
//! an unchanged history (the on-demand query path) returns the same report
//! without advancing any statistic.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use spcwatch_core::{ParameterCatalog, Reading};

use crate::cusum::{CusumOutcome, CusumState};
use crate::ewma::{EwmaOutcome, EwmaState};
use crate::shift::{detect_shift, ShiftOutcome};
use crate::trend::{analyze_trend, TrendOutcome};

/// Minimum history length before any drift analysis runs.
pub const DRIFT_MIN_SAMPLES: usize = 20;

/// Whether the detector had enough history to analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftStatus {
    InsufficientData,
    Analyzed,
}

/// Per-parameter drift verdict, worst-of across the four sub-analyses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftVerdict {
    Normal,
    Warning,
    Critical,
}

/// Drift analysis of one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDrift {
    /// CUSUM outcome; absent until the baseline is seeded.
    pub cusum: Option<CusumOutcome>,
    /// EWMA outcome; absent only for degenerate sigma.
    pub ewma: Option<EwmaOutcome>,
    pub trend: TrendOutcome,
    pub shift: ShiftOutcome,
    pub verdict: DriftVerdict,
}

/// Full drift report over the current history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub status: DriftStatus,
    pub parameters: HashMap<String, ParameterDrift>,
}

impl DriftReport {
    fn insufficient() -> Self {
        Self {
            status: DriftStatus::InsufficientData,
            parameters: HashMap::new(),
        }
    }

    /// Worst verdict across all parameters; `Normal` when empty.
    pub fn worst_verdict(&self) -> DriftVerdict {
        self.parameters
            .values()
            .map(|p| p.verdict)
            .max()
            .unwrap_or(DriftVerdict::Normal)
    }
}

/// Persistent state for one parameter.
#[derive(Debug, Clone)]
struct DriftState {
    cusum: CusumState,
    ewma: EwmaState,
    /// Newest reading id already accumulated; guards on-demand re-runs.
    last_reading_id: Option<u64>,
    last_cusum: Option<CusumOutcome>,
    last_ewma: Option<EwmaOutcome>,
}

/// Stateful detector owning CUSUM/EWMA state for every catalog parameter.
#[derive(Debug, Default)]
pub struct DriftDetector {
    states: HashMap<String, DriftState>,
}

impl DriftDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyzes the full current history.
    ///
    /// Returns `InsufficientData` with no per-parameter results when fewer
    /// than [`DRIFT_MIN_SAMPLES`] readings exist. Idempotent for an
    /// unchanged history: statistics advance at most once per reading id.
    pub fn detect(&mut self, history: &[Reading], catalog: &ParameterCatalog) -> DriftReport {
        if history.len() < DRIFT_MIN_SAMPLES {
            return DriftReport::insufficient();
        }
        let newest_id = match history.last() {
            Some(r) => r.id,
            None => return DriftReport::insufficient(),
        };

        let mut parameters = HashMap::with_capacity(catalog.len());
        for spec in catalog.specs() {
            let series: Vec<f64> = history
                .iter()
                .filter_map(|r| r.value(&spec.name))
                .filter(|v| v.is_finite())
                .collect();
            if series.len() < DRIFT_MIN_SAMPLES {
                continue;
            }

            let sigma = spec.control_sigma();
            let state = self
                .states
                .entry(spec.name.clone())
                .or_insert_with(|| DriftState {
                    cusum: CusumState::default(),
                    ewma: EwmaState::new(spec.target, sigma),
                    last_reading_id: None,
                    last_cusum: None,
                    last_ewma: None,
                });

            if state.cusum.baseline.is_none() {
                state.cusum.seed_baseline(&series);
                if let Some(baseline) = state.cusum.baseline {
                    debug!(parameter = %spec.name, baseline, "seeded CUSUM baseline");
                }
            }

            // Accumulate at most once per reading.
            if state.last_reading_id != Some(newest_id) {
                if let Some(&latest) = series.last() {
                    state.last_cusum = state.cusum.update(latest, sigma);
                    state.last_ewma = if sigma > 0.0 {
                        Some(state.ewma.update(latest))
                    } else {
                        None
                    };
                }
                state.last_reading_id = Some(newest_id);
            }

            let cusum = state.last_cusum;
            let ewma = state.last_ewma;
            let trend = analyze_trend(&series, spec);
            let shift = detect_shift(&series);

            let cusum_alarm = cusum.is_some_and(|c| c.alarm);
            let cusum_warning = cusum.is_some_and(|c| c.warning);
            let ewma_alarm = ewma.is_some_and(|e| e.alarm);
            let ewma_warning = ewma.is_some_and(|e| e.warning);

            let verdict = if cusum_alarm || ewma_alarm || shift.detected {
                DriftVerdict::Critical
            } else if trend.significant || cusum_warning || ewma_warning {
                DriftVerdict::Warning
            } else {
                DriftVerdict::Normal
            };

            parameters.insert(
                spec.name.clone(),
                ParameterDrift {
                    cusum,
                    ewma,
                    trend,
                    shift,
                    verdict,
                },
            );
        }

        DriftReport {
            status: DriftStatus::Analyzed,
            parameters,
        }
    }

    /// Clears CUSUM/EWMA state for one parameter, forcing re-seeding on the
    /// next sufficient-data analysis. Used after a deliberate process
    /// adjustment so the stale baseline cannot raise false alarms.
    pub fn reset(&mut self, parameter: &str) -> bool {
        self.states.remove(parameter).is_some()
    }

    /// Clears state for every parameter.
    pub fn reset_all(&mut self) {
        self.states.clear();
    }
}
