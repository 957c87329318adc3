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

//! Alert synthesis, deduplication, and the alert log.
//!
//! Candidates are derived per parameter from the SPC and drift results. A
//! cooldown map keyed by `(kind, parameter)` suppresses re-emission of the
//! same condition within the cooldown window; suppressed candidates are
//! dropped silently. Cooldown cardinality is bounded by kinds × parameters,
//! so the map never needs eviction.
//!
//! All time arithmetic uses reading timestamps, not wall clock, so replayed
//! or backfilled streams dedup correctly.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use spcwatch_analytics::{DriftReport, SpcResult};
use spcwatch_core::{Alert, AlertKind, MonitorError, ParameterCatalog, Reading, Result};

/// Stateful alert synthesizer and log.
#[derive(Debug)]
pub struct AlertEngine {
    cooldown: Duration,
    last_fired: HashMap<(AlertKind, String), DateTime<Utc>>,
    log: Vec<Alert>,
}

impl AlertEngine {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_fired: HashMap::new(),
            log: Vec::new(),
        }
    }

    /// Evaluates alert conditions for one reading and appends any emitted
    /// alerts to the log.
    ///
    /// `drift` is present only on analysis ticks; SPC-driven kinds are
    /// checked every tick. `current_yield` feeds the impact projection.
    pub fn check_for_alerts(
        &mut self,
        reading: &Reading,
        spc: &HashMap<String, SpcResult>,
        drift: Option<&DriftReport>,
        catalog: &ParameterCatalog,
        current_yield: f64,
    ) -> Vec<Alert> {
        let mut emitted = Vec::new();

        for spec in catalog.specs() {
            let parameter = spec.name.as_str();

            if let Some(result) = spc.get(parameter) {
                if result.out_of_spec {
                    self.emit(
                        AlertKind::OutOfSpec,
                        parameter,
                        reading,
                        format!(
                            "{parameter} {value:.2} {unit} outside specification limits [{lsl}, {usl}]",
                            value = result.value,
                            unit = spec.unit,
                            lsl = spec.lsl,
                            usl = spec.usl,
                        ),
                        current_yield,
                        &mut emitted,
                    );
                } else if result.out_of_control {
                    self.emit(
                        AlertKind::OutOfControl,
                        parameter,
                        reading,
                        format!(
                            "{parameter} {value:.2} {unit} outside control limits [{lcl}, {ucl}]",
                            value = result.value,
                            unit = spec.unit,
                            lcl = spec.lcl,
                            ucl = spec.ucl,
                        ),
                        current_yield,
                        &mut emitted,
                    );
                }
            }

            let Some(param_drift) = drift.and_then(|d| d.parameters.get(parameter)) else {
                continue;
            };

            if let Some(c) = param_drift.cusum.filter(|c| c.alarm) {
                self.emit(
                    AlertKind::CusumDrift,
                    parameter,
                    reading,
                    format!(
                        "{parameter} CUSUM alarm (S+={:.2}, S-={:.2}, baseline {:.2})",
                        c.plus, c.minus, c.baseline
                    ),
                    current_yield,
                    &mut emitted,
                );
            }
            if let Some(e) = param_drift.ewma.filter(|e| e.alarm) {
                self.emit(
                    AlertKind::EwmaDrift,
                    parameter,
                    reading,
                    format!(
                        "{parameter} EWMA {:.2} outside [{:.2}, {:.2}]",
                        e.ewma, e.lcl, e.ucl
                    ),
                    current_yield,
                    &mut emitted,
                );
            }
            if param_drift.trend.significant {
                self.emit(
                    AlertKind::Trend,
                    parameter,
                    reading,
                    format!(
                        "{parameter} trending at {:+.3} {unit}/reading (r²={:.2})",
                        param_drift.trend.slope,
                        param_drift.trend.r_squared,
                        unit = spec.unit,
                    ),
                    current_yield,
                    &mut emitted,
                );
            }
            if param_drift.shift.detected {
                self.emit(
                    AlertKind::ProcessShift,
                    parameter,
                    reading,
                    format!(
                        "{parameter} mean shifted {:+.2}σ ({:.2} → {:.2})",
                        param_drift.shift.shift_in_sigmas,
                        param_drift.shift.baseline_mean,
                        param_drift.shift.recent_mean
                    ),
                    current_yield,
                    &mut emitted,
                );
            }
        }

        emitted
    }

    fn emit(
        &mut self,
        kind: AlertKind,
        parameter: &str,
        reading: &Reading,
        message: String,
        current_yield: f64,
        emitted: &mut Vec<Alert>,
    ) {
        let key = (kind, parameter.to_string());
        let now = reading.timestamp;
        if let Some(last) = self.last_fired.get(&key) {
            if now - *last < self.cooldown {
                debug!(?kind, parameter, "alert suppressed by cooldown");
                return;
            }
        }
        self.last_fired.insert(key, now);

        let alert = Alert::new(kind, parameter, &reading.line, message, now, current_yield);
        info!(
            ?kind,
            parameter,
            severity = ?alert.severity,
            "alert emitted: {}",
            alert.message
        );
        self.log.push(alert.clone());
        emitted.push(alert);
    }

    /// Most recent alerts, sorted by priority score descending with ties
    /// broken by recency.
    pub fn recent(&self, count: usize, unacknowledged_only: bool) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .log
            .iter()
            .filter(|a| !unacknowledged_only || !a.acknowledged)
            .cloned()
            .collect();
        alerts.sort_by(|a, b| {
            b.priority_score()
                .cmp(&a.priority_score())
                .then(b.timestamp.cmp(&a.timestamp))
        });
        alerts.truncate(count);
        alerts
    }

    /// Marks an alert acknowledged. Idempotent for an already-acknowledged
    /// alert; unknown ids are an error.
    pub fn acknowledge(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        match self.log.iter_mut().find(|a| a.id == id) {
            Some(alert) => {
                alert.acknowledge(at);
                Ok(())
            }
            None => Err(MonitorError::UnknownAlert(id)),
        }
    }

    /// Total alerts ever emitted.
    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}
