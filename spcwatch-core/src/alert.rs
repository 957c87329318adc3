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

//! Alert records emitted by the alert synthesizer.
//!
//! Every alert kind carries a fixed operator playbook (recommended actions)
//! and a coarse yield-impact range. Both are advisory outputs for display and
//! triage; nothing in the control path consumes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Alert severity levels, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    /// Numeric level used in priority scoring (critical=3, warning=2, info=1).
    pub fn level(&self) -> u32 {
        match self {
            AlertSeverity::Critical => 3,
            AlertSeverity::Warning => 2,
            AlertSeverity::Info => 1,
        }
    }

    /// Multiplier applied to the yield-impact estimate.
    pub fn impact_multiplier(&self) -> f64 {
        match self {
            AlertSeverity::Critical => 1.5,
            AlertSeverity::Warning => 1.0,
            AlertSeverity::Info => 0.5,
        }
    }
}

/// The condition class an alert reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Value outside the specification limits.
    OutOfSpec,
    /// Value outside the control limits (but within spec).
    OutOfControl,
    /// CUSUM decision interval exceeded.
    CusumDrift,
    /// EWMA control limit exceeded.
    EwmaDrift,
    /// Statistically significant linear trend.
    Trend,
    /// Mean shift between baseline and recent windows.
    ProcessShift,
}

impl AlertKind {
    /// Default severity for this kind.
    pub fn severity(&self) -> AlertSeverity {
        match self {
            AlertKind::OutOfSpec => AlertSeverity::Critical,
            AlertKind::OutOfControl => AlertSeverity::Warning,
            AlertKind::CusumDrift => AlertSeverity::Critical,
            AlertKind::EwmaDrift => AlertSeverity::Warning,
            AlertKind::Trend => AlertSeverity::Info,
            AlertKind::ProcessShift => AlertSeverity::Critical,
        }
    }

    /// Type weight used as the secondary term in priority scoring.
    pub fn weight(&self) -> u32 {
        match self {
            AlertKind::OutOfSpec => 50,
            AlertKind::ProcessShift => 40,
            AlertKind::CusumDrift => 30,
            AlertKind::OutOfControl => 20,
            AlertKind::EwmaDrift => 15,
            AlertKind::Trend => 10,
        }
    }

    /// Operator guidance attached to alerts of this kind.
    pub fn recommended_actions(&self) -> Vec<String> {
        let actions: &[&str] = match self {
            AlertKind::OutOfSpec => &[
                "Quarantine product manufactured since the last in-spec reading",
                "Stop the line if the condition persists for consecutive readings",
                "Verify sensor calibration before adjusting the process",
            ],
            AlertKind::OutOfControl => &[
                "Inspect the process for assignable causes",
                "Review recent tooling, material, or operator changes",
                "Increase sampling frequency until the process re-centers",
            ],
            AlertKind::CusumDrift => &[
                "Investigate a small sustained shift in the process mean",
                "Check for gradual tool wear or raw-material lot changes",
                "Recalibrate the affected control loop if the shift is confirmed",
            ],
            AlertKind::EwmaDrift => &[
                "Review the smoothed trend against recent setpoint changes",
                "Schedule preventive maintenance for the affected equipment",
            ],
            AlertKind::Trend => &[
                "Monitor the projected drift against the control limits",
                "Plan a process adjustment before the trend reaches a limit",
            ],
            AlertKind::ProcessShift => &[
                "Compare pre-shift and post-shift operating conditions",
                "Audit recent setpoint, recipe, or material changes",
                "Reset drift baselines after a deliberate process adjustment",
            ],
        };
        actions.iter().map(|s| s.to_string()).collect()
    }

    /// Coarse yield-impact range in percentage points (low, high).
    pub fn impact_range(&self) -> (f64, f64) {
        match self {
            AlertKind::OutOfSpec => (5.0, 15.0),
            AlertKind::ProcessShift => (3.0, 8.0),
            AlertKind::CusumDrift => (2.0, 6.0),
            AlertKind::OutOfControl => (1.0, 4.0),
            AlertKind::EwmaDrift => (1.0, 3.0),
            AlertKind::Trend => (0.5, 2.0),
        }
    }
}

/// Estimated yield impact attached to an alert.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YieldImpact {
    /// Expected yield loss in percentage points.
    pub avg_impact: f64,
    /// Yield projection if the condition persists.
    pub projected_yield: f64,
}

impl YieldImpact {
    /// `avg_impact = mean(kind range) × severity multiplier`;
    /// `projected_yield = current_yield − avg_impact`, floored at 0.
    pub fn estimate(kind: AlertKind, severity: AlertSeverity, current_yield: f64) -> Self {
        let (low, high) = kind.impact_range();
        let avg_impact = (low + high) / 2.0 * severity.impact_multiplier();
        Self {
            avg_impact,
            projected_yield: (current_yield - avg_impact).max(0.0),
        }
    }
}

/// A synthesized alert record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    /// Parameter that triggered the alert.
    pub parameter: String,
    /// Manufacturing line the triggering reading came from.
    pub line: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub recommended_actions: Vec<String>,
    pub yield_impact: YieldImpact,
}

impl Alert {
    /// Creates an unacknowledged alert with the kind's default severity,
    /// playbook, and impact estimate.
    pub fn new(
        kind: AlertKind,
        parameter: impl Into<String>,
        line: impl Into<String>,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
        current_yield: f64,
    ) -> Self {
        let severity = kind.severity();
        Self {
            id: Uuid::new_v4(),
            kind,
            severity,
            parameter: parameter.into(),
            line: line.into(),
            message: message.into(),
            timestamp,
            acknowledged: false,
            acknowledged_at: None,
            recommended_actions: kind.recommended_actions(),
            yield_impact: YieldImpact::estimate(kind, severity, current_yield),
        }
    }

    /// Score for display ordering: `100 × severity level + kind weight`.
    pub fn priority_score(&self) -> u32 {
        100 * self.severity.level() + self.kind.weight()
    }

    /// Marks the alert acknowledged. Idempotent: re-acknowledging keeps the
    /// original acknowledgment time.
    pub fn acknowledge(&mut self, at: DateTime<Utc>) {
        if !self.acknowledged {
            self.acknowledged = true;
            self.acknowledged_at = Some(at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering_across_kinds() {
        let now = Utc::now();
        let mk = |kind| Alert::new(kind, "temperature", "line-1", "m", now, 98.0);

        let out_of_spec = mk(AlertKind::OutOfSpec);
        let shift = mk(AlertKind::ProcessShift);
        let cusum = mk(AlertKind::CusumDrift);
        let ooc = mk(AlertKind::OutOfControl);
        let ewma = mk(AlertKind::EwmaDrift);
        let trend = mk(AlertKind::Trend);

        // 350 > 340 > 330 > 220 > 215 > 110
        assert_eq!(out_of_spec.priority_score(), 350);
        assert_eq!(shift.priority_score(), 340);
        assert_eq!(cusum.priority_score(), 330);
        assert_eq!(ooc.priority_score(), 220);
        assert_eq!(ewma.priority_score(), 215);
        assert_eq!(trend.priority_score(), 110);
    }

    #[test]
    fn test_yield_impact_estimate() {
        // OutOfSpec range (5, 15) → mean 10, critical multiplier 1.5 → 15.
        let impact = YieldImpact::estimate(AlertKind::OutOfSpec, AlertSeverity::Critical, 98.0);
        assert!((impact.avg_impact - 15.0).abs() < 1e-12);
        assert!((impact.projected_yield - 83.0).abs() < 1e-12);

        // Projection floors at zero.
        let floored = YieldImpact::estimate(AlertKind::OutOfSpec, AlertSeverity::Critical, 5.0);
        assert_eq!(floored.projected_yield, 0.0);
    }

    #[test]
    fn test_acknowledge_is_idempotent() {
        let mut alert = Alert::new(
            AlertKind::Trend,
            "ph",
            "line-1",
            "trend detected",
            Utc::now(),
            99.0,
        );
        let t1 = Utc::now();
        alert.acknowledge(t1);
        assert!(alert.acknowledged);
        assert_eq!(alert.acknowledged_at, Some(t1));

        let t2 = t1 + chrono::Duration::seconds(30);
        alert.acknowledge(t2);
        assert_eq!(alert.acknowledged_at, Some(t1), "first ack time is kept");
    }

    #[test]
    fn test_every_kind_has_a_playbook() {
        for kind in [
            AlertKind::OutOfSpec,
            AlertKind::OutOfControl,
            AlertKind::CusumDrift,
            AlertKind::EwmaDrift,
            AlertKind::Trend,
            AlertKind::ProcessShift,
        ] {
            assert!(!kind.recommended_actions().is_empty());
            let (low, high) = kind.impact_range();
            assert!(low < high);
        }
    }
}
