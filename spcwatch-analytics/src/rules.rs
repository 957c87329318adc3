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

//! Western-Electric-style run rules over the most recent window of values.
//!
//! Run rules catch non-random patterns that individual-point limit checks
//! miss. They are a diagnostic surface only; violations never feed the alert
//! synthesizer directly.
//!
//! # Reference
//!
//! Western Electric (1956). *Statistical Quality Control Handbook*.

use serde::{Deserialize, Serialize};
use spcwatch_core::ParameterSpec;

/// Number of trailing values the rules inspect.
pub const RULE_WINDOW: usize = 9;

/// The individual run rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunRule {
    /// Any point beyond a control limit.
    BeyondControlLimit,
    /// 9 consecutive points on the same side of target.
    NineOneSide,
    /// 6 consecutive strictly increasing or decreasing points.
    SixMonotonic,
    /// 2 of the last 3 points beyond 2σ on the same side.
    TwoOfThreeBeyondTwoSigma,
}

/// A structured rule violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRuleViolation {
    pub rule: RunRule,
    pub parameter: String,
    /// Index into the inspected window where the violation fired.
    pub index: usize,
    pub description: String,
}

/// Checks the four run rules over the last [`RULE_WINDOW`] values.
///
/// `values` is the parameter's series in time order; only the tail is
/// inspected. Returns one record per (rule, firing point).
pub fn check_run_rules(values: &[f64], spec: &ParameterSpec) -> Vec<RunRuleViolation> {
    let start = values.len().saturating_sub(RULE_WINDOW);
    let window = &values[start..];
    let mut violations = Vec::new();

    // Rule 1: any point beyond a control limit.
    for (i, &v) in window.iter().enumerate() {
        if v > spec.ucl || v < spec.lcl {
            violations.push(RunRuleViolation {
                rule: RunRule::BeyondControlLimit,
                parameter: spec.name.clone(),
                index: i,
                description: format!("value {v} beyond control limits [{}, {}]", spec.lcl, spec.ucl),
            });
        }
    }

    // Rule 2: 9 consecutive points on one side of target.
    if window.len() >= 9 {
        let all_above = window.iter().all(|&v| v > spec.target);
        let all_below = window.iter().all(|&v| v < spec.target);
        if all_above || all_below {
            violations.push(RunRuleViolation {
                rule: RunRule::NineOneSide,
                parameter: spec.name.clone(),
                index: window.len() - 1,
                description: format!(
                    "9 consecutive points {} target",
                    if all_above { "above" } else { "below" }
                ),
            });
        }
    }

    // Rule 3: 6 consecutive strictly monotonic points.
    if window.len() >= 6 {
        for (i, run) in window.windows(6).enumerate() {
            let increasing = run.windows(2).all(|w| w[1] > w[0]);
            let decreasing = run.windows(2).all(|w| w[1] < w[0]);
            if increasing || decreasing {
                violations.push(RunRuleViolation {
                    rule: RunRule::SixMonotonic,
                    parameter: spec.name.clone(),
                    index: i + 5,
                    description: format!(
                        "6 consecutive strictly {} points",
                        if increasing { "increasing" } else { "decreasing" }
                    ),
                });
            }
        }
    }

    // Rule 4: 2 of the last 3 points beyond 2σ on the same side.
    if window.len() >= 3 {
        let sigma = spec.control_sigma();
        if sigma > 0.0 {
            let last3 = &window[window.len() - 3..];
            let above = last3
                .iter()
                .filter(|&&v| v > spec.target + 2.0 * sigma)
                .count();
            let below = last3
                .iter()
                .filter(|&&v| v < spec.target - 2.0 * sigma)
                .count();
            if above >= 2 || below >= 2 {
                violations.push(RunRuleViolation {
                    rule: RunRule::TwoOfThreeBeyondTwoSigma,
                    parameter: spec.name.clone(),
                    index: window.len() - 1,
                    description: format!(
                        "2 of last 3 points beyond 2 sigma {} target",
                        if above >= 2 { "above" } else { "below" }
                    ),
                });
            }
        }
    }

    violations
}
