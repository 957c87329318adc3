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

//! Per-reading SPC evaluation against control and specification limits.
//!
//! Stateless: each reading is scored independently. A value is classified
//! into a zone by splitting the distance from target to the relevant control
//! limit into thirds (`A` nearest the target, `B`, `C`, `OUT` beyond the
//! limit), signed by which side of target the value lies on.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use spcwatch_core::{ParameterCatalog, ParameterSpec, Reading};

/// Zone classification relative to target and control limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Zone {
    #[serde(rename = "A+")]
    AUpper,
    #[serde(rename = "B+")]
    BUpper,
    #[serde(rename = "C+")]
    CUpper,
    #[serde(rename = "OUT+")]
    OutUpper,
    #[serde(rename = "A-")]
    ALower,
    #[serde(rename = "B-")]
    BLower,
    #[serde(rename = "C-")]
    CLower,
    #[serde(rename = "OUT-")]
    OutLower,
}

impl Zone {
    /// Whether the zone lies beyond a control limit.
    pub fn is_out(&self) -> bool {
        matches!(self, Zone::OutUpper | Zone::OutLower)
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Zone::AUpper => "A+",
            Zone::BUpper => "B+",
            Zone::CUpper => "C+",
            Zone::OutUpper => "OUT+",
            Zone::ALower => "A-",
            Zone::BLower => "B-",
            Zone::CLower => "C-",
            Zone::OutLower => "OUT-",
        };
        f.write_str(s)
    }
}

/// Per-parameter evaluation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpcStatus {
    Normal,
    Warning,
    Critical,
}

/// SPC evaluation of one parameter in one reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpcResult {
    pub value: f64,
    /// `value - target`.
    pub deviation: f64,
    /// Deviation as a percentage of target; 0 when target is 0.
    pub deviation_percent: f64,
    pub zone: Zone,
    /// Outside `[lcl, ucl]`.
    pub out_of_control: bool,
    /// Outside `[lsl, usl]`.
    pub out_of_spec: bool,
    pub status: SpcStatus,
}

/// Classifies a value into its zone for the given spec.
fn classify_zone(value: f64, spec: &ParameterSpec) -> Zone {
    if value >= spec.target {
        let third = (spec.ucl - spec.target) / 3.0;
        let distance = value - spec.target;
        if value > spec.ucl {
            Zone::OutUpper
        } else if distance <= third {
            Zone::AUpper
        } else if distance <= 2.0 * third {
            Zone::BUpper
        } else {
            Zone::CUpper
        }
    } else {
        let third = (spec.target - spec.lcl) / 3.0;
        let distance = spec.target - value;
        if value < spec.lcl {
            Zone::OutLower
        } else if distance <= third {
            Zone::ALower
        } else if distance <= 2.0 * third {
            Zone::BLower
        } else {
            Zone::CLower
        }
    }
}

/// Evaluates a single value against one parameter spec.
pub fn evaluate_value(value: f64, spec: &ParameterSpec) -> SpcResult {
    let deviation = value - spec.target;
    let deviation_percent = if spec.target == 0.0 {
        0.0
    } else {
        deviation / spec.target * 100.0
    };

    let out_of_control = value > spec.ucl || value < spec.lcl;
    let out_of_spec = value > spec.usl || value < spec.lsl;

    let status = if out_of_spec {
        SpcStatus::Critical
    } else if out_of_control {
        SpcStatus::Warning
    } else {
        SpcStatus::Normal
    };

    SpcResult {
        value,
        deviation,
        deviation_percent,
        zone: classify_zone(value, spec),
        out_of_control,
        out_of_spec,
        status,
    }
}

/// Evaluates every catalog parameter present in the reading.
///
/// Parameters missing from the reading, or carrying non-finite values, are
/// skipped rather than reported.
pub fn evaluate(reading: &Reading, catalog: &ParameterCatalog) -> HashMap<String, SpcResult> {
    let mut results = HashMap::with_capacity(catalog.len());
    for spec in catalog.specs() {
        let Some(value) = reading.value(&spec.name) else {
            continue;
        };
        if !value.is_finite() {
            continue;
        }
        results.insert(spec.name.clone(), evaluate_value(value, spec));
    }
    results
}
