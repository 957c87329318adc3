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

//! Parameter specifications and the monitored-parameter catalog.
//!
//! A [`ParameterSpec`] carries the target plus two pairs of limits:
//!
//! - **UCL/LCL** — control limits, statistically derived bounds that signal
//!   process instability.
//! - **USL/LSL** — specification limits, the product acceptance bounds.
//!
//! Specs are validated once at load and never mutated afterwards.

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};

/// Immutable per-parameter monitoring specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Parameter key, e.g. "temperature".
    pub name: String,
    /// Engineering unit, e.g. "°C".
    pub unit: String,
    /// Grouping for display/reporting, e.g. "thermal".
    pub category: String,
    /// Process target (nominal) value.
    pub target: f64,
    /// Upper control limit.
    pub ucl: f64,
    /// Lower control limit.
    pub lcl: f64,
    /// Upper specification limit.
    pub usl: f64,
    /// Lower specification limit.
    pub lsl: f64,
}

impl ParameterSpec {
    /// Validates the limit ordering invariants: `lcl < target < ucl` and
    /// `lsl < usl`. Control limits inside spec limits is typical but not
    /// required, so it is not checked here.
    pub fn validate(&self) -> Result<()> {
        if !(self.lcl < self.target && self.target < self.ucl) {
            return Err(MonitorError::InvalidSpec {
                name: self.name.clone(),
                reason: format!(
                    "control limits must satisfy lcl < target < ucl (lcl={}, target={}, ucl={})",
                    self.lcl, self.target, self.ucl
                ),
            });
        }
        if !(self.lsl < self.usl) {
            return Err(MonitorError::InvalidSpec {
                name: self.name.clone(),
                reason: format!(
                    "spec limits must satisfy lsl < usl (lsl={}, usl={})",
                    self.lsl, self.usl
                ),
            });
        }
        for (label, v) in [
            ("target", self.target),
            ("ucl", self.ucl),
            ("lcl", self.lcl),
            ("usl", self.usl),
            ("lsl", self.lsl),
        ] {
            if !v.is_finite() {
                return Err(MonitorError::InvalidSpec {
                    name: self.name.clone(),
                    reason: format!("{label} is not finite"),
                });
            }
        }
        Ok(())
    }

    /// Process sigma derived from the control-limit width: `(ucl - lcl) / 6`.
    ///
    /// This conflates control-limit width with process sigma and may
    /// understate true variability; it is kept because the CUSUM/EWMA alarm
    /// thresholds downstream are calibrated against it.
    pub fn control_sigma(&self) -> f64 {
        (self.ucl - self.lcl) / 6.0
    }
}

/// Ordered collection of parameter specs with lookup by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterCatalog {
    specs: Vec<ParameterSpec>,
}

impl ParameterCatalog {
    /// Builds a catalog, validating every spec and rejecting duplicates.
    pub fn new(specs: Vec<ParameterSpec>) -> Result<Self> {
        for spec in &specs {
            spec.validate()?;
        }
        for (i, spec) in specs.iter().enumerate() {
            if specs[..i].iter().any(|s| s.name == spec.name) {
                return Err(MonitorError::InvalidSpec {
                    name: spec.name.clone(),
                    reason: "duplicate parameter name".to_string(),
                });
            }
        }
        Ok(Self { specs })
    }

    /// Looks up a spec by parameter name.
    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Like [`get`](Self::get) but returns `UnknownParameter` for callers
    /// that treat a missing name as a request error.
    pub fn require(&self, name: &str) -> Result<&ParameterSpec> {
        self.get(name)
            .ok_or_else(|| MonitorError::UnknownParameter(name.to_string()))
    }

    /// All specs, in catalog order.
    pub fn specs(&self) -> &[ParameterSpec] {
        &self.specs
    }

    /// Parameter names, in catalog order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Built-in catalog of typical manufacturing-line parameters, used when
    /// no catalog file is configured.
    pub fn builtin() -> Self {
        let specs = vec![
            ParameterSpec {
                name: "temperature".to_string(),
                unit: "°C".to_string(),
                category: "thermal".to_string(),
                target: 25.0,
                ucl: 27.0,
                lcl: 23.0,
                usl: 28.0,
                lsl: 22.0,
            },
            ParameterSpec {
                name: "pressure".to_string(),
                unit: "kPa".to_string(),
                category: "hydraulic".to_string(),
                target: 101.3,
                ucl: 104.0,
                lcl: 98.6,
                usl: 106.0,
                lsl: 96.6,
            },
            ParameterSpec {
                name: "flow_rate".to_string(),
                unit: "L/min".to_string(),
                category: "hydraulic".to_string(),
                target: 12.0,
                ucl: 13.5,
                lcl: 10.5,
                usl: 14.5,
                lsl: 9.5,
            },
            ParameterSpec {
                name: "ph".to_string(),
                unit: "pH".to_string(),
                category: "chemical".to_string(),
                target: 7.0,
                ucl: 7.4,
                lcl: 6.6,
                usl: 7.8,
                lsl: 6.2,
            },
            ParameterSpec {
                name: "viscosity".to_string(),
                unit: "cP".to_string(),
                category: "chemical".to_string(),
                target: 350.0,
                ucl: 380.0,
                lcl: 320.0,
                usl: 400.0,
                lsl: 300.0,
            },
            ParameterSpec {
                name: "humidity".to_string(),
                unit: "%RH".to_string(),
                category: "environmental".to_string(),
                target: 45.0,
                ucl: 52.0,
                lcl: 38.0,
                usl: 60.0,
                lsl: 30.0,
            },
        ];
        // Built-in specs are well-formed by construction.
        Self { specs }
    }
}
