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

//! One multi-parameter sensor sample.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single sample produced by the reading generator, one per tick.
///
/// Immutable after creation; owned by the history store once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Monotonic sample id assigned by the producer.
    pub id: u64,
    /// Sample timestamp.
    pub timestamp: DateTime<Utc>,
    /// Manufacturing line identifier.
    pub line: String,
    /// Measured value per parameter name.
    pub parameters: HashMap<String, f64>,
}

impl Reading {
    /// Creates a reading for the given line.
    pub fn new(
        id: u64,
        timestamp: DateTime<Utc>,
        line: impl Into<String>,
        parameters: HashMap<String, f64>,
    ) -> Self {
        Self {
            id,
            timestamp,
            line: line.into(),
            parameters,
        }
    }

    /// Value of a single parameter, if present in this sample.
    pub fn value(&self, parameter: &str) -> Option<f64> {
        self.parameters.get(parameter).copied()
    }
}
