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

//! Bounded rolling history of readings.
//!
//! Append-only at the tail with FIFO eviction at the head; `len ≤ capacity`
//! holds at all times once the cap takes effect, and stored order is
//! strictly timestamp-ascending. The store is owned by the scheduler; query
//! paths receive copied slices, never the live structure.

use std::collections::VecDeque;

use spcwatch_core::{ParameterCatalog, Reading};
use tracing::warn;

/// Capacity-bounded FIFO of readings.
#[derive(Debug)]
pub struct HistoryStore {
    readings: VecDeque<Reading>,
    capacity: usize,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            readings: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// Appends a reading, evicting from the head past capacity.
    ///
    /// A reading that does not advance the timeline is rejected, keeping the
    /// timestamp-ascending invariant; returns whether the reading was stored.
    pub fn push(&mut self, reading: Reading) -> bool {
        if let Some(last) = self.readings.back() {
            if reading.timestamp <= last.timestamp {
                warn!(
                    id = reading.id,
                    "rejected out-of-order reading ({} <= {})",
                    reading.timestamp,
                    last.timestamp
                );
                return false;
            }
        }
        self.readings.push_back(reading);
        while self.readings.len() > self.capacity {
            self.readings.pop_front();
        }
        true
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copies the full history in time order.
    pub fn to_vec(&self) -> Vec<Reading> {
        self.readings.iter().cloned().collect()
    }

    /// Copies the most recent `count` readings in time order.
    pub fn recent(&self, count: usize) -> Vec<Reading> {
        let skip = self.readings.len().saturating_sub(count);
        self.readings.iter().skip(skip).cloned().collect()
    }

    /// The most recent `count` values of one parameter, in time order.
    /// Readings missing the parameter are skipped.
    pub fn series(&self, parameter: &str, count: usize) -> Vec<f64> {
        let values: Vec<f64> = self
            .readings
            .iter()
            .filter_map(|r| r.value(parameter))
            .collect();
        let skip = values.len().saturating_sub(count);
        values[skip..].to_vec()
    }

    /// Percentage of the last `window` readings with every parameter inside
    /// its specification limits. Used as the current-yield estimate for
    /// alert impact projections; 100 when the history is empty.
    pub fn in_spec_yield(&self, catalog: &ParameterCatalog, window: usize) -> f64 {
        let skip = self.readings.len().saturating_sub(window);
        let mut total = 0usize;
        let mut in_spec = 0usize;
        for reading in self.readings.iter().skip(skip) {
            total += 1;
            let ok = catalog.specs().iter().all(|spec| {
                reading
                    .value(&spec.name)
                    .map(|v| v >= spec.lsl && v <= spec.usl)
                    .unwrap_or(true)
            });
            if ok {
                in_spec += 1;
            }
        }
        if total == 0 {
            100.0
        } else {
            in_spec as f64 / total as f64 * 100.0
        }
    }
}
