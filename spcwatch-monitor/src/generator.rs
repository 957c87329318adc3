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

//! The reading-producer seam.
//!
//! The pipeline consumes readings through [`ReadingGenerator`], keeping the
//! data source strictly external to the core: production wires in a sensor
//! feed, the demo binary uses [`SimulatedGenerator`], and tests drive the
//! scheduler with deterministic [`FixtureGenerator`] sequences.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use spcwatch_core::{MonitorError, ParameterCatalog, Reading, Result};

/// Produces one reading per scheduler tick.
pub trait ReadingGenerator: Send {
    fn next_reading(&mut self) -> Result<Reading>;
}

/// Random-walk generator over the catalog parameters.
///
/// Each parameter wanders around its target with noise scaled to the
/// control-limit sigma plus a slowly-moving bias, which makes the simulated
/// stream occasionally graze control limits and exhibit mild drift.
pub struct SimulatedGenerator {
    catalog: ParameterCatalog,
    line: String,
    next_id: u64,
    clock: DateTime<Utc>,
    tick: Duration,
    rng: StdRng,
    bias: HashMap<String, f64>,
}

impl SimulatedGenerator {
    /// Starts the simulated clock at `start`, advancing `tick` per reading.
    pub fn new(
        catalog: ParameterCatalog,
        line: impl Into<String>,
        start: DateTime<Utc>,
        tick: Duration,
    ) -> Self {
        Self::with_seed(catalog, line, start, tick, rand::random())
    }

    /// Deterministic variant for reproducible runs.
    pub fn with_seed(
        catalog: ParameterCatalog,
        line: impl Into<String>,
        start: DateTime<Utc>,
        tick: Duration,
        seed: u64,
    ) -> Self {
        Self {
            catalog,
            line: line.into(),
            next_id: 1,
            clock: start,
            tick,
            rng: StdRng::seed_from_u64(seed),
            bias: HashMap::new(),
        }
    }
}

impl ReadingGenerator for SimulatedGenerator {
    fn next_reading(&mut self) -> Result<Reading> {
        let mut parameters = HashMap::with_capacity(self.catalog.len());
        for spec in self.catalog.specs() {
            let sigma = spec.control_sigma().max(f64::MIN_POSITIVE);
            let bias = self.bias.entry(spec.name.clone()).or_insert(0.0);
            // Bias random-walks slowly and is pulled back toward zero.
            *bias += self.rng.gen_range(-0.05..0.05) * sigma;
            *bias *= 0.995;
            let noise = self.rng.gen_range(-1.0..1.0) * sigma;
            parameters.insert(spec.name.clone(), spec.target + *bias + noise);
        }

        let reading = Reading::new(self.next_id, self.clock, self.line.clone(), parameters);
        self.next_id += 1;
        self.clock += self.tick;
        Ok(reading)
    }
}

/// Replays a fixed sequence of per-parameter values with synthetic ids and
/// evenly spaced timestamps. Errors once exhausted.
pub struct FixtureGenerator {
    frames: std::vec::IntoIter<HashMap<String, f64>>,
    line: String,
    next_id: u64,
    clock: DateTime<Utc>,
    tick: Duration,
}

impl FixtureGenerator {
    pub fn new(
        frames: Vec<HashMap<String, f64>>,
        line: impl Into<String>,
        start: DateTime<Utc>,
        tick: Duration,
    ) -> Self {
        Self {
            frames: frames.into_iter(),
            line: line.into(),
            next_id: 1,
            clock: start,
            tick,
        }
    }

    /// Convenience for single-parameter fixtures.
    pub fn single(
        parameter: &str,
        values: &[f64],
        line: impl Into<String>,
        start: DateTime<Utc>,
        tick: Duration,
    ) -> Self {
        let frames = values
            .iter()
            .map(|&v| {
                let mut m = HashMap::new();
                m.insert(parameter.to_string(), v);
                m
            })
            .collect();
        Self::new(frames, line, start, tick)
    }
}

impl ReadingGenerator for FixtureGenerator {
    fn next_reading(&mut self) -> Result<Reading> {
        let frame = self
            .frames
            .next()
            .ok_or_else(|| MonitorError::Generator("fixture exhausted".to_string()))?;
        let reading = Reading::new(self.next_id, self.clock, self.line.clone(), frame);
        self.next_id += 1;
        self.clock += self.tick;
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_generator_stays_plausible() {
        let catalog = ParameterCatalog::builtin();
        let mut gen = SimulatedGenerator::with_seed(
            catalog.clone(),
            "line-1",
            Utc::now(),
            Duration::seconds(2),
            7,
        );

        let mut last_ts = None;
        for expected_id in 1..=100u64 {
            let reading = gen.next_reading().unwrap();
            assert_eq!(reading.id, expected_id);
            assert_eq!(reading.parameters.len(), catalog.len());
            if let Some(prev) = last_ts {
                assert!(reading.timestamp > prev);
            }
            last_ts = Some(reading.timestamp);

            for spec in catalog.specs() {
                let v = reading.value(&spec.name).unwrap();
                assert!(v.is_finite());
                // Values stay within a loose envelope of the control band.
                let sigma = spec.control_sigma();
                assert!((v - spec.target).abs() < 12.0 * sigma, "{}: {v}", spec.name);
            }
        }
    }

    #[test]
    fn test_seeded_generator_is_deterministic() {
        let catalog = ParameterCatalog::builtin();
        let start = Utc::now();
        let mut a =
            SimulatedGenerator::with_seed(catalog.clone(), "l", start, Duration::seconds(2), 42);
        let mut b = SimulatedGenerator::with_seed(catalog, "l", start, Duration::seconds(2), 42);
        for _ in 0..10 {
            assert_eq!(a.next_reading().unwrap(), b.next_reading().unwrap());
        }
    }

    #[test]
    fn test_fixture_generator_replays_then_errors() {
        let mut gen = FixtureGenerator::single(
            "temperature",
            &[25.0, 26.0],
            "line-1",
            Utc::now(),
            Duration::seconds(2),
        );
        assert_eq!(gen.next_reading().unwrap().value("temperature"), Some(25.0));
        assert_eq!(gen.next_reading().unwrap().value("temperature"), Some(26.0));
        assert!(matches!(
            gen.next_reading(),
            Err(MonitorError::Generator(_))
        ));
    }
}
