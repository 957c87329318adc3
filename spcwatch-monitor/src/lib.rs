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

//! Spcwatch Monitor
//!
//! The monitoring service: bounded rolling history, alert synthesis with
//! cooldown deduplication, the reading-generator seam, and the scheduler
//! that drives the per-tick pipeline and fans results out to subscribers.

pub mod alerts;
pub mod generator;
pub mod history;
pub mod scheduler;

pub use alerts::AlertEngine;
pub use generator::{FixtureGenerator, ReadingGenerator, SimulatedGenerator};
pub use history::HistoryStore;
pub use scheduler::{Monitor, MonitorEvent, Snapshot};
