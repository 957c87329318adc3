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

//! The monitoring scheduler and its query surface.
//!
//! One scheduler drives the whole pipeline: per tick it pulls a reading from
//! the generator, SPC-evaluates it, appends it to the rolling history, runs
//! drift analysis every Nth tick, synthesizes alerts, and publishes the
//! result to subscribers over a broadcast channel. Slow subscribers lag and
//! drop events; they never block the tick.
//!
//! The shared state lives behind a single `RwLock` written only by the tick
//! path (and the two exposed mutations, acknowledge and drift reset). Query
//! methods copy data out under a read lock; the live structures are never
//! handed out.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use spcwatch_analytics::{
    check_run_rules, evaluate, summarize, CapabilitySummary, DriftDetector, DriftReport,
    RunRuleViolation, SpcResult,
};
use spcwatch_core::{Alert, MonitorConfig, ParameterCatalog, Reading, Result};

use crate::alerts::AlertEngine;
use crate::generator::ReadingGenerator;
use crate::history::HistoryStore;

/// Readings delivered in the first-subscription snapshot.
const SNAPSHOT_READINGS: usize = 100;
/// Alerts delivered in the first-subscription snapshot.
const SNAPSHOT_ALERTS: usize = 50;
/// Window for the capability summary and yield estimate.
const SUMMARY_WINDOW: usize = 100;

/// One tick's published output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorEvent {
    pub reading: Reading,
    pub spc: HashMap<String, SpcResult>,
    /// Present on analysis ticks only.
    pub drift: Option<DriftReport>,
    /// Alerts newly emitted on this tick.
    pub alerts: Vec<Alert>,
}

/// Snapshot burst delivered on first subscription, before live events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub readings: Vec<Reading>,
    pub alerts: Vec<Alert>,
}

/// Shared mutable pipeline state; written only by the scheduler tick and the
/// exposed mutations.
struct MonitorState {
    history: HistoryStore,
    detector: DriftDetector,
    alerts: AlertEngine,
    tick_count: u64,
}

/// The monitoring service for one manufacturing line.
#[derive(Clone)]
pub struct Monitor {
    config: Arc<MonitorConfig>,
    catalog: Arc<ParameterCatalog>,
    state: Arc<RwLock<MonitorState>>,
    events: broadcast::Sender<MonitorEvent>,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Result<Self> {
        config.validate()?;
        let catalog = config.catalog()?;
        let (events, _) = broadcast::channel(config.channel_capacity.max(1));
        let state = MonitorState {
            history: HistoryStore::new(config.history_capacity),
            detector: DriftDetector::new(),
            alerts: AlertEngine::new(config.alert_cooldown()),
            tick_count: 0,
        };
        Ok(Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            state: Arc::new(RwLock::new(state)),
            events,
        })
    }

    pub fn catalog(&self) -> &ParameterCatalog {
        &self.catalog
    }

    /// Runs one reading through the full pipeline and publishes the result.
    ///
    /// Drift analysis runs on every `analysis_every`-th stored reading;
    /// SPC-driven alerts are checked on every tick.
    pub fn process_tick(&self, reading: Reading) -> MonitorEvent {
        let spc = evaluate(&reading, &self.catalog);

        let mut state = self.state.write();
        let stored = state.history.push(reading.clone());

        let (drift, alerts) = if stored {
            state.tick_count += 1;
            let drift = if state.tick_count % self.config.analysis_every == 0 {
                let history = state.history.to_vec();
                let report = state.detector.detect(&history, &self.catalog);
                debug!(
                    tick = state.tick_count,
                    status = ?report.status,
                    "drift analysis complete"
                );
                Some(report)
            } else {
                None
            };
            let current_yield = state.history.in_spec_yield(&self.catalog, SUMMARY_WINDOW);
            let alerts = state.alerts.check_for_alerts(
                &reading,
                &spc,
                drift.as_ref(),
                &self.catalog,
                current_yield,
            );
            (drift, alerts)
        } else {
            (None, Vec::new())
        };
        drop(state);

        let event = MonitorEvent {
            reading,
            spc,
            drift,
            alerts,
        };
        // No receivers is fine; lagged receivers drop events on their side.
        let _ = self.events.send(event.clone());
        event
    }

    /// Replays `ticks` synthetic readings through the pipeline so that drift
    /// preconditions are already satisfied when live ticking begins.
    pub fn backfill(&self, generator: &mut dyn ReadingGenerator, ticks: usize) -> Result<usize> {
        for _ in 0..ticks {
            let reading = generator.next_reading()?;
            self.process_tick(reading);
        }
        info!(ticks, "backfill complete");
        Ok(ticks)
    }

    /// Drives the periodic tick until `shutdown` flips to true.
    ///
    /// A generator failure is logged and the tick skipped; the history is
    /// left untouched and the loop continues on the next tick.
    pub async fn run<G: ReadingGenerator>(
        &self,
        mut generator: G,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(self.config.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            line = %self.config.line,
            interval_ms = self.config.tick_interval_ms,
            "monitor running"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match generator.next_reading() {
                        Ok(reading) => {
                            self.process_tick(reading);
                        }
                        Err(err) => {
                            warn!("reading generator failed, skipping tick: {err}");
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("monitor stopping");
                        break;
                    }
                }
            }
        }
    }

    /// Subscribes to live events, returning the snapshot burst first.
    ///
    /// The receiver is created before the snapshot is taken, so no event
    /// falls in the gap between the two.
    pub fn subscribe(&self) -> (Snapshot, broadcast::Receiver<MonitorEvent>) {
        let receiver = self.events.subscribe();
        let state = self.state.read();
        let snapshot = Snapshot {
            readings: state.history.recent(SNAPSHOT_READINGS),
            alerts: state.alerts.recent(SNAPSHOT_ALERTS, false),
        };
        (snapshot, receiver)
    }

    /// The most recent `count` readings, oldest first.
    pub fn recent_readings(&self, count: usize) -> Vec<Reading> {
        self.state.read().history.recent(count)
    }

    /// The most recent alerts, priority-sorted.
    pub fn recent_alerts(&self, count: usize, unacknowledged_only: bool) -> Vec<Alert> {
        self.state.read().alerts.recent(count, unacknowledged_only)
    }

    /// The most recent `count` values of one parameter.
    pub fn parameter_series(&self, parameter: &str, count: usize) -> Result<Vec<f64>> {
        self.catalog.require(parameter)?;
        Ok(self.state.read().history.series(parameter, count))
    }

    /// Capability summary over the recent window of one parameter.
    pub fn capability_summary(&self, parameter: &str) -> Result<CapabilitySummary> {
        let spec = self.catalog.require(parameter)?;
        let values = self.state.read().history.series(parameter, SUMMARY_WINDOW);
        Ok(summarize(&values, spec))
    }

    /// Run-rule diagnostics over the recent window of one parameter.
    pub fn run_rule_violations(&self, parameter: &str) -> Result<Vec<RunRuleViolation>> {
        let spec = self.catalog.require(parameter)?;
        let values = self.state.read().history.series(parameter, SUMMARY_WINDOW);
        Ok(check_run_rules(&values, spec))
    }

    /// Re-runs drift detection over the current history on demand.
    ///
    /// Safe to call between ticks: accumulation is gated per reading, so an
    /// on-demand run over unchanged history returns the same report.
    pub fn drift_status(&self) -> DriftReport {
        let mut state = self.state.write();
        let history = state.history.to_vec();
        state.detector.detect(&history, &self.catalog)
    }

    /// Acknowledges an alert; unknown ids are an error, re-acknowledging is
    /// a no-op.
    pub fn acknowledge_alert(&self, id: Uuid) -> Result<()> {
        self.state.write().alerts.acknowledge(id, Utc::now())
    }

    /// Clears drift state for one parameter after a deliberate process
    /// adjustment, forcing a fresh baseline.
    pub fn reset_drift(&self, parameter: &str) -> Result<()> {
        self.catalog.require(parameter)?;
        let existed = self.state.write().detector.reset(parameter);
        info!(parameter, existed, "drift state reset");
        Ok(())
    }

    /// Clears drift state for every parameter.
    pub fn reset_all_drift(&self) {
        self.state.write().detector.reset_all();
        info!("all drift state reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::FixtureGenerator;
    use chrono::Duration;
    use spcwatch_core::{AlertKind, MonitorError, ParameterSpec};

    fn config() -> MonitorConfig {
        MonitorConfig {
            parameters: vec![ParameterSpec {
                name: "temperature".to_string(),
                unit: "°C".to_string(),
                category: "thermal".to_string(),
                target: 25.0,
                ucl: 27.0,
                lcl: 23.0,
                usl: 28.0,
                lsl: 22.0,
            }],
            ..Default::default()
        }
    }

    fn fixture(values: &[f64]) -> FixtureGenerator {
        FixtureGenerator::single(
            "temperature",
            values,
            "line-1",
            Utc::now() - Duration::hours(1),
            Duration::seconds(2),
        )
    }

    #[test]
    fn test_tick_attaches_spc_and_counts_history() {
        let monitor = Monitor::new(config()).unwrap();
        let mut gen = fixture(&[25.0, 26.0, 28.5]);

        let e1 = monitor.process_tick(gen.next_reading().unwrap());
        assert!(!e1.spc["temperature"].out_of_spec);
        assert!(e1.drift.is_none());

        monitor.process_tick(gen.next_reading().unwrap());
        let e3 = monitor.process_tick(gen.next_reading().unwrap());
        assert!(e3.spc["temperature"].out_of_spec);
        assert_eq!(monitor.recent_readings(100).len(), 3);
    }

    #[test]
    fn test_drift_runs_every_nth_tick() {
        let monitor = Monitor::new(config()).unwrap();
        let mut gen = fixture(&[25.0; 30]);

        for tick in 1..=30u64 {
            let event = monitor.process_tick(gen.next_reading().unwrap());
            if tick % 10 == 0 {
                assert!(event.drift.is_some(), "tick {tick} must analyze");
            } else {
                assert!(event.drift.is_none(), "tick {tick} must not analyze");
            }
        }
    }

    #[test]
    fn test_backfill_satisfies_drift_preconditions() {
        let monitor = Monitor::new(config()).unwrap();
        let mut gen = fixture(&[25.0; 80]);
        monitor.backfill(&mut gen, 80).unwrap();

        let report = monitor.drift_status();
        assert_eq!(
            report.status,
            spcwatch_analytics::DriftStatus::Analyzed,
            "80 backfilled readings exceed every precondition"
        );
        assert!(report.parameters.contains_key("temperature"));
    }

    #[test]
    fn test_backfill_propagates_generator_failure() {
        let monitor = Monitor::new(config()).unwrap();
        let mut gen = fixture(&[25.0; 3]);
        let err = monitor.backfill(&mut gen, 10);
        assert!(matches!(err, Err(MonitorError::Generator(_))));
        // The three good readings were processed before the failure.
        assert_eq!(monitor.recent_readings(10).len(), 3);
    }

    #[test]
    fn test_query_surface_unknown_parameter() {
        let monitor = Monitor::new(config()).unwrap();
        assert!(matches!(
            monitor.parameter_series("missing", 10),
            Err(MonitorError::UnknownParameter(_))
        ));
        assert!(monitor.capability_summary("missing").is_err());
        assert!(monitor.run_rule_violations("missing").is_err());
        assert!(monitor.reset_drift("missing").is_err());
    }

    #[test]
    fn test_capability_summary_over_recent_window() {
        let monitor = Monitor::new(config()).unwrap();
        let mut gen = fixture(&[24.0, 25.0, 26.0]);
        for _ in 0..3 {
            monitor.process_tick(gen.next_reading().unwrap());
        }
        let summary = monitor.capability_summary("temperature").unwrap();
        assert!((summary.mean - 25.0).abs() < 1e-12);
        assert!(summary.cp > 0.0);
    }

    #[test]
    fn test_acknowledge_round_trip() {
        let monitor = Monitor::new(config()).unwrap();
        let mut gen = fixture(&[28.5]);
        let event = monitor.process_tick(gen.next_reading().unwrap());
        let id = event.alerts[0].id;

        assert_eq!(monitor.recent_alerts(10, true).len(), 1);
        monitor.acknowledge_alert(id).unwrap();
        assert!(monitor.recent_alerts(10, true).is_empty());
        assert!(monitor.acknowledge_alert(Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_drift_status_on_demand_is_idempotent() {
        let monitor = Monitor::new(config()).unwrap();
        let mut gen = fixture(&[25.0; 25]);
        for _ in 0..25 {
            monitor.process_tick(gen.next_reading().unwrap());
        }
        let first = monitor.drift_status();
        let second = monitor.drift_status();
        assert_eq!(
            first.parameters["temperature"].cusum,
            second.parameters["temperature"].cusum
        );
    }

    #[tokio::test]
    async fn test_subscribe_snapshot_then_live() {
        let monitor = Monitor::new(config()).unwrap();
        let mut gen = fixture(&[25.0; 10]);
        for _ in 0..5 {
            monitor.process_tick(gen.next_reading().unwrap());
        }

        let (snapshot, mut rx) = monitor.subscribe();
        assert_eq!(snapshot.readings.len(), 5);
        assert!(snapshot.alerts.is_empty());

        let published = monitor.process_tick(gen.next_reading().unwrap());
        let live = rx.recv().await.unwrap();
        assert_eq!(live.reading.id, published.reading.id);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_does_not_block_tick() {
        let mut cfg = config();
        cfg.channel_capacity = 2;
        let monitor = Monitor::new(cfg).unwrap();
        let (_snapshot, mut rx) = monitor.subscribe();

        // Publish far past the channel capacity without ever receiving.
        let mut gen = fixture(&[25.0; 20]);
        for _ in 0..20 {
            monitor.process_tick(gen.next_reading().unwrap());
        }
        assert_eq!(monitor.recent_readings(100).len(), 20, "ticks never blocked");

        // The slow subscriber observes a lag error, then catches up.
        match rx.recv().await {
            Err(broadcast::error::RecvError::Lagged(skipped)) => assert!(skipped > 0),
            other => panic!("expected lag, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_loop_processes_and_stops() {
        let mut cfg = config();
        cfg.tick_interval_ms = 5;
        let monitor = Monitor::new(cfg).unwrap();
        let gen = fixture(&[25.0; 1000]);
        let (stop_tx, stop_rx) = watch::channel(false);

        let runner = {
            let monitor = monitor.clone();
            tokio::spawn(async move { monitor.run(gen, stop_rx).await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        stop_tx.send(true).unwrap();
        runner.await.unwrap();

        assert!(!monitor.recent_readings(100).is_empty());
    }

    #[tokio::test]
    async fn test_run_loop_survives_generator_failure() {
        // Fixture exhausts after 2 readings; the loop must keep ticking.
        let mut cfg = config();
        cfg.tick_interval_ms = 5;
        let monitor = Monitor::new(cfg).unwrap();
        let gen = fixture(&[25.0, 25.1]);
        let (stop_tx, stop_rx) = watch::channel(false);

        let runner = {
            let monitor = monitor.clone();
            tokio::spawn(async move { monitor.run(gen, stop_rx).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(80)).await;
        stop_tx.send(true).unwrap();
        runner.await.unwrap();

        assert_eq!(monitor.recent_readings(100).len(), 2, "history unchanged after failures");
    }
}
