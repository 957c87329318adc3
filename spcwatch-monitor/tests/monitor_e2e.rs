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

//! End-to-end pipeline scenarios driven through the public `Monitor` API.

use chrono::{Duration, Utc};
use proptest::prelude::*;

use spcwatch_core::{AlertKind, MonitorConfig, ParameterSpec, Reading};
use spcwatch_monitor::{FixtureGenerator, HistoryStore, Monitor, MonitorEvent, ReadingGenerator};

fn temperature_config() -> MonitorConfig {
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

/// Runs a fixed temperature sequence through the monitor, collecting every
/// published event in tick order.
fn run_sequence(config: MonitorConfig, values: &[f64]) -> (Monitor, Vec<MonitorEvent>) {
    let monitor = Monitor::new(config).unwrap();
    let mut gen = FixtureGenerator::single(
        "temperature",
        values,
        "line-1",
        Utc::now() - Duration::hours(2),
        Duration::seconds(2),
    );
    let mut events = Vec::with_capacity(values.len());
    for _ in 0..values.len() {
        events.push(monitor.process_tick(gen.next_reading().unwrap()));
    }
    (monitor, events)
}

#[test]
fn test_sustained_excursion_scenario() {
    // A stable process at target for 25 readings, then a jump to 28.5,
    // beyond the upper specification limit and 5.25 control sigmas above
    // the CUSUM baseline.
    let mut values = vec![25.0; 25];
    values.extend(vec![28.5; 15]);
    let (monitor, events) = run_sequence(temperature_config(), &values);

    // Every post-jump reading evaluates critical out-of-spec.
    for event in &events[25..] {
        let spc = &event.spc["temperature"];
        assert!(spc.out_of_spec);
        assert!(spc.out_of_control);
        assert!(spc.zone.is_out());
    }

    // The 2-second tick spacing keeps all 15 excursion readings inside the
    // 5-minute cooldown, so the condition is reported exactly once.
    let out_of_spec: Vec<_> = events
        .iter()
        .flat_map(|e| &e.alerts)
        .filter(|a| a.kind == AlertKind::OutOfSpec)
        .collect();
    assert_eq!(out_of_spec.len(), 1, "cooldown dedups the repeated excursion");
    assert_eq!(out_of_spec[0].timestamp, events[25].reading.timestamp);

    // Drift analysis runs on ticks 30 and 40. The EWMA crosses its
    // asymptotic limit on the first post-jump analysis; the CUSUM needs two
    // accumulations of z = 5.25 to exceed the decision interval.
    let tick30 = events[29].drift.as_ref().unwrap();
    let d30 = &tick30.parameters["temperature"];
    assert!(d30.ewma.unwrap().alarm, "EWMA alarms on the first analysis");
    assert!(!d30.cusum.unwrap().alarm);

    let tick40 = events[39].drift.as_ref().unwrap();
    let d40 = &tick40.parameters["temperature"];
    assert!(d40.cusum.unwrap().alarm, "CUSUM alarms within two analyses");
    assert_eq!(d40.cusum.unwrap().baseline, 25.0, "baseline from stable phase");

    let fired: Vec<AlertKind> = events
        .iter()
        .flat_map(|e| &e.alerts)
        .map(|a| a.kind)
        .collect();
    assert!(fired.contains(&AlertKind::EwmaDrift));
    assert!(fired.contains(&AlertKind::CusumDrift));

    // Priority ranking puts the specification breach above the drift alarms.
    let ranked = monitor.recent_alerts(10, false);
    assert_eq!(ranked[0].kind, AlertKind::OutOfSpec);
    assert!(ranked[0].priority_score() > ranked[1].priority_score());
}

#[test]
fn test_stable_process_stays_quiet() {
    let values = vec![25.0; 60];
    let (monitor, events) = run_sequence(temperature_config(), &values);

    assert!(events.iter().all(|e| e.alerts.is_empty()));
    assert!(monitor.recent_alerts(10, false).is_empty());

    let report = monitor.drift_status();
    let drift = &report.parameters["temperature"];
    assert_eq!(
        drift.verdict,
        spcwatch_analytics::DriftVerdict::Normal,
        "flat history must not drift"
    );
    assert!(!drift.shift.detected);
    assert!(!drift.trend.significant);
}

#[test]
fn test_drift_reset_after_deliberate_adjustment() {
    // Process recentered from 24.0 to 26.0 on purpose. A small history
    // capacity lets the old regime roll off, so after a reset the fresh
    // baseline forms entirely from post-adjustment readings.
    let mut config = temperature_config();
    config.history_capacity = 25;
    config.analysis_every = 1000; // drift only on demand here
    let monitor = Monitor::new(config).unwrap();

    let mut values = vec![24.0; 30];
    values.extend(vec![26.0; 25]);
    let mut gen = FixtureGenerator::single(
        "temperature",
        &values,
        "line-1",
        Utc::now() - Duration::hours(2),
        Duration::seconds(2),
    );

    for _ in 0..30 {
        monitor.process_tick(gen.next_reading().unwrap());
    }
    let before = monitor.drift_status();
    assert_eq!(
        before.parameters["temperature"].cusum.unwrap().baseline,
        24.0
    );

    monitor.reset_drift("temperature").unwrap();
    for _ in 0..25 {
        monitor.process_tick(gen.next_reading().unwrap());
    }
    let after = monitor.drift_status();
    assert_eq!(
        after.parameters["temperature"].cusum.unwrap().baseline,
        26.0,
        "fresh baseline from the post-adjustment history",
    );
}

#[test]
fn test_capability_degrades_with_excursion() {
    let (monitor, _) = run_sequence(temperature_config(), &[25.0; 40]);
    let stable = monitor.capability_summary("temperature").unwrap();

    let mut values = vec![25.0; 20];
    values.extend(vec![27.9; 20]);
    let (monitor, _) = run_sequence(temperature_config(), &values);
    let shifted = monitor.capability_summary("temperature").unwrap();

    assert!(shifted.std_dev > stable.std_dev);
    assert!(shifted.cpk < 1.0, "off-center process loses capability");
    assert_eq!(shifted.ppk, shifted.cpk);
}

#[test]
fn test_subscriber_sees_full_excursion() {
    let monitor = Monitor::new(temperature_config()).unwrap();
    let mut gen = FixtureGenerator::single(
        "temperature",
        &[25.0, 25.0, 28.5],
        "line-1",
        Utc::now() - Duration::hours(1),
        Duration::seconds(2),
    );
    monitor.process_tick(gen.next_reading().unwrap());

    let (snapshot, mut rx) = monitor.subscribe();
    assert_eq!(snapshot.readings.len(), 1);

    monitor.process_tick(gen.next_reading().unwrap());
    monitor.process_tick(gen.next_reading().unwrap());

    let quiet = rx.try_recv().unwrap();
    assert!(quiet.alerts.is_empty());
    let excursion = rx.try_recv().unwrap();
    assert_eq!(excursion.alerts.len(), 1);
    assert_eq!(excursion.alerts[0].kind, AlertKind::OutOfSpec);
}

proptest! {
    #[test]
    fn prop_history_stays_bounded_and_ordered(
        values in proptest::collection::vec(20.0f64..30.0, 0..150),
        capacity in 1usize..64,
    ) {
        let mut store = HistoryStore::new(capacity);
        let start = Utc::now();
        for (i, &v) in values.iter().enumerate() {
            let mut params = std::collections::HashMap::new();
            params.insert("temperature".to_string(), v);
            store.push(Reading::new(
                i as u64 + 1,
                start + Duration::seconds(i as i64),
                "line-1",
                params,
            ));
        }

        prop_assert!(store.len() <= capacity);
        prop_assert_eq!(store.len(), values.len().min(capacity));

        let all = store.to_vec();
        for pair in all.windows(2) {
            prop_assert!(pair[0].timestamp < pair[1].timestamp);
            prop_assert!(pair[0].id < pair[1].id);
        }
        // The retained suffix is exactly the newest readings.
        if let Some(last) = all.last() {
            prop_assert_eq!(last.id, values.len() as u64);
        }
    }

    #[test]
    fn prop_in_spec_readings_never_alert(value in 23.5f64..26.5) {
        // Zone C body of the temperature spec: no alert kind can fire from
        // SPC evaluation alone.
        let monitor = Monitor::new(temperature_config()).unwrap();
        let mut gen = FixtureGenerator::single(
            "temperature",
            &[value],
            "line-1",
            Utc::now(),
            Duration::seconds(2),
        );
        let event = monitor.process_tick(gen.next_reading().unwrap());
        prop_assert!(event.alerts.is_empty());
        prop_assert!(!event.spc["temperature"].out_of_control);
    }
}
