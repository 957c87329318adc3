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

//! Demo monitor over a simulated sensor feed.
//!
//! Backfills history, then ticks live and prints every alert as it fires.
//! Drift summaries are logged at the analysis cadence via `tracing`.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{Duration, Utc};
use clap::Parser;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use spcwatch_core::MonitorConfig;
use spcwatch_monitor::{Monitor, SimulatedGenerator};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// RNG seed for a reproducible simulated feed
    #[arg(long, env = "SPCWATCH_SEED")]
    seed: Option<u64>,

    /// Tick period in milliseconds (overrides config file)
    #[arg(long)]
    tick_interval_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = match args.config {
        Some(path) => MonitorConfig::from_file(path)?,
        None => MonitorConfig::default(),
    };
    if let Some(ms) = args.tick_interval_ms {
        config.tick_interval_ms = ms;
    }

    let backfill_ticks = config.backfill_ticks;
    let tick = Duration::milliseconds(config.tick_interval_ms as i64);
    let monitor = Monitor::new(config.clone())?;

    // Backfilled readings are stamped into the past so live ticks continue
    // the same timeline.
    let start = Utc::now() - tick * backfill_ticks as i32;
    let mut generator = match args.seed {
        Some(seed) => SimulatedGenerator::with_seed(
            monitor.catalog().clone(),
            config.line.clone(),
            start,
            tick,
            seed,
        ),
        None => SimulatedGenerator::new(monitor.catalog().clone(), config.line.clone(), start, tick),
    };
    monitor.backfill(&mut generator, backfill_ticks)?;

    let (snapshot, mut events) = monitor.subscribe();
    info!(
        readings = snapshot.readings.len(),
        alerts = snapshot.alerts.len(),
        "subscribed after backfill"
    );

    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    for alert in &event.alerts {
                        println!(
                            "[{}] {:?}/{:?} {} priority={} | {}",
                            alert.timestamp.format("%H:%M:%S"),
                            alert.severity,
                            alert.kind,
                            alert.parameter,
                            alert.priority_score(),
                            alert.message,
                        );
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    info!(skipped, "printer lagged behind the feed");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let (stop_tx, stop_rx) = watch::channel(false);
    let runner = {
        let monitor = monitor.clone();
        tokio::spawn(async move { monitor.run(generator, stop_rx).await })
    };

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    stop_tx.send(true)?;
    runner.await?;
    printer.abort();

    for alert in monitor.recent_alerts(10, false) {
        info!(
            kind = ?alert.kind,
            parameter = %alert.parameter,
            priority = alert.priority_score(),
            "session alert"
        );
    }
    Ok(())
}
