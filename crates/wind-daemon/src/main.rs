//! Windline daemon - live wind telemetry aggregation
//!
//! This binary coordinates:
//! - Wind data acquisition (live push feed or simulator)
//! - Bounded time-windowed history
//! - Published rolling aggregates (5/10/20 minute windows)

mod config;

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wind_agg::{Controller, ControllerHandle, RunOptions};
use wind_config::AppConfig;
use wind_history::HistoryBuffer;
use wind_transport::{sample_channel, LiveClient, ReconnectPolicy, SimulatorFeed};

use crate::config::{DaemonConfig, TransportKind};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Windline daemon");

    let config = DaemonConfig::from_env()?;
    info!("Loaded configuration: {:?}", config);

    let app_config = AppConfig::load().context("Failed to load credential configuration")?;

    let run_opts = RunOptions {
        poll_interval: Duration::from_secs(config.poll_interval),
        ..RunOptions::default()
    };

    let shutdown = setup_shutdown_handler();

    match config.transport {
        TransportKind::Live => {
            // Absent credentials mean "do not connect", so this is a
            // configuration failure, not something to retry.
            let credentials = app_config
                .credentials()
                .context("Live transport requires api_key and application_key in config")?;
            let endpoint = app_config.feed_endpoint();

            let mut client =
                LiveClient::new(endpoint, &credentials, ReconnectPolicy::default())
                    .context("Failed to construct live client")?;

            let (sample_tx, sample_rx) = sample_channel(64);
            let (sub_tx, mut sub_rx) = mpsc::channel::<Vec<String>>(4);
            let connection = client.state();

            client.connect(sample_tx, sub_tx);
            info!("Live feed client started");

            tokio::spawn(async move {
                while let Some(devices) = sub_rx.recv().await {
                    info!(?devices, "station subscription acknowledged");
                }
            });

            let (controller, handle) = Controller::push(HistoryBuffer::new());
            spawn_state_logger(&handle);

            tokio::select! {
                _ = controller.run_push(sample_rx, connection, run_opts) => {
                    warn!("Controller stopped");
                }
                _ = shutdown => {
                    info!("Shutdown signal received");
                    client.disconnect();
                }
            }
        }
        TransportKind::Simulator => {
            let (controller, handle) = Controller::poll(
                HistoryBuffer::new(),
                Box::new(SimulatorFeed::new()),
                config.batch_limit,
            );
            spawn_state_logger(&handle);
            info!("Simulator feed started");

            tokio::select! {
                _ = controller.run_poll(run_opts) => {
                    warn!("Controller stopped");
                }
                _ = shutdown => {
                    info!("Shutdown signal received");
                }
            }
        }
    }

    info!("Windline daemon stopped");
    Ok(())
}

/// Log each published snapshot
fn spawn_state_logger(handle: &ControllerHandle) {
    let mut state = handle.state();
    tokio::spawn(async move {
        while state.changed().await.is_ok() {
            let snapshot = state.borrow().clone();
            debug!(
                speed = snapshot.current_speed,
                direction = snapshot.current_direction,
                avg5 = snapshot.averages.avg_speed_5,
                high5 = snapshot.averages.high_speed_5,
                live = snapshot.using_real_data,
                "wind snapshot"
            );
        }
    });
}

/// Setup graceful shutdown handler
async fn setup_shutdown_handler() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to setup signal handler");
}
