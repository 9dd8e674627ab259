//! Aggregation controller: transport -> history -> published state
//!
//! The controller exclusively owns the history buffer. Samples arrive
//! either over the live sample channel (push) or from a `BatchSource`
//! on the poll timer; both paths funnel through the same recompute and
//! the snapshot is replaced atomically on every publish.

use crate::state::{reduce, Action};
use crate::{AggError, AggResult};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use wind_core::{wind_averages, ConnectionState, Sample, WindState};
use wind_history::HistoryBuffer;
use wind_transport::{normalize_batch, BatchSource, SampleReceiver, TransportError};

/// Widest published horizon; recomputation never needs older samples
const WIDEST_WINDOW_MINUTES: i64 = 20;

/// Consumer-issued actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Refresh,
    SetPollingEnabled(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransportMode {
    Push,
    Poll,
}

/// Timer settings for the controller event loop
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub poll_interval: Duration,
    pub evict_interval: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            evict_interval: Duration::from_secs(60),
        }
    }
}

/// The UI-facing contract: snapshot watch plus the two actions
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<WindState>,
}

impl ControllerHandle {
    /// Watch published snapshots
    pub fn state(&self) -> watch::Receiver<WindState> {
        self.state.clone()
    }

    /// Current snapshot by value
    pub fn snapshot(&self) -> WindState {
        self.state.borrow().clone()
    }

    /// Request a refresh; a no-op on push transports but never an error
    pub async fn refresh(&self) -> AggResult<()> {
        self.commands
            .send(Command::Refresh)
            .await
            .map_err(|_| AggError::ControllerStopped)
    }

    /// Toggle background polling; takes effect at the next tick
    pub async fn set_polling_enabled(&self, enabled: bool) -> AggResult<()> {
        self.commands
            .send(Command::SetPollingEnabled(enabled))
            .await
            .map_err(|_| AggError::ControllerStopped)
    }
}

pub struct Controller {
    history: HistoryBuffer,
    mode: TransportMode,
    batch: Option<Box<dyn BatchSource>>,
    batch_limit: usize,
    polling_enabled: bool,
    state_tx: watch::Sender<WindState>,
    commands: mpsc::Receiver<Command>,
}

impl Controller {
    /// Controller for a live push transport
    pub fn push(history: HistoryBuffer) -> (Self, ControllerHandle) {
        Self::new(history, TransportMode::Push, None, 0)
    }

    /// Controller for a poll transport backed by `batch`
    pub fn poll(
        history: HistoryBuffer,
        batch: Box<dyn BatchSource>,
        batch_limit: usize,
    ) -> (Self, ControllerHandle) {
        Self::new(history, TransportMode::Poll, Some(batch), batch_limit)
    }

    fn new(
        history: HistoryBuffer,
        mode: TransportMode,
        batch: Option<Box<dyn BatchSource>>,
        batch_limit: usize,
    ) -> (Self, ControllerHandle) {
        // Waiting-for-first-sample: zero defaults, loading flag up.
        let initial = WindState {
            is_loading: true,
            ..WindState::default()
        };
        let (state_tx, state_rx) = watch::channel(initial);
        let (command_tx, command_rx) = mpsc::channel(16);

        let controller = Self {
            history,
            mode,
            batch,
            batch_limit,
            polling_enabled: true,
            state_tx,
            commands: command_rx,
        };
        let handle = ControllerHandle {
            commands: command_tx,
            state: state_rx,
        };
        (controller, handle)
    }

    /// Ingest one live sample and republish
    pub fn handle_sample(&mut self, sample: Sample) {
        self.handle_sample_at(sample, Utc::now());
    }

    pub fn handle_sample_at(&mut self, sample: Sample, now: DateTime<Utc>) {
        self.history.insert(sample);
        self.publish_success(sample, now);
    }

    /// Refresh on demand
    ///
    /// Poll transports fetch, normalize, and republish. For a push
    /// transport the data is already live, so this silently returns.
    pub async fn refresh(&mut self) {
        match self.mode {
            TransportMode::Push => {
                debug!("refresh requested on live transport; data is already real-time");
            }
            TransportMode::Poll => self.refresh_batch().await,
        }
    }

    async fn refresh_batch(&mut self) {
        self.publish(Action::Loading);

        let Some(batch) = self.batch.as_mut() else {
            self.publish(Action::Error("no batch source configured".to_string()));
            return;
        };

        match batch.fetch_recent(self.batch_limit).await {
            Ok(records) => {
                let now = Utc::now();
                let samples = normalize_batch(&records, now);
                if samples.is_empty() {
                    warn!("fetch returned no usable wind records");
                    self.publish(Action::Error(TransportError::NoData.to_string()));
                    return;
                }

                for sample in &samples {
                    self.history.insert(*sample);
                }
                let current = match self.history.latest() {
                    Some(latest) => *latest,
                    None => return,
                };
                self.publish_success(current, now);
            }
            Err(e) => {
                warn!(error = %e, "batch fetch failed");
                self.publish(Action::Error(e.to_string()));
            }
        }
    }

    pub fn set_polling_enabled(&mut self, enabled: bool) {
        info!(enabled, "background polling toggled");
        self.polling_enabled = enabled;
    }

    pub fn polling_enabled(&self) -> bool {
        self.polling_enabled
    }

    /// Read-only view of the owned history; nothing outside the
    /// controller may mutate it
    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// Age out stale history; trims memory only, the published
    /// snapshot changes on the next recomputation
    pub fn evict_stale(&mut self, now: DateTime<Utc>) {
        self.history.evict_older_than(now);
    }

    /// React to transport lifecycle changes
    ///
    /// Only exhaustion (`Error`) is surfaced; `Connecting` and
    /// `Disconnected` during automatic reconnect stay invisible to
    /// consumers.
    pub fn handle_connection_state(&mut self, state: ConnectionState) {
        match state {
            ConnectionState::Error => {
                self.publish(Action::Error(
                    "live feed connection lost (reconnect attempts exhausted)".to_string(),
                ));
            }
            ConnectionState::Connected => debug!("live feed connected"),
            ConnectionState::Connecting | ConnectionState::Disconnected => {}
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Refresh => self.refresh().await,
            Command::SetPollingEnabled(enabled) => self.set_polling_enabled(enabled),
        }
    }

    fn publish_success(&mut self, current: Sample, now: DateTime<Utc>) {
        let recent = self.history.query(WIDEST_WINDOW_MINUTES, now);
        let averages = wind_averages(&recent, now);
        self.publish(Action::Success {
            current,
            averages,
            timestamp: now,
        });
    }

    fn publish(&mut self, action: Action) {
        let next = {
            let current = self.state_tx.borrow();
            reduce(&current, action)
        };
        self.state_tx.send_replace(next);
    }

    /// Event loop for a push transport
    ///
    /// Runs until the sample channel closes. Eviction sweeps on a
    /// fixed period regardless of arrival rate.
    pub async fn run_push(
        mut self,
        mut samples: SampleReceiver,
        mut connection: watch::Receiver<ConnectionState>,
        opts: RunOptions,
    ) {
        let mut evict = tokio::time::interval(opts.evict_interval);
        evict.set_missed_tick_behavior(MissedTickBehavior::Delay);
        evict.tick().await;

        let mut connection_alive = true;
        let mut commands_alive = true;

        info!("aggregation controller running (push)");
        loop {
            tokio::select! {
                maybe = samples.recv() => match maybe {
                    Some(sample) => self.handle_sample(sample),
                    None => {
                        info!("sample channel closed; controller stopping");
                        break;
                    }
                },
                command = self.commands.recv(), if commands_alive => match command {
                    Some(command) => self.handle_command(command).await,
                    None => commands_alive = false,
                },
                _ = evict.tick() => self.evict_stale(Utc::now()),
                changed = connection.changed(), if connection_alive => match changed {
                    Ok(()) => {
                        let state = *connection.borrow_and_update();
                        self.handle_connection_state(state);
                    }
                    Err(_) => connection_alive = false,
                },
            }
        }
    }

    /// Event loop for a poll transport
    ///
    /// The first poll tick fires immediately (initial fetch). Runs
    /// until the command channel closes.
    pub async fn run_poll(mut self, opts: RunOptions) {
        let mut evict = tokio::time::interval(opts.evict_interval);
        evict.set_missed_tick_behavior(MissedTickBehavior::Delay);
        evict.tick().await;

        let mut poll = tokio::time::interval(opts.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("aggregation controller running (poll)");
        loop {
            tokio::select! {
                _ = poll.tick() => {
                    // The flag is read at tick time, so disabling never
                    // cancels a fetch already in flight.
                    if self.polling_enabled {
                        self.refresh().await;
                    }
                },
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        info!("all handles dropped; controller stopping");
                        break;
                    }
                },
                _ = evict.tick() => self.evict_stale(Utc::now()),
            }
        }
    }
}
