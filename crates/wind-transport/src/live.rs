//! Live push transport with bounded reconnect
//!
//! One `LiveClient` owns one logical connection to the feed. The
//! connection task reads newline-delimited JSON frames, normalizes
//! data events into samples, and delivers them over a channel. On
//! connection loss it retries with a fixed delay up to a bounded
//! attempt count, then parks in the `Error` state until `connect` is
//! invoked again.

use crate::records::{decode_frame, SubscribeCommand, WireMessage};
use crate::{SampleSender, TransportError, TransportResult};
use chrono::Utc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use wind_config::Credentials;
use wind_core::{ConnectionState, Sample};

/// Subscription acknowledgment callback channel
pub type SubscribedSender = mpsc::Sender<Vec<String>>;
pub type SubscribedReceiver = mpsc::Receiver<Vec<String>>;

/// Bounded retry policy for the connection task
///
/// There is deliberately no separate connect timeout; attempts are
/// governed solely by the retry cap.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(3),
        }
    }
}

enum SessionEnd {
    /// Sample receiver dropped; nobody is listening anymore
    ConsumerGone,
    /// Peer closed the stream; eligible for reconnect
    StreamClosed,
}

/// Reconnecting client for the live wind feed
#[derive(Debug)]
pub struct LiveClient {
    endpoint: String,
    api_key: String,
    policy: ReconnectPolicy,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
    task: Option<JoinHandle<()>>,
}

impl LiveClient {
    /// Create a client for the given endpoint
    ///
    /// Both credential keys must be present; an empty key is a
    /// configuration error and no connection will be attempted.
    pub fn new(
        endpoint: impl Into<String>,
        credentials: &Credentials,
        policy: ReconnectPolicy,
    ) -> TransportResult<Self> {
        if credentials.api_key.is_empty() {
            return Err(TransportError::Config("missing API key".to_string()));
        }
        if credentials.application_key.is_empty() {
            return Err(TransportError::Config(
                "missing application key".to_string(),
            ));
        }

        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        Ok(Self {
            endpoint: endpoint.into(),
            api_key: credentials.api_key.clone(),
            policy,
            state_tx,
            state_rx,
            task: None,
        })
    }

    /// Watch the connection lifecycle
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state_rx.borrow().is_live()
    }

    /// Start the connection task
    ///
    /// Idempotent: while a task is running this is a no-op. After the
    /// task has parked in `Error` (retries exhausted) or after
    /// `disconnect`, calling `connect` starts over with a fresh
    /// attempt counter.
    pub fn connect(&mut self, samples: SampleSender, subscribed: SubscribedSender) {
        if let Some(task) = &self.task {
            if !task.is_finished() {
                debug!("connect called while already running; ignoring");
                return;
            }
        }

        let endpoint = self.endpoint.clone();
        let api_key = self.api_key.clone();
        let policy = self.policy;
        let state_tx = self.state_tx.clone();

        info!(%endpoint, "starting live feed connection");
        self.task = Some(tokio::spawn(async move {
            run_connection(endpoint, api_key, policy, state_tx, samples, subscribed).await;
        }));
    }

    /// Tear down the connection and any pending reconnect timer
    ///
    /// History held by consumers is untouched; stale data stays
    /// displayable, it just stops being live.
    pub fn disconnect(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.state_tx.send_replace(ConnectionState::Disconnected);
        info!("live feed disconnected");
    }
}

impl Drop for LiveClient {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Bounded reconnect loop
///
/// The attempt counter resets on every successful connect, so a feed
/// that flaps indefinitely keeps reconnecting; only consecutive
/// failures exhaust the cap.
async fn run_connection(
    endpoint: String,
    api_key: String,
    policy: ReconnectPolicy,
    state_tx: watch::Sender<ConnectionState>,
    samples: SampleSender,
    subscribed: SubscribedSender,
) {
    let mut attempts: u32 = 0;

    loop {
        state_tx.send_replace(ConnectionState::Connecting);

        match TcpStream::connect(&endpoint).await {
            Ok(stream) => {
                info!(%endpoint, "feed connected");
                attempts = 0;
                state_tx.send_replace(ConnectionState::Connected);

                match run_session(stream, &api_key, &samples, &subscribed).await {
                    Ok(SessionEnd::ConsumerGone) => {
                        debug!("sample receiver dropped; stopping connection task");
                        state_tx.send_replace(ConnectionState::Disconnected);
                        return;
                    }
                    Ok(SessionEnd::StreamClosed) => warn!("feed closed the stream"),
                    Err(e) => warn!(error = %e, "feed session error"),
                }
                state_tx.send_replace(ConnectionState::Disconnected);
            }
            Err(e) => {
                warn!(error = %e, attempt = attempts + 1, "feed connect failed");
            }
        }

        attempts += 1;
        if attempts >= policy.max_attempts {
            error!(
                attempts,
                "reconnect attempts exhausted; not retrying until connect is invoked again"
            );
            state_tx.send_replace(ConnectionState::Error);
            return;
        }

        sleep(policy.delay).await;
    }
}

async fn run_session(
    stream: TcpStream,
    api_key: &str,
    samples: &SampleSender,
    subscribed: &SubscribedSender,
) -> std::io::Result<SessionEnd> {
    let (reader, mut writer) = stream.into_split();

    // The subscribe handshake goes out only after the connection is
    // established; frames sent earlier are dropped by the backend.
    let handshake = serde_json::to_string(&SubscribeCommand::new(api_key))
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    writer.write_all(handshake.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    debug!("subscribe handshake sent");

    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        match decode_frame(&line) {
            Some(WireMessage::Data(record)) => {
                match Sample::from_record(&record, Utc::now()) {
                    Some(sample) => {
                        if samples.send(sample).await.is_err() {
                            return Ok(SessionEnd::ConsumerGone);
                        }
                    }
                    None => debug!("data frame without wind fields dropped"),
                }
            }
            Some(WireMessage::Subscribed(devices)) => {
                info!(?devices, "subscription acknowledged");
                // One callback per ack; acks are rare enough that
                // waiting for channel capacity is fine. A dropped
                // receiver just means nobody wants them.
                let _ = subscribed.send(devices).await;
            }
            None => debug!("unrecognized frame dropped"),
        }
    }

    Ok(SessionEnd::StreamClosed)
}
