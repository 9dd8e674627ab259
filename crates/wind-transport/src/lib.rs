//! Transports for wind telemetry
//!
//! Two acquisition styles share one normalization path: the live push
//! client (`live::LiveClient`) delivering samples over a channel as
//! they arrive, and the `BatchSource` trait for poll-style transports
//! that fetch a batch of recent records on demand.

pub mod live;
pub mod records;
pub mod simulator;

pub use live::*;
pub use records::*;
pub use simulator::*;

use thiserror::Error;
use tokio::sync::mpsc;
use wind_core::{RawRecord, Sample};

#[derive(Debug, Error)]
pub enum TransportError {
    /// Missing or empty credentials; never retried automatically
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Subscribe handshake failed: {0}")]
    Handshake(String),

    #[error("Gave up after {0} failed connection attempts")]
    RetriesExhausted(u32),

    #[error("No data returned")]
    NoData,
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Poll-style transport: fetch a batch of recent raw records
///
/// The REST fallback plugs in here; its output goes through the same
/// normalization rules as the live feed.
#[async_trait::async_trait]
pub trait BatchSource: Send + Sync {
    /// Source name/identifier
    fn name(&self) -> &str;

    /// Fetch up to `limit` recent records, newest first
    async fn fetch_recent(&mut self, limit: usize) -> TransportResult<Vec<RawRecord>>;
}

/// Channel types for async sample delivery
pub type SampleReceiver = mpsc::Receiver<Sample>;
pub type SampleSender = mpsc::Sender<Sample>;

/// Create a new sample channel with specified buffer size
pub fn sample_channel(buffer_size: usize) -> (SampleSender, SampleReceiver) {
    mpsc::channel(buffer_size)
}
