//! Wire frame decoding and batch normalization
//!
//! The feed speaks newline-delimited JSON. Every frame carries an
//! `event` tag; frames without a recognized tag, and frames that fail
//! the structural parse, are dropped by the caller. One bad frame
//! must never interrupt a live stream.

use chrono::{DateTime, Utc};
use serde::Serialize;
use wind_core::{RawRecord, Sample};

/// Post-connect subscribe handshake
///
/// Must be sent after the connection is acknowledged; frames sent
/// earlier are dropped by the backend.
#[derive(Debug, Clone, Serialize)]
pub struct SubscribeCommand {
    pub command: String,
    #[serde(rename = "apiKeys")]
    pub api_keys: Vec<String>,
}

impl SubscribeCommand {
    pub fn new(api_key: &str) -> Self {
        Self {
            command: "subscribe".to_string(),
            api_keys: vec![api_key.to_string()],
        }
    }
}

/// Recognized inbound frames
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    /// A weather update carrying observation fields
    Data(RawRecord),
    /// Subscription acknowledgment listing device identifiers
    Subscribed(Vec<String>),
}

/// Decode one frame; `None` means "drop it"
///
/// Covers both failure modes the same way: structurally malformed
/// JSON and structurally valid frames without a recognized event tag.
pub fn decode_frame(frame: &str) -> Option<WireMessage> {
    let value: serde_json::Value = serde_json::from_str(frame).ok()?;

    match value.get("event").and_then(|e| e.as_str()) {
        Some("data") => serde_json::from_value::<RawRecord>(value)
            .ok()
            .map(WireMessage::Data),
        Some("subscribed") => {
            let devices = value
                .get("devices")
                .and_then(|d| d.as_array())
                .map(|arr| {
                    arr.iter()
                        .filter_map(|d| d.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();
            Some(WireMessage::Subscribed(devices))
        }
        _ => None,
    }
}

/// Normalize a fetched batch into samples
///
/// Same rules as the live path: records without any wind field are
/// skipped, missing numerics default to 0.
pub fn normalize_batch(records: &[RawRecord], received_at: DateTime<Utc>) -> Vec<Sample> {
    records
        .iter()
        .filter_map(|record| Sample::from_record(record, received_at))
        .collect()
}
