//! Core data types for wind telemetry

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A raw field value as stations actually send it
///
/// Feeds are not strict about numeric types: speeds arrive as floats,
/// integers, or occasionally quoted strings. Anything non-numeric is
/// treated as absent downstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Text(String),
    Null,
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            FieldValue::Float(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

/// Raw wind record as carried by the station feed
///
/// Field names match the provider wire format. Unknown fields are
/// retained in `extra` but never interpreted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RawRecord {
    /// Observation time, epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dateutc: Option<FieldValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windspeedmph: Option<FieldValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winddir: Option<FieldValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windgustmph: Option<FieldValue>,

    /// Station identifier
    #[serde(rename = "macAddress", default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,

    /// Passthrough fields ignored by the aggregation core
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl RawRecord {
    /// True if the record carries at least one wind observation
    pub fn has_wind_fields(&self) -> bool {
        self.windspeedmph.is_some() || self.winddir.is_some()
    }
}

/// One normalized wind observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,

    /// Wind speed in mph, never negative
    pub wind_speed: f64,

    /// Wind direction in degrees, always in [0, 360)
    pub wind_direction: f64,

    /// Gust speed in mph, never negative
    pub wind_gust: f64,
}

impl Sample {
    /// Normalize a raw feed record into a sample
    ///
    /// Records carrying neither a speed nor a direction field are
    /// rejected. Missing or non-numeric fields default to 0. A missing
    /// observation time falls back to `received_at`.
    pub fn from_record(record: &RawRecord, received_at: DateTime<Utc>) -> Option<Sample> {
        if !record.has_wind_fields() {
            return None;
        }

        let numeric = |field: &Option<FieldValue>| -> f64 {
            field.as_ref().and_then(FieldValue::as_f64).unwrap_or(0.0)
        };

        let timestamp = record
            .dateutc
            .as_ref()
            .and_then(FieldValue::as_i64)
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .unwrap_or(received_at);

        Some(Sample {
            timestamp,
            wind_speed: numeric(&record.windspeedmph).max(0.0),
            wind_direction: numeric(&record.winddir).rem_euclid(360.0),
            wind_gust: numeric(&record.windgustmph).max(0.0),
        })
    }
}

/// Lifecycle of the live feed connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl ConnectionState {
    /// Only a connected feed is considered live; readers must treat
    /// everything else as stale-but-displayable.
    pub fn is_live(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Error => "error",
        };
        f.write_str(label)
    }
}

/// Rolling-window aggregates over the 5/10/20 minute horizons
///
/// Derived on every publish tick, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct WindAverages {
    pub avg_speed_5: f64,
    pub avg_speed_10: f64,
    pub avg_speed_20: f64,
    pub avg_direction_5: f64,
    pub avg_direction_10: f64,
    pub avg_direction_20: f64,
    pub high_speed_5: f64,
    pub high_speed_10: f64,
    pub high_speed_20: f64,
}

/// Consolidated snapshot published to consumers
///
/// Replaced wholesale on every recomputation so a reader never sees
/// speed from one tick and direction from another.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindState {
    pub current_speed: f64,
    pub current_direction: f64,
    pub current_gust: f64,

    #[serde(flatten)]
    pub averages: WindAverages,

    /// False whenever the feed is in an error state
    pub using_real_data: bool,

    pub last_updated: Option<DateTime<Utc>>,

    pub is_loading: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for WindState {
    fn default() -> Self {
        Self {
            current_speed: 0.0,
            current_direction: 0.0,
            current_gust: 0.0,
            averages: WindAverages::default(),
            using_real_data: false,
            last_updated: None,
            is_loading: false,
            error: None,
        }
    }
}
