//! Simulated wind feed for running without station credentials

use crate::{BatchSource, TransportResult};
use chrono::Utc;
use wind_core::{FieldValue, RawRecord};

/// Batch source generating synthetic wind records
///
/// Produces a plausible slowly-veering breeze derived from the clock,
/// one record per minute going back from now.
pub struct SimulatorFeed {
    base_speed: f64,
}

impl SimulatorFeed {
    pub fn new() -> Self {
        Self { base_speed: 8.0 }
    }

    fn record_at(&self, epoch_millis: i64) -> RawRecord {
        let seconds = epoch_millis / 1000;
        // Pseudo-random variation tied to the timestamp
        let variation = ((seconds % 100) as f64 / 10.0) - 5.0;
        let speed = (self.base_speed + variation).max(0.0);

        RawRecord {
            dateutc: Some(FieldValue::Integer(epoch_millis)),
            windspeedmph: Some(FieldValue::Float(speed)),
            winddir: Some(FieldValue::Float((seconds % 360) as f64)),
            windgustmph: Some(FieldValue::Float(speed * 1.4)),
            mac_address: Some("simulator".to_string()),
            extra: Default::default(),
        }
    }
}

impl Default for SimulatorFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BatchSource for SimulatorFeed {
    fn name(&self) -> &str {
        "simulator"
    }

    async fn fetch_recent(&mut self, limit: usize) -> TransportResult<Vec<RawRecord>> {
        let now_millis = Utc::now().timestamp_millis();
        let records = (0..limit as i64)
            .map(|i| self.record_at(now_millis - i * 60_000))
            .collect();
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::normalize_batch;

    #[tokio::test]
    async fn test_simulator_records_normalize() {
        let mut feed = SimulatorFeed::new();
        let records = feed.fetch_recent(10).await.unwrap();
        assert_eq!(records.len(), 10);

        let samples = normalize_batch(&records, Utc::now());
        assert_eq!(samples.len(), 10);
        assert!(samples.iter().all(|s| s.wind_speed >= 0.0));
        assert!(samples
            .iter()
            .all(|s| (0.0..360.0).contains(&s.wind_direction)));
        // Newest first, one minute apart
        assert!(samples[0].timestamp > samples[1].timestamp);
    }

    #[tokio::test]
    async fn test_simulator_name() {
        let feed = SimulatorFeed::new();
        assert_eq!(feed.name(), "simulator");
    }
}
