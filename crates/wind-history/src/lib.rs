//! Bounded, time-windowed history of wind samples
//!
//! The buffer enforces two limits, whichever triggers first: a hard
//! capacity cap bounding memory regardless of arrival rate, and a
//! retention horizon aging out stale samples even when the sensor
//! goes quiet. Readers never mutate it; only the owning controller
//! inserts and sweeps.

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use wind_core::Sample;

/// Hard cap on retained samples
pub const DEFAULT_CAPACITY: usize = 100;

/// Maximum sample age before eviction
pub const RETENTION_MINUTES: i64 = 30;

/// Newest-first store of recent samples
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
    retention: Duration,
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_CAPACITY, RETENTION_MINUTES)
    }

    pub fn with_limits(capacity: usize, retention_minutes: i64) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            retention: Duration::minutes(retention_minutes),
        }
    }

    /// Insert a sample, keeping newest-first order
    ///
    /// Samples normally arrive in order, making this an O(1) prepend;
    /// slightly out-of-order arrivals fall back to a positional
    /// insert. A sample with a timestamp already present is dropped.
    /// Overflow beyond capacity truncates the oldest entries.
    pub fn insert(&mut self, sample: Sample) {
        if self.samples.iter().any(|s| s.timestamp == sample.timestamp) {
            return;
        }

        let position = self
            .samples
            .iter()
            .position(|s| s.timestamp < sample.timestamp)
            .unwrap_or(self.samples.len());
        self.samples.insert(position, sample);

        self.samples.truncate(self.capacity);
    }

    /// Remove every sample older than the retention horizon
    ///
    /// Invoked on a fixed sweep period so a quiet sensor still ages
    /// out stale data.
    pub fn evict_older_than(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.retention;
        while let Some(oldest) = self.samples.back() {
            if oldest.timestamp < cutoff {
                self.samples.pop_back();
            } else {
                break;
            }
        }
    }

    /// Every sample within the last `window_minutes` relative to `now`
    ///
    /// Pure read. An empty buffer yields an empty vec; a window wider
    /// than the retention horizon caps at what is retained.
    pub fn query(&self, window_minutes: i64, now: DateTime<Utc>) -> Vec<Sample> {
        let window = Duration::minutes(window_minutes);
        self.samples
            .iter()
            .take_while(|s| now - s.timestamp <= window)
            .copied()
            .collect()
    }

    /// Most recent sample, if any
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.front()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}
