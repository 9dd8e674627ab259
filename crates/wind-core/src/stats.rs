//! Scalar and circular aggregates over wind samples
//!
//! All functions here are pure and total: empty input yields 0, never
//! NaN and never an error, so downstream display code needs no guards.

use crate::types::{Sample, WindAverages};
use chrono::{DateTime, Duration, Utc};

/// The rolling horizons published to consumers, in minutes
pub const WINDOW_MINUTES: [i64; 3] = [5, 10, 20];

/// Resultant vectors shorter than this (relative to sample count) are
/// treated as degenerate: the mean direction is undefined when the
/// unit vectors cancel, so we report a stable 0 instead.
const DEGENERATE_RESULTANT: f64 = 1e-9;

/// Arithmetic mean of wind speed
pub fn average_speed(samples: &[Sample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|s| s.wind_speed).sum();
    sum / samples.len() as f64
}

/// Vector (circular) mean of wind direction, in degrees [0, 360)
///
/// Directions are angles, so 350° and 10° must average to 0°, not
/// 180°. Each direction becomes a unit vector; the mean is the angle
/// of the summed components. Degrees at the boundary, radians only
/// inside the computation.
pub fn average_direction(samples: &[Sample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    for sample in samples {
        let radians = sample.wind_direction.to_radians();
        sum_x += radians.cos();
        sum_y += radians.sin();
    }

    let resultant = (sum_x * sum_x + sum_y * sum_y).sqrt() / samples.len() as f64;
    if resultant < DEGENERATE_RESULTANT {
        return 0.0;
    }

    let mut degrees = sum_y.atan2(sum_x).to_degrees();
    if degrees < 0.0 {
        degrees += 360.0;
    }
    degrees % 360.0
}

/// Maximum wind speed across the sequence
pub fn max_speed(samples: &[Sample]) -> f64 {
    samples
        .iter()
        .map(|s| s.wind_speed)
        .fold(0.0_f64, f64::max)
}

/// Compute the 5/10/20 minute aggregates relative to `now`
///
/// Samples newer than `now` (clock skew) are counted in every window.
pub fn wind_averages(samples: &[Sample], now: DateTime<Utc>) -> WindAverages {
    let window = |minutes: i64| -> Vec<Sample> {
        samples
            .iter()
            .filter(|s| now - s.timestamp <= Duration::minutes(minutes))
            .copied()
            .collect()
    };

    let w5 = window(5);
    let w10 = window(10);
    let w20 = window(20);

    WindAverages {
        avg_speed_5: average_speed(&w5),
        avg_speed_10: average_speed(&w10),
        avg_speed_20: average_speed(&w20),
        avg_direction_5: average_direction(&w5),
        avg_direction_10: average_direction(&w10),
        avg_direction_20: average_direction(&w20),
        high_speed_5: max_speed(&w5),
        high_speed_10: max_speed(&w10),
        high_speed_20: max_speed(&w20),
    }
}
