//! Published-state reducer
//!
//! The snapshot evolves only through `reduce`, so every transition is
//! explicit and testable without any transport attached. Consumers
//! always see a whole snapshot, never a partial update.

use chrono::{DateTime, Utc};
use wind_core::{Sample, WindAverages, WindState};

/// State-machine inputs
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A refresh attempt started (poll transports only)
    Loading,

    /// A recomputation succeeded; replaces the snapshot wholesale
    Success {
        current: Sample,
        averages: WindAverages,
        timestamp: DateTime<Utc>,
    },

    /// A transport-level failure; keeps last-known-good aggregates so
    /// the display never flashes to zero
    Error(String),

    /// Back to all-zero defaults
    Reset,
}

pub fn reduce(state: &WindState, action: Action) -> WindState {
    match action {
        Action::Loading => WindState {
            is_loading: true,
            error: None,
            ..state.clone()
        },
        Action::Success {
            current,
            averages,
            timestamp,
        } => WindState {
            current_speed: current.wind_speed,
            current_direction: current.wind_direction,
            current_gust: current.wind_gust,
            averages,
            using_real_data: true,
            last_updated: Some(timestamp),
            is_loading: false,
            error: None,
        },
        Action::Error(message) => WindState {
            is_loading: false,
            using_real_data: false,
            error: Some(message),
            ..state.clone()
        },
        Action::Reset => WindState::default(),
    }
}
