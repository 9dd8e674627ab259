//! Aggregation controller
//!
//! Glues transport, history, and statistics into one reactive
//! published snapshot, with a uniform refresh/polling contract across
//! push and poll transports.

pub mod controller;
pub mod state;

pub use controller::*;
pub use state::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggError {
    #[error("Transport error: {0}")]
    Transport(#[from] wind_transport::TransportError),

    #[error("Controller has stopped")]
    ControllerStopped,
}

pub type AggResult<T> = Result<T, AggError>;
