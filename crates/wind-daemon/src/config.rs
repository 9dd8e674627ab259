//! Daemon configuration from environment variables

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportKind {
    /// Live push feed (requires station credentials)
    Live,
    /// Synthetic poll source for running without credentials
    Simulator,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Which transport to run
    pub transport: TransportKind,

    /// Poll interval in seconds for batch transports (default: 60)
    pub poll_interval: u64,

    /// Records per batch fetch (default: 10)
    pub batch_limit: usize,
}

impl DaemonConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let transport = match env::var("TRANSPORT")
            .unwrap_or_else(|_| "simulator".to_string())
            .as_str()
        {
            "live" => TransportKind::Live,
            "simulator" => TransportKind::Simulator,
            other => anyhow::bail!("Unknown TRANSPORT: {other}"),
        };

        let poll_interval = env::var("POLL_INTERVAL")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .context("Invalid POLL_INTERVAL")?;

        let batch_limit = env::var("BATCH_LIMIT")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("Invalid BATCH_LIMIT")?;

        Ok(Self {
            transport,
            poll_interval,
            batch_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test body: these mutate process-global env vars and must
    // not run concurrently.
    #[test]
    fn test_config_from_env() {
        env::remove_var("TRANSPORT");
        env::remove_var("POLL_INTERVAL");
        env::remove_var("BATCH_LIMIT");

        let config = DaemonConfig::from_env().unwrap();
        assert_eq!(config.transport, TransportKind::Simulator);
        assert_eq!(config.poll_interval, 60);
        assert_eq!(config.batch_limit, 10);

        env::set_var("TRANSPORT", "live");
        env::set_var("POLL_INTERVAL", "15");
        let config = DaemonConfig::from_env().unwrap();
        assert_eq!(config.transport, TransportKind::Live);
        assert_eq!(config.poll_interval, 15);

        env::set_var("TRANSPORT", "carrier-pigeon");
        assert!(DaemonConfig::from_env().is_err());

        env::remove_var("TRANSPORT");
        env::remove_var("POLL_INTERVAL");
    }
}
