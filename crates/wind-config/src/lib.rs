use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Station credential pair as stored by the operator
///
/// Both keys are required before any connection attempt; the mac
/// address is an optional device filter passed through opaquely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub api_key: String,
    pub application_key: String,
    pub mac_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationSection {
    pub api_key: Option<String>,
    pub application_key: Option<String>,
    pub mac_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSection {
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub station: Option<StationSection>,
    pub feed: Option<FeedSection>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppConfig {
    /// Load configuration from WINDLINE_CONFIG path (TOML) if present, with reasonable defaults
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("WINDLINE_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        let cfg = if Path::new(&path).exists() {
            let s = fs::read_to_string(&path)?;
            toml::from_str::<AppConfig>(&s)?
        } else {
            AppConfig::default()
        };
        Ok(cfg)
    }

    /// Credentials, only when both keys are configured and non-empty
    ///
    /// `None` means "do not connect" - a missing credential is a
    /// configuration condition, never a connection error.
    pub fn credentials(&self) -> Option<Credentials> {
        let station = self.station.as_ref()?;
        let api_key = station.api_key.as_deref().filter(|k| !k.is_empty())?;
        let application_key = station
            .application_key
            .as_deref()
            .filter(|k| !k.is_empty())?;

        Some(Credentials {
            api_key: api_key.to_string(),
            application_key: application_key.to_string(),
            mac_address: station.mac_address.clone(),
        })
    }

    /// Live feed endpoint (default rt2.ambientweather.net:8660)
    pub fn feed_endpoint(&self) -> String {
        self.feed
            .as_ref()
            .and_then(|f| f.endpoint.clone())
            .unwrap_or_else(|| "rt2.ambientweather.net:8660".to_string())
    }
}
