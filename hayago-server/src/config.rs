use std::{net::SocketAddr, path::Path, time::Duration};

use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub request_timeout_secs: u64,
    pub concurrency_limit: usize,
    pub nearby: NearbyConfig,
    pub history: HistoryConfig,
}

/// Nearby driver search
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NearbyConfig {
    pub default_radius_km: f64,
    /// Only fixes younger than this count as a live driver
    pub recent_minutes: i64,
    pub max_results: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub default_hours: i64,
    pub default_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            request_timeout_secs: 30,
            concurrency_limit: 256,
            nearby: NearbyConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl Default for NearbyConfig {
    fn default() -> Self {
        Self {
            default_radius_km: 5.0,
            recent_minutes: 5,
            max_results: 20,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_hours: 24,
            default_limit: 1000,
        }
    }
}

impl ServerConfig {
    /// Reads a TOML file; missing keys keep their defaults
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ApiError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ApiError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ApiError> {
        let config: Self = toml::from_str(text).map_err(|e| ApiError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn validate(&self) -> Result<(), ApiError> {
        if self.nearby.default_radius_km <= 0.0 {
            return Err(ApiError::Config(
                "nearby.default_radius_km must be greater than 0".to_string(),
            ));
        }
        if self.concurrency_limit == 0 {
            return Err(ApiError::Config(
                "concurrency_limit must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
