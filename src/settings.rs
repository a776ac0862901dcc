//! Process settings read from the environment.
//!
//! - `ATHLETE_PULSE_BACKEND_URL` - backend base URL (default `http://localhost:8000`)
//! - `ATHLETE_PULSE_CONFIG`      - optional JSON dashboard config file
//! - `ATHLETE_PULSE_POLL_SECS`   - optional poll interval override
//! - `ATHLETE_PULSE_HISTORY`     - optional history capacity override

use std::path::PathBuf;
use crate::kernel::config::{ConfigError, ConfigField, DashboardConfig};
use crate::services::backend::client::DEFAULT_BASE_URL;

pub const ENV_BACKEND_URL: &str = "ATHLETE_PULSE_BACKEND_URL";
pub const ENV_CONFIG_PATH: &str = "ATHLETE_PULSE_CONFIG";
pub const ENV_POLL_SECS: &str = "ATHLETE_PULSE_POLL_SECS";
pub const ENV_HISTORY: &str = "ATHLETE_PULSE_HISTORY";

#[derive(Debug, Clone)]
pub struct Settings {
    pub backend_url: String,
    pub dashboard: DashboardConfig,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves settings through `lookup` so callers can supply a fake environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend_url = lookup(ENV_BACKEND_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut dashboard = match lookup(ENV_CONFIG_PATH) {
            Some(path) => DashboardConfig::load(&PathBuf::from(path))?,
            None => DashboardConfig::default(),
        };

        if let Some(raw) = lookup(ENV_POLL_SECS) {
            dashboard = dashboard.with_field(ConfigField::parse("interval", &raw)?)?;
        }
        if let Some(raw) = lookup(ENV_HISTORY) {
            dashboard = dashboard.with_field(ConfigField::parse("history", &raw)?)?;
        }

        Ok(Self { backend_url, dashboard })
    }
}
