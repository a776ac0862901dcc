use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const POLL_INTERVAL_SECS_MIN: u64 = 1;
pub const POLL_INTERVAL_SECS_MAX: u64 = 60;
pub const HISTORY_CAPACITY_MIN: usize = 10;
pub const HISTORY_CAPACITY_MAX: usize = 1000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("poll interval must be between 1 and 60 seconds (got {0})")]
    PollInterval(u64),
    #[error("history capacity must be between 10 and 1000 records (got {0})")]
    HistoryCapacity(usize),
    #[error(
        "heart-rate thresholds must be strictly increasing (low {low}, normal {normal}, high {high})"
    )]
    HeartRateOrder { low: u32, normal: u32, high: u32 },
    #[error("saturation low threshold must be below the good threshold (low {low}, good {good})")]
    SaturationOrder { low: f64, good: f64 },
    #[error("unknown config field: {0}")]
    UnknownField(String),
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("dashboard has been torn down")]
    TornDown,
}

/// Classification thresholds for the vital signs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub heart_rate_low: u32,
    pub heart_rate_normal: u32,
    pub heart_rate_high: u32,
    pub saturation_low: f64,
    pub saturation_good: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            heart_rate_low: 60,
            heart_rate_normal: 100,
            heart_rate_high: 150,
            saturation_low: 95.0,
            saturation_good: 98.0,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heart_rate_low >= self.heart_rate_normal
            || self.heart_rate_normal >= self.heart_rate_high
        {
            return Err(ConfigError::HeartRateOrder {
                low: self.heart_rate_low,
                normal: self.heart_rate_normal,
                high: self.heart_rate_high,
            });
        }
        // NaN fails the comparison and is rejected here too
        if !(self.saturation_low < self.saturation_good) {
            return Err(ConfigError::SaturationOrder {
                low: self.saturation_low,
                good: self.saturation_good,
            });
        }
        Ok(())
    }
}

/// User-editable dashboard configuration. Every instance handed out by the
/// public constructors has passed `validate`.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub poll_interval_secs: u64,
    pub history_capacity: usize,
    pub thresholds: Thresholds,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 2,
            history_capacity: 50,
            thresholds: Thresholds::default(),
        }
    }
}

pub fn validate_poll_interval(secs: u64) -> Result<u64, ConfigError> {
    if (POLL_INTERVAL_SECS_MIN..=POLL_INTERVAL_SECS_MAX).contains(&secs) {
        Ok(secs)
    } else {
        Err(ConfigError::PollInterval(secs))
    }
}

pub fn validate_history_capacity(capacity: usize) -> Result<usize, ConfigError> {
    if (HISTORY_CAPACITY_MIN..=HISTORY_CAPACITY_MAX).contains(&capacity) {
        Ok(capacity)
    } else {
        Err(ConfigError::HistoryCapacity(capacity))
    }
}

impl DashboardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_poll_interval(self.poll_interval_secs)?;
        validate_history_capacity(self.history_capacity)?;
        self.thresholds.validate()
    }

    /// Returns a copy with `field` applied, or the validation failure.
    /// `self` is never modified.
    pub fn with_field(&self, field: ConfigField) -> Result<Self, ConfigError> {
        let mut next = self.clone();
        match field {
            ConfigField::PollInterval(secs) => next.poll_interval_secs = secs,
            ConfigField::HistoryCapacity(capacity) => next.history_capacity = capacity,
            ConfigField::HeartRateLow(v) => next.thresholds.heart_rate_low = v,
            ConfigField::HeartRateNormal(v) => next.thresholds.heart_rate_normal = v,
            ConfigField::HeartRateHigh(v) => next.thresholds.heart_rate_high = v,
            ConfigField::SaturationLow(v) => next.thresholds.saturation_low = v,
            ConfigField::SaturationGood(v) => next.thresholds.saturation_good = v,
        }
        next.validate()?;
        Ok(next)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let doc: ConfigDocument = serde_json::from_str(raw)?;
        let config = Self::from(doc);
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(&ConfigDocument::from(self))?)
    }
}

/// A single named configuration update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigField {
    PollInterval(u64),
    HistoryCapacity(usize),
    HeartRateLow(u32),
    HeartRateNormal(u32),
    HeartRateHigh(u32),
    SaturationLow(f64),
    SaturationGood(f64),
}

impl ConfigField {
    pub const NAMES: [&'static str; 7] = [
        "interval",
        "history",
        "hr.low",
        "hr.normal",
        "hr.high",
        "spo2.low",
        "spo2.good",
    ];

    /// Parses a `name value` pair as typed in the driver.
    pub fn parse(name: &str, value: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            field: name.to_string(),
            value: value.to_string(),
        };
        let value = value.trim();
        match name {
            "interval" => value.parse().map(ConfigField::PollInterval).map_err(|_| invalid()),
            "history" => value.parse().map(ConfigField::HistoryCapacity).map_err(|_| invalid()),
            "hr.low" => value.parse().map(ConfigField::HeartRateLow).map_err(|_| invalid()),
            "hr.normal" => value.parse().map(ConfigField::HeartRateNormal).map_err(|_| invalid()),
            "hr.high" => value.parse().map(ConfigField::HeartRateHigh).map_err(|_| invalid()),
            "spo2.low" => value.parse().map(ConfigField::SaturationLow).map_err(|_| invalid()),
            "spo2.good" => value.parse().map(ConfigField::SaturationGood).map_err(|_| invalid()),
            other => Err(ConfigError::UnknownField(other.to_string())),
        }
    }
}

/// JSON shape shared with the backend's `/configuracoes` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub intervalo_atualizacao: u64,
    pub limite_historico: usize,
    pub limites_batimento: HeartRateLimits,
    pub limites_saturacao: SaturationLimits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartRateLimits {
    pub baixo: u32,
    pub normal: u32,
    pub alto: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaturationLimits {
    pub baixo: f64,
    pub bom: f64,
}

impl From<ConfigDocument> for DashboardConfig {
    fn from(doc: ConfigDocument) -> Self {
        Self {
            poll_interval_secs: doc.intervalo_atualizacao,
            history_capacity: doc.limite_historico,
            thresholds: Thresholds {
                heart_rate_low: doc.limites_batimento.baixo,
                heart_rate_normal: doc.limites_batimento.normal,
                heart_rate_high: doc.limites_batimento.alto,
                saturation_low: doc.limites_saturacao.baixo,
                saturation_good: doc.limites_saturacao.bom,
            },
        }
    }
}

impl From<&DashboardConfig> for ConfigDocument {
    fn from(config: &DashboardConfig) -> Self {
        let t = &config.thresholds;
        Self {
            intervalo_atualizacao: config.poll_interval_secs,
            limite_historico: config.history_capacity,
            limites_batimento: HeartRateLimits {
                baixo: t.heart_rate_low,
                normal: t.heart_rate_normal,
                alto: t.heart_rate_high,
            },
            limites_saturacao: SaturationLimits {
                baixo: t.saturation_low,
                bom: t.saturation_good,
            },
        }
    }
}
