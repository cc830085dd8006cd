//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `dashboard.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - PollingConfig: How often the scheduler samples the source.
//!     - ServerConfig: Where the read-only JSON API listens.
//!     - LoggingConfig: Log level and whether readings are echoed.
//!     - SourceConfig: Values returned by the built-in static source.
//!     - ThresholdConfig: Alert threshold, unit and colour per parameter.
//!
//! unlike a missing file, a file that exists but is broken is FATAL:
//! the dashboard refuses to start rather than quietly run on defaults.
//! a file must spell out `[thresholds.*]` for every parameter; only the
//! no-file fallback uses the built-in table. misspelled keys in any
//! section are rejected too.
//!
//! ==============================================================================

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::domain::{Color, ParameterName};
use crate::error::ConfigError;

/// environment variable that points at an explicit config file
pub const CONFIG_ENV: &str = "PLANT_MONITOR_CONFIG";

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct DashboardConfig {
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub source: SourceConfig,
    pub thresholds: ThresholdConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct PollingConfig {
    pub interval_seconds: u64,
    /// unset means a sample may take as long as it likes
    pub sample_timeout_seconds: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_seconds: 5, sample_timeout_seconds: None }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub enabled: bool,
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { enabled: true, bind: "0.0.0.0:3000".to_string() }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub show_readings: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_readings: true }
    }
}

/// fixed values served by `StaticSource`
#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub moisture: f64,
    pub temperature: f64,
    pub humidity: f64,
}

impl SourceConfig {
    pub fn value(&self, name: ParameterName) -> f64 {
        match name {
            ParameterName::Moisture => self.moisture,
            ParameterName::Temperature => self.temperature,
            ParameterName::Humidity => self.humidity,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self { moisture: 65.0, temperature: 25.0, humidity: 60.0 }
    }
}

// ==============================================================================
// thresholds
// ==============================================================================

/// per-parameter alert settings
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ThresholdSpec {
    pub threshold: f64,
    pub unit: String,
    pub display_color: Color,
}

impl ThresholdSpec {
    pub fn new(threshold: f64, unit: impl Into<String>, display_color: Color) -> Self {
        Self { threshold, unit: unit.into(), display_color }
    }
}

/// static threshold table, one entry for every `ParameterName`
///
/// completeness is checked on construction, so `get` never misses.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(try_from = "BTreeMap<ParameterName, ThresholdSpec>")]
pub struct ThresholdConfig {
    entries: BTreeMap<ParameterName, ThresholdSpec>,
}

impl ThresholdConfig {
    pub fn new(entries: BTreeMap<ParameterName, ThresholdSpec>) -> Result<Self, ConfigError> {
        for name in ParameterName::ALL {
            let spec = entries.get(&name).ok_or(ConfigError::MissingParameter(name))?;
            if !spec.threshold.is_finite() {
                return Err(ConfigError::InvalidThreshold { name, value: spec.threshold });
            }
            if spec.unit.trim().is_empty() {
                return Err(ConfigError::EmptyUnit(name));
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, name: ParameterName) -> &ThresholdSpec {
        &self.entries[&name]
    }
}

impl TryFrom<BTreeMap<ParameterName, ThresholdSpec>> for ThresholdConfig {
    type Error = ConfigError;

    fn try_from(entries: BTreeMap<ParameterName, ThresholdSpec>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        let entry = |threshold: f64, unit: &str, hex: &'static str| {
            ThresholdSpec::new(threshold, unit, Color::from_static(hex))
        };
        let entries = BTreeMap::from([
            (ParameterName::Moisture, entry(70.0, "%", "#2e7d32")),
            (ParameterName::Temperature, entry(30.0, "°C", "#1976d2")),
            (ParameterName::Humidity, entry(80.0, "%", "#9c27b0")),
        ]);
        Self { entries }
    }
}

// ==============================================================================
// loading
// ==============================================================================

/// where the active configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigOrigin {
    File(PathBuf),
    Defaults,
}

impl DashboardConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: DashboardConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load with default fallback
    ///
    /// an explicit `PLANT_MONITOR_CONFIG` path must exist; the conventional
    /// locations are optional.
    pub fn load_or_default() -> Result<(Self, ConfigOrigin), ConfigError> {
        if let Some(explicit) = std::env::var_os(CONFIG_ENV) {
            let path = PathBuf::from(explicit);
            let config = Self::load(&path)?;
            return Ok((config, ConfigOrigin::File(path)));
        }

        let paths = [
            PathBuf::from("config").join("dashboard.toml"),
            PathBuf::from("..").join("config").join("dashboard.toml"),
        ];

        for path in paths {
            if path.exists() {
                let config = Self::load(&path)?;
                return Ok((config, ConfigOrigin::File(path)));
            }
        }

        Ok((Self::default(), ConfigOrigin::Defaults))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polling.interval_seconds == 0 {
            return Err(ConfigError::InvalidInterval("polling.interval_seconds"));
        }
        if self.polling.sample_timeout_seconds == Some(0) {
            return Err(ConfigError::InvalidInterval("polling.sample_timeout_seconds"));
        }
        self.bind_addr()?;
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_seconds)
    }

    pub fn sample_timeout(&self) -> Option<Duration> {
        self.polling.sample_timeout_seconds.map(Duration::from_secs)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|_| ConfigError::InvalidBind(self.server.bind.clone()))
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        tracing::info!(
            interval_secs = self.polling.interval_seconds,
            sample_timeout_secs = ?self.polling.sample_timeout_seconds,
            server_enabled = self.server.enabled,
            bind = %self.server.bind,
            log_level = %self.logging.level,
            "Dashboard configuration",
        );
        for name in ParameterName::ALL {
            let spec = self.thresholds.get(name);
            tracing::info!(
                parameter = %name,
                threshold = spec.threshold,
                unit = %spec.unit,
                color = spec.display_color.as_str(),
                "Threshold",
            );
        }
    }
}
