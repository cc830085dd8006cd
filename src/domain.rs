use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// the closed set of monitored parameters
///
/// adding a parameter means adding a variant here plus a threshold entry in
/// the config file; nothing else is keyed by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterName {
    Moisture,
    Temperature,
    Humidity,
}

impl ParameterName {
    pub const ALL: [ParameterName; 3] = [
        ParameterName::Moisture,
        ParameterName::Temperature,
        ParameterName::Humidity,
    ];

    /// config / json key
    pub fn key(self) -> &'static str {
        match self {
            ParameterName::Moisture => "moisture",
            ParameterName::Temperature => "temperature",
            ParameterName::Humidity => "humidity",
        }
    }

    /// human-readable title shown on the dashboard card
    pub fn label(self) -> &'static str {
        match self {
            ParameterName::Moisture => "Soil Moisture",
            ParameterName::Temperature => "Temperature",
            ParameterName::Humidity => "Humidity",
        }
    }
}

impl fmt::Display for ParameterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// a single timestamped value for one parameter
///
/// fields are read-only once constructed; a newer value is a new reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterReading {
    name: ParameterName,
    value: f64,
    /// unix timestamp in milliseconds
    timestamp_ms: u64,
}

impl ParameterReading {
    pub fn new(name: ParameterName, value: f64, timestamp_ms: u64) -> Self {
        Self { name, value, timestamp_ms }
    }

    pub fn name(&self) -> ParameterName {
        self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }
}

/// display colour in `#rrggbb` form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(String);

impl Color {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let hex = raw
            .strip_prefix('#')
            .filter(|h| h.len() == 6 && h.chars().all(|c| c.is_ascii_hexdigit()));
        match hex {
            Some(_) => Ok(Self(raw.to_ascii_lowercase())),
            None => Err(ConfigError::InvalidColor(raw.to_string())),
        }
    }

    /// built-in defaults only; the literal must already be `#rrggbb`
    pub(crate) fn from_static(hex: &'static str) -> Self {
        Self(hex.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Color {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.0
    }
}

/// overall dashboard status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardStatus {
    #[default]
    Loading,
    Ready,
    Error,
}

/// current dashboard state, owned by the state store
///
/// readers only ever get a clone of this (see `StateStore::snapshot`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardState {
    /// latest reading per parameter; absent means not yet sampled
    pub readings: BTreeMap<ParameterName, ParameterReading>,
    pub status: DashboardStatus,
    /// message of the most recent source failure while status is Error
    pub last_error: Option<String>,
}

impl DashboardState {
    pub fn reading(&self, name: ParameterName) -> Option<&ParameterReading> {
        self.readings.get(&name)
    }

    /// true once every known parameter has been sampled at least once
    pub fn is_complete(&self) -> bool {
        ParameterName::ALL.iter().all(|n| self.readings.contains_key(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_names_use_lowercase_keys() {
        let json = serde_json::to_string(&ParameterName::Temperature).unwrap();
        assert_eq!(json, "\"temperature\"");
        let back: ParameterName = serde_json::from_str("\"humidity\"").unwrap();
        assert_eq!(back, ParameterName::Humidity);
    }

    #[test]
    fn reading_exposes_what_it_was_built_with() {
        let r = ParameterReading::new(ParameterName::Humidity, 61.5, 1_700_000_000_000);
        assert_eq!(r.name(), ParameterName::Humidity);
        assert_eq!(r.value(), 61.5);
        assert_eq!(r.timestamp_ms(), 1_700_000_000_000);

        let json = serde_json::to_value(r).unwrap();
        assert_eq!(json["name"], "humidity");
        assert_eq!(json["timestamp_ms"], 1_700_000_000_000u64);
    }

    #[test]
    fn color_accepts_hex_and_rejects_names() {
        assert_eq!(Color::parse("#2E7D32").unwrap().as_str(), "#2e7d32");
        assert!(matches!(Color::parse("green"), Err(ConfigError::InvalidColor(_))));
        assert!(Color::parse("#12345").is_err());
        assert!(Color::parse("#12345g").is_err());
    }

    #[test]
    fn state_is_complete_only_with_every_parameter() {
        let mut state = DashboardState::default();
        state.readings.insert(
            ParameterName::Moisture,
            ParameterReading::new(ParameterName::Moisture, 65.0, 1),
        );
        state.readings.insert(
            ParameterName::Temperature,
            ParameterReading::new(ParameterName::Temperature, 25.0, 1),
        );
        assert!(!state.is_complete());
        state.readings.insert(
            ParameterName::Humidity,
            ParameterReading::new(ParameterName::Humidity, 60.0, 1),
        );
        assert!(state.is_complete());
    }
}
