//! Threshold evaluation and the read model handed to presentation.
//!
//! Alerts are derived at read time from the latest snapshot. There is no
//! hysteresis: a value that hovers around its threshold flips on every
//! evaluation.

use serde::Serialize;

use crate::config::ThresholdConfig;
use crate::domain::{DashboardState, DashboardStatus, ParameterName};

/// `value > threshold`; a value exactly at the threshold is not an alert
pub fn is_alert(name: ParameterName, value: f64, config: &ThresholdConfig) -> bool {
    value > config.get(name).threshold
}

/// one dashboard card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterView {
    pub name: ParameterName,
    pub label: &'static str,
    /// `None` until the parameter has been sampled
    pub value: Option<f64>,
    pub timestamp_ms: Option<u64>,
    pub unit: String,
    pub threshold: f64,
    pub display_color: String,
    pub alert: bool,
}

/// everything the presentation layer needs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub status: DashboardStatus,
    pub last_error: Option<String>,
    pub parameters: Vec<ParameterView>,
}

impl DashboardView {
    pub fn parameter(&self, name: ParameterName) -> Option<&ParameterView> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn alerts(&self) -> impl Iterator<Item = &ParameterView> {
        self.parameters.iter().filter(|p| p.alert)
    }
}

pub fn evaluate(state: &DashboardState, config: &ThresholdConfig) -> DashboardView {
    let parameters = ParameterName::ALL
        .iter()
        .map(|&name| {
            let spec = config.get(name);
            let reading = state.reading(name);
            ParameterView {
                name,
                label: name.label(),
                value: reading.map(|r| r.value()),
                timestamp_ms: reading.map(|r| r.timestamp_ms()),
                unit: spec.unit.clone(),
                threshold: spec.threshold,
                display_color: spec.display_color.as_str().to_string(),
                alert: reading.is_some_and(|r| is_alert(name, r.value(), config)),
            }
        })
        .collect();

    DashboardView {
        status: state.status,
        last_error: state.last_error.clone(),
        parameters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParameterReading;

    #[test]
    fn alert_is_strictly_above_threshold() {
        let config = ThresholdConfig::default();
        assert!(!is_alert(ParameterName::Moisture, 70.0, &config));
        assert!(is_alert(ParameterName::Moisture, 71.0, &config));
        assert!(is_alert(ParameterName::Moisture, 70.0001, &config));
        assert!(!is_alert(ParameterName::Temperature, 30.0, &config));
        assert!(!is_alert(ParameterName::Humidity, -5.0, &config));
    }

    #[test]
    fn unsampled_parameters_are_never_in_alert() {
        let view = evaluate(&DashboardState::default(), &ThresholdConfig::default());
        assert_eq!(view.status, DashboardStatus::Loading);
        assert_eq!(view.parameters.len(), 3);
        assert!(view.parameters.iter().all(|p| p.value.is_none() && !p.alert));
    }

    #[test]
    fn view_carries_config_and_reading() {
        let mut state = DashboardState::default();
        state.readings.insert(
            ParameterName::Moisture,
            ParameterReading::new(ParameterName::Moisture, 85.0, 42),
        );
        let view = evaluate(&state, &ThresholdConfig::default());

        let moisture = view.parameter(ParameterName::Moisture).unwrap();
        assert_eq!(moisture.label, "Soil Moisture");
        assert_eq!(moisture.value, Some(85.0));
        assert_eq!(moisture.timestamp_ms, Some(42));
        assert_eq!(moisture.unit, "%");
        assert_eq!(moisture.display_color, "#2e7d32");
        assert!(moisture.alert);
        assert_eq!(view.alerts().count(), 1);
    }
}
