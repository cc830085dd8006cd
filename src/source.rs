//! ==============================================================================
//! source.rs - Parameter Source Capability
//! ==============================================================================
//!
//! purpose:
//!     defines the one capability the core needs from the outside world:
//!     "give me the current parameter values". whatever actually talks to
//!     the sensors (http endpoint, message bus, i2c bus) plugs in here.
//!
//! contract:
//!     - on success, return one reading per known parameter. a subset is
//!       tolerated: parameters left out keep their previous reading.
//!     - on failure, fail as a unit with a `SourceError`.
//!     - may take arbitrarily long. the scheduler never waits on it from
//!       the timer, and drops ticks while a sample is still in flight.
//!
//! relationships:
//!     - used by: scheduler.rs (calls sample() once per tick)
//!     - implemented by: StaticSource (the built-in stand-in for real sensors)
//!
//! ==============================================================================

use async_trait::async_trait;

use crate::config::SourceConfig;
use crate::domain::{ParameterName, ParameterReading};
use crate::error::SourceError;

#[async_trait]
pub trait ParameterSource: Send + Sync {
    /// take a fresh snapshot of the parameter values
    async fn sample(&self) -> Result<Vec<ParameterReading>, SourceError>;

    /// short identifier used in logs
    fn describe(&self) -> &str {
        "source"
    }
}

/// current unix time in milliseconds
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ==============================================================================
// static source (no sensors attached)
// ==============================================================================

/// returns the same configured value for every parameter on every call,
/// stamped with the current time
pub struct StaticSource {
    values: SourceConfig,
}

impl StaticSource {
    pub fn new(values: SourceConfig) -> Self {
        tracing::info!("Using STATIC parameter source (no sensor access)");
        Self { values }
    }
}

#[async_trait]
impl ParameterSource for StaticSource {
    async fn sample(&self) -> Result<Vec<ParameterReading>, SourceError> {
        let now = now_ms();
        let readings = ParameterName::ALL
            .iter()
            .map(|&name| ParameterReading::new(name, self.values.value(name), now))
            .collect();
        tracing::debug!("[STATIC] Sampled {:?}", self.values);
        Ok(readings)
    }

    fn describe(&self) -> &str {
        "static"
    }
}
