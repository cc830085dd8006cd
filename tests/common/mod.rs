//! Test doubles for `ParameterSource`.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Semaphore};

use plant_monitor::domain::{ParameterName, ParameterReading};
use plant_monitor::error::SourceError;
use plant_monitor::source::ParameterSource;

/// returns the configured values, timestamp advancing by one per call
pub struct ScriptedSource {
    values: Mutex<Vec<(ParameterName, f64)>>,
    clock: AtomicU64,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl ScriptedSource {
    pub fn new(values: &[(ParameterName, f64)]) -> Arc<Self> {
        Arc::new(Self {
            values: Mutex::new(values.to_vec()),
            clock: AtomicU64::new(0),
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        })
    }

    pub fn healthy() -> Arc<Self> {
        Self::new(&[
            (ParameterName::Moisture, 65.0),
            (ParameterName::Temperature, 25.0),
            (ParameterName::Humidity, 60.0),
        ])
    }

    pub fn set_values(&self, values: &[(ParameterName, f64)]) {
        *self.values.lock().unwrap() = values.to_vec();
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ParameterSource for ScriptedSource {
    async fn sample(&self) -> Result<Vec<ParameterReading>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("sensor bus offline".into()));
        }
        let t = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        let values = self.values.lock().unwrap().clone();
        Ok(values
            .into_iter()
            .map(|(name, value)| ParameterReading::new(name, value, t))
            .collect())
    }
}

/// blocks every sample until the test releases it
pub struct GatedSource {
    gate: Semaphore,
    started: mpsc::UnboundedSender<usize>,
    calls: AtomicUsize,
}

impl GatedSource {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<usize>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Arc::new(Self {
            gate: Semaphore::new(0),
            started: tx,
            calls: AtomicUsize::new(0),
        });
        (source, rx)
    }

    /// let one waiting sample complete
    pub fn release_one(&self) {
        self.gate.add_permits(1);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ParameterSource for GatedSource {
    async fn sample(&self) -> Result<Vec<ParameterReading>, SourceError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.started.send(n);
        self.gate
            .acquire()
            .await
            .map_err(|_| SourceError::Unavailable("gate closed".into()))?
            .forget();
        Ok(ParameterName::ALL
            .iter()
            .map(|&name| ParameterReading::new(name, 50.0, n as u64))
            .collect())
    }
}

/// never answers within `delay`
pub struct SlowSource {
    pub delay: Duration,
}

#[async_trait]
impl ParameterSource for SlowSource {
    async fn sample(&self) -> Result<Vec<ParameterReading>, SourceError> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }
}
