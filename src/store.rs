//! ==============================================================================
//! store.rs - dashboard state store
//! ==============================================================================
//!
//! purpose:
//!     holds the latest reading per parameter and the overall dashboard status.
//!     the polling scheduler is the only writer; the api and the reading logger
//!     are readers and only ever see whole snapshots.
//!
//! we use arc<rwlock<>> for thread-safe sharing:
//!     - arc: reference-counted pointer for sharing across tasks
//!     - rwlock: multiple readers OR one writer, so an update is never torn
//!
//! a watch channel carries a revision counter. it only moves when the stored
//! state really changed, so readers can wait for news instead of polling.
//!
//! ==============================================================================

use std::sync::Arc;

use tokio::sync::{watch, RwLock};

use crate::domain::{DashboardState, DashboardStatus, ParameterReading};
use crate::error::SourceError;

#[derive(Clone)]
pub struct StateStore {
    state: Arc<RwLock<DashboardState>>,
    revision: Arc<watch::Sender<u64>>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    /// fresh store: status Loading, nothing sampled
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: Arc::new(RwLock::new(DashboardState::default())),
            revision: Arc::new(revision),
        }
    }

    /// apply a set of readings
    ///
    /// a reading replaces the stored one for its parameter only if its
    /// timestamp is >= the stored timestamp. parameters absent from the set
    /// are left alone. returns true if the stored state changed.
    pub async fn update<I>(&self, readings: I) -> bool
    where
        I: IntoIterator<Item = ParameterReading>,
    {
        let mut state = self.state.write().await;
        let before = state.clone();

        for reading in readings {
            if !reading.value().is_finite() {
                tracing::warn!(parameter = %reading.name(), value = reading.value(), "Ignoring non-finite reading");
                continue;
            }
            match state.readings.get(&reading.name()) {
                Some(current) if current.timestamp_ms() > reading.timestamp_ms() => {
                    tracing::debug!(
                        parameter = %reading.name(),
                        stored_ms = current.timestamp_ms(),
                        incoming_ms = reading.timestamp_ms(),
                        "Ignoring out-of-order reading",
                    );
                }
                _ => {
                    state.readings.insert(reading.name(), reading);
                }
            }
        }

        state.status = if state.is_complete() {
            DashboardStatus::Ready
        } else {
            DashboardStatus::Loading
        };
        state.last_error = None;

        let changed = *state != before;
        if changed {
            self.revision.send_modify(|r| *r += 1);
        }
        changed
    }

    /// record a failed sample; readings stay as they were
    pub async fn mark_error(&self, error: &SourceError) -> bool {
        let mut state = self.state.write().await;
        let message = error.to_string();
        let changed = state.status != DashboardStatus::Error
            || state.last_error.as_deref() != Some(message.as_str());

        state.status = DashboardStatus::Error;
        state.last_error = Some(message);

        if changed {
            self.revision.send_modify(|r| *r += 1);
        }
        changed
    }

    /// point-in-time copy of the whole state
    pub async fn snapshot(&self) -> DashboardState {
        self.state.read().await.clone()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// receiver that wakes whenever the stored state changes
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}
