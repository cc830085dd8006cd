//! ==============================================================================
//! scheduler.rs - polling scheduler
//! ==============================================================================
//!
//! purpose:
//!     samples the parameter source on a fixed interval and feeds the results
//!     into the state store. owns an explicit start/stop lifecycle so it can be
//!     driven (and tested) without any ui around it.
//!
//! lifecycle:
//!
//! ```text
//!     Stopped ──start()──▶ Running ──stop()──▶ Stopped
//!                  ▲                              │
//!                  └──────────────────────────────┘
//!
//!     - start() while Running is a no-op and returns false.
//!     - entering Running samples immediately, then once per interval.
//! ```
//!
//! tick policy (drop-if-busy):
//!     each sample runs in its own task so a slow source never stalls the
//!     timer. if the previous sample is still in flight when a tick fires,
//!     the tick is skipped. at most one sample per run is ever outstanding.
//!
//! stop guarantee:
//!     every result is applied while holding the lifecycle lock, after
//!     checking that the run which issued it is still the current one.
//!     stop() clears the run under that same lock, so once stop() returns
//!     nothing reaches the store, even if a sample resolves later.
//!
//! ```text
//!     every run's token is a child of a root token owned by the scheduler.
//!     dropping the scheduler cancels the root, which ends the timer and
//!     voids any sample still in flight without needing the lock.
//! ```
//!
//! failures:
//!     a SourceError flips the dashboard to Error (last readings stay) and
//!     polling carries on. the next successful sample clears it.
//!
//! ==============================================================================

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::DashboardConfig;
use crate::domain::ParameterReading;
use crate::error::{ConfigError, SourceError};
use crate::source::ParameterSource;
use crate::store::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Stopped,
    Running,
}

/// counters since the scheduler was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    /// ticks fired, including skipped ones
    pub ticks: u64,
    /// ticks dropped because a sample was still in flight
    pub skipped: u64,
    pub applied: u64,
    pub failures: u64,
    /// results that arrived after their run was stopped
    pub discarded: u64,
}

#[derive(Default)]
struct Counters {
    ticks: AtomicU64,
    skipped: AtomicU64,
    applied: AtomicU64,
    failures: AtomicU64,
    discarded: AtomicU64,
}

// ==============================================================================
// lifecycle bookkeeping
// ==============================================================================

struct Run {
    cancel: CancellationToken,
    timer: JoinHandle<()>,
}

#[derive(Default)]
struct Lifecycle {
    /// bumped on every start(); results carry the epoch they were issued in
    epoch: u64,
    run: Option<Run>,
}

impl Lifecycle {
    fn is_current(&self, epoch: u64) -> bool {
        self.run.is_some() && self.epoch == epoch
    }
}

/// clears the in-flight flag even if the sample task panics
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ==============================================================================
// scheduler
// ==============================================================================

pub struct PollingScheduler {
    source: Arc<dyn ParameterSource>,
    store: StateStore,
    interval: Duration,
    sample_timeout: Option<Duration>,
    lifecycle: Arc<Mutex<Lifecycle>>,
    counters: Arc<Counters>,
    /// parent of every run's token; cancelled on drop
    root: CancellationToken,
}

impl PollingScheduler {
    pub fn new(
        source: Arc<dyn ParameterSource>,
        store: StateStore,
        interval: Duration,
    ) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::InvalidInterval("polling interval"));
        }
        Ok(Self {
            source,
            store,
            interval,
            sample_timeout: None,
            lifecycle: Arc::new(Mutex::new(Lifecycle::default())),
            counters: Arc::new(Counters::default()),
            root: CancellationToken::new(),
        })
    }

    pub fn from_config(
        source: Arc<dyn ParameterSource>,
        store: StateStore,
        config: &DashboardConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(source, store, config.interval())?.with_sample_timeout(config.sample_timeout()))
    }

    /// fail any sample that takes longer than `limit` with `SourceError::Timeout`
    pub fn with_sample_timeout(mut self, limit: Option<Duration>) -> Self {
        self.sample_timeout = limit.filter(|d| !d.is_zero());
        self
    }

    /// begin polling; returns false if already running
    pub async fn start(&self) -> bool {
        let mut life = self.lifecycle.lock().await;
        if life.run.is_some() {
            tracing::debug!("Scheduler already running; start ignored");
            return false;
        }

        life.epoch += 1;
        let cancel = self.root.child_token();
        let ticker = Ticker {
            epoch: life.epoch,
            cancel: cancel.clone(),
            source: Arc::clone(&self.source),
            store: self.store.clone(),
            lifecycle: Arc::clone(&self.lifecycle),
            counters: Arc::clone(&self.counters),
            busy: Arc::new(AtomicBool::new(false)),
            sample_timeout: self.sample_timeout,
        };
        let timer = tokio::spawn(run_timer(self.interval, cancel.clone(), ticker));
        life.run = Some(Run { cancel, timer });

        tracing::info!(
            epoch = life.epoch,
            source = self.source.describe(),
            interval_ms = self.interval.as_millis() as u64,
            "Polling scheduler started",
        );
        true
    }

    /// stop polling; returns false if it was not running
    ///
    /// when this returns, no further store mutation will come from this
    /// scheduler until the next start().
    pub async fn stop(&self) -> bool {
        let run = {
            let mut life = self.lifecycle.lock().await;
            let run = life.run.take();
            if let Some(run) = &run {
                run.cancel.cancel();
            }
            run
        };

        let Some(run) = run else {
            tracing::debug!("Scheduler not running; stop ignored");
            return false;
        };

        if let Err(e) = run.timer.await {
            tracing::warn!(error = %e, "Polling timer task ended abnormally");
        }
        tracing::info!("Polling scheduler stopped");
        true
    }

    pub async fn state(&self) -> SchedulerState {
        if self.lifecycle.lock().await.run.is_some() {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    pub async fn is_running(&self) -> bool {
        self.state().await == SchedulerState::Running
    }

    pub fn stats(&self) -> SchedulerStats {
        let c = &self.counters;
        SchedulerStats {
            ticks: c.ticks.load(Ordering::Relaxed),
            skipped: c.skipped.load(Ordering::Relaxed),
            applied: c.applied.load(Ordering::Relaxed),
            failures: c.failures.load(Ordering::Relaxed),
            discarded: c.discarded.load(Ordering::Relaxed),
        }
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        // cancels the current run's child token too, lock or no lock
        self.root.cancel();
    }
}

// ==============================================================================
// per-run machinery
// ==============================================================================

#[derive(Clone)]
struct Ticker {
    epoch: u64,
    cancel: CancellationToken,
    source: Arc<dyn ParameterSource>,
    store: StateStore,
    lifecycle: Arc<Mutex<Lifecycle>>,
    counters: Arc<Counters>,
    busy: Arc<AtomicBool>,
    sample_timeout: Option<Duration>,
}

async fn run_timer(interval: Duration, cancel: CancellationToken, ticker: Ticker) {
    let mut timer = tokio::time::interval(interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = timer.tick() => ticker.fire(),
        }
    }
    tracing::debug!(epoch = ticker.epoch, "Polling timer exited");
}

impl Ticker {
    fn fire(&self) {
        self.counters.ticks.fetch_add(1, Ordering::Relaxed);

        if self.busy.swap(true, Ordering::AcqRel) {
            self.counters.skipped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(epoch = self.epoch, "Previous sample still in flight; tick skipped");
            return;
        }

        let ticker = self.clone();
        tokio::spawn(async move {
            let _busy = BusyGuard(Arc::clone(&ticker.busy));
            ticker.sample_and_apply().await;
        });
    }

    async fn sample(&self) -> Result<Vec<ParameterReading>, SourceError> {
        match self.sample_timeout {
            Some(limit) => tokio::time::timeout(limit, self.source.sample())
                .await
                .unwrap_or(Err(SourceError::Timeout(limit))),
            None => self.source.sample().await,
        }
    }

    async fn sample_and_apply(&self) {
        let outcome = self.sample().await;

        // held across the store write so stop() can't interleave
        let life = self.lifecycle.lock().await;
        if !life.is_current(self.epoch) || self.cancel.is_cancelled() {
            self.counters.discarded.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(epoch = self.epoch, "Discarding sample that completed after stop");
            return;
        }

        match outcome {
            Ok(readings) => {
                let count = readings.len();
                let changed = self.store.update(readings).await;
                self.counters.applied.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(count, changed, "Sample applied");
            }
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "Sample failed; retrying next tick");
                self.store.mark_error(&e).await;
            }
        }
        drop(life);
    }
}
