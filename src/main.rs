//! ==============================================================================
//! main.rs - plant monitor entry point
//! ==============================================================================
//!
//! purpose:
//!     wires the dashboard core together and keeps it running until ctrl-c.
//!
//! responsibilities:
//!     - load and validate dashboard.toml (a broken file aborts startup)
//!     - set up structured logging
//!     - start the polling scheduler against the configured source
//!     - serve the read model as json
//!     - echo state changes (and alerts) to the log
//!     - on shutdown, stop the scheduler before anything else goes away
//!
//! relationships:
//!     - uses: config.rs (settings + thresholds)
//!     - uses: source.rs (the parameter source)
//!     - uses: scheduler.rs / store.rs (polling and state)
//!     - uses: evaluator.rs (alerts for the log)
//!     - uses: server.rs (json api)
//!
//! architecture:
//!
//!     ┌─────────────────────────────────────────────────────────────┐
//!     │                       plant-monitor                          │
//!     │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//!     │  │ scheduler   │  │ json api    │  │ reading logger      │  │
//!     │  │ (5s cycle)  │  │ (port 3000) │  │ (store changes)     │  │
//!     │  └──────┬──────┘  └──────┬──────┘  └──────────┬──────────┘  │
//!     │         │ writes         │ reads              │ reads       │
//!     │         └────────────────┼────────────────────┘             │
//!     │                    ┌─────┴─────┐                            │
//!     │                    │ state     │                            │
//!     │                    │ store     │                            │
//!     │                    └───────────┘                            │
//!     └─────────────────────────────────────────────────────────────┘
//!
//! ==============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plant_monitor::config::{ConfigOrigin, DashboardConfig, ThresholdConfig, CONFIG_ENV};
use plant_monitor::domain::DashboardStatus;
use plant_monitor::evaluator::evaluate;
use plant_monitor::scheduler::PollingScheduler;
use plant_monitor::server::{self, ApiState};
use plant_monitor::source::{ParameterSource, StaticSource};
use plant_monitor::store::StateStore;

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: load configuration (before logging, which depends on it)
    let (config, origin) = DashboardConfig::load_or_default()
        .with_context(|| format!("invalid dashboard configuration (set {CONFIG_ENV} to choose a file)"))?;

    // step 2: logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("plant_monitor={}", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &origin {
        ConfigOrigin::File(path) => tracing::info!(path = %path.display(), "Loaded configuration"),
        ConfigOrigin::Defaults => tracing::warn!("No config file found - using defaults"),
    }
    config.log_summary();

    // step 3: core
    let store = StateStore::new();
    let thresholds = Arc::new(config.thresholds.clone());
    let source: Arc<dyn ParameterSource> = Arc::new(StaticSource::new(config.source.clone()));
    let scheduler = PollingScheduler::from_config(source, store.clone(), &config)?;

    let shutdown = CancellationToken::new();

    // step 4: reading logger
    let logger = if config.logging.show_readings {
        Some(tokio::spawn(log_readings(
            store.clone(),
            Arc::clone(&thresholds),
            shutdown.clone(),
        )))
    } else {
        None
    };

    // step 5: json api in background
    let server = if config.server.enabled {
        let addr = config.bind_addr()?;
        let state = ApiState { store: store.clone(), thresholds: Arc::clone(&thresholds) };
        let token = shutdown.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = server::run_server(addr, state, token).await {
                tracing::error!(error = %format!("{e:#}"), "Web server error");
            }
        }))
    } else {
        None
    };

    // step 6: poll until ctrl-c
    scheduler.start().await;
    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    tracing::info!("Shutdown requested");

    scheduler.stop().await;
    shutdown.cancel();
    for task in [logger, server].into_iter().flatten() {
        task.await.ok();
    }

    let stats = scheduler.stats();
    tracing::info!(
        ticks = stats.ticks,
        skipped = stats.skipped,
        failures = stats.failures,
        discarded = stats.discarded,
        "Bye",
    );
    Ok(())
}

/// log every state change, alerts at warn
async fn log_readings(store: StateStore, thresholds: Arc<ThresholdConfig>, shutdown: CancellationToken) {
    let mut changes = store.subscribe();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let view = evaluate(&store.snapshot().await, &thresholds);
        if view.status == DashboardStatus::Error {
            tracing::warn!(
                error = view.last_error.as_deref().unwrap_or("unknown"),
                "Source error - showing last known readings",
            );
            continue;
        }

        for p in &view.parameters {
            let Some(value) = p.value else { continue };
            if p.alert {
                tracing::warn!(parameter = %p.name, value, threshold = p.threshold, unit = %p.unit, "ALERT: above threshold");
            } else {
                tracing::info!(parameter = %p.name, value, unit = %p.unit, "Reading");
            }
        }
    }
}
