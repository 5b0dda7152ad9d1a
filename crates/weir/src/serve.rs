// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `weir serve` command implementation.
//!
//! Opens one SQLite store per configured target, starts the ingestion
//! pipeline, and serves the webhook gateway until SIGTERM or SIGINT.
//! Shutdown drains events that were already queued before exiting.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use weir_config::WeirConfig;
use weir_core::store::EventStore;
use weir_core::WeirError;
use weir_gateway::{AppState, ServerConfig};
use weir_pipeline::{Pipeline, PipelineSettings};
use weir_storage::SqliteEventStore;

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is
/// received.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(err) => {
                    tracing::error!(error = %err, "failed to install SIGTERM handler");
                    let _ = ctrl_c.await;
                    token_clone.cancel();
                    return;
                }
            };

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("weir={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

/// Opens every configured target up front; a target that cannot open or
/// fails its health check is a startup error, not a runtime surprise.
///
/// The concrete handles are returned so shutdown can checkpoint each
/// database after the pipeline drains.
async fn open_targets(
    targets: &BTreeMap<String, String>,
) -> Result<Vec<(String, Arc<SqliteEventStore>)>, WeirError> {
    let mut opened = Vec::with_capacity(targets.len());
    for (name, path) in targets {
        let store = Arc::new(SqliteEventStore::open(path).await?);
        store.health_check().await?;
        info!(target = %name, path = %path, "storage target ready");
        opened.push((name.clone(), store));
    }
    Ok(opened)
}

/// Checkpoint every target's WAL. A failed checkpoint is logged, not fatal:
/// shutdown proceeds and SQLite recovers the WAL on the next open.
async fn checkpoint_targets(targets: &[(String, Arc<SqliteEventStore>)]) {
    for (name, store) in targets {
        match store.close().await {
            Ok(()) => debug!(target = %name, "storage target checkpointed"),
            Err(err) => warn!(target = %name, error = %err, "checkpoint failed"),
        }
    }
}

/// Runs the `weir serve` command.
pub async fn run_serve(config: WeirConfig) -> Result<(), WeirError> {
    init_tracing(&config.service.log_level);

    info!(service = %config.service.name, "starting weir serve");

    let targets = open_targets(&config.storage.targets).await?;
    let target_names: Vec<String> = targets.iter().map(|(name, _)| name.clone()).collect();
    let stores: HashMap<String, Arc<dyn EventStore>> = targets
        .iter()
        .map(|(name, store)| (name.clone(), Arc::clone(store) as Arc<dyn EventStore>))
        .collect();

    let cancel = install_signal_handler();

    let pipeline = Pipeline::start(
        PipelineSettings {
            queue_capacity: config.pipeline.queue_capacity,
            workers: config.pipeline.workers,
            breaker_threshold: config.pipeline.breaker_threshold,
            breaker_cooldown: Duration::from_secs(config.pipeline.breaker_cooldown_secs),
            op_timeout: Duration::from_millis(config.pipeline.op_timeout_ms),
        },
        stores,
        cancel.clone(),
    );

    let state = AppState {
        ingress: pipeline.ingress(),
        health: pipeline.health(),
        targets: Arc::new(target_names),
    };
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };

    // A gateway failure (bind error, serve error) also triggers shutdown.
    let server_cancel = cancel.clone();
    let server = tokio::spawn(async move {
        let result = tokio::select! {
            result = weir_gateway::start_server(&server_config, state) => result,
            _ = server_cancel.cancelled() => Ok(()),
        };
        server_cancel.cancel();
        result
    });

    cancel.cancelled().await;

    info!("draining pipeline");
    pipeline.shutdown().await;
    checkpoint_targets(&targets).await;

    match server.await {
        Ok(result) => result?,
        Err(err) => {
            tracing::error!(error = %err, "gateway task failed");
        }
    }

    info!("weir stopped");
    Ok(())
}
