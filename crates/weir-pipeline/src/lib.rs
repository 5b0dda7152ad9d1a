// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The asynchronous ingestion pipeline.
//!
//! Wires together the bounded event queue, the worker pool, the circuit
//! breaker, and the breaker-gated dispatcher, and exposes the two handles
//! the outside world needs: an [`IngressGate`] for submitting events and a
//! [`HealthReporter`] for monitoring.
//!
//! Data flow: ingress gate -> event queue -> worker pool -> circuit breaker
//! gate -> event store. When the queue is saturated the ingress gate runs
//! the same gated dispatch inline, so every accepted event is processed
//! exactly once by one of the two paths.

pub mod breaker;
pub mod dispatcher;
pub mod health;
pub mod ingress;
pub mod queue;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;
use weir_core::store::EventStore;

use crate::breaker::CircuitBreaker;
use crate::dispatcher::Dispatcher;
use crate::health::HealthReporter;
use crate::ingress::IngressGate;
use crate::queue::EventQueue;
use crate::worker::WorkerPool;

/// Runtime sizing of the pipeline. Mirrors the `[pipeline]` configuration
/// section without depending on the config crate.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub queue_capacity: usize,
    pub workers: usize,
    pub breaker_threshold: u32,
    pub breaker_cooldown: Duration,
    pub op_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            workers: 4,
            breaker_threshold: 10,
            breaker_cooldown: Duration::from_secs(60),
            op_timeout: Duration::from_millis(5_000),
        }
    }
}

/// A running pipeline: spawned workers plus the shared state they drain.
pub struct Pipeline {
    ingress: IngressGate,
    health: HealthReporter,
    workers: WorkerPool,
    cancel: CancellationToken,
}

impl Pipeline {
    /// Build the shared state and spawn the worker pool.
    pub fn start(
        settings: PipelineSettings,
        stores: HashMap<String, Arc<dyn EventStore>>,
        cancel: CancellationToken,
    ) -> Self {
        let queue = Arc::new(EventQueue::new(settings.queue_capacity));
        let breaker = Arc::new(CircuitBreaker::new(
            settings.breaker_threshold,
            settings.breaker_cooldown,
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            stores,
            Arc::clone(&breaker),
            settings.op_timeout,
        ));
        let workers = WorkerPool::spawn(
            settings.workers,
            Arc::clone(&queue),
            Arc::clone(&dispatcher),
            cancel.clone(),
        );
        info!(
            queue_capacity = settings.queue_capacity,
            workers = settings.workers,
            breaker_threshold = settings.breaker_threshold,
            "pipeline started"
        );
        Self {
            ingress: IngressGate::new(Arc::clone(&queue), dispatcher),
            health: HealthReporter::new(queue, breaker, settings.workers),
            workers,
            cancel,
        }
    }

    pub fn ingress(&self) -> IngressGate {
        self.ingress.clone()
    }

    pub fn health(&self) -> HealthReporter {
        self.health.clone()
    }

    /// Stop the workers and drain events that were already queued.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.workers.join().await;
        info!("pipeline stopped");
    }
}
