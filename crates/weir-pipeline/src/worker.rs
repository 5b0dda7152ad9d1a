// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed worker pool draining the event queue.
//!
//! Workers log and continue on every dispatch failure: one poisonous event
//! must never take a worker down. On cancellation each worker drains events
//! that are already queued, then exits.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::dispatcher::Dispatcher;
use crate::queue::EventQueue;

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `count` workers consuming from the shared queue.
    pub fn spawn(
        count: usize,
        queue: Arc<EventQueue>,
        dispatcher: Arc<Dispatcher>,
        cancel: CancellationToken,
    ) -> Self {
        let handles = (0..count)
            .map(|worker_id| {
                let queue = Arc::clone(&queue);
                let dispatcher = Arc::clone(&dispatcher);
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    run_worker(worker_id, queue, dispatcher, cancel).await;
                })
            })
            .collect();
        Self { handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to finish. Call after cancelling the token.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(err) = handle.await {
                warn!(error = %err, "worker task panicked");
            }
        }
    }
}

async fn run_worker(
    worker_id: usize,
    queue: Arc<EventQueue>,
    dispatcher: Arc<Dispatcher>,
    cancel: CancellationToken,
) {
    debug!(worker_id, "worker started");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = queue.dequeue() => match event {
                Some(event) => process(worker_id, &dispatcher, event).await,
                None => break,
            },
        }
    }

    // Drain whatever was queued before cancellation.
    while let Some(event) = queue.take_now().await {
        process(worker_id, &dispatcher, event).await;
    }
    debug!(worker_id, "worker stopped");
}

async fn process(worker_id: usize, dispatcher: &Dispatcher, event: weir_core::Event) {
    // A store implementation that panics must not take the worker with it.
    match AssertUnwindSafe(dispatcher.dispatch(&event)).catch_unwind().await {
        Ok(Ok(_)) => {}
        Ok(Err(err)) => {
            warn!(worker_id, target = %event.target, error = %err, "event dispatch failed");
        }
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            error!(worker_id, target = %event.target, reason, "event dispatch panicked");
        }
    }
}
