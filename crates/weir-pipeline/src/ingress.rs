// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingress gate: non-blocking enqueue with an inline fallback.
//!
//! Every submitted event is accepted. When the queue has room, submit
//! returns immediately and a worker processes the event later. When the
//! queue is saturated, the event runs through the same breaker-gated
//! dispatch synchronously in the caller's context, so nothing is dropped.
//! Storage failures on either path are logged, never reported to the
//! submitter.

use std::sync::Arc;

use tracing::warn;
use weir_core::Event;

use crate::dispatcher::Dispatcher;
use crate::queue::EventQueue;

/// Which path handled a submission. Both mean "accepted".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The event was queued for a worker.
    Queued,
    /// The queue was full; the event was processed inline.
    Inline,
}

#[derive(Clone)]
pub struct IngressGate {
    queue: Arc<EventQueue>,
    dispatcher: Arc<Dispatcher>,
}

impl IngressGate {
    pub fn new(queue: Arc<EventQueue>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { queue, dispatcher }
    }

    /// Accept one event. Never returns an error to the caller.
    pub async fn submit(&self, event: Event) -> Disposition {
        match self.queue.try_enqueue(event) {
            Ok(()) => Disposition::Queued,
            Err(crate::queue::QueueFull(event)) => {
                warn!(
                    target = %event.target,
                    depth = self.queue.depth(),
                    "queue saturated, processing event inline"
                );
                if let Err(err) = self.dispatcher.dispatch(&event).await {
                    warn!(target = %event.target, error = %err, "inline dispatch failed");
                }
                Disposition::Inline
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    use weir_core::store::EventStore;

    use crate::breaker::CircuitBreaker;
    use crate::testing::{lifecycle_event, RecordingStore, StoreBehavior};

    fn make_gate(
        capacity: usize,
        store: Arc<RecordingStore>,
    ) -> (IngressGate, Arc<EventQueue>) {
        let queue = Arc::new(EventQueue::new(capacity));
        let breaker = Arc::new(CircuitBreaker::new(10, Duration::from_secs(60)));
        let mut stores: HashMap<String, Arc<dyn EventStore>> = HashMap::new();
        stores.insert("primary".to_string(), store);
        let dispatcher = Arc::new(Dispatcher::new(stores, breaker, Duration::from_millis(100)));
        (IngressGate::new(Arc::clone(&queue), dispatcher), queue)
    }

    #[tokio::test]
    async fn overflow_event_runs_inline_exactly_once() {
        let store = Arc::new(RecordingStore::new(StoreBehavior::Succeed));
        // No workers draining: the queue stays full once it fills.
        let (gate, queue) = make_gate(2, store.clone());

        assert_eq!(gate.submit(lifecycle_event("primary", "c-1")).await, Disposition::Queued);
        assert_eq!(gate.submit(lifecycle_event("primary", "c-2")).await, Disposition::Queued);
        assert_eq!(gate.submit(lifecycle_event("primary", "c-3")).await, Disposition::Inline);

        // The overflow event reached storage exactly once and the queued
        // events are still waiting for workers.
        assert_eq!(store.applied(), 1);
        assert_eq!(queue.depth(), 2);
    }

    #[tokio::test]
    async fn inline_storage_failure_is_still_accepted() {
        let store = Arc::new(RecordingStore::new(StoreBehavior::FailStorage));
        let (gate, _queue) = make_gate(1, store.clone());

        gate.submit(lifecycle_event("primary", "c-1")).await;
        // Queue is full; this one fails inline but the gate absorbs it.
        let disposition = gate.submit(lifecycle_event("primary", "c-2")).await;
        assert_eq!(disposition, Disposition::Inline);
        assert_eq!(store.applied(), 1);
    }
}
