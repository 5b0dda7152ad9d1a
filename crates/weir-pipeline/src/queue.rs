// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded multi-producer multi-consumer event queue.
//!
//! Producers never block: `try_enqueue` either takes the event or hands it
//! straight back as [`QueueFull`] so the caller can run the inline fallback.
//! Consumers share one receiver behind an async mutex, so each queued event
//! is claimed by exactly one worker.

use tokio::sync::{mpsc, Mutex};
use weir_core::Event;

/// Returned when the queue is at capacity; carries the rejected event back
/// to the caller so it can be processed inline instead of dropped.
#[derive(Debug)]
pub struct QueueFull(pub Event);

pub struct EventQueue {
    tx: mpsc::Sender<Event>,
    rx: Mutex<mpsc::Receiver<Event>>,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Non-blocking enqueue. Fails only when the queue is at capacity.
    pub fn try_enqueue(&self, event: Event) -> Result<(), QueueFull> {
        self.tx.try_send(event).map_err(|err| match err {
            mpsc::error::TrySendError::Full(event) => QueueFull(event),
            // The receiver lives as long as the queue itself.
            mpsc::error::TrySendError::Closed(event) => QueueFull(event),
        })
    }

    /// Wait for the next event. Each event is delivered to exactly one caller.
    pub async fn dequeue(&self) -> Option<Event> {
        self.rx.lock().await.recv().await
    }

    /// Take an already-queued event without waiting. Used to drain the queue
    /// during shutdown.
    pub async fn take_now(&self) -> Option<Event> {
        self.rx.lock().await.try_recv().ok()
    }

    /// Number of events currently buffered.
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use weir_core::event::{EventBody, LifecycleEvent};

    fn event(n: u32) -> Event {
        Event::new(
            "primary",
            EventBody::Lifecycle(LifecycleEvent {
                contact_id: format!("c-{n}"),
                conversation_key: format!("+1555000{n:04}"),
                old_lifecycle: None,
                lifecycle: Some("lead".into()),
                event_id: None,
                contact: json!({}),
            }),
        )
    }

    #[tokio::test]
    async fn enqueue_fails_only_at_capacity() {
        let queue = EventQueue::new(2);
        assert!(queue.try_enqueue(event(1)).is_ok());
        assert!(queue.try_enqueue(event(2)).is_ok());
        let QueueFull(rejected) = queue.try_enqueue(event(3)).unwrap_err();
        assert_eq!(queue.depth(), 2);

        // The rejected event comes back intact for inline processing.
        match rejected.body {
            EventBody::Lifecycle(ev) => assert_eq!(ev.contact_id, "c-3"),
            EventBody::Message(_) => panic!("wrong body kind"),
        }
    }

    #[tokio::test]
    async fn dequeue_frees_capacity() {
        let queue = EventQueue::new(1);
        queue.try_enqueue(event(1)).unwrap();
        assert!(queue.try_enqueue(event(2)).is_err());

        assert!(queue.dequeue().await.is_some());
        assert_eq!(queue.depth(), 0);
        assert!(queue.try_enqueue(event(2)).is_ok());
    }

    #[tokio::test]
    async fn take_now_returns_none_on_empty_queue() {
        let queue = EventQueue::new(4);
        assert!(queue.take_now().await.is_none());
        queue.try_enqueue(event(1)).unwrap();
        assert!(queue.take_now().await.is_some());
        assert!(queue.take_now().await.is_none());
    }
}
