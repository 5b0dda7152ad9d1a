// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test support: a scriptable in-memory event store.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;
use weir_core::event::{EventBody, LifecycleEvent};
use weir_core::store::{EventStore, UpsertOutcome};
use weir_core::{Event, WeirError};

#[derive(Debug, Clone, Copy)]
pub enum StoreBehavior {
    /// Every apply succeeds and reports an insert.
    Succeed,
    /// Every apply fails with a storage error.
    FailStorage,
    /// Every apply blocks until the dispatch timeout fires.
    Hang,
    /// The first apply panics; later applies succeed.
    PanicOnce,
}

/// Event store that records how many applies reached it.
pub struct RecordingStore {
    behavior: StoreBehavior,
    applied: AtomicUsize,
    panicked: AtomicBool,
}

impl RecordingStore {
    pub fn new(behavior: StoreBehavior) -> Self {
        Self {
            behavior,
            applied: AtomicUsize::new(0),
            panicked: AtomicBool::new(false),
        }
    }

    pub fn applied(&self) -> usize {
        self.applied.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventStore for RecordingStore {
    async fn apply(&self, _event: &Event) -> Result<UpsertOutcome, WeirError> {
        match self.behavior {
            StoreBehavior::Succeed => {
                self.applied.fetch_add(1, Ordering::SeqCst);
                Ok(UpsertOutcome {
                    message_inserted: true,
                })
            }
            StoreBehavior::FailStorage => {
                self.applied.fetch_add(1, Ordering::SeqCst);
                Err(WeirError::Storage {
                    source: "disk unavailable".into(),
                })
            }
            StoreBehavior::Hang => std::future::pending().await,
            StoreBehavior::PanicOnce => {
                if !self.panicked.swap(true, Ordering::SeqCst) {
                    panic!("storage backend fault");
                }
                self.applied.fetch_add(1, Ordering::SeqCst);
                Ok(UpsertOutcome {
                    message_inserted: true,
                })
            }
        }
    }

    async fn health_check(&self) -> Result<(), WeirError> {
        Ok(())
    }
}

pub fn lifecycle_event(target: &str, contact_id: &str) -> Event {
    Event::new(
        target,
        EventBody::Lifecycle(LifecycleEvent {
            contact_id: contact_id.to_string(),
            conversation_key: format!("+1555{contact_id}"),
            old_lifecycle: None,
            lifecycle: Some("lead".to_string()),
            event_id: None,
            contact: json!({}),
        }),
    )
}
