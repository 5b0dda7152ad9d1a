// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The breaker-gated storage dispatch shared by workers and the inline
//! fallback path.
//!
//! Every write attempt, from either path, goes through [`Dispatcher::dispatch`]
//! so the circuit breaker sees one consistent stream of outcomes. Storage
//! errors and timeouts count against the breaker; routing errors do not.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use weir_core::store::{EventStore, UpsertOutcome};
use weir_core::{Event, WeirError};

use crate::breaker::CircuitBreaker;

pub struct Dispatcher {
    stores: HashMap<String, Arc<dyn EventStore>>,
    breaker: Arc<CircuitBreaker>,
    op_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        stores: HashMap<String, Arc<dyn EventStore>>,
        breaker: Arc<CircuitBreaker>,
        op_timeout: Duration,
    ) -> Self {
        Self {
            stores,
            breaker,
            op_timeout,
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Apply one event to its target store, gated by the circuit breaker and
    /// bounded by the per-operation timeout.
    pub async fn dispatch(&self, event: &Event) -> Result<UpsertOutcome, WeirError> {
        if !self.breaker.allow() {
            return Err(WeirError::CircuitOpen);
        }

        let store = self.stores.get(&event.target).ok_or_else(|| {
            WeirError::Internal(format!("unknown storage target `{}`", event.target))
        })?;

        match tokio::time::timeout(self.op_timeout, store.apply(event)).await {
            Ok(Ok(outcome)) => {
                self.breaker.record_success();
                Ok(outcome)
            }
            Ok(Err(err)) => {
                if err.is_breaker_counted() {
                    self.breaker.record_failure();
                }
                Err(err)
            }
            Err(_) => {
                self.breaker.record_failure();
                warn!(target = %event.target, timeout_ms = self.op_timeout.as_millis() as u64,
                    "storage operation timed out");
                Err(WeirError::Timeout {
                    duration: self.op_timeout,
                })
            }
        }
    }
}
