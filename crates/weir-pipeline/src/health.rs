// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only health snapshot of the pipeline.
//!
//! The reporter shares the queue and breaker handles but never mutates
//! either; the snapshot may lag the write path slightly, which is fine for
//! monitoring.

use std::sync::Arc;

use serde::Serialize;

use crate::breaker::{BreakerSnapshot, CircuitBreaker};
use crate::queue::EventQueue;

/// Wire shape of the health endpoint body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub queue: QueueHealth,
    pub circuit_breaker: BreakerSnapshot,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct QueueHealth {
    pub size: usize,
    pub max_size: usize,
    pub workers: usize,
}

#[derive(Clone)]
pub struct HealthReporter {
    queue: Arc<EventQueue>,
    breaker: Arc<CircuitBreaker>,
    workers: usize,
}

impl HealthReporter {
    pub fn new(queue: Arc<EventQueue>, breaker: Arc<CircuitBreaker>, workers: usize) -> Self {
        Self {
            queue,
            breaker,
            workers,
        }
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            status: "ok",
            queue: QueueHealth {
                size: self.queue.depth(),
                max_size: self.queue.capacity(),
                workers: self.workers,
            },
            circuit_breaker: self.breaker.snapshot(),
        }
    }
}
