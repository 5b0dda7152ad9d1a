// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Consecutive-failure circuit breaker shared by all workers.
//!
//! The breaker opens after `threshold` consecutive counted failures and
//! rejects every attempt until `cooldown` has elapsed since it opened. There
//! is no half-open probe: after the cooldown the breaker resets fully closed
//! with a zero counter, and must see the full threshold of failures again
//! before reopening. The reset happens lazily on the next `allow` call.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;
use strum::Display;
use tracing::{info, warn};

/// Externally visible breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum CircuitStatus {
    Closed,
    Open,
}

/// Point-in-time view of the breaker, for the health snapshot.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BreakerSnapshot {
    pub status: CircuitStatus,
    pub failures: u32,
    pub threshold: u32,
}

#[derive(Debug)]
struct BreakerState {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
            state: Mutex::new(BreakerState {
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    /// Whether an attempt may proceed. Performs the lazy cooldown reset.
    pub fn allow(&self) -> bool {
        let mut state = self.lock();
        match state.opened_at {
            None => true,
            Some(opened_at) if opened_at.elapsed() >= self.cooldown => {
                state.opened_at = None;
                state.consecutive_failures = 0;
                info!("circuit breaker closed after cooldown");
                true
            }
            Some(_) => false,
        }
    }

    pub fn record_success(&self) {
        let mut state = self.lock();
        if state.opened_at.is_none() {
            state.consecutive_failures = 0;
        }
    }

    /// Count one failure. Failures while the breaker is open are not counted,
    /// so the timeline to reset is driven by the cooldown alone.
    pub fn record_failure(&self) {
        let mut state = self.lock();
        if state.opened_at.is_some() {
            return;
        }
        state.consecutive_failures += 1;
        if state.consecutive_failures >= self.threshold {
            state.opened_at = Some(Instant::now());
            warn!(
                failures = state.consecutive_failures,
                threshold = self.threshold,
                "circuit breaker opened"
            );
        }
    }

    /// Read-only snapshot. Reports CLOSED once the cooldown has elapsed even
    /// if no `allow` call has performed the reset yet.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let state = self.lock();
        let open = matches!(state.opened_at, Some(opened_at) if opened_at.elapsed() < self.cooldown);
        BreakerSnapshot {
            status: if open {
                CircuitStatus::Open
            } else {
                CircuitStatus::Closed
            },
            failures: if state.opened_at.is_some() && !open {
                0
            } else {
                state.consecutive_failures
            },
            threshold: self.threshold,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerState> {
        // Mutex poisoning cannot leave the counters in a torn state; recover.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
