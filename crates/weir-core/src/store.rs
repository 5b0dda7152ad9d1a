// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The storage seam between the pipeline and the document store.
//!
//! The pipeline only ever sees this trait. The SQLite implementation lives
//! in `weir-storage`; tests substitute recording stubs.

use async_trait::async_trait;

use crate::error::WeirError;
use crate::event::Event;

/// Outcome of applying one event to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// True when the message upsert inserted a new record (as opposed to
    /// merging into an existing one). Lifecycle events never insert messages.
    pub message_inserted: bool,
}

/// Upsert-by-key storage contract.
///
/// Implementations must tolerate retried identical events without side
/// effects beyond the intended field updates: repeating an event must not
/// duplicate status-history entries or inflate conversation counters.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Apply one event: upsert the message and conversation records (or the
    /// contact record for lifecycle events) in a single logical write.
    async fn apply(&self, event: &Event) -> Result<UpsertOutcome, WeirError>;

    /// Cheap liveness probe, used at startup and never on the event path.
    async fn health_check(&self) -> Result<(), WeirError>;
}
