// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the `EventStore` trait.

use async_trait::async_trait;
use tracing::debug;

use weir_core::event::{Event, EventBody};
use weir_core::store::{EventStore, UpsertOutcome};
use weir_core::WeirError;

use crate::database::Database;
use crate::queries;

/// SQLite-backed event store for one storage target.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
/// One instance per configured target; the pipeline routes events to the
/// instance matching the event's target name.
pub struct SqliteEventStore {
    db: Database,
}

impl SqliteEventStore {
    /// Open the store at the given database path, running migrations.
    pub async fn open(path: &str) -> Result<Self, WeirError> {
        let db = Database::open(path).await?;
        debug!(path, "event store opened");
        Ok(Self { db })
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Checkpoint and release the store ahead of shutdown.
    pub async fn close(&self) -> Result<(), WeirError> {
        self.db.close().await
    }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn apply(&self, event: &Event) -> Result<UpsertOutcome, WeirError> {
        match &event.body {
            EventBody::Message(msg) => {
                let inserted = queries::events::apply_message_event(&self.db, msg).await?;
                Ok(UpsertOutcome {
                    message_inserted: inserted,
                })
            }
            EventBody::Lifecycle(ev) => {
                queries::events::apply_lifecycle_event(&self.db, ev).await?;
                Ok(UpsertOutcome {
                    message_inserted: false,
                })
            }
        }
    }

    async fn health_check(&self) -> Result<(), WeirError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)
    }
}
