// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation rollup read operations.

use rusqlite::{params, OptionalExtension};
use weir_core::WeirError;

use crate::database::Database;
use crate::models::ConversationRecord;

fn json_col<T: serde::de::DeserializeOwned>(idx: usize, text: &str) -> Result<T, rusqlite::Error> {
    serde_json::from_str(text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_conversation(row: &rusqlite::Row<'_>) -> Result<ConversationRecord, rusqlite::Error> {
    let media_counts: String = row.get(5)?;
    let channels: String = row.get(6)?;
    let contact: String = row.get(7)?;
    let assignee: Option<String> = row.get(8)?;
    let channel_info: String = row.get(9)?;
    Ok(ConversationRecord {
        id: row.get(0)?,
        created_at: row.get(1)?,
        first_message_ts: row.get(2)?,
        last_message_ts: row.get(3)?,
        message_count: row.get(4)?,
        media_counts: json_col(5, &media_counts)?,
        channels: json_col(6, &channels)?,
        contact: json_col(7, &contact)?,
        assignee: match assignee {
            Some(text) => Some(json_col(8, &text)?),
            None => None,
        },
        channel_info: json_col(9, &channel_info)?,
        updated_at: row.get(10)?,
    })
}

/// Look up one conversation rollup by its conversation key.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<ConversationRecord>, WeirError> {
    let id = id.to_string();
    db.connection()
        .call(
            move |conn| -> Result<Option<ConversationRecord>, rusqlite::Error> {
                conn.query_row(
                    "SELECT id, created_at, first_message_ts, last_message_ts, message_count,
                            media_counts, channels, contact, assignee, channel_info, updated_at
                     FROM conversations WHERE id = ?1",
                    params![id],
                    row_to_conversation,
                )
                .optional()
            },
        )
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count stored conversations. Used by operational checks and tests.
pub async fn count_conversations(db: &Database) -> Result<i64, WeirError> {
    db.connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))
        })
        .await
        .map_err(crate::database::map_tr_err)
}
