// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message read operations.

use rusqlite::{params, OptionalExtension};
use weir_core::WeirError;

use crate::database::Database;
use crate::models::MessageRecord;

fn json_col<T: serde::de::DeserializeOwned>(idx: usize, text: &str) -> Result<T, rusqlite::Error> {
    serde_json::from_str(text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<MessageRecord, rusqlite::Error> {
    let sender_info: String = row.get(4)?;
    let status_history: String = row.get(10)?;
    let raw: String = row.get(13)?;
    Ok(MessageRecord {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        ts: row.get(2)?,
        sender: row.get(3)?,
        sender_info: json_col(4, &sender_info)?,
        message_type: row.get(5)?,
        direction: row.get(6)?,
        channel_id: row.get(7)?,
        channel_name: row.get(8)?,
        channel_source: row.get(9)?,
        status_history: json_col(10, &status_history)?,
        event_type: row.get(11)?,
        event_id: row.get(12)?,
        raw: json_col(13, &raw)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

const MESSAGE_COLUMNS: &str = "id, conversation_id, ts, sender, sender_info, message_type, \
     direction, channel_id, channel_name, channel_source, status_history, \
     event_type, event_id, raw, created_at, updated_at";

/// Look up one message by its platform message identifier.
pub async fn get_message(db: &Database, id: &str) -> Result<Option<MessageRecord>, WeirError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<MessageRecord>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                params![id],
                row_to_message,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get messages for a conversation in chronological order.
pub async fn get_messages_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<MessageRecord>, WeirError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<MessageRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conversation_id = ?1 ORDER BY ts ASC"
            ))?;
            let rows = stmt.query_map(params![conversation_id], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
