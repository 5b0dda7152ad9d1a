// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact read operations.

use rusqlite::{params, OptionalExtension};
use weir_core::WeirError;

use crate::database::Database;
use crate::models::ContactRecord;

fn json_col<T: serde::de::DeserializeOwned>(idx: usize, text: &str) -> Result<T, rusqlite::Error> {
    serde_json::from_str(text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Look up one contact by its platform contact identifier.
pub async fn get_contact(db: &Database, id: &str) -> Result<Option<ContactRecord>, WeirError> {
    let id = id.to_string();
    db.connection()
        .call(
            move |conn| -> Result<Option<ContactRecord>, rusqlite::Error> {
                conn.query_row(
                    "SELECT id, phone, profile, lifecycle, tags, lifecycle_history, updated_at
                     FROM contacts WHERE id = ?1",
                    params![id],
                    |row| {
                        let profile: String = row.get(2)?;
                        let tags: String = row.get(4)?;
                        let lifecycle_history: String = row.get(5)?;
                        Ok(ContactRecord {
                            id: row.get(0)?,
                            phone: row.get(1)?,
                            profile: json_col(2, &profile)?,
                            lifecycle: row.get(3)?,
                            tags: json_col(4, &tags)?,
                            lifecycle_history: json_col(5, &lifecycle_history)?,
                            updated_at: row.get(6)?,
                        })
                    },
                )
                .optional()
            },
        )
        .await
        .map_err(crate::database::map_tr_err)
}
