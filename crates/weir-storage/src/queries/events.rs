// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Idempotent event application.
//!
//! Each apply runs inside one IMMEDIATE transaction so the message row and
//! its conversation rollup move together. Applying the same event twice is a
//! no-op for every counter: duplicates are detected by primary key before any
//! aggregate is touched.
//!
//! JSON merge helpers are pure `String -> String` functions and parse
//! leniently. A corrupt stored document degrades to its empty value instead
//! of poisoning the whole target.

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use weir_core::event::{LifecycleEvent, MessageEvent, StatusEntry};
use weir_core::record::LifecycleChange;
use weir_core::WeirError;

use crate::database::Database;

/// Format a timestamp the way every stored timestamp is formatted: RFC 3339
/// UTC with millisecond precision, so string min/max equals chronological
/// min/max.
pub(crate) fn fmt_ts(ts: chrono::DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn to_json_string<T: serde::Serialize>(value: &T) -> Result<String, WeirError> {
    serde_json::to_string(value).map_err(|e| WeirError::Storage {
        source: Box::new(e),
    })
}

/// Apply a message event. Returns `true` if a new message row was inserted,
/// `false` if the event was a duplicate by message key.
pub async fn apply_message_event(db: &Database, msg: &MessageEvent) -> Result<bool, WeirError> {
    let now = fmt_ts(Utc::now());
    let ts = fmt_ts(msg.timestamp);

    let id = msg.message_key.clone();
    let conversation_id = msg.conversation_key.clone();
    let sender = msg.sender.clone();
    let sender_info = to_json_string(&msg.sender_info)?;
    let message_type = msg.message_type.clone();
    let direction = msg.direction.to_string();
    let channel_id = msg.channel.id;
    let channel_name = msg.channel.name.clone();
    let channel_source = msg.channel.source.clone();
    let incoming_statuses = msg.status_history.clone();
    let status_history = to_json_string(&msg.status_history)?;
    let event_type = msg.event_type.clone();
    let event_id = msg.event_id.clone();
    let raw = to_json_string(&msg.raw)?;
    let contact = to_json_string(&msg.contact)?;
    let assignee = match &msg.assignee {
        Some(a) => Some(to_json_string(a)?),
        None => None,
    };
    let channel_info = to_json_string(&msg.channel)?;
    let media_type = msg.media_type.clone();

    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let existing_history: Option<String> = tx
                .query_row(
                    "SELECT status_history FROM messages WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            let inserted = existing_history.is_none();

            match existing_history {
                Some(stored) => {
                    // Redelivery: union the status history, take the latest
                    // values for everything else.
                    let merged = merge_status_history(&stored, &incoming_statuses);
                    tx.execute(
                        "UPDATE messages SET
                             ts = ?2, sender = ?3, sender_info = ?4, message_type = ?5,
                             direction = ?6, channel_id = ?7, channel_name = ?8,
                             channel_source = ?9, status_history = ?10, event_type = ?11,
                             event_id = ?12, raw = ?13, updated_at = ?14
                         WHERE id = ?1",
                        params![
                            id,
                            ts,
                            sender,
                            sender_info,
                            message_type,
                            direction,
                            channel_id,
                            channel_name,
                            channel_source,
                            merged,
                            event_type,
                            event_id,
                            raw,
                            now,
                        ],
                    )?;
                }
                None => {
                    tx.execute(
                        "INSERT INTO messages
                             (id, conversation_id, ts, sender, sender_info, message_type,
                              direction, channel_id, channel_name, channel_source,
                              status_history, event_type, event_id, raw, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)",
                        params![
                            id,
                            conversation_id,
                            ts,
                            sender,
                            sender_info,
                            message_type,
                            direction,
                            channel_id,
                            channel_name,
                            channel_source,
                            status_history,
                            event_type,
                            event_id,
                            raw,
                            now,
                        ],
                    )?;
                }
            }

            let rollup: Option<(String, String, String, String)> = tx
                .query_row(
                    "SELECT first_message_ts, last_message_ts, media_counts, channels
                     FROM conversations WHERE id = ?1",
                    params![conversation_id],
                    |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                    },
                )
                .optional()?;

            match rollup {
                Some((first_ts, last_ts, media_counts, channels)) => {
                    let first = if ts < first_ts { &ts } else { &first_ts };
                    let last = if ts > last_ts { &ts } else { &last_ts };
                    let media_counts = if inserted {
                        match &media_type {
                            Some(mt) => bump_media_count(&media_counts, mt),
                            None => media_counts,
                        }
                    } else {
                        media_counts
                    };
                    let channels = match &channel_name {
                        Some(name) => add_channel(&channels, name),
                        None => channels,
                    };
                    tx.execute(
                        "UPDATE conversations SET
                             first_message_ts = ?2, last_message_ts = ?3,
                             message_count = message_count + ?4,
                             media_counts = ?5, channels = ?6, contact = ?7,
                             assignee = COALESCE(?8, assignee), updated_at = ?9
                         WHERE id = ?1",
                        params![
                            conversation_id,
                            first,
                            last,
                            i64::from(inserted),
                            media_counts,
                            channels,
                            contact,
                            assignee,
                            now,
                        ],
                    )?;
                }
                None => {
                    // First sighting of this conversation key. Recompute the
                    // count and the ts bounds from the messages table so the
                    // rollup self-heals if it was ever lost out from under
                    // existing messages. MIN/MAX on the RFC 3339 strings is
                    // chronological because every stored ts shares the format.
                    let (message_count, min_ts, max_ts): (i64, Option<String>, Option<String>) =
                        tx.query_row(
                            "SELECT COUNT(*), MIN(ts), MAX(ts)
                             FROM messages WHERE conversation_id = ?1",
                            params![conversation_id],
                            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                        )?;
                    let first_ts = min_ts.unwrap_or_else(|| ts.clone());
                    let last_ts = max_ts.unwrap_or_else(|| ts.clone());
                    let media_counts = match (&media_type, inserted) {
                        (Some(mt), true) => bump_media_count("{}", mt),
                        _ => "{}".to_string(),
                    };
                    let channels = match &channel_name {
                        Some(name) => add_channel("[]", name),
                        None => "[]".to_string(),
                    };
                    tx.execute(
                        "INSERT INTO conversations
                             (id, created_at, first_message_ts, last_message_ts, message_count,
                              media_counts, channels, contact, assignee, channel_info, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?2)",
                        params![
                            conversation_id,
                            now,
                            first_ts,
                            last_ts,
                            message_count,
                            media_counts,
                            channels,
                            contact,
                            assignee,
                            channel_info,
                        ],
                    )?;
                }
            }

            tx.commit()?;
            Ok(inserted)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply a contact lifecycle transition.
///
/// Upserts the contact row, appends to its lifecycle history (deduplicated by
/// event id), and patches the lifecycle stage on the conversation's contact
/// snapshot when a conversation already exists for the contact's key.
pub async fn apply_lifecycle_event(db: &Database, ev: &LifecycleEvent) -> Result<(), WeirError> {
    let now = fmt_ts(Utc::now());

    let contact_id = ev.contact_id.clone();
    let conversation_key = ev.conversation_key.clone();
    let lifecycle = ev.lifecycle.clone();
    let phone = ev
        .contact
        .get("phone")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let tags: Vec<String> = ev
        .contact
        .get("tags")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|t| t.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let tags = to_json_string(&tags)?;
    let profile = to_json_string(&ev.contact)?;
    let change = LifecycleChange {
        from: ev.old_lifecycle.clone(),
        to: ev.lifecycle.clone(),
        timestamp: now.clone(),
        event_id: ev.event_id.clone(),
    };

    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let existing_history: Option<String> = tx
                .query_row(
                    "SELECT lifecycle_history FROM contacts WHERE id = ?1",
                    params![contact_id],
                    |row| row.get(0),
                )
                .optional()?;

            match existing_history {
                Some(stored) => {
                    let history = append_lifecycle(&stored, &change);
                    tx.execute(
                        "UPDATE contacts SET
                             phone = COALESCE(?2, phone), profile = ?3, lifecycle = ?4,
                             tags = ?5, lifecycle_history = ?6, updated_at = ?7
                         WHERE id = ?1",
                        params![contact_id, phone, profile, lifecycle, tags, history, now],
                    )?;
                }
                None => {
                    let history = append_lifecycle("[]", &change);
                    tx.execute(
                        "INSERT INTO contacts
                             (id, phone, profile, lifecycle, tags, lifecycle_history, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                        params![contact_id, phone, profile, lifecycle, tags, history, now],
                    )?;
                }
            }

            let conversation_contact: Option<String> = tx
                .query_row(
                    "SELECT contact FROM conversations WHERE id = ?1",
                    params![conversation_key],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(snapshot) = conversation_contact {
                let patched = set_contact_lifecycle(&snapshot, lifecycle.as_deref());
                tx.execute(
                    "UPDATE conversations SET contact = ?2, updated_at = ?3 WHERE id = ?1",
                    params![conversation_key, patched, now],
                )?;
            }

            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Union stored and incoming status entries, preserving stored order and
/// appending unseen incoming entries in their own order.
fn merge_status_history(stored_json: &str, incoming: &[StatusEntry]) -> String {
    let mut merged: Vec<StatusEntry> = serde_json::from_str(stored_json).unwrap_or_default();
    for entry in incoming {
        if !merged.contains(entry) {
            merged.push(entry.clone());
        }
    }
    serde_json::to_string(&merged).unwrap_or_else(|_| "[]".to_string())
}

/// Increment one media-type counter in a JSON object of counts.
fn bump_media_count(counts_json: &str, media_type: &str) -> String {
    let mut counts: std::collections::BTreeMap<String, i64> =
        serde_json::from_str(counts_json).unwrap_or_default();
    *counts.entry(media_type.to_string()).or_insert(0) += 1;
    serde_json::to_string(&counts).unwrap_or_else(|_| "{}".to_string())
}

/// Append a channel name to a JSON array of names if not already present.
fn add_channel(channels_json: &str, name: &str) -> String {
    let mut channels: Vec<String> = serde_json::from_str(channels_json).unwrap_or_default();
    if !channels.iter().any(|c| c == name) {
        channels.push(name.to_string());
    }
    serde_json::to_string(&channels).unwrap_or_else(|_| "[]".to_string())
}

/// Append a lifecycle change to a JSON history array.
///
/// When the change carries an event id that already appears in the history,
/// the append is skipped so redelivered webhooks do not duplicate entries.
fn append_lifecycle(history_json: &str, change: &LifecycleChange) -> String {
    let mut history: Vec<LifecycleChange> = serde_json::from_str(history_json).unwrap_or_default();
    let duplicate = match &change.event_id {
        Some(id) => history
            .iter()
            .any(|c| c.event_id.as_deref() == Some(id.as_str())),
        None => false,
    };
    if !duplicate {
        history.push(change.clone());
    }
    serde_json::to_string(&history).unwrap_or_else(|_| "[]".to_string())
}

/// Overwrite the `lifecycle` field of a contact snapshot JSON object.
fn set_contact_lifecycle(contact_json: &str, lifecycle: Option<&str>) -> String {
    let mut contact: serde_json::Value =
        serde_json::from_str(contact_json).unwrap_or_else(|_| serde_json::json!({}));
    if let Some(obj) = contact.as_object_mut() {
        match lifecycle {
            Some(stage) => {
                obj.insert("lifecycle".to_string(), serde_json::json!(stage));
            }
            None => {
                obj.insert("lifecycle".to_string(), serde_json::Value::Null);
            }
        }
    }
    serde_json::to_string(&contact).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::{contacts, conversations, messages};
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::tempdir;
    use weir_core::event::{ChannelInfo, Direction};

    fn ts(secs: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, secs).unwrap()
    }

    fn make_event(message_key: &str, secs: u32) -> MessageEvent {
        MessageEvent {
            direction: Direction::Incoming,
            conversation_key: "+15550001111".to_string(),
            message_key: message_key.to_string(),
            timestamp: ts(secs),
            sender: "+15550001111".to_string(),
            sender_info: json!({"name": "Ada"}),
            message_type: "text".to_string(),
            media_type: None,
            channel: ChannelInfo {
                id: Some(7),
                name: Some("whatsapp".to_string()),
                source: Some("whatsapp_cloud".to_string()),
            },
            contact: json!({"id": "c-1", "phone": "+15550001111", "lifecycle": "lead"}),
            assignee: None,
            status_history: vec![StatusEntry {
                value: "delivered".to_string(),
                timestamp: Some(1_770_000_000_000),
            }],
            event_type: Some("message.received".to_string()),
            event_id: Some("evt-1".to_string()),
            raw: json!({"messageId": message_key}),
        }
    }

    async fn open_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[test]
    fn merge_status_history_unions_without_duplicates() {
        let stored = r#"[{"value":"delivered","timestamp":1}]"#;
        let incoming = vec![
            StatusEntry {
                value: "delivered".to_string(),
                timestamp: Some(1),
            },
            StatusEntry {
                value: "read".to_string(),
                timestamp: Some(2),
            },
        ];
        let merged: Vec<StatusEntry> =
            serde_json::from_str(&merge_status_history(stored, &incoming)).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].value, "read");
    }

    #[test]
    fn merge_status_history_tolerates_corrupt_stored_json() {
        let incoming = vec![StatusEntry {
            value: "sent".to_string(),
            timestamp: None,
        }];
        let merged: Vec<StatusEntry> =
            serde_json::from_str(&merge_status_history("not json", &incoming)).unwrap();
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn bump_media_count_increments_and_creates() {
        let once = bump_media_count("{}", "image");
        assert_eq!(once, r#"{"image":1}"#);
        let twice = bump_media_count(&once, "image");
        assert_eq!(twice, r#"{"image":2}"#);
    }

    #[test]
    fn add_channel_is_set_like() {
        let one = add_channel("[]", "whatsapp");
        assert_eq!(add_channel(&one, "whatsapp"), one);
        let two = add_channel(&one, "telegram");
        assert_eq!(two, r#"["whatsapp","telegram"]"#);
    }

    #[test]
    fn append_lifecycle_dedupes_by_event_id() {
        let change = LifecycleChange {
            from: Some("lead".to_string()),
            to: Some("customer".to_string()),
            timestamp: "2026-02-01T08:00:00.000Z".to_string(),
            event_id: Some("evt-5".to_string()),
        };
        let once = append_lifecycle("[]", &change);
        assert_eq!(append_lifecycle(&once, &change), once);
    }

    #[test]
    fn set_contact_lifecycle_overwrites_stage() {
        let patched = set_contact_lifecycle(r#"{"id":"c-1","lifecycle":"lead"}"#, Some("customer"));
        let value: serde_json::Value = serde_json::from_str(&patched).unwrap();
        assert_eq!(value["lifecycle"], "customer");
    }

    #[tokio::test]
    async fn double_apply_is_idempotent() {
        let (db, _dir) = open_db().await;
        let event = make_event("msg-1", 0);

        assert!(apply_message_event(&db, &event).await.unwrap());
        assert!(!apply_message_event(&db, &event).await.unwrap());

        let conv = conversations::get_conversation(&db, "+15550001111")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conv.message_count, 1);
        assert_eq!(conv.channels, vec!["whatsapp".to_string()]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn rollup_tracks_min_max_regardless_of_arrival_order() {
        let (db, _dir) = open_db().await;

        // Later message arrives first.
        apply_message_event(&db, &make_event("msg-2", 30)).await.unwrap();
        apply_message_event(&db, &make_event("msg-1", 10)).await.unwrap();
        apply_message_event(&db, &make_event("msg-3", 20)).await.unwrap();

        let conv = conversations::get_conversation(&db, "+15550001111")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conv.message_count, 3);
        assert_eq!(conv.first_message_ts, "2026-02-01T08:00:10.000Z");
        assert_eq!(conv.last_message_ts, "2026-02-01T08:00:30.000Z");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_skips_media_count_but_merges_statuses() {
        let (db, _dir) = open_db().await;
        let mut event = make_event("msg-1", 0);
        event.message_type = "attachment".to_string();
        event.media_type = Some("image".to_string());

        apply_message_event(&db, &event).await.unwrap();

        let mut redelivery = event.clone();
        redelivery.status_history.push(StatusEntry {
            value: "read".to_string(),
            timestamp: Some(1_770_000_001_000),
        });
        apply_message_event(&db, &redelivery).await.unwrap();

        let conv = conversations::get_conversation(&db, "+15550001111")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conv.media_counts.get("image"), Some(&1));

        let msg = messages::get_message(&db, "msg-1").await.unwrap().unwrap();
        assert_eq!(msg.status_history.len(), 2);
        assert_eq!(msg.status_history[1].value, "read");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn rollup_self_heals_from_message_table() {
        let (db, _dir) = open_db().await;
        apply_message_event(&db, &make_event("msg-1", 0)).await.unwrap();
        apply_message_event(&db, &make_event("msg-2", 1)).await.unwrap();

        // Simulate a lost rollup row.
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute("DELETE FROM conversations", [])?;
                Ok(())
            })
            .await
            .unwrap();

        apply_message_event(&db, &make_event("msg-3", 2)).await.unwrap();
        let conv = conversations::get_conversation(&db, "+15550001111")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conv.message_count, 3);
        // The healed bounds come from the messages table, not from the
        // triggering event alone.
        assert_eq!(conv.first_message_ts, "2026-02-01T08:00:00.000Z");
        assert_eq!(conv.last_message_ts, "2026-02-01T08:00:02.000Z");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn lifecycle_upserts_contact_and_patches_conversation() {
        let (db, _dir) = open_db().await;
        apply_message_event(&db, &make_event("msg-1", 0)).await.unwrap();

        let ev = LifecycleEvent {
            contact_id: "c-1".to_string(),
            conversation_key: "+15550001111".to_string(),
            old_lifecycle: Some("lead".to_string()),
            lifecycle: Some("customer".to_string()),
            event_id: Some("evt-9".to_string()),
            contact: json!({
                "id": "c-1",
                "phone": "+15550001111",
                "tags": ["vip"],
            }),
        };
        apply_lifecycle_event(&db, &ev).await.unwrap();
        // Redelivery of the same event id must not duplicate history.
        apply_lifecycle_event(&db, &ev).await.unwrap();

        let contact = contacts::get_contact(&db, "c-1").await.unwrap().unwrap();
        assert_eq!(contact.lifecycle.as_deref(), Some("customer"));
        assert_eq!(contact.tags, vec!["vip".to_string()]);
        assert_eq!(contact.lifecycle_history.len(), 1);
        assert_eq!(
            contact.lifecycle_history[0].from.as_deref(),
            Some("lead")
        );

        let conv = conversations::get_conversation(&db, "+15550001111")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conv.contact["lifecycle"], "customer");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn lifecycle_for_unknown_conversation_only_touches_contact() {
        let (db, _dir) = open_db().await;
        let ev = LifecycleEvent {
            contact_id: "c-2".to_string(),
            conversation_key: "+15550002222".to_string(),
            old_lifecycle: None,
            lifecycle: Some("lead".to_string()),
            event_id: None,
            contact: json!({"id": "c-2"}),
        };
        apply_lifecycle_event(&db, &ev).await.unwrap();

        assert!(contacts::get_contact(&db, "c-2").await.unwrap().is_some());
        assert!(conversations::get_conversation(&db, "+15550002222")
            .await
            .unwrap()
            .is_none());

        db.close().await.unwrap();
    }
}
