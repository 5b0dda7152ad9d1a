// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stored record shapes: conversations, messages, and contacts.
//!
//! Timestamps are RFC 3339 strings with millisecond precision in UTC, so
//! lexicographic comparison matches chronological order. Document-flavored
//! fields (snapshots, counters, histories) are JSON strings as stored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-conversation rollup of message statistics and profile metadata.
///
/// Keyed by the conversation key (contact phone or contact id). Created on
/// the first event for its key, mutated in place afterwards, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: String,
    pub created_at: String,
    pub first_message_ts: String,
    pub last_message_ts: String,
    /// Count of distinct messages ever recorded for this key. Monotonic.
    pub message_count: i64,
    /// Media-type name -> cumulative count.
    pub media_counts: BTreeMap<String, i64>,
    /// Channel names seen on this conversation, insertion-ordered.
    pub channels: Vec<String>,
    pub contact: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<serde_json::Value>,
    pub channel_info: serde_json::Value,
    pub updated_at: String,
}

/// One stored message, keyed by the platform message identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub conversation_id: String,
    pub ts: String,
    pub sender: String,
    pub sender_info: serde_json::Value,
    pub message_type: String,
    pub direction: String,
    pub channel_id: Option<i64>,
    pub channel_name: Option<String>,
    pub channel_source: Option<String>,
    /// Append-only delivery status history.
    pub status_history: Vec<crate::event::StatusEntry>,
    pub event_type: Option<String>,
    pub event_id: Option<String>,
    /// Full inner message object for unmapped-field forward compatibility.
    pub raw: serde_json::Value,
    pub created_at: String,
    pub updated_at: String,
}

/// A contact profile with lifecycle tracking, keyed by contact id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id: String,
    pub phone: Option<String>,
    pub profile: serde_json::Value,
    pub lifecycle: Option<String>,
    pub tags: Vec<String>,
    /// Append-only lifecycle transition history.
    pub lifecycle_history: Vec<LifecycleChange>,
    pub updated_at: String,
}

/// One entry in a contact's lifecycle history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleChange {
    pub from: Option<String>,
    pub to: Option<String>,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}
