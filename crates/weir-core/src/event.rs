// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normalized event types flowing through the ingestion pipeline.
//!
//! Events are produced by the gateway's schema mapper, carried through the
//! bounded queue (or the inline fallback path), and consumed exactly once by
//! the storage layer. They are immutable after construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Message direction relative to the recorded contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// One normalized inbound notification, routed to a named storage target.
#[derive(Debug, Clone)]
pub struct Event {
    /// Storage target name (a key of the configured target map).
    pub target: String,
    /// The normalized payload.
    pub body: EventBody,
    /// When the event entered the pipeline.
    pub enqueued_at: DateTime<Utc>,
}

impl Event {
    pub fn new(target: impl Into<String>, body: EventBody) -> Self {
        Self {
            target: target.into(),
            body,
            enqueued_at: Utc::now(),
        }
    }
}

/// The closed set of payload kinds the pipeline processes.
#[derive(Debug, Clone)]
pub enum EventBody {
    /// An incoming or outgoing platform message.
    Message(MessageEvent),
    /// A contact lifecycle stage transition.
    Lifecycle(LifecycleEvent),
}

/// A normalized platform message, mapped from the webhook envelope.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub direction: Direction,
    /// Stable conversation key: contact phone, falling back to contact id.
    pub conversation_key: String,
    /// Platform message identifier, globally unique per storage target.
    pub message_key: String,
    pub timestamp: DateTime<Utc>,
    /// Sender identifier (conversation key, user email, or source name).
    pub sender: String,
    /// Sender detail snapshot as mapped from the payload.
    pub sender_info: serde_json::Value,
    /// Platform message type ("text", "attachment", "image", ...).
    pub message_type: String,
    /// Media type extracted for conversation counters, if any.
    pub media_type: Option<String>,
    pub channel: ChannelInfo,
    /// Contact profile snapshot.
    pub contact: serde_json::Value,
    /// Assignee snapshot, when the platform supplies one.
    pub assignee: Option<serde_json::Value>,
    /// Delivery status entries carried by this event.
    pub status_history: Vec<StatusEntry>,
    pub event_type: Option<String>,
    pub event_id: Option<String>,
    /// The full inner message object, kept for unmapped fields.
    pub raw: serde_json::Value,
}

/// A contact lifecycle transition, mapped from a lifecycle webhook.
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    pub contact_id: String,
    /// Conversation key of the contact (phone, falling back to contact id).
    pub conversation_key: String,
    pub old_lifecycle: Option<String>,
    pub lifecycle: Option<String>,
    pub event_id: Option<String>,
    /// Contact profile snapshot, including tags and assignee if present.
    pub contact: serde_json::Value,
}

/// Channel identification carried on every message event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub source: Option<String>,
}

/// One delivery-status entry in a message's append-only status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}
