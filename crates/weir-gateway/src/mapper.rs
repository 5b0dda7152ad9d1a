// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook envelope to normalized event mapping.
//!
//! The platform posts loosely-typed JSON envelopes; this module pulls out
//! the fields the pipeline cares about and leaves everything else in the
//! `raw` snapshot. Mapping is lenient about optional fields and strict only
//! about identity: an event with neither a contact phone nor a contact id
//! cannot be keyed and is rejected.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use weir_core::event::{ChannelInfo, Direction, LifecycleEvent, MessageEvent, StatusEntry};
use weir_core::WeirError;

/// Event type the lifecycle endpoint requires.
pub const LIFECYCLE_EVENT_TYPE: &str = "contact.lifecycle.updated";

/// Extract the media type used for conversation counters from the inner
/// message content object.
///
/// `attachment` messages report their nested attachment type, defaulting to
/// `file`. Plain media types pass through. Text and anything unrecognized
/// count as no media.
pub fn extract_media_type(content: &Value) -> Option<String> {
    let msg_type = content.get("type").and_then(Value::as_str).unwrap_or("text");
    match msg_type {
        "attachment" => {
            let nested = content
                .get("attachment")
                .and_then(|a| a.get("type"))
                .and_then(Value::as_str)
                .unwrap_or("file");
            Some(nested.to_string())
        }
        "image" | "video" | "document" | "file" | "audio" | "media" => Some(msg_type.to_string()),
        _ => None,
    }
}

/// Stringify an id that the platform may send as a number or a string.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn nonempty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Resolve the conversation key: contact phone, falling back to contact id.
fn conversation_key(contact: &Value) -> Result<(String, Option<String>), WeirError> {
    let phone = nonempty_str(contact.get("phone"));
    let contact_id = contact.get("id").and_then(id_string);
    match (&phone, &contact_id) {
        (Some(p), _) => Ok((p.clone(), contact_id)),
        (None, Some(id)) => Ok((id.clone(), contact_id)),
        (None, None) => Err(WeirError::Mapping(
            "webhook contact has neither phone nor id".to_string(),
        )),
    }
}

fn epoch_ms_to_utc(ms: i64) -> DateTime<Utc> {
    match Utc.timestamp_millis_opt(ms) {
        chrono::LocalResult::Single(ts) => ts,
        _ => Utc::now(),
    }
}

fn parse_status_history(message: &Value) -> Vec<StatusEntry> {
    message
        .get("status")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let value = entry.get("value").and_then(Value::as_str)?;
                    Some(StatusEntry {
                        value: value.to_string(),
                        timestamp: entry.get("timestamp").and_then(Value::as_i64),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Map a message webhook envelope into a normalized [`MessageEvent`].
pub fn map_message_event(direction: Direction, body: &Value) -> Result<MessageEvent, WeirError> {
    let contact = body.get("contact").cloned().unwrap_or_else(|| Value::Object(Default::default()));
    let (key, contact_id) = conversation_key(&contact)?;

    let message = body.get("message").cloned().unwrap_or_else(|| Value::Object(Default::default()));
    let message_key = message
        .get("messageId")
        .and_then(id_string)
        .ok_or_else(|| WeirError::Mapping("webhook message has no messageId".to_string()))?;

    let timestamp = message
        .get("timestamp")
        .and_then(Value::as_i64)
        .map(epoch_ms_to_utc)
        .unwrap_or_else(Utc::now);

    let content = message.get("message").cloned().unwrap_or_else(|| Value::Object(Default::default()));
    let message_type = content
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("text")
        .to_string();
    let media_type = extract_media_type(&content);

    let (sender, sender_info) = match direction {
        Direction::Incoming => {
            let first = contact.get("firstName").and_then(Value::as_str).unwrap_or("");
            let last = contact.get("lastName").and_then(Value::as_str).unwrap_or("");
            let name = format!("{first} {last}").trim().to_string();
            (
                key.clone(),
                serde_json::json!({
                    "phone": contact.get("phone"),
                    "contact_id": contact_id,
                    "name": name,
                }),
            )
        }
        Direction::Outgoing => match body.get("user").filter(|u| u.is_object()) {
            Some(user) => (
                nonempty_str(user.get("email")).unwrap_or_else(|| "system".to_string()),
                serde_json::json!({
                    "id": user.get("id"),
                    "email": user.get("email"),
                    "firstName": user.get("firstName"),
                    "lastName": user.get("lastName"),
                    "role": user.get("role"),
                }),
            ),
            None => {
                let source = nonempty_str(body.get("source")).unwrap_or_else(|| "system".to_string());
                (source.clone(), serde_json::json!({ "source": source }))
            }
        },
    };

    let channel = body.get("channel").cloned().unwrap_or(Value::Null);
    let channel = ChannelInfo {
        id: channel.get("id").and_then(Value::as_i64),
        name: nonempty_str(channel.get("name")),
        source: nonempty_str(channel.get("source")),
    };

    Ok(MessageEvent {
        direction,
        conversation_key: key,
        message_key,
        timestamp,
        sender,
        sender_info,
        message_type,
        media_type,
        channel,
        assignee: contact.get("assignee").cloned(),
        contact,
        status_history: parse_status_history(&message),
        event_type: nonempty_str(body.get("event_type")),
        event_id: body.get("event_id").and_then(id_string),
        raw: content,
    })
}

/// Map a lifecycle webhook envelope into a normalized [`LifecycleEvent`].
pub fn map_lifecycle_event(body: &Value) -> Result<LifecycleEvent, WeirError> {
    let contact = body.get("contact").cloned().unwrap_or_else(|| Value::Object(Default::default()));
    let (key, contact_id) = conversation_key(&contact)?;

    Ok(LifecycleEvent {
        // A contact without an id is still trackable by its phone key.
        contact_id: contact_id.unwrap_or_else(|| key.clone()),
        conversation_key: key,
        old_lifecycle: nonempty_str(body.get("oldLifecycle")),
        lifecycle: nonempty_str(body.get("lifecycle")),
        event_id: body.get("event_id").and_then(id_string),
        contact,
    })
}
