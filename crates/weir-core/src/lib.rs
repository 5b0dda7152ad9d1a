// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Weir webhook bridge.
//!
//! This crate provides the normalized event model, the stored record shapes,
//! the `EventStore` storage seam, and the error type shared across the Weir
//! workspace. It carries no I/O of its own.

pub mod error;
pub mod event;
pub mod record;
pub mod store;

// Re-export key items at crate root for ergonomic imports.
pub use error::WeirError;
pub use event::{ChannelInfo, Direction, Event, EventBody, LifecycleEvent, MessageEvent, StatusEntry};
pub use record::{ContactRecord, ConversationRecord, LifecycleChange, MessageRecord};
pub use store::{EventStore, UpsertOutcome};
