// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for the storage schema.
//!
//! The canonical record shapes live in `weir-core`; this module re-exports
//! them so query code and callers share one definition.

pub use weir_core::record::{ConversationRecord, ContactRecord, LifecycleChange, MessageRecord};
