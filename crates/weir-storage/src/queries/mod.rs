// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per concern.

pub mod contacts;
pub mod conversations;
pub mod events;
pub mod messages;
