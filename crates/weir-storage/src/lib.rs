// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Weir webhook bridge.
//!
//! One database per configured storage target, opened with WAL journaling
//! and embedded refinery migrations. Event application is idempotent and
//! transactional: a message row and its conversation rollup always move in
//! the same IMMEDIATE transaction.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod store;

pub use database::Database;
pub use store::SqliteEventStore;
