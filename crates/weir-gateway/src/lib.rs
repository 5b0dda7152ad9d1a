// SPDX-FileCopyrightText: 2026 Weir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP webhook gateway for the Weir bridge.
//!
//! Exposes per-target webhook endpoints, a health snapshot, and a service
//! banner, and maps platform envelopes into pipeline events.

pub mod handlers;
pub mod mapper;
pub mod server;

pub use handlers::AppState;
pub use server::{build_router, start_server, ServerConfig};
