// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! HTTP/WebSocket node for atelier workspaces.
//!
//! Transport only: token validation happens behind the [`auth::TokenValidator`]
//! seam, user records behind [`users::UserDirectory`], and every message that
//! survives JSON validation is handed to the core dispatcher.

pub mod app;
pub mod auth;
pub mod error;
pub mod node;
pub mod routes;
pub mod users;
pub mod ws;

pub use app::AppState;
pub use auth::{StaticTokenValidator, TokenValidator};
pub use error::GatewayError;
pub use node::{build_router, serve};
pub use users::{StaticUserDirectory, UserDirectory};
