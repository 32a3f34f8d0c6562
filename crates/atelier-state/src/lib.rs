// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Filesystem-backed workspace state for multi-user isolation.
//!
//! Each user owns a directory under the configured workspace root:
//!
//! ```text
//! <root>/<user_id>/
//!     workspace.json              # current state, atomic temp+rename writes
//!     workspace.json.corrupted    # quarantined unreadable prior file
//!     gallery/
//!         _index.json             # cached metadata listing
//!         piece_000001.json       # immutable finished pieces
//!     references/                 # saved imagine() outputs
//! ```
//!
//! Two locks per workspace: the strokes lock serializes canvas and
//! pending-queue mutations, the write lock serializes persistence I/O.
//! Neither is ever held across the other's critical section boundary in a
//! way that could deadlock: saves snapshot under the strokes lock, then
//! write under the write lock.

pub mod error;
pub mod persist;
pub mod store;

pub use error::StateError;
pub use store::{StoreOptions, WorkspaceSnapshot, WorkspaceStore};
