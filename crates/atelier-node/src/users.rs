// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! User-record seam for the public gallery.
//!
//! The user database (SQL, invite codes) is external; the public routes
//! only need the opt-in set.  [`StaticUserDirectory`] serves it from the
//! `server.public_gallery_users` config list.

use async_trait::async_trait;

/// Which users have opted into the public gallery.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_public_users(&self) -> Vec<String>;
    async fn is_public(&self, user_id: &str) -> bool;
}

pub struct StaticUserDirectory {
    users: Vec<String>,
}

impl StaticUserDirectory {
    pub fn new(users: Vec<String>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn list_public_users(&self) -> Vec<String> {
        self.users.clone()
    }

    async fn is_public(&self, user_id: &str) -> bool {
        self.users.iter().any(|u| u == user_id)
    }
}
