// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for users and their linked identities.
//!
//! The schema enforces the two storage-level guarantees identity resolution
//! relies on: `(provider, provider_id)` is unique across all users, and a
//! user's last remaining provider can never be removed.

pub mod error;
pub mod migrations;
pub mod pool;
pub mod testing;
pub mod user;

pub use error::{DbError, Result};
pub use migrations::run_migrations;
pub use pool::create_pool;
pub use user::{RemoveIdentities, UserRepository, UserStore};
