// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity resolution and account linking.
//!
//! [`IdentityService`] is what an HTTP router calls:
//!
//! - [`IdentityService::initiate`] starts a flow and returns the provider URL
//! - [`IdentityService::handle_callback`] verifies the CSRF state, talks to the
//!   provider and resolves the identity to a [`User`](tether_auth::User)
//! - [`IdentityService::unlink`] detaches a provider from a user
//! - [`IdentityService::current_user`] reads the user behind a session
//!
//! The session is an explicit [`SessionContext`] value the router loads and
//! saves around each call, typically through a [`SessionStore`].

pub mod classify;
pub mod resolver;
pub mod retry;
pub mod service;
pub mod session;
pub mod session_store;

#[cfg(test)]
pub(crate) mod testing;

pub use classify::classify;
pub use resolver::{Decision, IdentityResolver, Resolution};
pub use retry::{retry, RetryConfig, RetryableError};
pub use service::{CallbackOutcome, CallbackQuery, IdentityService};
pub use session::{
	generate_nonce, generate_state, is_safe_redirect, sanitize_redirect, FlowPhase, PendingFlow,
	SessionContext,
};
pub use session_store::{MemorySessionStore, SessionStore};
