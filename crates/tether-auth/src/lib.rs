// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core domain types for Tether.
//!
//! - [`User`] and [`LinkedIdentity`]: the account aggregate and its provider linkages
//! - [`NormalizedIdentity`] and [`TokenSet`]: what a provider adapter hands to the resolver
//! - [`ProviderKind`]: the closed set of supported identity providers
//! - [`AuthError`] and [`ErrorKind`]: the failure taxonomy shared by every crate

pub mod error;
pub mod identity;
pub mod types;
pub mod user;

pub use error::{provider_error_description, AuthError, ErrorKind};
pub use identity::{normalize_email, NormalizedIdentity, TokenSet};
pub use types::{IdentityId, ProviderKind, UserId};
pub use user::{placeholder_email, LinkedIdentity, User};
