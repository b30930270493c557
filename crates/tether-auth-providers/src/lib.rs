// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! OAuth 2.0 provider adapters for Tether.
//!
//! Every supported provider runs the same authorization code flow:
//!
//! 1. [`ProviderAdapter::build_authorization_url`] embeds the CSRF state (and,
//!    for OpenID Connect providers, a nonce) in the provider's consent URL.
//! 2. [`ProviderAdapter::exchange_code`] trades the callback `code` for a
//!    [`TokenSet`](tether_auth::TokenSet).
//! 3. [`ProviderAdapter::fetch_profile`] calls the provider's profile API.
//!    GitHub needs a second call for verified email addresses.
//! 4. [`ProviderAdapter::normalize_profile`] maps the provider's profile into a
//!    [`NormalizedIdentity`](tether_auth::NormalizedIdentity).
//!
//! Per-provider differences (endpoints, default scopes, profile shape) live in
//! [`providers`] as static [`ProviderSpec`] entries. A single
//! [`OAuth2Adapter`] drives all of them.
//!
//! Tokens and client secrets stay in [`SecretString`](tether_common_secret::SecretString)
//! and every instrumented method skips them.

pub mod adapter;
pub mod error;
pub mod id_token;
pub mod oauth2;
pub mod profile;
pub mod providers;
pub mod registry;

pub use adapter::ProviderAdapter;
pub use error::OAuthError;
pub use id_token::{decode_claims, verify_nonce, IdTokenClaims};
pub use oauth2::{OAuth2Adapter, ProviderEndpoints};
pub use profile::RawProfile;
pub use providers::{spec_for, ProviderSpec};
pub use registry::ProviderRegistry;
