// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use tether_auth::{AuthError, NormalizedIdentity, ProviderKind, TokenSet};
use tether_common_secret::SecretString;
use url::Url;

use crate::profile::RawProfile;

/// One configured identity provider.
///
/// Implementations hold their client credentials and HTTP client. Errors are
/// already classified: anything returned from the async methods is an
/// [`AuthError::Provider`] unless the adapter itself is misconfigured.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
	fn provider(&self) -> ProviderKind;

	/// Whether flows for this provider carry an OpenID Connect nonce.
	fn uses_nonce(&self) -> bool;

	/// The provider consent URL. `scopes` overrides the configured scopes.
	fn build_authorization_url(
		&self,
		scopes: Option<&[String]>,
		state: &str,
		nonce: Option<&str>,
	) -> Url;

	async fn exchange_code(&self, code: &str) -> Result<TokenSet, AuthError>;

	async fn fetch_profile(&self, access_token: &SecretString) -> Result<RawProfile, AuthError>;

	fn normalize_profile(&self, raw: RawProfile, tokens: TokenSet) -> NormalizedIdentity {
		raw.normalize(tokens)
	}
}
