// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Test doubles shared by the resolver and service tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tether_auth::{
	normalize_email, AuthError, LinkedIdentity, NormalizedIdentity, ProviderKind, TokenSet, User,
	UserId,
};
use tether_auth_providers::providers::github::{GitHubEmail, GitHubProfile, GitHubUser};
use tether_auth_providers::providers::google::GoogleProfile;
use tether_auth_providers::{ProviderAdapter, RawProfile};
use tether_common_secret::SecretString;
use tether_db::{DbError, RemoveIdentities, UserStore};
use url::Url;

use crate::resolver::IdentityResolver;

pub fn identity(
	provider: ProviderKind,
	external_id: &str,
	email: Option<&str>,
	email_verified: bool,
) -> NormalizedIdentity {
	NormalizedIdentity {
		provider,
		external_id: external_id.to_string(),
		display_name: format!("{provider} {external_id}"),
		email: normalize_email(email),
		email_verified,
		profile_photo: None,
		tokens: TokenSet::bearer(format!("access-{external_id}")),
	}
}

pub fn resolver_with(store: Arc<dyn UserStore>) -> IdentityResolver {
	IdentityResolver::new(store)
}

/// A compact JWT with the given claims and a dummy signature.
pub fn jwt(claims: serde_json::Value) -> String {
	let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
	let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
	format!("{header}.{payload}.sig")
}

// =============================================================================
// Stores
// =============================================================================

/// Delegates to a real store, intercepting identity lookups.
///
/// The first `stale` lookups miss as if a concurrent write had not committed,
/// and the first `failures` lookups fail with a pool timeout.
pub struct InterceptStore {
	inner: Arc<dyn UserStore>,
	stale: AtomicUsize,
	failures: AtomicUsize,
	lookups: AtomicUsize,
}

impl InterceptStore {
	pub fn stale_lookups(inner: Arc<dyn UserStore>, stale: usize) -> Self {
		Self::new(inner, stale, 0)
	}

	pub fn failing_lookups(inner: Arc<dyn UserStore>, failures: usize) -> Self {
		Self::new(inner, 0, failures)
	}

	fn new(inner: Arc<dyn UserStore>, stale: usize, failures: usize) -> Self {
		Self {
			inner,
			stale: AtomicUsize::new(stale),
			failures: AtomicUsize::new(failures),
			lookups: AtomicUsize::new(0),
		}
	}

	pub fn lookups(&self) -> usize {
		self.lookups.load(Ordering::SeqCst)
	}
}

fn take_one(counter: &AtomicUsize) -> bool {
	counter
		.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
		.is_ok()
}

#[async_trait]
impl UserStore for InterceptStore {
	async fn create_user_with_identity(
		&self,
		email: &str,
		email_verified: bool,
		identity: &LinkedIdentity,
	) -> Result<User, DbError> {
		self.inner
			.create_user_with_identity(email, email_verified, identity)
			.await
	}

	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError> {
		self.inner.get_user_by_id(id).await
	}

	async fn get_user_by_identity(
		&self,
		provider: ProviderKind,
		provider_id: &str,
	) -> Result<Option<User>, DbError> {
		self.lookups.fetch_add(1, Ordering::SeqCst);
		if take_one(&self.failures) {
			return Err(DbError::Sqlx(sqlx::Error::PoolTimedOut));
		}
		if take_one(&self.stale) {
			return Ok(None);
		}
		self.inner.get_user_by_identity(provider, provider_id).await
	}

	async fn find_user_by_verified_email(&self, email: &str) -> Result<Option<User>, DbError> {
		self.inner.find_user_by_verified_email(email).await
	}

	async fn add_identity(&self, user_id: &UserId, identity: &LinkedIdentity) -> Result<User, DbError> {
		self.inner.add_identity(user_id, identity).await
	}

	async fn refresh_identity(
		&self,
		user_id: &UserId,
		identity: &NormalizedIdentity,
	) -> Result<User, DbError> {
		self.inner.refresh_identity(user_id, identity).await
	}

	async fn remove_provider_identities(
		&self,
		user_id: &UserId,
		provider: ProviderKind,
	) -> Result<RemoveIdentities, DbError> {
		self.inner.remove_provider_identities(user_id, provider).await
	}
}

// =============================================================================
// Provider adapter
// =============================================================================

/// Provider stand-in that records every call that would hit the network.
pub struct FakeAdapter {
	kind: ProviderKind,
	profile: RawProfile,
	id_token: Mutex<Option<String>>,
	exchange_error: Option<String>,
	pub exchanges: AtomicUsize,
	pub profile_fetches: AtomicUsize,
}

impl FakeAdapter {
	pub fn google(sub: &str, email: Option<&str>, email_verified: bool) -> Self {
		Self::new(RawProfile::Google(GoogleProfile {
			sub: sub.to_string(),
			name: Some(format!("Google {sub}")),
			email: email.map(String::from),
			email_verified,
			picture: None,
		}))
	}

	pub fn github(id: i64, verified_email: Option<&str>) -> Self {
		Self::new(RawProfile::GitHub(GitHubProfile {
			user: GitHubUser {
				id,
				login: format!("user{id}"),
				name: None,
				email: None,
				avatar_url: None,
			},
			emails: verified_email
				.map(|e| GitHubEmail {
					email: e.to_string(),
					primary: true,
					verified: true,
				})
				.into_iter()
				.collect(),
		}))
	}

	fn new(profile: RawProfile) -> Self {
		Self {
			kind: profile.provider(),
			profile,
			id_token: Mutex::new(None),
			exchange_error: None,
			exchanges: AtomicUsize::new(0),
			profile_fetches: AtomicUsize::new(0),
		}
	}

	pub fn failing_exchange(mut self, payload: &str) -> Self {
		self.exchange_error = Some(payload.to_string());
		self
	}

	/// Make the next token response carry this id_token.
	pub fn set_id_token(&self, token: String) {
		if let Ok(mut slot) = self.id_token.lock() {
			*slot = Some(token);
		}
	}

	pub fn http_calls(&self) -> usize {
		self.exchanges.load(Ordering::SeqCst) + self.profile_fetches.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl ProviderAdapter for FakeAdapter {
	fn provider(&self) -> ProviderKind {
		self.kind
	}

	fn uses_nonce(&self) -> bool {
		matches!(
			self.kind,
			ProviderKind::Google | ProviderKind::Microsoft | ProviderKind::LinkedIn
		)
	}

	fn build_authorization_url(&self, _scopes: Option<&[String]>, state: &str, nonce: Option<&str>) -> Url {
		let mut url = Url::parse("https://provider.example/authorize").unwrap();
		url.query_pairs_mut().append_pair("state", state);
		if let Some(nonce) = nonce {
			url.query_pairs_mut().append_pair("nonce", nonce);
		}
		url
	}

	async fn exchange_code(&self, code: &str) -> Result<TokenSet, AuthError> {
		self.exchanges.fetch_add(1, Ordering::SeqCst);
		if let Some(payload) = &self.exchange_error {
			return Err(AuthError::from_provider_payload(Some(self.kind), payload));
		}
		let mut tokens = TokenSet::bearer(format!("access-for-{code}"));
		tokens.id_token = self
			.id_token
			.lock()
			.ok()
			.and_then(|t| t.clone())
			.map(SecretString::new);
		Ok(tokens)
	}

	async fn fetch_profile(&self, _access_token: &SecretString) -> Result<RawProfile, AuthError> {
		self.profile_fetches.fetch_add(1, Ordering::SeqCst);
		Ok(self.profile.clone())
	}
}
