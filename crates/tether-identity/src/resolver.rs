// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Maps a [`NormalizedIdentity`] to an internal [`User`].
//!
//! Evaluation order is fixed. With a logged-in user (linking mode):
//!
//! 1. identity owned by another user: [`AuthError::AlreadyLinked`]
//! 2. identity owned by this user: refresh it, [`Decision::Login`]
//! 3. identity unknown: attach it, [`Decision::Link`]
//!
//! Without one:
//!
//! 1. identity known: refresh it, [`Decision::Login`]
//! 2. verified email matches a verified user: attach it, [`Decision::Login`]
//! 3. otherwise: new user, [`Decision::Create`]
//!
//! A write that loses a uniqueness race is retried once as lookup-then-login.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tether_auth::{placeholder_email, AuthError, LinkedIdentity, NormalizedIdentity, User, UserId};
use tether_db::{DbError, UserStore};

use crate::retry::{retry, RetryConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
	Create,
	Login,
	Link,
}

impl fmt::Display for Decision {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Decision::Create => "create",
			Decision::Login => "login",
			Decision::Link => "link",
		})
	}
}

#[derive(Debug, Clone)]
pub struct Resolution {
	pub decision: Decision,
	pub user: User,
}

impl Resolution {
	fn new(decision: Decision, user: User) -> Self {
		tracing::info!(user_id = %user.id, %decision, "identity resolved");
		Self { decision, user }
	}
}

#[derive(Clone)]
pub struct IdentityResolver {
	store: Arc<dyn UserStore>,
	read_retry: RetryConfig,
}

impl IdentityResolver {
	pub fn new(store: Arc<dyn UserStore>) -> Self {
		Self {
			store,
			read_retry: RetryConfig::default(),
		}
	}

	pub fn with_read_retry(mut self, read_retry: RetryConfig) -> Self {
		self.read_retry = read_retry;
		self
	}

	#[tracing::instrument(
		skip(self, identity),
		fields(provider = %identity.provider, authenticated = current_user.is_some())
	)]
	pub async fn resolve(
		&self,
		current_user: Option<&UserId>,
		identity: &NormalizedIdentity,
	) -> Result<Resolution, AuthError> {
		match current_user {
			Some(user_id) => self.resolve_linking(user_id, identity).await,
			None => self.resolve_anonymous(identity).await,
		}
	}

	async fn resolve_linking(
		&self,
		user_id: &UserId,
		identity: &NormalizedIdentity,
	) -> Result<Resolution, AuthError> {
		match self.lookup(identity).await? {
			Some(owner) if owner.id != *user_id => Err(already_linked(identity, &owner)),
			Some(_) => self.refresh(user_id, identity).await,
			None => {
				let linked = LinkedIdentity::from_normalized(identity, Utc::now());
				match self.store.add_identity(user_id, &linked).await {
					Ok(user) => {
						tracing::debug!(user_id = %user.id, provider = %identity.provider, "identity linked");
						Ok(Resolution::new(Decision::Link, user))
					}
					Err(e) if e.is_conflict() => match self.lookup(identity).await? {
						Some(owner) if owner.id == *user_id => self.refresh(user_id, identity).await,
						Some(owner) => Err(already_linked(identity, &owner)),
						None => Err(vanished(e)),
					},
					Err(e) => Err(e.into()),
				}
			}
		}
	}

	async fn resolve_anonymous(&self, identity: &NormalizedIdentity) -> Result<Resolution, AuthError> {
		if let Some(owner) = self.lookup(identity).await? {
			return self.refresh(&owner.id, identity).await;
		}

		if let Some(email) = identity.verified_email() {
			let found = retry(&self.read_retry, || self.store.find_user_by_verified_email(email)).await?;
			if let Some(user) = found {
				let linked = LinkedIdentity::from_normalized(identity, Utc::now());
				return match self.store.add_identity(&user.id, &linked).await {
					Ok(user) => {
						tracing::debug!(user_id = %user.id, provider = %identity.provider, "identity merged by verified email");
						Ok(Resolution::new(Decision::Login, user))
					}
					Err(e) if e.is_conflict() => self.login_after_race(identity, e).await,
					Err(e) => Err(e.into()),
				};
			}
		}

		let email = identity
			.email
			.clone()
			.unwrap_or_else(|| placeholder_email(identity.provider, &identity.external_id));
		let email_verified = identity.verified_email().is_some();
		let linked = LinkedIdentity::from_normalized(identity, Utc::now());

		match self
			.store
			.create_user_with_identity(&email, email_verified, &linked)
			.await
		{
			Ok(user) => Ok(Resolution::new(Decision::Create, user)),
			Err(e) if e.is_conflict() => self.login_after_race(identity, e).await,
			Err(e) => Err(e.into()),
		}
	}

	/// A concurrent callback registered the same identity first.
	async fn login_after_race(
		&self,
		identity: &NormalizedIdentity,
		conflict: DbError,
	) -> Result<Resolution, AuthError> {
		tracing::debug!(provider = %identity.provider, "uniqueness race lost, retrying as login");
		match self.lookup(identity).await? {
			Some(owner) => self.refresh(&owner.id, identity).await,
			None => Err(vanished(conflict)),
		}
	}

	async fn lookup(&self, identity: &NormalizedIdentity) -> Result<Option<User>, DbError> {
		retry(&self.read_retry, || {
			self.store
				.get_user_by_identity(identity.provider, &identity.external_id)
		})
		.await
	}

	async fn refresh(&self, user_id: &UserId, identity: &NormalizedIdentity) -> Result<Resolution, AuthError> {
		let user = self.store.refresh_identity(user_id, identity).await?;
		Ok(Resolution::new(Decision::Login, user))
	}
}

fn already_linked(identity: &NormalizedIdentity, owner: &User) -> AuthError {
	tracing::warn!(
		provider = %identity.provider,
		owner_id = %owner.id,
		"identity already linked to another user"
	);
	AuthError::AlreadyLinked {
		provider: identity.provider,
		provider_id: identity.external_id.clone(),
	}
}

fn vanished(conflict: DbError) -> AuthError {
	AuthError::Persistence(format!("identity missing after uniqueness conflict: {conflict}"))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{identity, resolver_with, InterceptStore};
	use proptest::prelude::*;
	use std::time::Duration;
	use tether_auth::{ErrorKind, ProviderKind, TokenSet};
	use tether_db::testing::create_user_test_pool;
	use tether_db::UserRepository;

	async fn repo() -> Arc<UserRepository> {
		Arc::new(UserRepository::new(create_user_test_pool().await.unwrap()))
	}

	#[tokio::test]
	async fn anonymous_new_identity_creates_user() {
		let repo = repo().await;
		let resolver = resolver_with(repo.clone());

		let r = resolver
			.resolve(None, &identity(ProviderKind::Google, "g1", Some("a@x.com"), true))
			.await
			.unwrap();

		assert_eq!(r.decision, Decision::Create);
		assert_eq!(r.user.email, "a@x.com");
		assert!(r.user.email_verified);
		assert_eq!(r.user.identities.len(), 1);
		assert_eq!(r.user.identities[0].provider_id, "g1");
	}

	#[tokio::test]
	async fn create_without_email_uses_placeholder() {
		let resolver = resolver_with(repo().await);
		let r = resolver
			.resolve(None, &identity(ProviderKind::GitHub, "583231", None, false))
			.await
			.unwrap();

		assert_eq!(r.decision, Decision::Create);
		assert_eq!(r.user.email, "user-583231@github.account");
		assert!(!r.user.email_verified);
	}

	#[tokio::test]
	async fn create_with_unverified_email_keeps_it_unverified() {
		let resolver = resolver_with(repo().await);
		let r = resolver
			.resolve(None, &identity(ProviderKind::Facebook, "fb1", Some("b@x.com"), false))
			.await
			.unwrap();
		assert_eq!(r.user.email, "b@x.com");
		assert!(!r.user.email_verified);
	}

	#[tokio::test]
	async fn known_identity_logs_in_and_refreshes() {
		let resolver = resolver_with(repo().await);
		let first = resolver
			.resolve(None, &identity(ProviderKind::Google, "g1", Some("a@x.com"), true))
			.await
			.unwrap();

		let mut again = identity(ProviderKind::Google, "g1", Some("a@x.com"), true);
		again.display_name = "Ada L.".to_string();
		again.tokens = TokenSet::bearer("new-access");
		let second = resolver.resolve(None, &again).await.unwrap();

		assert_eq!(second.decision, Decision::Login);
		assert_eq!(second.user.id, first.user.id);
		assert_eq!(second.user.identities.len(), 1);
		assert_eq!(second.user.identities[0].display_name, "Ada L.");
		assert_eq!(second.user.identities[0].access_token.expose(), "new-access");
	}

	#[tokio::test]
	async fn unverified_email_still_refreshes_in_place() {
		let resolver = resolver_with(repo().await);
		let first = resolver
			.resolve(None, &identity(ProviderKind::Microsoft, "ms1", Some("m@x.com"), false))
			.await
			.unwrap();
		let second = resolver
			.resolve(None, &identity(ProviderKind::Microsoft, "ms1", Some("m@x.com"), false))
			.await
			.unwrap();
		assert_eq!(second.decision, Decision::Login);
		assert_eq!(second.user.id, first.user.id);
	}

	#[tokio::test]
	async fn verified_email_merges_across_providers() {
		let resolver = resolver_with(repo().await);
		let first = resolver
			.resolve(None, &identity(ProviderKind::Google, "g1", Some("a@x.com"), true))
			.await
			.unwrap();
		let second = resolver
			.resolve(None, &identity(ProviderKind::GitHub, "gh1", Some("A@X.com "), true))
			.await
			.unwrap();

		assert_eq!(second.decision, Decision::Login);
		assert_eq!(second.user.id, first.user.id);
		assert_eq!(
			second.user.providers(),
			vec![ProviderKind::Google, ProviderKind::GitHub]
		);
	}

	#[tokio::test]
	async fn unverified_email_never_merges() {
		let resolver = resolver_with(repo().await);
		let first = resolver
			.resolve(None, &identity(ProviderKind::Google, "g1", Some("a@x.com"), true))
			.await
			.unwrap();
		let second = resolver
			.resolve(None, &identity(ProviderKind::Facebook, "fb1", Some("a@x.com"), false))
			.await
			.unwrap();

		assert_eq!(second.decision, Decision::Create);
		assert_ne!(second.user.id, first.user.id);
	}

	#[tokio::test]
	async fn verified_email_does_not_merge_into_unverified_user() {
		let resolver = resolver_with(repo().await);
		let first = resolver
			.resolve(None, &identity(ProviderKind::Facebook, "fb1", Some("a@x.com"), false))
			.await
			.unwrap();
		let second = resolver
			.resolve(None, &identity(ProviderKind::Google, "g1", Some("a@x.com"), true))
			.await
			.unwrap();

		assert_eq!(second.decision, Decision::Create);
		assert_ne!(second.user.id, first.user.id);
	}

	#[tokio::test]
	async fn authenticated_unknown_identity_links() {
		let resolver = resolver_with(repo().await);
		let user = resolver
			.resolve(None, &identity(ProviderKind::Google, "g1", Some("a@x.com"), true))
			.await
			.unwrap()
			.user;

		let r = resolver
			.resolve(
				Some(&user.id),
				&identity(ProviderKind::LinkedIn, "li1", Some("other@x.com"), false),
			)
			.await
			.unwrap();

		assert_eq!(r.decision, Decision::Link);
		assert_eq!(r.user.id, user.id);
		assert_eq!(r.user.identities.len(), 2);
	}

	#[tokio::test]
	async fn authenticated_own_identity_logs_in() {
		let resolver = resolver_with(repo().await);
		let user = resolver
			.resolve(None, &identity(ProviderKind::Google, "g1", None, false))
			.await
			.unwrap()
			.user;

		let r = resolver
			.resolve(Some(&user.id), &identity(ProviderKind::Google, "g1", None, false))
			.await
			.unwrap();
		assert_eq!(r.decision, Decision::Login);
		assert_eq!(r.user.identities.len(), 1);
	}

	#[tokio::test]
	async fn linking_takes_precedence_over_email_merge() {
		let resolver = resolver_with(repo().await);
		let u1 = resolver
			.resolve(None, &identity(ProviderKind::Google, "g1", Some("one@x.com"), true))
			.await
			.unwrap()
			.user;
		let u2 = resolver
			.resolve(None, &identity(ProviderKind::Google, "g2", Some("two@x.com"), true))
			.await
			.unwrap()
			.user;

		// Verified email points at U2, but U1 is logged in.
		let r = resolver
			.resolve(
				Some(&u1.id),
				&identity(ProviderKind::GitHub, "gh2", Some("two@x.com"), true),
			)
			.await
			.unwrap();
		assert_eq!(r.decision, Decision::Link);
		assert_eq!(r.user.id, u1.id);
		assert_ne!(r.user.id, u2.id);
	}

	#[tokio::test]
	async fn identity_of_other_user_is_conflict_and_changes_nothing() {
		let repo = repo().await;
		let resolver = resolver_with(repo.clone());
		let u1 = resolver
			.resolve(None, &identity(ProviderKind::Google, "g1", None, false))
			.await
			.unwrap()
			.user;
		let u2 = resolver
			.resolve(None, &identity(ProviderKind::Google, "g2", None, false))
			.await
			.unwrap()
			.user;

		let err = resolver
			.resolve(Some(&u1.id), &identity(ProviderKind::Google, "g2", None, false))
			.await
			.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Conflict);

		let u1_after = repo.get_user_by_id(&u1.id).await.unwrap().unwrap();
		let u2_after = repo.get_user_by_id(&u2.id).await.unwrap().unwrap();
		assert_eq!(u1_after.identities.len(), 1);
		assert_eq!(u1_after.updated_at, u1.updated_at);
		assert_eq!(u2_after.identities.len(), 1);
	}

	#[tokio::test]
	async fn lost_create_race_becomes_login() {
		let repo = repo().await;
		let winner = resolver_with(repo.clone())
			.resolve(None, &identity(ProviderKind::Google, "g1", Some("a@x.com"), true))
			.await
			.unwrap()
			.user;

		// First lookup misses as if the winner had not committed yet.
		let racing = InterceptStore::stale_lookups(repo.clone(), 1);
		let r = resolver_with(Arc::new(racing))
			.resolve(None, &identity(ProviderKind::Google, "g1", Some("a@x.com"), true))
			.await
			.unwrap();

		assert_eq!(r.decision, Decision::Login);
		assert_eq!(r.user.id, winner.id);
		assert_eq!(r.user.identities.len(), 1);
	}

	#[tokio::test]
	async fn lost_merge_race_logs_in_to_the_merged_user() {
		let repo = repo().await;
		let resolver = resolver_with(repo.clone());
		let owner = resolver
			.resolve(None, &identity(ProviderKind::Google, "g1", Some("a@x.com"), true))
			.await
			.unwrap()
			.user;
		// A concurrent callback already merged gh1 into the owner.
		resolver
			.resolve(None, &identity(ProviderKind::GitHub, "gh1", Some("a@x.com"), true))
			.await
			.unwrap();

		let racing = Arc::new(InterceptStore::stale_lookups(repo.clone(), 1));
		let r = resolver_with(racing.clone())
			.resolve(None, &identity(ProviderKind::GitHub, "gh1", Some("a@x.com"), true))
			.await
			.unwrap();

		assert_eq!(r.decision, Decision::Login);
		assert_eq!(r.user.id, owner.id);
		assert_eq!(r.user.identities.len(), 2);
		assert_eq!(racing.lookups(), 2);
	}

	#[tokio::test]
	async fn lost_link_race_to_other_user_is_conflict() {
		let repo = repo().await;
		let resolver = resolver_with(repo.clone());
		let u1 = resolver
			.resolve(None, &identity(ProviderKind::GitHub, "gh1", None, false))
			.await
			.unwrap()
			.user;
		resolver
			.resolve(None, &identity(ProviderKind::Google, "g9", None, false))
			.await
			.unwrap();

		let racing = resolver_with(Arc::new(InterceptStore::stale_lookups(repo.clone(), 1)));
		let err = racing
			.resolve(Some(&u1.id), &identity(ProviderKind::Google, "g9", None, false))
			.await
			.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Conflict);
	}

	#[tokio::test]
	async fn transient_read_failure_is_retried() {
		let repo = repo().await;
		let flaky = Arc::new(InterceptStore::failing_lookups(repo.clone(), 1));
		let resolver = IdentityResolver::new(flaky.clone()).with_read_retry(RetryConfig {
			base_delay: Duration::from_millis(1),
			..Default::default()
		});

		let r = resolver
			.resolve(None, &identity(ProviderKind::Google, "g1", None, false))
			.await
			.unwrap();
		assert_eq!(r.decision, Decision::Create);
		assert_eq!(flaky.lookups(), 2);
	}

	#[tokio::test]
	async fn persistent_read_failure_is_persistence_error() {
		let repo = repo().await;
		let resolver = IdentityResolver::new(Arc::new(InterceptStore::failing_lookups(repo, 5))).with_read_retry(
			RetryConfig {
				base_delay: Duration::from_millis(1),
				..Default::default()
			},
		);

		let err = resolver
			.resolve(None, &identity(ProviderKind::Google, "g1", None, false))
			.await
			.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Persistence);
	}

	proptest! {
		#![proptest_config(ProptestConfig::with_cases(24))]

		#[test]
		fn merge_happens_only_for_verified_email(
			verified in any::<bool>(),
			upper in any::<bool>(),
		) {
			let rt = tokio::runtime::Runtime::new().unwrap();
			rt.block_on(async {
				let resolver = resolver_with(repo().await);
				let first = resolver
					.resolve(None, &identity(ProviderKind::Google, "g1", Some("a@x.com"), true))
					.await
					.unwrap();

				let email = if upper { "A@X.COM" } else { "a@x.com" };
				let second = resolver
					.resolve(None, &identity(ProviderKind::GitHub, "gh1", Some(email), verified))
					.await
					.unwrap();

				assert_eq!(second.user.id == first.user.id, verified);
			});
		}

		#[test]
		fn resolving_twice_is_idempotent(
			provider in prop::sample::select(ProviderKind::ALL.to_vec()),
			external_id in "[a-z0-9]{1,12}",
			verified in any::<bool>(),
		) {
			let rt = tokio::runtime::Runtime::new().unwrap();
			rt.block_on(async {
				let resolver = resolver_with(repo().await);
				let id = identity(provider, &external_id, Some("p@x.com"), verified);
				let first = resolver.resolve(None, &id).await.unwrap();
				let second = resolver.resolve(None, &id).await.unwrap();

				assert_eq!(second.decision, Decision::Login);
				assert_eq!(first.user.id, second.user.id);
				assert_eq!(second.user.identities.len(), 1);
			});
		}
	}
}
