// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Router-facing operations.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tether_auth::{AuthError, ErrorKind, ProviderKind, User, UserId};
use tether_auth_providers::{verify_nonce, ProviderRegistry};
use tether_config::FlowConfig;
use tether_db::{RemoveIdentities, UserStore};
use url::Url;

use crate::resolver::{IdentityResolver, Resolution};
use crate::retry::{retry, RetryConfig};
use crate::session::{generate_nonce, generate_state, sanitize_redirect, PendingFlow, SessionContext};

/// Query parameters a provider sends to the callback URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackQuery {
	#[serde(default)]
	pub code: Option<String>,
	#[serde(default)]
	pub state: Option<String>,
	#[serde(default)]
	pub error: Option<String>,
	#[serde(default)]
	pub error_description: Option<String>,
}

impl CallbackQuery {
	/// Read the parameters from a full callback URL.
	pub fn from_url(url: &Url) -> Self {
		let mut query = Self::default();
		for (key, value) in url.query_pairs() {
			let slot = match key.as_ref() {
				"code" => &mut query.code,
				"state" => &mut query.state,
				"error" => &mut query.error,
				"error_description" => &mut query.error_description,
				_ => continue,
			};
			*slot = Some(value.into_owned());
		}
		query
	}
}

/// Span-safe view of a [`CallbackQuery`]: no code, no state.
struct CallbackQueryRedacted<'a>(&'a CallbackQuery);

impl std::fmt::Debug for CallbackQueryRedacted<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CallbackQuery")
			.field("has_code", &self.0.code.is_some())
			.field("has_state", &self.0.state.is_some())
			.field("error", &self.0.error)
			.finish()
	}
}

#[derive(Debug)]
pub enum CallbackOutcome {
	Resolved { resolution: Resolution, redirect: String },
	Failed { error: AuthError, redirect: String },
}

impl CallbackOutcome {
	pub fn redirect(&self) -> &str {
		match self {
			CallbackOutcome::Resolved { redirect, .. } | CallbackOutcome::Failed { redirect, .. } => {
				redirect
			}
		}
	}
}

/// Ties the provider registry, resolver and user store together.
#[derive(Clone)]
pub struct IdentityService {
	registry: ProviderRegistry,
	resolver: IdentityResolver,
	store: Arc<dyn UserStore>,
	flow: FlowConfig,
	read_retry: RetryConfig,
}

impl IdentityService {
	pub fn new(registry: ProviderRegistry, store: Arc<dyn UserStore>, flow: FlowConfig) -> Self {
		Self {
			registry,
			resolver: IdentityResolver::new(store.clone()),
			store,
			flow,
			read_retry: RetryConfig::default(),
		}
	}

	pub fn configured_providers(&self) -> Vec<ProviderKind> {
		self.registry.configured()
	}

	/// Start a flow and return the provider URL to redirect the browser to.
	///
	/// `redirect` is where to land after success; unsafe targets fall back to
	/// the configured default.
	#[tracing::instrument(skip(self, session, scopes, redirect), fields(provider = %provider))]
	pub fn initiate(
		&self,
		session: &mut SessionContext,
		provider: ProviderKind,
		scopes: Option<&[String]>,
		redirect: Option<&str>,
	) -> Result<Url, AuthError> {
		let adapter = self.registry.get(provider)?;

		let state = generate_state();
		let nonce = adapter.uses_nonce().then(generate_nonce);
		let url = adapter.build_authorization_url(
			scopes,
			state.expose(),
			nonce.as_ref().map(|n| n.expose().as_str()),
		);

		session.begin_flow(PendingFlow {
			provider,
			state,
			nonce,
			success_redirect: sanitize_redirect(redirect, &self.flow.success_redirect),
			failure_redirect: self.flow.failure_redirect.clone(),
			created_at: Utc::now(),
		});

		tracing::info!(
			authenticated = session.is_authenticated(),
			"OAuth flow initiated"
		);
		Ok(url)
	}

	/// Finish a flow. Never leaves a pending flow behind, and never touches an
	/// existing login on failure.
	#[tracing::instrument(
		skip(self, session, query),
		fields(provider = %provider, query = ?CallbackQueryRedacted(query))
	)]
	pub async fn handle_callback(
		&self,
		session: &mut SessionContext,
		provider: ProviderKind,
		query: &CallbackQuery,
	) -> CallbackOutcome {
		let pending = session.receive_callback();
		let failure_redirect = pending
			.as_ref()
			.map(|p| p.failure_redirect.clone())
			.unwrap_or_else(|| self.flow.failure_redirect.clone());

		match self.complete_flow(session, provider, query, pending).await {
			Ok((resolution, redirect)) => {
				session.resolve(resolution.user.id);
				CallbackOutcome::Resolved { resolution, redirect }
			}
			Err(error) => {
				match error.kind() {
					ErrorKind::Persistence | ErrorKind::Unknown => {
						tracing::error!(error = %error, kind = %error.kind(), "OAuth flow failed")
					}
					_ => tracing::warn!(error = %error, kind = %error.kind(), "OAuth flow failed"),
				}
				session.fail();
				CallbackOutcome::Failed {
					error,
					redirect: failure_redirect,
				}
			}
		}
	}

	async fn complete_flow(
		&self,
		session: &mut SessionContext,
		provider: ProviderKind,
		query: &CallbackQuery,
		pending: Option<PendingFlow>,
	) -> Result<(Resolution, String), AuthError> {
		let Some(pending) = pending else {
			tracing::warn!("callback without a pending flow");
			return Err(AuthError::CsrfStateMismatch);
		};
		pending.verify(provider, query.state.as_deref(), self.flow.state_ttl, Utc::now())?;

		if let Some(error) = query.error.as_deref() {
			let message = query
				.error_description
				.as_deref()
				.filter(|d| !d.trim().is_empty())
				.unwrap_or(error);
			return Err(AuthError::provider(provider, message));
		}

		let code = query
			.code
			.as_deref()
			.filter(|c| !c.is_empty())
			.ok_or_else(|| AuthError::provider(provider, "callback is missing the authorization code"))?;

		let adapter = self.registry.get(provider)?;
		let tokens = adapter.exchange_code(code).await?;
		verify_nonce(&tokens, pending.nonce.as_ref()).map_err(|e| e.into_auth_error(provider))?;
		let raw = adapter.fetch_profile(&tokens.access_token).await?;
		let identity = adapter.normalize_profile(raw, tokens);

		let current = self.current_user(session).await?.map(|u| u.id);
		let resolution = self.resolver.resolve(current.as_ref(), &identity).await?;
		Ok((resolution, pending.success_redirect))
	}

	/// Detach every identity of `provider` from the user.
	#[tracing::instrument(skip(self), fields(user_id = %user_id, provider = %provider))]
	pub async fn unlink(&self, user_id: &UserId, provider: ProviderKind) -> Result<User, AuthError> {
		match self.store.remove_provider_identities(user_id, provider).await? {
			RemoveIdentities::Removed { user, removed } => {
				tracing::info!(removed, "provider unlinked");
				Ok(user)
			}
			RemoveIdentities::NotLinked => Err(AuthError::NotFound(format!(
				"{provider} is not linked to user {user_id}"
			))),
			RemoveIdentities::LastIdentity => {
				tracing::warn!("refusing to unlink last identity");
				Err(AuthError::LastIdentityViolation)
			}
		}
	}

	/// The user behind the session. A reference to a deleted user is dropped.
	pub async fn current_user(&self, session: &mut SessionContext) -> Result<Option<User>, AuthError> {
		let Some(user_id) = session.user_id() else {
			return Ok(None);
		};

		match retry(&self.read_retry, || self.store.get_user_by_id(&user_id)).await? {
			Some(user) => Ok(Some(user)),
			None => {
				tracing::warn!(user_id = %user_id, "session references a missing user");
				session.clear_user();
				Ok(None)
			}
		}
	}
}
