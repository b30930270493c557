// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-browser session state and the redirect flow state machine.
//!
//! ```text
//! Anonymous ──initiate──▶ FlowInitiated ──callback──▶ FlowCallbackReceived ─┬─▶ Resolved
//!                                                                          └─▶ FlowFailed
//! ```
//!
//! The pending flow is taken out of the session as soon as the callback
//! arrives, so a state value is single-use and is gone in both terminal states.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tether_auth::{AuthError, ProviderKind, UserId};
use tether_common_secret::SecretString;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowPhase {
	#[default]
	Anonymous,
	FlowInitiated,
	FlowCallbackReceived,
	Resolved,
	FlowFailed,
}

/// What `initiate` remembers for the callback.
#[derive(Clone, Serialize, Deserialize)]
pub struct PendingFlow {
	pub provider: ProviderKind,
	#[serde(with = "tether_common_secret::exposed")]
	pub state: SecretString,
	#[serde(with = "tether_common_secret::exposed::option", default)]
	pub nonce: Option<SecretString>,
	pub success_redirect: String,
	pub failure_redirect: String,
	pub created_at: DateTime<Utc>,
}

impl fmt::Debug for PendingFlow {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PendingFlow")
			.field("provider", &self.provider)
			.field("state", &self.state)
			.field("nonce", &self.nonce)
			.field("success_redirect", &self.success_redirect)
			.field("created_at", &self.created_at)
			.finish_non_exhaustive()
	}
}

impl PendingFlow {
	pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
		let age = now.signed_duration_since(self.created_at);
		match chrono::Duration::from_std(ttl) {
			Ok(ttl) => age >= ttl,
			Err(_) => false,
		}
	}

	/// Check a callback against this flow: same provider, not expired, and a
	/// byte-identical state. Any failure is a [`AuthError::CsrfStateMismatch`].
	pub fn verify(
		&self,
		provider: ProviderKind,
		returned_state: Option<&str>,
		ttl: Duration,
		now: DateTime<Utc>,
	) -> Result<(), AuthError> {
		if self.provider != provider {
			tracing::warn!(expected = %self.provider, actual = %provider, "callback provider does not match pending flow");
			return Err(AuthError::CsrfStateMismatch);
		}
		if self.is_expired(ttl, now) {
			tracing::warn!(provider = %provider, "pending flow expired");
			return Err(AuthError::CsrfStateMismatch);
		}
		match returned_state {
			Some(state) if self.state.ct_eq_str(state) => Ok(()),
			_ => {
				tracing::warn!(provider = %provider, "OAuth state mismatch");
				Err(AuthError::CsrfStateMismatch)
			}
		}
	}
}

/// The session a router keeps for one browser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionContext {
	user_id: Option<UserId>,
	pending: Option<PendingFlow>,
	phase: FlowPhase,
}

impl SessionContext {
	pub fn new() -> Self {
		Self::default()
	}

	/// A session that is already logged in, with no flow in progress.
	pub fn for_user(user_id: UserId) -> Self {
		Self {
			user_id: Some(user_id),
			pending: None,
			phase: FlowPhase::Resolved,
		}
	}

	pub fn is_authenticated(&self) -> bool {
		self.user_id.is_some()
	}

	pub fn user_id(&self) -> Option<UserId> {
		self.user_id
	}

	pub fn phase(&self) -> FlowPhase {
		self.phase
	}

	pub fn pending(&self) -> Option<&PendingFlow> {
		self.pending.as_ref()
	}

	/// Start a flow. Replaces any flow that was already pending.
	pub fn begin_flow(&mut self, pending: PendingFlow) {
		self.pending = Some(pending);
		self.phase = FlowPhase::FlowInitiated;
	}

	/// Take the pending flow out of the session for verification.
	pub fn receive_callback(&mut self) -> Option<PendingFlow> {
		self.phase = FlowPhase::FlowCallbackReceived;
		self.pending.take()
	}

	pub fn resolve(&mut self, user_id: UserId) {
		self.user_id = Some(user_id);
		self.pending = None;
		self.phase = FlowPhase::Resolved;
	}

	/// Leaves any existing login in place.
	pub fn fail(&mut self) {
		self.pending = None;
		self.phase = FlowPhase::FlowFailed;
	}

	/// Forget a user that no longer exists.
	pub fn clear_user(&mut self) {
		self.user_id = None;
	}

	pub fn log_out(&mut self) {
		*self = Self::default();
	}
}

/// Random CSRF state. UUID v4 carries 122 random bits.
#[tracing::instrument]
pub fn generate_state() -> SecretString {
	tracing::debug!("generated OAuth state");
	SecretString::new(uuid::Uuid::new_v4().simple().to_string())
}

/// Random OpenID Connect nonce.
#[tracing::instrument]
pub fn generate_nonce() -> SecretString {
	tracing::debug!("generated OAuth nonce");
	SecretString::new(uuid::Uuid::new_v4().simple().to_string())
}

/// Relative, same-origin paths only: `/x` yes, `//evil.example` and
/// `https://evil.example` no.
///
/// Control characters are rejected outright: browsers drop tab, CR and LF
/// while parsing, which turns `/\t/evil.example` into `//evil.example`.
pub fn is_safe_redirect(url: &str) -> bool {
	url.starts_with('/')
		&& !url.starts_with("//")
		&& !url.contains('\\')
		&& !url.chars().any(|c| c.is_control())
}

pub fn sanitize_redirect(url: Option<&str>, fallback: &str) -> String {
	match url {
		Some(u) if is_safe_redirect(u) => u.to_string(),
		_ => fallback.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use std::collections::HashSet;

	const TTL: Duration = Duration::from_secs(600);

	fn pending(provider: ProviderKind, state: &str) -> PendingFlow {
		PendingFlow {
			provider,
			state: SecretString::from(state),
			nonce: Some(SecretString::from("nonce-value")),
			success_redirect: "/".to_string(),
			failure_redirect: "/login".to_string(),
			created_at: Utc::now(),
		}
	}

	#[test]
	fn matching_state_verifies() {
		let flow = pending(ProviderKind::Google, "xyz");
		assert!(flow
			.verify(ProviderKind::Google, Some("xyz"), TTL, Utc::now())
			.is_ok());
	}

	#[test]
	fn mismatched_state_is_csrf() {
		let flow = pending(ProviderKind::Google, "xyz");
		for returned in [Some("abc"), Some("xyz "), Some("XYZ"), Some(""), None] {
			let err = flow
				.verify(ProviderKind::Google, returned, TTL, Utc::now())
				.unwrap_err();
			assert!(matches!(err, AuthError::CsrfStateMismatch));
		}
	}

	#[test]
	fn other_provider_is_csrf() {
		let flow = pending(ProviderKind::Google, "xyz");
		let err = flow
			.verify(ProviderKind::GitHub, Some("xyz"), TTL, Utc::now())
			.unwrap_err();
		assert!(matches!(err, AuthError::CsrfStateMismatch));
	}

	#[test]
	fn expired_flow_is_csrf() {
		let mut flow = pending(ProviderKind::Google, "xyz");
		flow.created_at = Utc::now() - chrono::Duration::seconds(601);
		assert!(flow.is_expired(TTL, Utc::now()));
		assert!(flow
			.verify(ProviderKind::Google, Some("xyz"), TTL, Utc::now())
			.is_err());
	}

	#[test]
	fn state_machine_transitions() {
		let mut session = SessionContext::new();
		assert_eq!(session.phase(), FlowPhase::Anonymous);

		session.begin_flow(pending(ProviderKind::GitHub, "s"));
		assert_eq!(session.phase(), FlowPhase::FlowInitiated);

		assert!(session.receive_callback().is_some());
		assert_eq!(session.phase(), FlowPhase::FlowCallbackReceived);
		assert!(session.pending().is_none());
		assert!(session.receive_callback().is_none(), "state is single-use");

		let user = UserId::generate();
		session.resolve(user);
		assert_eq!(session.phase(), FlowPhase::Resolved);
		assert_eq!(session.user_id(), Some(user));
	}

	#[test]
	fn failure_keeps_login() {
		let user = UserId::generate();
		let mut session = SessionContext::for_user(user);
		session.begin_flow(pending(ProviderKind::GitHub, "s"));
		session.receive_callback();
		session.fail();

		assert_eq!(session.phase(), FlowPhase::FlowFailed);
		assert_eq!(session.user_id(), Some(user));
		assert!(session.pending().is_none());
	}

	#[test]
	fn log_out_resets_everything() {
		let mut session = SessionContext::for_user(UserId::generate());
		session.begin_flow(pending(ProviderKind::Google, "s"));
		session.log_out();
		assert!(!session.is_authenticated());
		assert!(session.pending().is_none());
		assert_eq!(session.phase(), FlowPhase::Anonymous);
	}

	#[test]
	fn pending_flow_debug_is_redacted() {
		let debug = format!("{:?}", pending(ProviderKind::Google, "super-secret-state"));
		assert!(!debug.contains("super-secret-state"));
		assert!(!debug.contains("nonce-value"));
	}

	#[test]
	fn session_survives_serialization() {
		let mut session = SessionContext::new();
		session.begin_flow(pending(ProviderKind::LinkedIn, "stored-state"));

		let json = serde_json::to_string(&session).unwrap();
		let back: SessionContext = serde_json::from_str(&json).unwrap();
		let flow = back.pending().unwrap();
		assert_eq!(flow.provider, ProviderKind::LinkedIn);
		assert!(flow.state.ct_eq_str("stored-state"));
		assert_eq!(back.phase(), FlowPhase::FlowInitiated);
	}

	#[test]
	fn generated_values_are_unique() {
		let states: HashSet<String> = (0..200).map(|_| generate_state().into_inner()).collect();
		assert_eq!(states.len(), 200);
		assert_eq!(generate_nonce().expose().len(), 32);
	}

	#[test]
	fn redirect_safety() {
		assert!(is_safe_redirect("/"));
		assert!(is_safe_redirect("/settings/accounts?tab=linked"));
		assert!(!is_safe_redirect("//evil.example"));
		assert!(!is_safe_redirect("https://evil.example/"));
		assert!(!is_safe_redirect("/\\evil.example"));
		assert!(!is_safe_redirect(""));
		assert!(!is_safe_redirect("/\t/evil.example"));
		assert!(!is_safe_redirect("/\r\n/evil.example"));
		assert!(!is_safe_redirect("/account\x00"));

		assert_eq!(sanitize_redirect(Some("/account"), "/"), "/account");
		assert_eq!(sanitize_redirect(Some("//evil"), "/home"), "/home");
		assert_eq!(sanitize_redirect(None, "/home"), "/home");
		assert_eq!(sanitize_redirect(Some("/\t/evil.example"), "/"), "/");
	}

	proptest! {
		#[test]
		fn only_the_exact_state_verifies(stored in "[a-f0-9]{32}", returned in "[a-f0-9]{0,33}") {
			let flow = pending(ProviderKind::Google, &stored);
			let result = flow.verify(ProviderKind::Google, Some(&returned), TTL, Utc::now());
			prop_assert_eq!(result.is_ok(), stored == returned);
		}

		#[test]
		fn sanitized_redirect_is_always_safe(input in ".{0,40}") {
			prop_assert!(is_safe_redirect(&sanitize_redirect(Some(&input), "/")));
		}

		#[test]
		fn sanitized_redirect_stays_relative_after_browser_parsing(
			input in r"[/\\\t\r\n\x00a-z.:]{0,24}",
		) {
			let target = sanitize_redirect(Some(&input), "/");
			let parsed: String = target.chars().filter(|c| !matches!(c, '\t' | '\r' | '\n')).collect();
			prop_assert!(parsed.starts_with('/'));
			prop_assert!(!parsed.starts_with("//"));
			prop_assert!(!parsed.contains('\\'));
		}
	}
}
