// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The closed failure taxonomy for sign-in, linking and unlinking.
//!
//! Every crate converts its own errors into [`AuthError`] through `From`
//! impls. Callers branch on [`AuthError::kind`] rather than on the variants.

use std::fmt;

use thiserror::Error;

use crate::types::ProviderKind;

/// Error category exposed to the router layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	Configuration,
	Provider,
	Conflict,
	CsrfStateMismatch,
	Persistence,
	LastIdentityViolation,
	NotFound,
	Unknown,
}

impl ErrorKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			ErrorKind::Configuration => "configuration_error",
			ErrorKind::Provider => "provider_error",
			ErrorKind::Conflict => "already_linked",
			ErrorKind::CsrfStateMismatch => "csrf_state_mismatch",
			ErrorKind::Persistence => "persistence_error",
			ErrorKind::LastIdentityViolation => "last_identity_violation",
			ErrorKind::NotFound => "not_found",
			ErrorKind::Unknown => "unknown_error",
		}
	}
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Error)]
pub enum AuthError {
	/// Detected before a flow starts: unknown or unconfigured provider.
	#[error("configuration error: {0}")]
	Configuration(String),

	/// The provider rejected a request or could not be reached.
	#[error("{} error: {message}", provider_label(.provider))]
	Provider {
		provider: Option<ProviderKind>,
		message: String,
	},

	#[error("{provider} account {provider_id} is already linked to another user")]
	AlreadyLinked {
		provider: ProviderKind,
		provider_id: String,
	},

	#[error("OAuth state does not match the pending flow")]
	CsrfStateMismatch,

	#[error("persistence error: {0}")]
	Persistence(String),

	#[error("cannot remove the last linked identity")]
	LastIdentityViolation,

	#[error("not found: {0}")]
	NotFound(String),

	#[error("unexpected error: {0}")]
	Unknown(#[source] Box<dyn std::error::Error + Send + Sync>),
}

fn provider_label(provider: &Option<ProviderKind>) -> &'static str {
	provider.map(|p| p.as_str()).unwrap_or("provider")
}

impl AuthError {
	pub fn provider(provider: ProviderKind, message: impl Into<String>) -> Self {
		AuthError::Provider {
			provider: Some(provider),
			message: message.into(),
		}
	}

	/// Build a provider error from a raw failure payload, using the payload's
	/// human-readable description when it has one.
	pub fn from_provider_payload(provider: Option<ProviderKind>, payload: &str) -> Self {
		let message = provider_error_description(payload).unwrap_or_else(|| {
			let trimmed = payload.trim();
			if trimmed.is_empty() {
				"empty error response".to_string()
			} else {
				trimmed.chars().take(200).collect()
			}
		});
		AuthError::Provider { provider, message }
	}

	pub fn kind(&self) -> ErrorKind {
		match self {
			AuthError::Configuration(_) => ErrorKind::Configuration,
			AuthError::Provider { .. } => ErrorKind::Provider,
			AuthError::AlreadyLinked { .. } => ErrorKind::Conflict,
			AuthError::CsrfStateMismatch => ErrorKind::CsrfStateMismatch,
			AuthError::Persistence(_) => ErrorKind::Persistence,
			AuthError::LastIdentityViolation => ErrorKind::LastIdentityViolation,
			AuthError::NotFound(_) => ErrorKind::NotFound,
			AuthError::Unknown(_) => ErrorKind::Unknown,
		}
	}

	/// HTTP-equivalent status for the router.
	pub fn status_code(&self) -> u16 {
		match self.kind() {
			ErrorKind::Configuration => 500,
			ErrorKind::Provider => 502,
			ErrorKind::Conflict => 409,
			ErrorKind::CsrfStateMismatch => 400,
			ErrorKind::Persistence => 503,
			ErrorKind::LastIdentityViolation => 422,
			ErrorKind::NotFound => 404,
			ErrorKind::Unknown => 500,
		}
	}

	/// Failures on our side, as opposed to a user or provider outcome.
	pub fn is_internal(&self) -> bool {
		matches!(
			self.kind(),
			ErrorKind::Configuration | ErrorKind::Persistence | ErrorKind::Unknown
		)
	}
}

/// Extract the human-readable description from a provider error payload.
///
/// Understands the shapes the supported providers actually return:
/// - OAuth2 token errors: `{"error": "invalid_grant", "error_description": "..."}`
/// - the same as a form-encoded body (GitHub without `Accept: application/json`)
/// - Graph API errors: `{"error": {"code": "...", "message": "..."}}`
/// - REST errors: `{"message": "Bad credentials"}`
///
/// Returns `None` when no description can be found.
pub fn provider_error_description(payload: &str) -> Option<String> {
	let payload = payload.trim();
	if payload.is_empty() {
		return None;
	}

	if let Ok(value) = serde_json::from_str::<serde_json::Value>(payload) {
		return description_from_json(&value);
	}

	description_from_form(payload)
}

fn non_empty(value: Option<&serde_json::Value>) -> Option<String> {
	value
		.and_then(|v| v.as_str())
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(str::to_string)
}

fn description_from_json(value: &serde_json::Value) -> Option<String> {
	non_empty(value.get("error_description"))
		.or_else(|| value.get("error").and_then(|e| non_empty(e.get("message"))))
		.or_else(|| non_empty(value.get("message")))
		.or_else(|| non_empty(value.get("error")))
}

fn description_from_form(payload: &str) -> Option<String> {
	if !payload.contains('=') {
		return None;
	}

	let mut error = None;
	let mut description = None;
	for (key, value) in url::form_urlencoded::parse(payload.as_bytes()) {
		let value = value.trim().to_string();
		if value.is_empty() {
			continue;
		}
		match key.as_ref() {
			"error_description" => description = Some(value),
			"error" => error = Some(value),
			_ => {}
		}
	}
	description.or(error)
}
