// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use tether_auth::{AuthError, ProviderKind};

/// Failures talking to a provider.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
	/// Network error or timeout.
	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	/// The provider answered with a body we could not read.
	#[error("failed to parse response: {0}")]
	Parse(String),

	/// The provider answered with an error. `payload` is the raw body.
	#[error("provider returned status {status}")]
	Provider { status: u16, payload: String },

	#[error("invalid id token: {0}")]
	InvalidIdToken(String),

	#[error("id token nonce mismatch")]
	NonceMismatch,
}

impl OAuthError {
	/// Classify into the domain taxonomy. Every variant is a provider failure.
	pub fn into_auth_error(self, provider: ProviderKind) -> AuthError {
		into_auth_error(self, Some(provider))
	}
}

impl From<OAuthError> for AuthError {
	fn from(e: OAuthError) -> Self {
		into_auth_error(e, None)
	}
}

fn into_auth_error(e: OAuthError, provider: Option<ProviderKind>) -> AuthError {
	let message = match e {
		OAuthError::Provider { status, payload } => {
			if payload.trim().is_empty() {
				format!("provider returned HTTP {status}")
			} else {
				return AuthError::from_provider_payload(provider, &payload);
			}
		}
		OAuthError::Http(ref err) if err.is_timeout() => "request timed out".to_string(),
		OAuthError::Http(err) => format!("request failed: {err}"),
		OAuthError::Parse(msg) => msg,
		OAuthError::InvalidIdToken(msg) => format!("invalid id token: {msg}"),
		OAuthError::NonceMismatch => "id token nonce mismatch".to_string(),
	};
	AuthError::Provider { provider, message }
}
