// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The provider-independent identity produced at the end of a callback.

use serde::Deserialize;
use tether_common_secret::SecretString;

use crate::types::ProviderKind;

/// Tokens returned by a provider's token endpoint.
///
/// Deserializes directly from the standard OAuth2 token response. Every token
/// is a [`SecretString`].
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSet {
	pub access_token: SecretString,
	#[serde(default)]
	pub refresh_token: Option<SecretString>,
	/// Present for OpenID Connect providers.
	#[serde(default)]
	pub id_token: Option<SecretString>,
	#[serde(default)]
	pub token_type: Option<String>,
	#[serde(default)]
	pub expires_in: Option<u64>,
	#[serde(default)]
	pub scope: Option<String>,
}

impl TokenSet {
	pub fn bearer(access_token: impl Into<String>) -> Self {
		Self {
			access_token: SecretString::new(access_token.into()),
			refresh_token: None,
			id_token: None,
			token_type: Some("bearer".to_string()),
			expires_in: None,
			scope: None,
		}
	}
}

/// A verified external identity, normalized across providers.
#[derive(Debug, Clone)]
pub struct NormalizedIdentity {
	pub provider: ProviderKind,
	/// The provider's stable id for the account (`sub`, numeric id, ...).
	pub external_id: String,
	pub display_name: String,
	/// Trimmed and lowercased.
	pub email: Option<String>,
	/// True only when the provider itself asserts the email is verified.
	pub email_verified: bool,
	pub profile_photo: Option<String>,
	pub tokens: TokenSet,
}

impl NormalizedIdentity {
	/// The email, but only if it may be used to merge into an existing account.
	pub fn verified_email(&self) -> Option<&str> {
		if self.email_verified {
			self.email.as_deref()
		} else {
			None
		}
	}
}

/// Trim and lowercase an email; blank values become `None`.
pub fn normalize_email(raw: Option<&str>) -> Option<String> {
	raw.map(str::trim)
		.filter(|e| !e.is_empty())
		.map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn identity(email: Option<&str>, verified: bool) -> NormalizedIdentity {
		NormalizedIdentity {
			provider: ProviderKind::Google,
			external_id: "g1".to_string(),
			display_name: "Ada".to_string(),
			email: normalize_email(email),
			email_verified: verified,
			profile_photo: None,
			tokens: TokenSet::bearer("at"),
		}
	}

	#[test]
	fn token_set_from_standard_response() {
		let json = r#"{
			"access_token": "ya29.token",
			"expires_in": 3599,
			"refresh_token": "1//refresh",
			"scope": "openid email profile",
			"token_type": "Bearer",
			"id_token": "eyJhbGciOi.payload.sig"
		}"#;
		let tokens: TokenSet = serde_json::from_str(json).unwrap();
		assert_eq!(tokens.access_token.expose(), "ya29.token");
		assert_eq!(tokens.refresh_token.unwrap().expose(), "1//refresh");
		assert!(tokens.id_token.is_some());
		assert_eq!(tokens.expires_in, Some(3599));
	}

	#[test]
	fn token_set_minimal_response() {
		let tokens: TokenSet = serde_json::from_str(r#"{"access_token":"gho_x"}"#).unwrap();
		assert!(tokens.refresh_token.is_none());
		assert!(tokens.id_token.is_none());
	}

	#[test]
	fn token_set_debug_is_redacted() {
		let tokens = TokenSet::bearer("gho_secret_value");
		assert!(!format!("{tokens:?}").contains("gho_secret_value"));
	}

	#[test]
	fn verified_email_requires_flag() {
		assert_eq!(identity(Some("a@x.com"), true).verified_email(), Some("a@x.com"));
		assert_eq!(identity(Some("a@x.com"), false).verified_email(), None);
		assert_eq!(identity(None, true).verified_email(), None);
	}

	#[test]
	fn normalize_email_cases() {
		assert_eq!(normalize_email(Some("  A@X.com ")), Some("a@x.com".to_string()));
		assert_eq!(normalize_email(Some("   ")), None);
		assert_eq!(normalize_email(None), None);
	}

	proptest! {
		#[test]
		fn normalize_email_is_idempotent(raw in "[ A-Za-z0-9@._-]{0,30}") {
			let once = normalize_email(Some(&raw));
			let twice = normalize_email(once.as_deref());
			prop_assert_eq!(once, twice);
		}
	}
}
