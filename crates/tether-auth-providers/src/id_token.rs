// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Minimal OpenID Connect `id_token` handling.
//!
//! The token arrives directly from the provider's token endpoint over TLS, so
//! only the claims are read here; the signature is not checked. The nonce
//! binds the token to the flow that requested it.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use tether_auth::TokenSet;
use tether_common_secret::SecretString;

use crate::error::OAuthError;

#[derive(Debug, Clone, Deserialize)]
pub struct IdTokenClaims {
	pub sub: String,
	#[serde(default)]
	pub nonce: Option<String>,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub email_verified: Option<bool>,
}

/// Decode the payload segment of a compact JWT.
pub fn decode_claims(id_token: &str) -> Result<IdTokenClaims, OAuthError> {
	let mut parts = id_token.split('.');
	let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
		(Some(_), Some(payload), Some(_), None) => payload,
		_ => return Err(OAuthError::InvalidIdToken("expected three segments".to_string())),
	};

	let bytes = URL_SAFE_NO_PAD
		.decode(payload.trim_end_matches('='))
		.map_err(|e| OAuthError::InvalidIdToken(format!("payload is not base64url: {e}")))?;

	serde_json::from_slice(&bytes)
		.map_err(|e| OAuthError::InvalidIdToken(format!("payload is not a claims object: {e}")))
}

/// Check the `nonce` claim against the nonce issued for this flow.
///
/// Passes when no nonce was issued or the provider returned no `id_token`.
pub fn verify_nonce(tokens: &TokenSet, expected: Option<&SecretString>) -> Result<(), OAuthError> {
	let (Some(expected), Some(id_token)) = (expected, tokens.id_token.as_ref()) else {
		return Ok(());
	};

	let claims = decode_claims(id_token.expose())?;
	match claims.nonce {
		Some(nonce) if expected.ct_eq_str(&nonce) => Ok(()),
		_ => Err(OAuthError::NonceMismatch),
	}
}
