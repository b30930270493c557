// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Google (OpenID Connect).

use serde::Deserialize;
use tether_auth::{normalize_email, NormalizedIdentity, ProviderKind, TokenSet};

use super::{display_name, lenient_bool, ProviderSpec};

pub static SPEC: ProviderSpec = ProviderSpec {
	kind: ProviderKind::Google,
	authorize_url: "https://accounts.google.com/o/oauth2/v2/auth",
	token_url: "https://oauth2.googleapis.com/token",
	profile_url: "https://openidconnect.googleapis.com/v1/userinfo",
	emails_url: None,
	default_scopes: &["openid", "email", "profile"],
	issues_id_token: true,
	profile_headers: &[],
};

/// OpenID Connect userinfo response.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
	pub sub: String,
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default, deserialize_with = "lenient_bool")]
	pub email_verified: bool,
	#[serde(default)]
	pub picture: Option<String>,
}

impl GoogleProfile {
	pub fn normalize(self, tokens: TokenSet) -> NormalizedIdentity {
		let email = normalize_email(self.email.as_deref());
		NormalizedIdentity {
			provider: ProviderKind::Google,
			display_name: display_name(&[self.name.as_deref(), email.as_deref()], &self.sub),
			email_verified: self.email_verified && email.is_some(),
			email,
			profile_photo: self.picture,
			external_id: self.sub,
			tokens,
		}
	}
}
