// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! LinkedIn ("Sign In with LinkedIn using OpenID Connect").

use serde::Deserialize;
use tether_auth::{normalize_email, NormalizedIdentity, ProviderKind, TokenSet};

use super::{display_name, lenient_bool, ProviderSpec};

pub static SPEC: ProviderSpec = ProviderSpec {
	kind: ProviderKind::LinkedIn,
	authorize_url: "https://www.linkedin.com/oauth/v2/authorization",
	token_url: "https://www.linkedin.com/oauth/v2/accessToken",
	profile_url: "https://api.linkedin.com/v2/userinfo",
	emails_url: None,
	default_scopes: &["openid", "profile", "email"],
	issues_id_token: true,
	profile_headers: &[],
};

#[derive(Debug, Clone, Deserialize)]
pub struct LinkedInProfile {
	pub sub: String,
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub given_name: Option<String>,
	#[serde(default)]
	pub family_name: Option<String>,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default, deserialize_with = "lenient_bool")]
	pub email_verified: bool,
	#[serde(default)]
	pub picture: Option<String>,
}

impl LinkedInProfile {
	pub fn normalize(self, tokens: TokenSet) -> NormalizedIdentity {
		let email = normalize_email(self.email.as_deref());
		let joined = match (self.given_name.as_deref(), self.family_name.as_deref()) {
			(Some(given), Some(family)) => Some(format!("{given} {family}")),
			(Some(given), None) => Some(given.to_string()),
			(None, Some(family)) => Some(family.to_string()),
			(None, None) => None,
		};

		NormalizedIdentity {
			provider: ProviderKind::LinkedIn,
			display_name: display_name(&[self.name.as_deref(), joined.as_deref()], &self.sub),
			email_verified: self.email_verified && email.is_some(),
			email,
			profile_photo: self.picture,
			external_id: self.sub,
			tokens,
		}
	}
}
