// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! GitHub. The `/user` profile only carries the public email, so verified
//! addresses come from a second call to `/user/emails`.

use serde::Deserialize;
use tether_auth::{normalize_email, NormalizedIdentity, ProviderKind, TokenSet};

use super::{display_name, ProviderSpec};

pub static SPEC: ProviderSpec = ProviderSpec {
	kind: ProviderKind::GitHub,
	authorize_url: "https://github.com/login/oauth/authorize",
	token_url: "https://github.com/login/oauth/access_token",
	profile_url: "https://api.github.com/user",
	emails_url: Some("https://api.github.com/user/emails"),
	default_scopes: &["read:user", "user:email"],
	issues_id_token: false,
	profile_headers: &[
		("Accept", "application/vnd.github+json"),
		("X-GitHub-Api-Version", "2022-11-28"),
	],
};

/// `/user` response.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
	/// Stable across username changes.
	pub id: i64,
	pub login: String,
	#[serde(default)]
	pub name: Option<String>,
	/// Public email only.
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub avatar_url: Option<String>,
}

/// One entry of `/user/emails`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubEmail {
	pub email: String,
	#[serde(default)]
	pub primary: bool,
	#[serde(default)]
	pub verified: bool,
}

/// `/user` merged with `/user/emails`.
#[derive(Debug, Clone)]
pub struct GitHubProfile {
	pub user: GitHubUser,
	pub emails: Vec<GitHubEmail>,
}

impl GitHubProfile {
	/// Primary verified address first, then any verified address, then the
	/// public profile email (never treated as verified).
	fn best_email(&self) -> (Option<String>, bool) {
		let verified = self
			.emails
			.iter()
			.find(|e| e.primary && e.verified)
			.or_else(|| self.emails.iter().find(|e| e.verified))
			.and_then(|e| normalize_email(Some(&e.email)));

		match verified {
			Some(email) => (Some(email), true),
			None => (normalize_email(self.user.email.as_deref()), false),
		}
	}

	pub fn normalize(self, tokens: TokenSet) -> NormalizedIdentity {
		let (email, email_verified) = self.best_email();
		let external_id = self.user.id.to_string();
		NormalizedIdentity {
			provider: ProviderKind::GitHub,
			display_name: display_name(
				&[self.user.name.as_deref(), Some(self.user.login.as_str())],
				&external_id,
			),
			external_id,
			email,
			email_verified,
			profile_photo: self.user.avatar_url,
			tokens,
		}
	}
}
