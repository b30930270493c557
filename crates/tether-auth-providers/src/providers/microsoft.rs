// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Microsoft identity platform with the Graph `/me` profile.

use serde::Deserialize;
use tether_auth::{normalize_email, NormalizedIdentity, ProviderKind, TokenSet};

use super::{display_name, ProviderSpec};

pub static SPEC: ProviderSpec = ProviderSpec {
	kind: ProviderKind::Microsoft,
	authorize_url: "https://login.microsoftonline.com/common/oauth2/v2.0/authorize",
	token_url: "https://login.microsoftonline.com/common/oauth2/v2.0/token",
	profile_url: "https://graph.microsoft.com/v1.0/me",
	emails_url: None,
	default_scopes: &["openid", "profile", "email", "User.Read", "offline_access"],
	issues_id_token: true,
	profile_headers: &[],
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicrosoftProfile {
	pub id: String,
	#[serde(default)]
	pub display_name: Option<String>,
	#[serde(default)]
	pub mail: Option<String>,
	#[serde(default)]
	pub user_principal_name: Option<String>,
}

impl MicrosoftProfile {
	/// Graph does not assert ownership of `mail`, so it is never verified.
	pub fn normalize(self, tokens: TokenSet) -> NormalizedIdentity {
		let upn = self
			.user_principal_name
			.as_deref()
			.filter(|upn| upn.contains('@'));
		let email = normalize_email(self.mail.as_deref().or(upn));

		NormalizedIdentity {
			provider: ProviderKind::Microsoft,
			display_name: display_name(&[self.display_name.as_deref(), email.as_deref()], &self.id),
			email,
			email_verified: false,
			profile_photo: None,
			external_id: self.id,
			tokens,
		}
	}
}
