// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Facebook Graph API. The profile carries no verification flag, so the
//! email is always treated as unverified.

use serde::Deserialize;
use tether_auth::{normalize_email, NormalizedIdentity, ProviderKind, TokenSet};

use super::{display_name, ProviderSpec};

pub static SPEC: ProviderSpec = ProviderSpec {
	kind: ProviderKind::Facebook,
	authorize_url: "https://www.facebook.com/v19.0/dialog/oauth",
	token_url: "https://graph.facebook.com/v19.0/oauth/access_token",
	profile_url: "https://graph.facebook.com/v19.0/me?fields=id,name,email,picture.type(large)",
	emails_url: None,
	default_scopes: &["email", "public_profile"],
	issues_id_token: false,
	profile_headers: &[],
};

#[derive(Debug, Clone, Deserialize)]
pub struct FacebookProfile {
	pub id: String,
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub picture: Option<FacebookPicture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FacebookPicture {
	pub data: FacebookPictureData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FacebookPictureData {
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub is_silhouette: bool,
}

impl FacebookProfile {
	pub fn normalize(self, tokens: TokenSet) -> NormalizedIdentity {
		let profile_photo = self
			.picture
			.map(|p| p.data)
			.filter(|d| !d.is_silhouette)
			.and_then(|d| d.url);

		NormalizedIdentity {
			provider: ProviderKind::Facebook,
			display_name: display_name(&[self.name.as_deref()], &self.id),
			email: normalize_email(self.email.as_deref()),
			email_verified: false,
			profile_photo,
			external_id: self.id,
			tokens,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn email_is_never_verified() {
		let profile: FacebookProfile = serde_json::from_str(
			r#"{"id":"10158","name":"Grace Hopper","email":"grace@x.com",
			    "picture":{"data":{"url":"https://platform-lookaside.example/p.jpg","is_silhouette":false}}}"#,
		)
		.unwrap();
		let identity = profile.normalize(TokenSet::bearer("EAAB"));
		assert_eq!(identity.external_id, "10158");
		assert_eq!(identity.email.as_deref(), Some("grace@x.com"));
		assert!(!identity.email_verified);
		assert_eq!(
			identity.profile_photo.as_deref(),
			Some("https://platform-lookaside.example/p.jpg")
		);
	}

	#[test]
	fn silhouette_is_not_a_photo() {
		let profile: FacebookProfile = serde_json::from_str(
			r#"{"id":"1","picture":{"data":{"url":"https://x.example/s.jpg","is_silhouette":true}}}"#,
		)
		.unwrap();
		let identity = profile.normalize(TokenSet::bearer("EAAB"));
		assert!(identity.profile_photo.is_none());
		assert_eq!(identity.display_name, "1");
	}
}
