// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provider-specific profile payloads as fetched, before normalization.

use tether_auth::{NormalizedIdentity, ProviderKind, TokenSet};

use crate::error::OAuthError;
use crate::providers::facebook::FacebookProfile;
use crate::providers::github::{GitHubEmail, GitHubProfile, GitHubUser};
use crate::providers::google::GoogleProfile;
use crate::providers::linkedin::LinkedInProfile;
use crate::providers::microsoft::MicrosoftProfile;

#[derive(Debug, Clone)]
pub enum RawProfile {
	Google(GoogleProfile),
	GitHub(GitHubProfile),
	Facebook(FacebookProfile),
	Microsoft(MicrosoftProfile),
	LinkedIn(LinkedInProfile),
}

impl RawProfile {
	pub fn provider(&self) -> ProviderKind {
		match self {
			RawProfile::Google(_) => ProviderKind::Google,
			RawProfile::GitHub(_) => ProviderKind::GitHub,
			RawProfile::Facebook(_) => ProviderKind::Facebook,
			RawProfile::Microsoft(_) => ProviderKind::Microsoft,
			RawProfile::LinkedIn(_) => ProviderKind::LinkedIn,
		}
	}

	/// Parse a profile body. `emails` is only consulted for GitHub.
	pub fn parse(
		provider: ProviderKind,
		body: &str,
		emails: Option<&str>,
	) -> Result<Self, OAuthError> {
		fn json<T: serde::de::DeserializeOwned>(body: &str, what: &str) -> Result<T, OAuthError> {
			serde_json::from_str(body).map_err(|e| OAuthError::Parse(format!("{what}: {e}")))
		}

		Ok(match provider {
			ProviderKind::Google => RawProfile::Google(json(body, "google profile")?),
			ProviderKind::GitHub => {
				let user: GitHubUser = json(body, "github user")?;
				let emails: Vec<GitHubEmail> = match emails {
					Some(body) => json(body, "github emails")?,
					None => Vec::new(),
				};
				RawProfile::GitHub(GitHubProfile { user, emails })
			}
			ProviderKind::Facebook => RawProfile::Facebook(json(body, "facebook profile")?),
			ProviderKind::Microsoft => RawProfile::Microsoft(json(body, "microsoft profile")?),
			ProviderKind::LinkedIn => RawProfile::LinkedIn(json(body, "linkedin profile")?),
		})
	}

	/// Total: every parsed profile yields an identity.
	pub fn normalize(self, tokens: TokenSet) -> NormalizedIdentity {
		match self {
			RawProfile::Google(p) => p.normalize(tokens),
			RawProfile::GitHub(p) => p.normalize(tokens),
			RawProfile::Facebook(p) => p.normalize(tokens),
			RawProfile::Microsoft(p) => p.normalize(tokens),
			RawProfile::LinkedIn(p) => p.normalize(tokens),
		}
	}
}
