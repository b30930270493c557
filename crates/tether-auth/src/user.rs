// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The user aggregate and its linked provider identities.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tether_common_secret::SecretString;

use crate::identity::NormalizedIdentity;
use crate::types::{IdentityId, ProviderKind, UserId};

/// An internal account. Always owns at least one [`LinkedIdentity`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
	pub id: UserId,
	/// Primary email. May be a placeholder, see [`placeholder_email`].
	pub email: String,
	pub email_verified: bool,
	/// Ordered by link time, oldest first.
	#[serde(rename = "providers")]
	pub identities: Vec<LinkedIdentity>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl User {
	pub fn has_provider(&self, provider: ProviderKind) -> bool {
		self.identities.iter().any(|i| i.provider == provider)
	}

	pub fn identities_for(&self, provider: ProviderKind) -> impl Iterator<Item = &LinkedIdentity> {
		self.identities.iter().filter(move |i| i.provider == provider)
	}

	pub fn find_identity(&self, provider: ProviderKind, provider_id: &str) -> Option<&LinkedIdentity> {
		self.identities
			.iter()
			.find(|i| i.provider == provider && i.provider_id == provider_id)
	}

	/// Distinct providers, in link order.
	pub fn providers(&self) -> Vec<ProviderKind> {
		let mut seen = Vec::new();
		for identity in &self.identities {
			if !seen.contains(&identity.provider) {
				seen.push(identity.provider);
			}
		}
		seen
	}
}

/// One provider account attached to a [`User`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedIdentity {
	#[serde(skip)]
	pub id: IdentityId,
	pub provider: ProviderKind,
	pub provider_id: String,
	pub display_name: String,
	/// As reported by the provider; may differ from the user's primary email.
	pub email: Option<String>,
	pub profile_photo: Option<String>,
	pub access_token: SecretString,
	pub refresh_token: Option<SecretString>,
	pub linked_at: DateTime<Utc>,
}

impl LinkedIdentity {
	pub fn from_normalized(identity: &NormalizedIdentity, linked_at: DateTime<Utc>) -> Self {
		Self {
			id: IdentityId::generate(),
			provider: identity.provider,
			provider_id: identity.external_id.clone(),
			display_name: identity.display_name.clone(),
			email: identity.email.clone(),
			profile_photo: identity.profile_photo.clone(),
			access_token: identity.tokens.access_token.clone(),
			refresh_token: identity.tokens.refresh_token.clone(),
			linked_at,
		}
	}
}

/// Synthesized primary email for users whose provider reported none.
pub fn placeholder_email(provider: ProviderKind, external_id: &str) -> String {
	format!("user-{external_id}@{provider}.account")
}
