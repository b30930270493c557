// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Static per-provider definitions, keyed by [`ProviderKind`].

pub mod facebook;
pub mod github;
pub mod google;
pub mod linkedin;
pub mod microsoft;

use tether_auth::ProviderKind;

/// Everything that differs between providers at the protocol level.
#[derive(Debug, Clone, Copy)]
pub struct ProviderSpec {
	pub kind: ProviderKind,
	pub authorize_url: &'static str,
	pub token_url: &'static str,
	pub profile_url: &'static str,
	/// Secondary endpoint for verified email addresses, when the profile lacks them.
	pub emails_url: Option<&'static str>,
	pub default_scopes: &'static [&'static str],
	/// OpenID Connect providers get a nonce and return an `id_token`.
	pub issues_id_token: bool,
	/// Extra headers for profile requests.
	pub profile_headers: &'static [(&'static str, &'static str)],
}

impl ProviderSpec {
	pub fn default_scopes(&self) -> Vec<String> {
		self.default_scopes.iter().map(|s| s.to_string()).collect()
	}
}

pub fn spec_for(kind: ProviderKind) -> &'static ProviderSpec {
	match kind {
		ProviderKind::Google => &google::SPEC,
		ProviderKind::GitHub => &github::SPEC,
		ProviderKind::Facebook => &facebook::SPEC,
		ProviderKind::Microsoft => &microsoft::SPEC,
		ProviderKind::LinkedIn => &linkedin::SPEC,
	}
}

/// Pick the display name: the first non-blank candidate, else the external id.
pub(crate) fn display_name(candidates: &[Option<&str>], external_id: &str) -> String {
	candidates
		.iter()
		.flatten()
		.map(|s| s.trim())
		.find(|s| !s.is_empty())
		.unwrap_or(external_id)
		.to_string()
}

/// Accepts `true`, `"true"` and `1`. Anything else, including absence, is false.
pub(crate) fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
	D: serde::Deserializer<'de>,
{
	use serde::Deserialize;

	let value = Option::<serde_json::Value>::deserialize(deserializer)?;
	Ok(match value {
		Some(serde_json::Value::Bool(b)) => b,
		Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("true"),
		Some(serde_json::Value::Number(n)) => n.as_i64() == Some(1),
		_ => false,
	})
}
