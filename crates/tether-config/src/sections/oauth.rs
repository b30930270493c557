// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! OAuth client registrations for the supported identity providers.
//!
//! A provider is enabled when its client id is set after merging. An enabled
//! provider without a client secret or redirect URI is a configuration error.

use serde::Deserialize;
use tether_common_secret::SecretString;

use crate::error::ConfigError;

/// Resolved credentials for one provider.
#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
	pub client_id: String,
	pub client_secret: SecretString,
	pub redirect_uri: String,
	/// Overrides the provider's default scopes when set.
	pub scopes: Option<Vec<String>>,
}

/// Partial credentials for one provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthClientConfigLayer {
	#[serde(default)]
	pub client_id: Option<String>,
	#[serde(default)]
	pub client_secret: Option<SecretString>,
	#[serde(default)]
	pub redirect_uri: Option<String>,
	#[serde(default)]
	pub scopes: Option<Vec<String>>,
}

impl OAuthClientConfigLayer {
	pub fn merge(&mut self, other: OAuthClientConfigLayer) {
		if other.client_id.is_some() {
			self.client_id = other.client_id;
		}
		if other.client_secret.is_some() {
			self.client_secret = other.client_secret;
		}
		if other.redirect_uri.is_some() {
			self.redirect_uri = other.redirect_uri;
		}
		if other.scopes.is_some() {
			self.scopes = other.scopes;
		}
	}

	/// `Ok(None)` without a client id, `Ok(Some)` when complete, `Err` when partial.
	pub fn finalize(self, provider: &str) -> Result<Option<OAuthClientConfig>, ConfigError> {
		let Some(client_id) = self.client_id.filter(|v| !v.trim().is_empty()) else {
			return Ok(None);
		};

		let missing = |field: &str| {
			ConfigError::Validation(format!(
				"oauth.{provider} is partially configured: {field} is missing"
			))
		};

		let client_secret = self
			.client_secret
			.filter(|v| !v.is_empty())
			.ok_or_else(|| missing("client_secret"))?;
		let redirect_uri = self
			.redirect_uri
			.filter(|v| !v.trim().is_empty())
			.ok_or_else(|| missing("redirect_uri"))?;

		if !(redirect_uri.starts_with("https://") || redirect_uri.starts_with("http://")) {
			return Err(ConfigError::InvalidValue {
				key: format!("oauth.{provider}.redirect_uri"),
				message: format!("'{redirect_uri}' must be an absolute http(s) URL"),
			});
		}

		Ok(Some(OAuthClientConfig {
			client_id,
			client_secret,
			redirect_uri,
			scopes: self.scopes.filter(|s| !s.is_empty()),
		}))
	}
}

/// Resolved OAuth configuration. `None` means the provider is not enabled.
#[derive(Debug, Clone, Default)]
pub struct OAuthConfig {
	pub google: Option<OAuthClientConfig>,
	pub github: Option<OAuthClientConfig>,
	pub facebook: Option<OAuthClientConfig>,
	pub microsoft: Option<OAuthClientConfig>,
	pub linkedin: Option<OAuthClientConfig>,
}

impl OAuthConfig {
	/// Enabled providers keyed by their lowercase identifier, in a stable order.
	pub fn providers(&self) -> Vec<(&'static str, &OAuthClientConfig)> {
		[
			("google", self.google.as_ref()),
			("github", self.github.as_ref()),
			("facebook", self.facebook.as_ref()),
			("microsoft", self.microsoft.as_ref()),
			("linkedin", self.linkedin.as_ref()),
		]
		.into_iter()
		.filter_map(|(name, config)| config.map(|c| (name, c)))
		.collect()
	}

	pub fn has_any_provider(&self) -> bool {
		!self.providers().is_empty()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthConfigLayer {
	#[serde(default)]
	pub google: OAuthClientConfigLayer,
	#[serde(default)]
	pub github: OAuthClientConfigLayer,
	#[serde(default)]
	pub facebook: OAuthClientConfigLayer,
	#[serde(default)]
	pub microsoft: OAuthClientConfigLayer,
	#[serde(default)]
	pub linkedin: OAuthClientConfigLayer,
}

impl OAuthConfigLayer {
	pub fn merge(&mut self, other: OAuthConfigLayer) {
		self.google.merge(other.google);
		self.github.merge(other.github);
		self.facebook.merge(other.facebook);
		self.microsoft.merge(other.microsoft);
		self.linkedin.merge(other.linkedin);
	}

	pub fn finalize(self) -> Result<OAuthConfig, ConfigError> {
		Ok(OAuthConfig {
			google: self.google.finalize("google")?,
			github: self.github.finalize("github")?,
			facebook: self.facebook.finalize("facebook")?,
			microsoft: self.microsoft.finalize("microsoft")?,
			linkedin: self.linkedin.finalize("linkedin")?,
		})
	}
}
