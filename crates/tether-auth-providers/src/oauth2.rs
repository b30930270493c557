// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The authorization code flow, driven by a [`ProviderSpec`].

use async_trait::async_trait;
use reqwest::StatusCode;
use tether_auth::{AuthError, ProviderKind, TokenSet};
use tether_common_secret::SecretString;
use tether_config::OAuthClientConfig;
use url::Url;

use crate::adapter::ProviderAdapter;
use crate::error::OAuthError;
use crate::profile::RawProfile;
use crate::providers::{spec_for, ProviderSpec};

/// Resolved endpoint URLs. Overridable so tests can point at a mock server.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
	pub authorize: Url,
	pub token: Url,
	pub profile: Url,
	pub emails: Option<Url>,
}

impl ProviderEndpoints {
	pub fn for_spec(spec: &ProviderSpec) -> Result<Self, url::ParseError> {
		Ok(Self {
			authorize: Url::parse(spec.authorize_url)?,
			token: Url::parse(spec.token_url)?,
			profile: Url::parse(spec.profile_url)?,
			emails: spec.emails_url.map(Url::parse).transpose()?,
		})
	}
}

/// A [`ProviderAdapter`] for any provider in the static table.
#[derive(Debug, Clone)]
pub struct OAuth2Adapter {
	spec: &'static ProviderSpec,
	endpoints: ProviderEndpoints,
	client_id: String,
	client_secret: SecretString,
	redirect_uri: String,
	scopes: Vec<String>,
	http: reqwest::Client,
}

impl OAuth2Adapter {
	#[tracing::instrument(skip_all, name = "OAuth2Adapter::new", fields(provider = %kind))]
	pub fn new(
		kind: ProviderKind,
		config: &OAuthClientConfig,
		http: reqwest::Client,
	) -> Result<Self, AuthError> {
		let spec = spec_for(kind);
		let endpoints = ProviderEndpoints::for_spec(spec).map_err(|e| {
			AuthError::Configuration(format!("invalid built-in endpoint for {kind}: {e}"))
		})?;

		let scopes = config
			.scopes
			.clone()
			.filter(|s| !s.is_empty())
			.unwrap_or_else(|| spec.default_scopes());

		Ok(Self {
			spec,
			endpoints,
			client_id: config.client_id.clone(),
			client_secret: config.client_secret.clone(),
			redirect_uri: config.redirect_uri.clone(),
			scopes,
			http,
		})
	}

	pub fn with_endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
		self.endpoints = endpoints;
		self
	}

	pub fn scopes(&self) -> &[String] {
		&self.scopes
	}

	async fn request_token(&self, code: &str) -> Result<TokenSet, OAuthError> {
		let response = self
			.http
			.post(self.endpoints.token.clone())
			.header("Accept", "application/json")
			.form(&[
				("grant_type", "authorization_code"),
				("code", code),
				("redirect_uri", self.redirect_uri.as_str()),
				("client_id", self.client_id.as_str()),
				("client_secret", self.client_secret.expose().as_str()),
			])
			.send()
			.await?;

		let status = response.status();
		let body = response.text().await?;

		// GitHub reports a bad code with 200 and an `error` field.
		let value: Option<serde_json::Value> = serde_json::from_str(&body).ok();
		let has_error = value
			.as_ref()
			.map(|v| v.get("error").is_some() && v.get("access_token").is_none())
			.unwrap_or(false);
		if !status.is_success() || has_error {
			return Err(OAuthError::Provider {
				status: status.as_u16(),
				payload: body,
			});
		}

		let tokens: TokenSet = serde_json::from_str(&body)
			.map_err(|e| OAuthError::Parse(format!("failed to parse token response: {e}")))?;
		if tokens.access_token.is_empty() {
			return Err(OAuthError::Parse("token response has an empty access_token".to_string()));
		}
		Ok(tokens)
	}

	async fn get_json_body(&self, url: &Url, access_token: &SecretString) -> Result<String, OAuthError> {
		let mut request = self
			.http
			.get(url.clone())
			.header("Authorization", format!("Bearer {}", access_token.expose()));
		for (name, value) in self.spec.profile_headers {
			request = request.header(*name, *value);
		}
		if self.spec.profile_headers.iter().all(|(name, _)| *name != "Accept") {
			request = request.header("Accept", "application/json");
		}

		let response = request.send().await?;
		let status = response.status();
		let body = response.text().await?;
		if !status.is_success() {
			return Err(OAuthError::Provider {
				status: status.as_u16(),
				payload: body,
			});
		}
		Ok(body)
	}

	async fn request_profile(&self, access_token: &SecretString) -> Result<RawProfile, OAuthError> {
		let body = self.get_json_body(&self.endpoints.profile, access_token).await?;

		let emails = match &self.endpoints.emails {
			Some(url) => match self.get_json_body(url, access_token).await {
				Ok(body) => Some(body),
				// Missing `user:email` scope; fall back to the public profile email.
				Err(OAuthError::Provider { status, .. })
					if status == StatusCode::FORBIDDEN.as_u16()
						|| status == StatusCode::NOT_FOUND.as_u16() =>
				{
					tracing::warn!(provider = %self.spec.kind, status, "email lookup denied, using profile email");
					None
				}
				Err(e) => return Err(e),
			},
			None => None,
		};

		RawProfile::parse(self.spec.kind, &body, emails.as_deref())
	}
}

#[async_trait]
impl ProviderAdapter for OAuth2Adapter {
	fn provider(&self) -> ProviderKind {
		self.spec.kind
	}

	fn uses_nonce(&self) -> bool {
		self.spec.issues_id_token
	}

	#[tracing::instrument(skip(self, state, nonce), fields(provider = %self.spec.kind, client_id = %self.client_id))]
	fn build_authorization_url(
		&self,
		scopes: Option<&[String]>,
		state: &str,
		nonce: Option<&str>,
	) -> Url {
		let scopes = scopes.filter(|s| !s.is_empty()).unwrap_or(self.scopes.as_slice());

		let mut url = self.endpoints.authorize.clone();
		{
			let mut query = url.query_pairs_mut();
			query
				.append_pair("response_type", "code")
				.append_pair("client_id", &self.client_id)
				.append_pair("redirect_uri", &self.redirect_uri)
				.append_pair("scope", &scopes.join(" "))
				.append_pair("state", state);
			if let Some(nonce) = nonce.filter(|_| self.spec.issues_id_token) {
				query.append_pair("nonce", nonce);
			}
		}
		url
	}

	#[tracing::instrument(skip(self, code), name = "OAuth2Adapter::exchange_code", fields(provider = %self.spec.kind))]
	async fn exchange_code(&self, code: &str) -> Result<TokenSet, AuthError> {
		tracing::debug!("exchanging authorization code for access token");
		self.request_token(code)
			.await
			.map_err(|e| e.into_auth_error(self.spec.kind))
	}

	#[tracing::instrument(skip(self, access_token), name = "OAuth2Adapter::fetch_profile", fields(provider = %self.spec.kind))]
	async fn fetch_profile(&self, access_token: &SecretString) -> Result<RawProfile, AuthError> {
		tracing::debug!("fetching provider profile");
		self.request_profile(access_token)
			.await
			.map_err(|e| e.into_auth_error(self.spec.kind))
	}
}
