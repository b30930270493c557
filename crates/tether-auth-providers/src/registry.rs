// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;
use std::sync::Arc;

use tether_auth::{AuthError, ProviderKind};
use tether_common_http::{new_client_with_timeouts, Timeouts};
use tether_config::OAuthConfig;

use crate::adapter::ProviderAdapter;
use crate::oauth2::OAuth2Adapter;

/// Configured provider adapters, keyed by provider.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
	adapters: BTreeMap<ProviderKind, Arc<dyn ProviderAdapter>>,
}

impl std::fmt::Debug for ProviderRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ProviderRegistry")
			.field("providers", &self.configured())
			.finish()
	}
}

impl ProviderRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// One adapter per configured provider, sharing a single HTTP client.
	#[tracing::instrument(skip_all, name = "ProviderRegistry::from_config")]
	pub fn from_config(config: &OAuthConfig, timeouts: Timeouts) -> Result<Self, AuthError> {
		let http = new_client_with_timeouts(timeouts)
			.map_err(|e| AuthError::Configuration(format!("failed to build HTTP client: {e}")))?;

		let mut registry = Self::new();
		for (name, client) in config.providers() {
			let kind: ProviderKind = name.parse()?;
			registry.register(Arc::new(OAuth2Adapter::new(kind, client, http.clone())?));
		}

		tracing::info!(providers = ?registry.configured(), "provider registry ready");
		Ok(registry)
	}

	/// Add or replace the adapter for its provider.
	pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
		self.adapters.insert(adapter.provider(), adapter);
	}

	pub fn get(&self, provider: ProviderKind) -> Result<Arc<dyn ProviderAdapter>, AuthError> {
		self.adapters
			.get(&provider)
			.cloned()
			.ok_or_else(|| AuthError::Configuration(format!("provider {provider} is not configured")))
	}

	pub fn is_configured(&self, provider: ProviderKind) -> bool {
		self.adapters.contains_key(&provider)
	}

	pub fn configured(&self) -> Vec<ProviderKind> {
		self.adapters.keys().copied().collect()
	}
}
