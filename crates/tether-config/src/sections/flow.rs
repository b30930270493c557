// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redirect flow settings: pending-state lifetime and post-flow destinations.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_STATE_TTL_SECS: u64 = 600;
const DEFAULT_SUCCESS_REDIRECT: &str = "/";
const DEFAULT_FAILURE_REDIRECT: &str = "/login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowConfig {
	/// How long a pending flow stays valid after `initiate`.
	pub state_ttl: Duration,
	pub success_redirect: String,
	pub failure_redirect: String,
}

impl Default for FlowConfig {
	fn default() -> Self {
		Self {
			state_ttl: Duration::from_secs(DEFAULT_STATE_TTL_SECS),
			success_redirect: DEFAULT_SUCCESS_REDIRECT.to_string(),
			failure_redirect: DEFAULT_FAILURE_REDIRECT.to_string(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlowConfigLayer {
	#[serde(default)]
	pub state_ttl_secs: Option<u64>,
	#[serde(default)]
	pub success_redirect: Option<String>,
	#[serde(default)]
	pub failure_redirect: Option<String>,
}

impl FlowConfigLayer {
	pub fn merge(&mut self, other: FlowConfigLayer) {
		if other.state_ttl_secs.is_some() {
			self.state_ttl_secs = other.state_ttl_secs;
		}
		if other.success_redirect.is_some() {
			self.success_redirect = other.success_redirect;
		}
		if other.failure_redirect.is_some() {
			self.failure_redirect = other.failure_redirect;
		}
	}

	pub fn finalize(self) -> Result<FlowConfig, ConfigError> {
		let ttl = self.state_ttl_secs.unwrap_or(DEFAULT_STATE_TTL_SECS);
		if ttl == 0 {
			return Err(ConfigError::InvalidValue {
				key: "flow.state_ttl_secs".to_string(),
				message: "must be greater than zero".to_string(),
			});
		}

		let success_redirect = self
			.success_redirect
			.unwrap_or_else(|| DEFAULT_SUCCESS_REDIRECT.to_string());
		let failure_redirect = self
			.failure_redirect
			.unwrap_or_else(|| DEFAULT_FAILURE_REDIRECT.to_string());

		check_relative("flow.success_redirect", &success_redirect)?;
		check_relative("flow.failure_redirect", &failure_redirect)?;

		Ok(FlowConfig {
			state_ttl: Duration::from_secs(ttl),
			success_redirect,
			failure_redirect,
		})
	}
}

// Same rule the callback applies to caller-supplied redirects.
fn check_relative(key: &str, value: &str) -> Result<(), ConfigError> {
	if value.starts_with('/') && !value.starts_with("//") {
		Ok(())
	} else {
		Err(ConfigError::InvalidValue {
			key: key.to_string(),
			message: format!("'{value}' must be a relative path starting with '/'"),
		})
	}
}
