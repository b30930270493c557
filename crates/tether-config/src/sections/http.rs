// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Outbound HTTP settings for provider calls.

use std::time::Duration;

use serde::Deserialize;
use tether_common_http::Timeouts;

use crate::error::ConfigError;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
	pub request_timeout: Duration,
	pub connect_timeout: Duration,
}

impl Default for HttpConfig {
	fn default() -> Self {
		Self {
			request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
			connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
		}
	}
}

impl HttpConfig {
	pub fn timeouts(&self) -> Timeouts {
		Timeouts {
			request: self.request_timeout,
			connect: self.connect_timeout,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpConfigLayer {
	#[serde(default)]
	pub request_timeout_secs: Option<u64>,
	#[serde(default)]
	pub connect_timeout_secs: Option<u64>,
}

impl HttpConfigLayer {
	pub fn merge(&mut self, other: HttpConfigLayer) {
		if other.request_timeout_secs.is_some() {
			self.request_timeout_secs = other.request_timeout_secs;
		}
		if other.connect_timeout_secs.is_some() {
			self.connect_timeout_secs = other.connect_timeout_secs;
		}
	}

	/// Resolve timeouts. A zero timeout would mean "wait forever" and is rejected.
	pub fn finalize(self) -> Result<HttpConfig, ConfigError> {
		let request = self
			.request_timeout_secs
			.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
		let connect = self
			.connect_timeout_secs
			.unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);

		if request == 0 {
			return Err(ConfigError::InvalidValue {
				key: "http.request_timeout_secs".to_string(),
				message: "must be greater than zero".to_string(),
			});
		}
		if connect == 0 {
			return Err(ConfigError::InvalidValue {
				key: "http.connect_timeout_secs".to_string(),
				message: "must be greater than zero".to_string(),
			});
		}

		Ok(HttpConfig {
			request_timeout: Duration::from_secs(request),
			connect_timeout: Duration::from_secs(connect),
		})
	}
}
