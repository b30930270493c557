// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! HTTP client construction with a consistent User-Agent and mandatory timeouts.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Request and connect timeouts applied to every provider call.
///
/// Both values are always applied. A token exchange or profile fetch that
/// exceeds them surfaces as a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
	pub request: Duration,
	pub connect: Duration,
}

impl Default for Timeouts {
	fn default() -> Self {
		Self {
			request: Duration::from_secs(10),
			connect: Duration::from_secs(5),
		}
	}
}

/// Creates a client builder with the standard Tether User-Agent header.
///
/// # Example
/// ```ignore
/// let client = tether_common_http::builder()
///     .timeout(Duration::from_secs(30))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Builds a client with the standard User-Agent and the given timeouts.
pub fn new_client_with_timeouts(timeouts: Timeouts) -> Result<Client, reqwest::Error> {
	tracing::debug!(
		request_timeout_ms = timeouts.request.as_millis() as u64,
		connect_timeout_ms = timeouts.connect.as_millis() as u64,
		"building provider HTTP client"
	);
	builder()
		.timeout(timeouts.request)
		.connect_timeout(timeouts.connect)
		.build()
}

/// Returns the standard Tether User-Agent string.
///
/// Format: `tether/{version} ({os}-{arch})`
pub fn user_agent() -> String {
	format!(
		"tether/{} ({}-{})",
		env!("CARGO_PKG_VERSION"),
		std::env::consts::OS,
		std::env::consts::ARCH
	)
}
