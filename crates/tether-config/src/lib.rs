// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for Tether.
//!
//! Sources, highest precedence first:
//! 1. Environment variables (`TETHER_*`)
//! 2. Config file (`/etc/tether/tether.toml`, or a path given explicitly)
//! 3. Built-in defaults
//!
//! ```ignore
//! use tether_config::load_config;
//!
//! let config = load_config()?;
//! for (name, _) in config.oauth.providers() {
//!     println!("{name} enabled");
//! }
//! ```

pub mod env;
pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use env::{load_secret_env, SecretEnvError};
pub use error::ConfigError;
pub use layer::TetherConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info, warn};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct TetherConfig {
	pub database: DatabaseConfig,
	pub http: HttpConfig,
	pub flow: FlowConfig,
	pub oauth: OAuthConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
pub fn load_config() -> Result<TetherConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<TetherConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Load configuration from the environment only.
pub fn load_config_from_env() -> Result<TetherConfig, ConfigError> {
	load_from_sources(vec![Box::new(DefaultsSource), Box::new(EnvSource)])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<TetherConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = TetherConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Resolve a merged layer, applying defaults and validation.
pub fn finalize(layer: TetherConfigLayer) -> Result<TetherConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let http = layer.http.unwrap_or_default().finalize()?;
	let flow = layer.flow.unwrap_or_default().finalize()?;
	let oauth = layer.oauth.unwrap_or_default().finalize()?;
	let logging = layer.logging.unwrap_or_default().finalize();

	let providers: Vec<&str> = oauth.providers().into_iter().map(|(name, _)| name).collect();
	if providers.is_empty() {
		warn!("no OAuth providers configured; every sign-in attempt will fail");
	}

	info!(
		database = %database.url,
		request_timeout_secs = http.request_timeout.as_secs(),
		state_ttl_secs = flow.state_ttl.as_secs(),
		providers = ?providers,
		"configuration loaded"
	);

	Ok(TetherConfig {
		database,
		http,
		flow,
		oauth,
		logging,
	})
}
