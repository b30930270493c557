// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, a TOML file and the environment.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::env::{env_var, load_secret_env, parse_list};
use crate::error::ConfigError;
use crate::layer::TetherConfigLayer;
use crate::sections::{
	DatabaseConfigLayer, FlowConfigLayer, HttpConfigLayer, LogFormat, LoggingConfigLayer,
	OAuthClientConfigLayer, OAuthConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<TetherConfigLayer, ConfigError>;
}

/// Built-in defaults. Section defaults live in each `finalize`, so this is empty.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<TetherConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(TetherConfigLayer::default())
	}
}

/// TOML file source. A missing file is not an error.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/tether/tether.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<TetherConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(TetherConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: TetherConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `TETHER_<SECTION>_<FIELD>`, and `TETHER_<PROVIDER>_<FIELD>` for
/// OAuth clients. Client secrets also accept the `_FILE` form.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<TetherConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(TetherConfigLayer {
			database: Some(load_database_from_env()),
			http: Some(load_http_from_env()?),
			flow: Some(load_flow_from_env()?),
			oauth: Some(load_oauth_from_env()?),
			logging: Some(load_logging_from_env()?),
		})
	}
}

fn env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u64 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_database_from_env() -> DatabaseConfigLayer {
	DatabaseConfigLayer {
		url: env_var("TETHER_DATABASE_URL"),
	}
}

fn load_http_from_env() -> Result<HttpConfigLayer, ConfigError> {
	Ok(HttpConfigLayer {
		request_timeout_secs: env_u64("TETHER_HTTP_REQUEST_TIMEOUT_SECS")?,
		connect_timeout_secs: env_u64("TETHER_HTTP_CONNECT_TIMEOUT_SECS")?,
	})
}

fn load_flow_from_env() -> Result<FlowConfigLayer, ConfigError> {
	Ok(FlowConfigLayer {
		state_ttl_secs: env_u64("TETHER_FLOW_STATE_TTL_SECS")?,
		success_redirect: env_var("TETHER_FLOW_SUCCESS_REDIRECT"),
		failure_redirect: env_var("TETHER_FLOW_FAILURE_REDIRECT"),
	})
}

fn load_client_from_env(prefix: &str) -> Result<OAuthClientConfigLayer, ConfigError> {
	Ok(OAuthClientConfigLayer {
		client_id: env_var(&format!("{prefix}_CLIENT_ID")),
		client_secret: load_secret_env(&format!("{prefix}_CLIENT_SECRET"))?,
		redirect_uri: env_var(&format!("{prefix}_REDIRECT_URI")),
		scopes: env_var(&format!("{prefix}_SCOPES")).map(|s| parse_list(&s)),
	})
}

fn load_oauth_from_env() -> Result<OAuthConfigLayer, ConfigError> {
	Ok(OAuthConfigLayer {
		google: load_client_from_env("TETHER_GOOGLE")?,
		github: load_client_from_env("TETHER_GITHUB")?,
		facebook: load_client_from_env("TETHER_FACEBOOK")?,
		microsoft: load_client_from_env("TETHER_MICROSOFT")?,
		linkedin: load_client_from_env("TETHER_LINKEDIN")?,
	})
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	let format = env_var("TETHER_LOG_FORMAT")
		.map(|v| v.parse::<LogFormat>())
		.transpose()?;

	Ok(LoggingConfigLayer {
		level: env_var("TETHER_LOG_LEVEL"),
		format,
	})
}
