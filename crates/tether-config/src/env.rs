// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Environment helpers, including the `VAR` / `VAR_FILE` secret convention.
//!
//! OAuth client secrets are usually mounted as files by Docker or Kubernetes,
//! so every secret variable also accepts a `_FILE` twin pointing at the file.

use std::path::PathBuf;
use std::{env, fs};

use tether_common_secret::SecretString;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

/// Load a secret from `{var}_FILE` (preferred) or `{var}`.
///
/// A single trailing newline in the file is stripped. Returns `Ok(None)` when
/// neither variable is set.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path_str) = env::var(&file_var) {
		if path_str.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}

		let path = PathBuf::from(&path_str);
		let content = fs::read_to_string(&path).map_err(|e| SecretEnvError::Io {
			path: path.clone(),
			source: e,
		})?;

		let secret = content.strip_suffix('\n').unwrap_or(&content).to_string();
		return Ok(Some(SecretString::new(secret)));
	}

	Ok(env::var(var).ok().map(SecretString::new))
}

/// Read a plain (non-secret) variable, treating empty values as unset.
pub fn env_var(name: &str) -> Option<String> {
	env::var(name).ok().filter(|s| !s.trim().is_empty())
}

/// Split a scope list on spaces or commas, dropping empty entries.
pub fn parse_list(value: &str) -> Vec<String> {
	value
		.split([' ', ','])
		.map(|s| s.trim().to_string())
		.filter(|s| !s.is_empty())
		.collect()
}
