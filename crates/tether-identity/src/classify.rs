// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Maps any failure onto the [`AuthError`] taxonomy.

use std::error::Error;

use tether_auth::AuthError;
use tether_auth_providers::OAuthError;
use tether_config::ConfigError;
use tether_db::DbError;

/// Classify an arbitrary error. Total: anything unrecognised becomes
/// [`AuthError::Unknown`] carrying the original error as its source.
pub fn classify(err: Box<dyn Error + Send + Sync + 'static>) -> AuthError {
	let err = match err.downcast::<AuthError>() {
		Ok(e) => return *e,
		Err(e) => e,
	};
	let err = match err.downcast::<DbError>() {
		Ok(e) => return (*e).into(),
		Err(e) => e,
	};
	let err = match err.downcast::<OAuthError>() {
		Ok(e) => return (*e).into(),
		Err(e) => e,
	};
	let err = match err.downcast::<ConfigError>() {
		Ok(e) => return AuthError::Configuration(e.to_string()),
		Err(e) => e,
	};
	AuthError::Unknown(err)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io;
	use tether_auth::{ErrorKind, ProviderKind};

	fn boxed<E: Error + Send + Sync + 'static>(e: E) -> Box<dyn Error + Send + Sync> {
		Box::new(e)
	}

	#[test]
	fn auth_errors_pass_through() {
		let err = classify(boxed(AuthError::LastIdentityViolation));
		assert_eq!(err.kind(), ErrorKind::LastIdentityViolation);

		let err = classify(boxed(AuthError::AlreadyLinked {
			provider: ProviderKind::Google,
			provider_id: "g2".to_string(),
		}));
		assert_eq!(err.kind(), ErrorKind::Conflict);
	}

	#[test]
	fn store_errors() {
		assert_eq!(
			classify(boxed(DbError::NotFound("user".into()))).kind(),
			ErrorKind::NotFound
		);
		assert_eq!(
			classify(boxed(DbError::Internal("disk".into()))).kind(),
			ErrorKind::Persistence
		);
	}

	#[test]
	fn provider_errors_keep_description() {
		let err = classify(boxed(OAuthError::Provider {
			status: 400,
			payload: r#"{"error":"access_denied","error_description":"The user denied access."}"#
				.to_string(),
		}));
		assert_eq!(err.kind(), ErrorKind::Provider);
		assert!(err.to_string().contains("The user denied access."));
	}

	#[test]
	fn config_errors() {
		let err = classify(boxed(ConfigError::Validation("missing client_secret".into())));
		assert_eq!(err.kind(), ErrorKind::Configuration);
	}

	#[test]
	fn anything_else_is_unknown_with_cause() {
		let err = classify(boxed(io::Error::new(io::ErrorKind::Other, "boom")));
		assert_eq!(err.kind(), ErrorKind::Unknown);
		let source = err.source().unwrap();
		assert_eq!(source.to_string(), "boom");
	}

	#[test]
	fn string_errors_are_unknown() {
		let err = classify("plain message".into());
		assert_eq!(err.kind(), ErrorKind::Unknown);
	}
}
