// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use tether_auth::AuthError;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Internal: {0}")]
	Internal(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

// SQLite primary result codes that clear up on their own.
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;

impl DbError {
	/// Failures worth one more attempt for an idempotent read.
	pub fn is_transient(&self) -> bool {
		match self {
			DbError::Sqlx(sqlx::Error::PoolTimedOut) | DbError::Sqlx(sqlx::Error::Io(_)) => true,
			DbError::Sqlx(sqlx::Error::Database(db_err)) => db_err
				.code()
				.and_then(|code| code.parse::<i64>().ok())
				.map(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
				.unwrap_or(false),
			_ => false,
		}
	}

	pub fn is_conflict(&self) -> bool {
		matches!(self, DbError::Conflict(_))
	}
}

/// Map a unique-constraint violation to [`DbError::Conflict`].
pub(crate) fn map_unique_violation(e: sqlx::Error, message: &str) -> DbError {
	match e {
		sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
			DbError::Conflict(message.to_string())
		}
		_ => DbError::Sqlx(e),
	}
}

impl From<DbError> for AuthError {
	fn from(e: DbError) -> Self {
		match e {
			DbError::NotFound(msg) => AuthError::NotFound(msg),
			other => AuthError::Persistence(other.to_string()),
		}
	}
}
