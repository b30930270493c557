// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory pools for tests in this and dependent crates.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::error::DbError;
use crate::migrations::run_migrations;

/// A single-connection in-memory pool. One connection, because every
/// `:memory:` connection is its own database.
pub async fn create_test_pool() -> Result<SqlitePool, DbError> {
	let options = SqliteConnectOptions::from_str(":memory:")
		.map_err(|e| DbError::Internal(e.to_string()))?
		.foreign_keys(true);

	Ok(SqlitePoolOptions::new()
		.max_connections(1)
		.connect_with(options)
		.await?)
}

/// In-memory pool with the full schema applied.
pub async fn create_user_test_pool() -> Result<SqlitePool, DbError> {
	let pool = create_test_pool().await?;
	run_migrations(&pool).await?;
	Ok(pool)
}
