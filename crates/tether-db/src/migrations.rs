// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Schema. Every statement is idempotent so migrations can run on each start.

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const MIGRATIONS: &[(&str, &str)] = &[
	(
		"create_users",
		r#"
		CREATE TABLE IF NOT EXISTS users (
			id TEXT PRIMARY KEY,
			email TEXT NOT NULL,
			email_verified INTEGER NOT NULL DEFAULT 0,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL
		)
		"#,
	),
	(
		"index_users_email",
		"CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)",
	),
	(
		"create_linked_identities",
		r#"
		CREATE TABLE IF NOT EXISTS linked_identities (
			id TEXT PRIMARY KEY,
			user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
			provider TEXT NOT NULL,
			provider_id TEXT NOT NULL,
			display_name TEXT NOT NULL,
			email TEXT,
			profile_photo TEXT,
			access_token TEXT NOT NULL,
			refresh_token TEXT,
			linked_at TEXT NOT NULL,
			UNIQUE(provider, provider_id)
		)
		"#,
	),
	(
		"index_linked_identities_user",
		"CREATE INDEX IF NOT EXISTS idx_linked_identities_user ON linked_identities(user_id)",
	),
];

#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for &(name, sql) in MIGRATIONS {
		sqlx::query(sql).execute(pool).await?;
		tracing::trace!(migration = name, "migration applied");
	}
	tracing::debug!(count = MIGRATIONS.len(), "migrations complete");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;

	#[tokio::test]
	async fn migrations_are_idempotent() {
		let pool = create_test_pool().await.unwrap();
		run_migrations(&pool).await.unwrap();
		run_migrations(&pool).await.unwrap();

		let tables: Vec<String> = sqlx::query_scalar(
			"SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
		)
		.fetch_all(&pool)
		.await
		.unwrap();
		assert!(tables.contains(&"users".to_string()));
		assert!(tables.contains(&"linked_identities".to_string()));
	}

	#[tokio::test]
	async fn email_index_exists() {
		let pool = create_test_pool().await.unwrap();
		run_migrations(&pool).await.unwrap();
		let count: i64 = sqlx::query_scalar(
			"SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'idx_users_email'",
		)
		.fetch_one(&pool)
		.await
		.unwrap();
		assert_eq!(count, 1);
	}
}
