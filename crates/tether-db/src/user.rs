// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User and linked-identity repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqliteRow};
use sqlx::Row;
use tether_auth::{IdentityId, LinkedIdentity, NormalizedIdentity, ProviderKind, User, UserId};
use tether_common_secret::SecretString;
use uuid::Uuid;

use crate::error::{map_unique_violation, DbError};

/// Outcome of removing a user's identities for one provider.
#[derive(Debug)]
pub enum RemoveIdentities {
	/// Identities were removed; carries the updated user.
	Removed { user: User, removed: u64 },
	/// The user has no identity for that provider.
	NotLinked,
	/// Removing them would leave the user with no identity; nothing changed.
	LastIdentity,
}

#[async_trait]
pub trait UserStore: Send + Sync {
	async fn create_user_with_identity(
		&self,
		email: &str,
		email_verified: bool,
		identity: &LinkedIdentity,
	) -> Result<User, DbError>;
	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError>;
	async fn get_user_by_identity(
		&self,
		provider: ProviderKind,
		provider_id: &str,
	) -> Result<Option<User>, DbError>;
	async fn find_user_by_verified_email(&self, email: &str) -> Result<Option<User>, DbError>;
	async fn add_identity(&self, user_id: &UserId, identity: &LinkedIdentity) -> Result<User, DbError>;
	async fn refresh_identity(
		&self,
		user_id: &UserId,
		identity: &NormalizedIdentity,
	) -> Result<User, DbError>;
	async fn remove_provider_identities(
		&self,
		user_id: &UserId,
		provider: ProviderKind,
	) -> Result<RemoveIdentities, DbError>;
}

#[async_trait]
impl UserStore for UserRepository {
	async fn create_user_with_identity(
		&self,
		email: &str,
		email_verified: bool,
		identity: &LinkedIdentity,
	) -> Result<User, DbError> {
		self
			.create_user_with_identity(email, email_verified, identity)
			.await
	}

	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError> {
		self.get_user_by_id(id).await
	}

	async fn get_user_by_identity(
		&self,
		provider: ProviderKind,
		provider_id: &str,
	) -> Result<Option<User>, DbError> {
		self.get_user_by_identity(provider, provider_id).await
	}

	async fn find_user_by_verified_email(&self, email: &str) -> Result<Option<User>, DbError> {
		self.find_user_by_verified_email(email).await
	}

	async fn add_identity(&self, user_id: &UserId, identity: &LinkedIdentity) -> Result<User, DbError> {
		self.add_identity(user_id, identity).await
	}

	async fn refresh_identity(
		&self,
		user_id: &UserId,
		identity: &NormalizedIdentity,
	) -> Result<User, DbError> {
		self.refresh_identity(user_id, identity).await
	}

	async fn remove_provider_identities(
		&self,
		user_id: &UserId,
		provider: ProviderKind,
	) -> Result<RemoveIdentities, DbError> {
		self.remove_provider_identities(user_id, provider).await
	}
}

/// Repository for users and their linked identities.
#[derive(Clone)]
pub struct UserRepository {
	pool: SqlitePool,
}

impl UserRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Create a user together with its first identity, in one transaction.
	///
	/// # Errors
	/// `DbError::Conflict` if `(provider, provider_id)` is already linked,
	/// which is how a concurrent registration of the same identity loses.
	#[tracing::instrument(skip(self, email, identity), fields(provider = %identity.provider))]
	pub async fn create_user_with_identity(
		&self,
		email: &str,
		email_verified: bool,
		identity: &LinkedIdentity,
	) -> Result<User, DbError> {
		let user_id = UserId::generate();
		let now = Utc::now().to_rfc3339();

		let mut tx = self.pool.begin().await?;

		sqlx::query(
			r#"
			INSERT INTO users (id, email, email_verified, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(user_id.to_string())
		.bind(email)
		.bind(email_verified)
		.bind(&now)
		.bind(&now)
		.execute(&mut *tx)
		.await?;

		insert_identity(&mut tx, &user_id, identity).await?;
		tx.commit().await?;

		tracing::debug!(user_id = %user_id, provider = %identity.provider, "user created");
		self.require_user(&user_id).await
	}

	#[tracing::instrument(skip(self), fields(user_id = %id))]
	pub async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError> {
		self.load_user(&id.to_string()).await
	}

	#[tracing::instrument(skip(self, provider_id), fields(provider = %provider))]
	pub async fn get_user_by_identity(
		&self,
		provider: ProviderKind,
		provider_id: &str,
	) -> Result<Option<User>, DbError> {
		let user_id: Option<String> = sqlx::query_scalar(
			r#"
			SELECT user_id FROM linked_identities
			WHERE provider = ? AND provider_id = ?
			"#,
		)
		.bind(provider.as_str())
		.bind(provider_id)
		.fetch_optional(&self.pool)
		.await?;

		match user_id {
			Some(id) => self.load_user(&id).await,
			None => Ok(None),
		}
	}

	/// Find the oldest user whose primary email matches and is itself verified.
	#[tracing::instrument(skip(self, email))]
	pub async fn find_user_by_verified_email(&self, email: &str) -> Result<Option<User>, DbError> {
		let user_id: Option<String> = sqlx::query_scalar(
			r#"
			SELECT id FROM users
			WHERE email = ? AND email_verified = 1
			ORDER BY created_at, rowid
			LIMIT 1
			"#,
		)
		.bind(email)
		.fetch_optional(&self.pool)
		.await?;

		match user_id {
			Some(id) => self.load_user(&id).await,
			None => Ok(None),
		}
	}

	/// Attach an identity to an existing user.
	///
	/// # Errors
	/// `DbError::NotFound` if the user does not exist, `DbError::Conflict` if
	/// the identity is already linked anywhere.
	#[tracing::instrument(skip(self, identity), fields(user_id = %user_id, provider = %identity.provider))]
	pub async fn add_identity(
		&self,
		user_id: &UserId,
		identity: &LinkedIdentity,
	) -> Result<User, DbError> {
		let mut tx = self.pool.begin().await?;

		ensure_user_exists(&mut tx, user_id).await?;
		insert_identity(&mut tx, user_id, identity).await?;
		touch_user(&mut tx, user_id).await?;
		tx.commit().await?;

		tracing::debug!(user_id = %user_id, provider = %identity.provider, "identity linked");
		self.require_user(user_id).await
	}

	/// Overwrite tokens and display fields of an identity the user already owns.
	///
	/// The stored refresh token is kept when the provider did not send a new one.
	#[tracing::instrument(skip(self, identity), fields(user_id = %user_id, provider = %identity.provider))]
	pub async fn refresh_identity(
		&self,
		user_id: &UserId,
		identity: &NormalizedIdentity,
	) -> Result<User, DbError> {
		let mut tx = self.pool.begin().await?;

		let result = sqlx::query(
			r#"
			UPDATE linked_identities
			SET display_name = ?,
			    email = ?,
			    profile_photo = ?,
			    access_token = ?,
			    refresh_token = COALESCE(?, refresh_token)
			WHERE user_id = ? AND provider = ? AND provider_id = ?
			"#,
		)
		.bind(&identity.display_name)
		.bind(identity.email.as_deref())
		.bind(identity.profile_photo.as_deref())
		.bind(identity.tokens.access_token.expose().as_str())
		.bind(
			identity
				.tokens
				.refresh_token
				.as_ref()
				.map(|t| t.expose().as_str()),
		)
		.bind(user_id.to_string())
		.bind(identity.provider.as_str())
		.bind(&identity.external_id)
		.execute(&mut *tx)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!(
				"{} identity {} for user {user_id}",
				identity.provider, identity.external_id
			)));
		}

		touch_user(&mut tx, user_id).await?;
		tx.commit().await?;

		tracing::debug!(user_id = %user_id, provider = %identity.provider, "identity refreshed");
		self.require_user(user_id).await
	}

	/// Remove every identity the user holds for `provider`, unless that would
	/// leave the user with none.
	///
	/// The guard is part of the `DELETE` itself, so two concurrent removals of
	/// a user's last two providers cannot both succeed.
	#[tracing::instrument(skip(self), fields(user_id = %user_id, provider = %provider))]
	pub async fn remove_provider_identities(
		&self,
		user_id: &UserId,
		provider: ProviderKind,
	) -> Result<RemoveIdentities, DbError> {
		let id = user_id.to_string();
		let mut tx = self.pool.begin().await?;

		ensure_user_exists(&mut tx, user_id).await?;

		let linked: i64 = sqlx::query_scalar(
			"SELECT COUNT(*) FROM linked_identities WHERE user_id = ? AND provider = ?",
		)
		.bind(&id)
		.bind(provider.as_str())
		.fetch_one(&mut *tx)
		.await?;

		if linked == 0 {
			return Ok(RemoveIdentities::NotLinked);
		}

		let result = sqlx::query(
			r#"
			DELETE FROM linked_identities
			WHERE user_id = ? AND provider = ?
			  AND EXISTS (
			    SELECT 1 FROM linked_identities other
			    WHERE other.user_id = ? AND other.provider != ?
			  )
			"#,
		)
		.bind(&id)
		.bind(provider.as_str())
		.bind(&id)
		.bind(provider.as_str())
		.execute(&mut *tx)
		.await?;

		let removed = result.rows_affected();
		if removed == 0 {
			tracing::debug!(user_id = %user_id, provider = %provider, "refusing to remove last identity");
			return Ok(RemoveIdentities::LastIdentity);
		}

		touch_user(&mut tx, user_id).await?;
		tx.commit().await?;

		tracing::debug!(user_id = %user_id, provider = %provider, removed, "identities removed");
		let user = self.require_user(user_id).await?;
		Ok(RemoveIdentities::Removed { user, removed })
	}

	async fn require_user(&self, user_id: &UserId) -> Result<User, DbError> {
		self.get_user_by_id(user_id)
			.await?
			.ok_or_else(|| DbError::Internal(format!("user {user_id} missing after write")))
	}

	async fn load_user(&self, id: &str) -> Result<Option<User>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, email, email_verified, created_at, updated_at
			FROM users
			WHERE id = ?
			"#,
		)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		let Some(row) = row else {
			return Ok(None);
		};

		let identity_rows = sqlx::query(
			r#"
			SELECT id, provider, provider_id, display_name, email, profile_photo,
			       access_token, refresh_token, linked_at
			FROM linked_identities
			WHERE user_id = ?
			ORDER BY linked_at, rowid
			"#,
		)
		.bind(id)
		.fetch_all(&self.pool)
		.await?;

		let identities = identity_rows
			.iter()
			.map(parse_identity_row)
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Some(parse_user_row(&row, identities)?))
	}
}

async fn ensure_user_exists(conn: &mut SqliteConnection, user_id: &UserId) -> Result<(), DbError> {
	let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE id = ?")
		.bind(user_id.to_string())
		.fetch_optional(&mut *conn)
		.await?;

	match exists {
		Some(_) => Ok(()),
		None => Err(DbError::NotFound(format!("user {user_id}"))),
	}
}

async fn insert_identity(
	conn: &mut SqliteConnection,
	user_id: &UserId,
	identity: &LinkedIdentity,
) -> Result<(), DbError> {
	sqlx::query(
		r#"
		INSERT INTO linked_identities (
			id, user_id, provider, provider_id, display_name, email, profile_photo,
			access_token, refresh_token, linked_at
		) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
		"#,
	)
	.bind(identity.id.to_string())
	.bind(user_id.to_string())
	.bind(identity.provider.as_str())
	.bind(&identity.provider_id)
	.bind(&identity.display_name)
	.bind(identity.email.as_deref())
	.bind(identity.profile_photo.as_deref())
	.bind(identity.access_token.expose().as_str())
	.bind(identity.refresh_token.as_ref().map(|t| t.expose().as_str()))
	.bind(identity.linked_at.to_rfc3339())
	.execute(&mut *conn)
	.await
	.map_err(|e| {
		map_unique_violation(
			e,
			&format!("{} identity {} is already linked", identity.provider, identity.provider_id),
		)
	})?;

	Ok(())
}

async fn touch_user(conn: &mut SqliteConnection, user_id: &UserId) -> Result<(), DbError> {
	sqlx::query("UPDATE users SET updated_at = ? WHERE id = ?")
		.bind(Utc::now().to_rfc3339())
		.bind(user_id.to_string())
		.execute(&mut *conn)
		.await?;
	Ok(())
}

fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>, DbError> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("Invalid {column}: {e}")))
}

fn parse_user_row(row: &SqliteRow, identities: Vec<LinkedIdentity>) -> Result<User, DbError> {
	let id_str: String = row.get("id");
	let created_at: String = row.get("created_at");
	let updated_at: String = row.get("updated_at");

	let id = Uuid::parse_str(&id_str)
		.map_err(|e| DbError::Internal(format!("Invalid user id UUID: {e}")))?;

	Ok(User {
		id: UserId::new(id),
		email: row.get("email"),
		email_verified: row.get("email_verified"),
		identities,
		created_at: parse_timestamp(&created_at, "created_at")?,
		updated_at: parse_timestamp(&updated_at, "updated_at")?,
	})
}

fn parse_identity_row(row: &SqliteRow) -> Result<LinkedIdentity, DbError> {
	let id_str: String = row.get("id");
	let provider_str: String = row.get("provider");
	let linked_at: String = row.get("linked_at");
	let access_token: String = row.get("access_token");
	let refresh_token: Option<String> = row.get("refresh_token");

	let id = Uuid::parse_str(&id_str)
		.map_err(|e| DbError::Internal(format!("Invalid identity id UUID: {e}")))?;
	let provider = provider_str
		.parse::<ProviderKind>()
		.map_err(|e| DbError::Internal(format!("Invalid provider: {e}")))?;

	Ok(LinkedIdentity {
		id: IdentityId::new(id),
		provider,
		provider_id: row.get("provider_id"),
		display_name: row.get("display_name"),
		email: row.get("email"),
		profile_photo: row.get("profile_photo"),
		access_token: SecretString::new(access_token),
		refresh_token: refresh_token.map(SecretString::new),
		linked_at: parse_timestamp(&linked_at, "linked_at")?,
	})
}
