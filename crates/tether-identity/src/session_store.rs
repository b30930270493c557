// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Keyed storage for [`SessionContext`] values.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tether_auth::AuthError;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::instrument;

use crate::session::SessionContext;

/// Opaque session storage owned by the router.
#[async_trait]
pub trait SessionStore: Send + Sync {
	async fn load(&self, session_id: &str) -> Result<Option<SessionContext>, AuthError>;
	async fn save(&self, session_id: &str, session: SessionContext) -> Result<(), AuthError>;
	async fn remove(&self, session_id: &str) -> Result<(), AuthError>;
}

#[derive(Debug, Clone)]
struct StoredSession {
	session: SessionContext,
	touched_at: Instant,
}

/// In-process store with an idle timeout.
///
/// Sessions idle longer than the timeout read as absent, which also abandons
/// any flow pending in them. Call [`cleanup_expired`](Self::cleanup_expired)
/// periodically to release their memory.
#[derive(Debug, Clone)]
pub struct MemorySessionStore {
	sessions: Arc<RwLock<HashMap<String, StoredSession>>>,
	idle_timeout: Duration,
}

impl MemorySessionStore {
	pub fn new(idle_timeout: Duration) -> Self {
		Self {
			sessions: Arc::new(RwLock::new(HashMap::new())),
			idle_timeout,
		}
	}

	/// Drop idle sessions. Returns how many were removed.
	#[instrument(skip(self))]
	pub async fn cleanup_expired(&self) -> usize {
		let mut sessions = self.sessions.write().await;
		let before = sessions.len();
		let timeout = self.idle_timeout;
		sessions.retain(|_, stored| stored.touched_at.elapsed() < timeout);
		let removed = before - sessions.len();
		if removed > 0 {
			tracing::debug!(removed, remaining = sessions.len(), "cleaned up idle sessions");
		}
		removed
	}

	pub async fn len(&self) -> usize {
		self.sessions.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.sessions.read().await.is_empty()
	}
}

#[async_trait]
impl SessionStore for MemorySessionStore {
	#[instrument(skip(self, session_id))]
	async fn load(&self, session_id: &str) -> Result<Option<SessionContext>, AuthError> {
		let mut sessions = self.sessions.write().await;
		let Some(stored) = sessions.get_mut(session_id) else {
			return Ok(None);
		};

		if stored.touched_at.elapsed() >= self.idle_timeout {
			sessions.remove(session_id);
			tracing::debug!("session expired");
			return Ok(None);
		}

		stored.touched_at = Instant::now();
		Ok(Some(stored.session.clone()))
	}

	#[instrument(skip(self, session_id, session))]
	async fn save(&self, session_id: &str, session: SessionContext) -> Result<(), AuthError> {
		self.sessions.write().await.insert(
			session_id.to_string(),
			StoredSession {
				session,
				touched_at: Instant::now(),
			},
		);
		Ok(())
	}

	#[instrument(skip(self, session_id))]
	async fn remove(&self, session_id: &str) -> Result<(), AuthError> {
		self.sessions.write().await.remove(session_id);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tether_auth::UserId;

	#[tokio::test]
	async fn save_and_load() {
		let store = MemorySessionStore::new(Duration::from_secs(60));
		let user = UserId::generate();
		store.save("sid", SessionContext::for_user(user)).await.unwrap();

		let loaded = store.load("sid").await.unwrap().unwrap();
		assert_eq!(loaded.user_id(), Some(user));
		assert!(store.load("other").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn remove_deletes() {
		let store = MemorySessionStore::new(Duration::from_secs(60));
		store.save("sid", SessionContext::new()).await.unwrap();
		store.remove("sid").await.unwrap();
		assert!(store.is_empty().await);
	}

	#[tokio::test(start_paused = true)]
	async fn idle_sessions_expire() {
		let store = MemorySessionStore::new(Duration::from_secs(60));
		store.save("sid", SessionContext::new()).await.unwrap();

		tokio::time::advance(Duration::from_secs(61)).await;
		assert!(store.load("sid").await.unwrap().is_none());
		assert_eq!(store.len().await, 0);
	}

	#[tokio::test(start_paused = true)]
	async fn load_extends_idle_window() {
		let store = MemorySessionStore::new(Duration::from_secs(60));
		store.save("sid", SessionContext::new()).await.unwrap();

		tokio::time::advance(Duration::from_secs(45)).await;
		assert!(store.load("sid").await.unwrap().is_some());
		tokio::time::advance(Duration::from_secs(45)).await;
		assert!(store.load("sid").await.unwrap().is_some());
	}

	#[tokio::test(start_paused = true)]
	async fn cleanup_counts_removed() {
		let store = MemorySessionStore::new(Duration::from_secs(60));
		store.save("old", SessionContext::new()).await.unwrap();
		tokio::time::advance(Duration::from_secs(61)).await;
		store.save("fresh", SessionContext::new()).await.unwrap();

		assert_eq!(store.cleanup_expired().await, 1);
		assert_eq!(store.len().await, 1);
	}
}
