// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use anyhow::Context;
use tether_auth::{AuthError, ProviderKind, User, UserId};
use tether_auth_providers::{spec_for, ProviderRegistry};
use tether_config::TetherConfig;
use tether_db::{create_pool, run_migrations, UserRepository};
use tether_identity::{
	CallbackOutcome, CallbackQuery, IdentityService, MemorySessionStore, SessionContext, SessionStore,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

pub fn providers(config: &TetherConfig) -> anyhow::Result<()> {
	let configured = config.oauth.providers();
	for kind in ProviderKind::ALL {
		match configured.iter().find(|(name, _)| *name == kind.as_str()) {
			Some((_, client)) => {
				let scopes = client
					.scopes
					.clone()
					.unwrap_or_else(|| spec_for(kind).default_scopes());
				println!(
					"{:<10} configured   redirect={} scopes={}",
					kind.as_str(),
					client.redirect_uri,
					scopes.join(" ")
				);
			}
			None => println!("{:<10} not configured", kind.as_str()),
		}
	}
	Ok(())
}

pub async fn migrate(config: &TetherConfig) -> anyhow::Result<()> {
	let pool = create_pool(&config.database.url).await?;
	run_migrations(&pool).await?;
	println!("migrations applied to {}", config.database.url);
	Ok(())
}

pub async fn show(config: &TetherConfig, user_id: &str) -> anyhow::Result<()> {
	let repo = open_repository(config).await?;
	let user_id = parse_user_id(user_id)?;
	let user = repo
		.get_user_by_id(&user_id)
		.await?
		.ok_or_else(|| AuthError::NotFound(format!("user {user_id}")))?;
	print_user(&user)
}

pub async fn unlink(config: &TetherConfig, user_id: &str, provider: &str) -> anyhow::Result<()> {
	let provider: ProviderKind = provider.parse()?;
	let user_id = parse_user_id(user_id)?;
	let service = build_service(config).await?;
	let user = service.unlink(&user_id, provider).await?;
	print_user(&user)
}

/// Interactive flow: print the provider URL, then read the URL the browser
/// was redirected to.
pub async fn login(
	config: &TetherConfig,
	provider: &str,
	scopes: Vec<String>,
	as_user: Option<&str>,
) -> anyhow::Result<()> {
	let provider: ProviderKind = provider.parse()?;
	let service = build_service(config).await?;

	let sessions = MemorySessionStore::new(config.flow.state_ttl);
	let session_id = uuid::Uuid::new_v4().to_string();
	let mut session = match as_user {
		Some(id) => SessionContext::for_user(parse_user_id(id)?),
		None => SessionContext::new(),
	};

	let scopes = (!scopes.is_empty()).then_some(scopes);
	let url = service.initiate(&mut session, provider, scopes.as_deref(), None)?;
	sessions.save(&session_id, session).await?;

	println!("Open this URL in a browser and authorize:\n\n  {url}\n");
	println!("Then paste the full URL you were redirected to:");

	let mut line = String::new();
	BufReader::new(tokio::io::stdin())
		.read_line(&mut line)
		.await
		.context("failed to read callback URL")?;
	let callback_url = Url::parse(line.trim()).context("callback URL is not a valid URL")?;

	// An idle timeout here means the flow expired while waiting.
	let mut session = sessions
		.load(&session_id)
		.await?
		.ok_or(AuthError::CsrfStateMismatch)?;
	let outcome = service
		.handle_callback(&mut session, provider, &CallbackQuery::from_url(&callback_url))
		.await;
	sessions.save(&session_id, session).await?;

	match outcome {
		CallbackOutcome::Resolved { resolution, .. } => {
			println!("{}: user {}", resolution.decision, resolution.user.id);
			print_user(&resolution.user)
		}
		CallbackOutcome::Failed { error, .. } => Err(error.into()),
	}
}

async fn open_repository(config: &TetherConfig) -> anyhow::Result<Arc<UserRepository>> {
	let pool = create_pool(&config.database.url).await?;
	run_migrations(&pool).await?;
	Ok(Arc::new(UserRepository::new(pool)))
}

async fn build_service(config: &TetherConfig) -> anyhow::Result<IdentityService> {
	let repo = open_repository(config).await?;
	let registry = ProviderRegistry::from_config(&config.oauth, config.http.timeouts())?;
	Ok(IdentityService::new(registry, repo, config.flow.clone()))
}

fn parse_user_id(raw: &str) -> Result<UserId, AuthError> {
	raw.parse()
		.map_err(|_| AuthError::NotFound(format!("'{raw}' is not a user id")))
}

fn print_user(user: &User) -> anyhow::Result<()> {
	println!("{}", serde_json::to_string_pretty(user)?);
	Ok(())
}
