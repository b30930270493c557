// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `tether` binary: drive OAuth logins and manage linked identities from a terminal.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tether_auth::{AuthError, ErrorKind};
use tether_auth_providers::OAuthError;
use tether_config::{ConfigError, LogFormat, LoggingConfig, TetherConfig};
use tether_db::DbError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "tether", version, about = "OAuth identity resolution and account linking")]
struct Args {
	/// Config file; defaults to /etc/tether/tether.toml when present
	#[arg(short, long, env = "TETHER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// List providers and whether they are configured
	Providers,

	/// Run a login flow: open the printed URL, then paste the callback URL
	Login {
		provider: String,

		/// Scopes to request instead of the configured ones
		#[arg(long, value_delimiter = ',')]
		scopes: Vec<String>,

		/// Link to this existing user instead of logging in anonymously
		#[arg(long)]
		as_user: Option<String>,
	},

	/// Print a user and its linked identities
	Show { user_id: String },

	/// Remove every identity of a provider from a user
	Unlink { user_id: String, provider: String },

	/// Create or upgrade the database schema
	Migrate,
}

#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();

	let config = match load_config(args.config.as_deref()) {
		Ok(config) => config,
		Err(e) => {
			eprintln!("error: {e}");
			return ExitCode::from(exit_code(ErrorKind::Configuration));
		}
	};

	init_tracing(&config.logging);

	match run(args.command, &config).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			let error = classify_failure(e);
			tracing::debug!(kind = %error.kind(), "command failed");
			eprintln!("error: {error}");
			ExitCode::from(exit_code(error.kind()))
		}
	}
}

fn load_config(path: Option<&std::path::Path>) -> Result<TetherConfig, tether_config::ConfigError> {
	match path {
		Some(path) => tether_config::load_config_with_file(path),
		None => tether_config::load_config(),
	}
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| logging.level.clone().into());
	let registry = tracing_subscriber::registry().with(filter);

	match logging.format {
		LogFormat::Json => registry
			.with(
				tracing_subscriber::fmt::layer()
					.json()
					.with_writer(std::io::stderr),
			)
			.init(),
		LogFormat::Pretty => registry
			.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
			.init(),
	}
}

async fn run(command: Command, config: &TetherConfig) -> anyhow::Result<()> {
	match command {
		Command::Providers => commands::providers(config),
		Command::Login {
			provider,
			scopes,
			as_user,
		} => commands::login(config, &provider, scopes, as_user.as_deref()).await,
		Command::Show { user_id } => commands::show(config, &user_id).await,
		Command::Unlink { user_id, provider } => commands::unlink(config, &user_id, &provider).await,
		Command::Migrate => commands::migrate(config).await,
	}
}

/// Recover the typed error behind an `anyhow::Error` before classifying.
///
/// `anyhow::Error` converts into a boxed error that hides the original type,
/// so the known error types are downcast here first.
fn classify_failure(err: anyhow::Error) -> AuthError {
	let err = match err.downcast::<AuthError>() {
		Ok(e) => return e,
		Err(err) => err,
	};
	let err = match err.downcast::<DbError>() {
		Ok(e) => return tether_identity::classify(Box::new(e)),
		Err(err) => err,
	};
	let err = match err.downcast::<OAuthError>() {
		Ok(e) => return tether_identity::classify(Box::new(e)),
		Err(err) => err,
	};
	let err = match err.downcast::<ConfigError>() {
		Ok(e) => return tether_identity::classify(Box::new(e)),
		Err(err) => err,
	};
	tether_identity::classify(err.into())
}

/// Distinct exit status per failure kind, for scripts.
fn exit_code(kind: ErrorKind) -> u8 {
	match kind {
		ErrorKind::Configuration => 2,
		ErrorKind::Provider => 3,
		ErrorKind::Conflict => 4,
		ErrorKind::CsrfStateMismatch => 5,
		ErrorKind::Persistence => 6,
		ErrorKind::LastIdentityViolation => 7,
		ErrorKind::NotFound => 8,
		ErrorKind::Unknown => 1,
	}
}
