// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! ID newtypes and the provider enumeration.
//!
//! ID types serialize transparently as UUID strings and convert to and from
//! [`uuid::Uuid`], so a [`UserId`] can never be passed where an
//! [`IdentityId`] is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AuthError;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			pub fn into_inner(self) -> Uuid {
				self.0
			}

			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl FromStr for $name {
			type Err = uuid::Error;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Uuid::parse_str(s).map(Self)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(UserId, "Unique identifier for a user.");
define_id_type!(IdentityId, "Unique identifier for a linked identity.");

// =============================================================================
// Provider
// =============================================================================

/// Supported external identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
	Google,
	#[serde(rename = "github")]
	GitHub,
	Facebook,
	Microsoft,
	#[serde(rename = "linkedin")]
	LinkedIn,
}

impl ProviderKind {
	/// Every provider, in registration order.
	pub const ALL: [ProviderKind; 5] = [
		ProviderKind::Google,
		ProviderKind::GitHub,
		ProviderKind::Facebook,
		ProviderKind::Microsoft,
		ProviderKind::LinkedIn,
	];

	/// The lowercase tag used in paths, config keys and storage.
	pub fn as_str(&self) -> &'static str {
		match self {
			ProviderKind::Google => "google",
			ProviderKind::GitHub => "github",
			ProviderKind::Facebook => "facebook",
			ProviderKind::Microsoft => "microsoft",
			ProviderKind::LinkedIn => "linkedin",
		}
	}
}

impl fmt::Display for ProviderKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ProviderKind {
	type Err = AuthError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		ProviderKind::ALL
			.into_iter()
			.find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
			.ok_or_else(|| AuthError::Configuration(format!("unknown provider '{s}'")))
	}
}
