// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redacting wrapper for credential material handled during OAuth flows.
//!
//! Tether touches several kinds of values that must never reach a log line:
//! OAuth client secrets, provider access and refresh tokens, ID tokens, and the
//! CSRF state and nonce values issued at flow initiation. All of them are held
//! in a [`Secret<T>`]:
//!
//! - `Debug`, `Display` and `Serialize` print `[REDACTED]`
//! - the inner value is zeroized on drop
//! - reading the value requires an explicit [`Secret::expose`]
//!
//! ```
//! use tether_common_secret::SecretString;
//!
//! let token = SecretString::new("gho_abc123".to_string());
//! assert_eq!(format!("{token}"), "[REDACTED]");
//! assert_eq!(token.expose(), "gho_abc123");
//! ```
//!
//! Values that must be persisted verbatim (for example a pending CSRF state in
//! a server-side session) opt in through the [`exposed`] serde module.

use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// Placeholder written wherever a secret would otherwise be printed.
pub const REDACTED: &str = "[REDACTED]";

/// Wrapper that keeps a sensitive value out of logs and serialized output.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

/// The common case: a secret string such as a token or client secret.
pub type SecretString = Secret<String>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Read the wrapped value. Call sites that need the raw value must say so.
	pub fn expose(&self) -> &T {
		&self.inner
	}

	/// Copy the value out. The wrapper's own memory is still zeroized on drop.
	pub fn into_inner(self) -> T
	where
		T: Clone,
	{
		self.inner.clone()
	}
}

impl Secret<String> {
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	/// Compare against untrusted input without short-circuiting on the first
	/// differing byte. Lengths are compared first; a length mismatch is not secret.
	pub fn ct_eq_str(&self, candidate: &str) -> bool {
		let expected = self.inner.as_bytes();
		let candidate = candidate.as_bytes();
		if expected.len() != candidate.len() {
			return false;
		}
		expected.ct_eq(candidate).into()
	}
}

impl From<String> for Secret<String> {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

impl From<&str> for Secret<String> {
	fn from(value: &str) -> Self {
		Self::new(value.to_string())
	}
}

impl<T> Clone for Secret<T>
where
	T: Zeroize + Clone,
{
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T> fmt::Debug for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl<T> fmt::Display for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T> PartialEq for Secret<T>
where
	T: Zeroize + PartialEq,
{
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl<T> Eq for Secret<T> where T: Zeroize + Eq {}

// =============================================================================
// Serde
// =============================================================================

#[cfg(feature = "serde")]
mod serde_impl {
	use super::{Secret, REDACTED};
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use zeroize::Zeroize;

	impl<T> Serialize for Secret<T>
	where
		T: Serialize + Zeroize,
	{
		fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			serializer.serialize_str(REDACTED)
		}
	}

	impl<'de, T> Deserialize<'de> for Secret<T>
	where
		T: Deserialize<'de> + Zeroize,
	{
		fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
		where
			D: Deserializer<'de>,
		{
			T::deserialize(deserializer).map(Secret::new)
		}
	}
}

/// Serde adapter that writes the real value of a [`SecretString`].
///
/// Only for storage the process itself owns (server-side session records).
/// Use as `#[serde(with = "tether_common_secret::exposed")]`.
#[cfg(feature = "serde")]
pub mod exposed {
	use super::SecretString;
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(secret.expose())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(SecretString::new)
	}

	/// Same as the parent module, for `Option<SecretString>` fields.
	pub mod option {
		use super::SecretString;
		use serde::{Deserialize, Deserializer, Serializer};

		pub fn serialize<S>(secret: &Option<SecretString>, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			match secret {
				Some(s) => serializer.serialize_some(s.expose()),
				None => serializer.serialize_none(),
			}
		}

		pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
		where
			D: Deserializer<'de>,
		{
			Option::<String>::deserialize(deserializer).map(|opt| opt.map(SecretString::new))
		}
	}
}
