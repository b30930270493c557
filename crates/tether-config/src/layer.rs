// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The mergeable top-level configuration layer.

use serde::Deserialize;

use crate::sections::{
	DatabaseConfigLayer, FlowConfigLayer, HttpConfigLayer, LoggingConfigLayer, OAuthConfigLayer,
};

/// One source's view of the configuration. Every section is optional so that
/// a source only overrides what it actually sets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TetherConfigLayer {
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub flow: Option<FlowConfigLayer>,
	#[serde(default)]
	pub oauth: Option<OAuthConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

macro_rules! merge_option {
	($self:ident, $other:ident, $field:ident) => {
		if let Some(incoming) = $other.$field {
			match $self.$field.as_mut() {
				Some(existing) => existing.merge(incoming),
				None => $self.$field = Some(incoming),
			}
		}
	};
}

impl TetherConfigLayer {
	/// Merge `other` over `self`; fields set in `other` win.
	pub fn merge(&mut self, other: TetherConfigLayer) {
		merge_option!(self, other, database);
		merge_option!(self, other, http);
		merge_option!(self, other, flow);
		merge_option!(self, other, oauth);
		merge_option!(self, other, logging);
	}
}
