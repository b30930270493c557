// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections. Each has a partial `*ConfigLayer` used for merging
//! and a resolved `*Config` produced by `finalize`.

mod database;
mod flow;
mod http;
mod logging;
mod oauth;

pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use flow::{FlowConfig, FlowConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use oauth::{OAuthClientConfig, OAuthClientConfigLayer, OAuthConfig, OAuthConfigLayer};
