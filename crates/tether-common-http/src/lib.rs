// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for Tether.
//!
//! Every outbound call to an identity provider goes through a client built here,
//! so all of them carry the same User-Agent and a bounded timeout.

mod client;

pub use client::{builder, new_client_with_timeouts, user_agent, Timeouts};
