// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SLP Directory Agent server library.
//!
//! The binary in `main.rs` is a thin CLI wrapper around
//! [`DirectoryAgentServer`]; embedders can drive the server directly.

pub mod config;
pub mod server;

pub use config::{ConfigError, DirectoryAgentConfig};
pub use server::{DirectoryAgentServer, ServerError};
