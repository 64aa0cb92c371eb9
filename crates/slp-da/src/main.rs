// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SLP Directory Agent daemon.
//!
//! Caches service registrations on behalf of Service Agents and answers
//! discovery queries from User Agents (RFC 2608), cutting multicast
//! traffic in managed networks. Only one instance can run per host as it
//! listens on the SLP TCP port.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (port 427, DEFAULT scope, all interfaces)
//! slp-da
//!
//! # Custom config and overrides
//! slp-da da.json --port 1427 --scopes branch,hq
//! ```

use clap::Parser;
use slp_da::{DirectoryAgentConfig, DirectoryAgentServer};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// SLP Directory Agent - service registration cache for RFC 2608 networks
#[derive(Parser, Debug)]
#[command(name = "slp-da")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (JSON format) overriding the defaults
    config: Option<PathBuf>,

    /// SLP port for UDP and TCP (default: 427)
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address (repeatable; 0.0.0.0 expands to all interfaces)
    #[arg(short, long)]
    address: Vec<String>,

    /// Served scopes (comma-separated)
    #[arg(short, long)]
    scopes: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            log::info!("[main] loading config from {}", path.display());
            DirectoryAgentConfig::from_file(path)?
        }
        None => DirectoryAgentConfig::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    if !args.address.is_empty() {
        config.addresses = args.address.clone();
    }
    if let Some(scopes) = &args.scopes {
        config.scopes = scopes.split(',').map(str::to_string).collect();
    }

    let server = Arc::new(DirectoryAgentServer::new(config)?);
    server.start()?;

    let hook = Arc::clone(&server);
    ctrlc::set_handler(move || {
        log::info!("[main] shutdown signal received, stopping");
        hook.stop();
    })?;

    while server.is_running() {
        std::thread::sleep(Duration::from_millis(200));
    }
    Ok(())
}
