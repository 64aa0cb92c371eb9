// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # SLP - Service Location Protocol v2 core
//!
//! A pure Rust implementation of the SLPv2 (RFC 2608) building blocks
//! needed by a Directory Agent: the service data model, LDAPv3 filter
//! matching, a concurrent service registry, binary message codecs, and
//! UDP/TCP transport servers.
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                    Directory Agent server                    |
//! |        dispatcher -> handlers -> reply performers            |
//! +--------------------------------------------------------------+
//! |                         Registry                             |
//! |   ServiceInfoCache | Scopes/Attributes matching | Filters    |
//! +--------------------------------------------------------------+
//! |                         Messages                             |
//! |   SrvRqst SrvRply SrvReg SrvDeReg SrvAck DAAdvert codecs     |
//! +--------------------------------------------------------------+
//! |                        Transports                            |
//! |   UDP multicast/unicast (port 427) | TCP (port 427)          |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ServiceInfoCache`] | Concurrent keyed store of registrations |
//! | [`ServiceInfo`] / [`ServiceKey`] | Registration payload and identity |
//! | [`Filter`] | LDAPv3 predicate over [`Attributes`] |
//! | [`DirectoryAgentInfo`] | DA self-description for DAAdverts |
//! | [`msg::Message`] | Decoded SLPv2 message, tagged by type |
//!
//! Out of scope: SLPv1, authentication blocks, mesh DA-to-DA
//! synchronization, IPX, persistence across restarts.

/// Typed attribute lists and their string form.
pub mod attributes;
/// The concurrent service registry with change listeners.
pub mod cache;
/// Directory Agent self-description.
pub mod directory_agent;
/// SLP error codes and the protocol error type.
pub mod error;
/// LDAPv3 filter parser and evaluator.
pub mod filter;
/// SLPv2 message types and wire codecs.
pub mod msg;
/// UDP/TCP transport servers and the listener seam.
pub mod net;
/// Fixed-delay periodic task scheduler.
pub mod scheduler;
/// Registered service identity and payload.
pub mod service_info;
/// Structured service-type names.
pub mod service_type;
/// Service URLs with registration lifetimes.
pub mod service_url;
/// Scope sets and matching modes.
pub mod scopes;

pub use attributes::{AttrValue, Attributes, AttributesError};
pub use cache::{CacheResult, ServiceInfoCache, ServiceListener};
pub use directory_agent::{DirectoryAgentInfo, DIRECTORY_AGENT_SERVICE_TYPE, TCP_PORT_TAG};
pub use error::{ErrorCode, SlpError};
pub use filter::{Filter, FilterError};
pub use scheduler::Scheduler;
pub use scopes::{Scopes, DEFAULT_SCOPE};
pub use service_info::{ServiceInfo, ServiceKey};
pub use service_type::ServiceType;
pub use service_url::{ServiceUrl, LIFETIME_DEFAULT, LIFETIME_PERMANENT};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
