// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Directory Agent self-description, as emitted in DAAdvert messages.

use crate::attributes::Attributes;
use crate::error::ErrorCode;
use crate::msg::DaAdvert;
use crate::scopes::Scopes;
use crate::service_type::ServiceType;

/// Service type under which Directory Agents advertise themselves.
pub const DIRECTORY_AGENT_SERVICE_TYPE: &str = "service:directory-agent";

/// Attribute tag carrying the DA's TCP port in every advert.
pub const TCP_PORT_TAG: &str = "service:directory-agent.tcp-port";

/// One Directory Agent binding: a host address plus the scopes,
/// attributes and language it serves, stamped with its boot time.
#[derive(Debug, Clone)]
pub struct DirectoryAgentInfo {
    /// Host address literal (dotted IPv4 or compressed IPv6 form).
    pub address: String,
    pub scopes: Scopes,
    /// Always includes the `service:directory-agent.tcp-port` tag.
    pub attributes: Attributes,
    pub language: String,
    /// Seconds since the epoch at which this DA started.
    pub boot_time: u32,
}

impl DirectoryAgentInfo {
    /// Build the description for one binding, injecting the tcp-port
    /// attribute tag.
    pub fn new(
        address: &str,
        scopes: Scopes,
        attributes: &Attributes,
        language: &str,
        boot_time: u32,
        tcp_port: u16,
    ) -> Self {
        let mut attributes = attributes.clone();
        let port_tag = Attributes::parse(&format!("({}={})", TCP_PORT_TAG, tcp_port))
            .unwrap_or_default();
        attributes = attributes.merge(&port_tag);
        Self {
            address: address.to_string(),
            scopes,
            attributes,
            language: language.to_string(),
            boot_time,
        }
    }

    /// The DA's advertised URL: `service:directory-agent://<address>`.
    pub fn url(&self) -> String {
        format!("{}://{}", DIRECTORY_AGENT_SERVICE_TYPE, self.address)
    }

    pub fn service_type() -> ServiceType {
        ServiceType::new(DIRECTORY_AGENT_SERVICE_TYPE)
    }

    /// Build a DAAdvert for this binding. `boot_time` is passed in so a
    /// shutdown advert can announce 0; solicited adverts echo the
    /// requester's XID and language.
    pub fn advert(&self, xid: u16, language: &str, boot_time: u32, multicast: bool) -> DaAdvert {
        DaAdvert {
            xid,
            language: language.to_string(),
            multicast,
            error_code: ErrorCode::Success,
            boot_time,
            url: self.url(),
            scopes: self.scopes.clone(),
            attributes: self.attributes.clone(),
            spi: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> DirectoryAgentInfo {
        DirectoryAgentInfo::new(
            "10.0.0.1",
            Scopes::default_scope(),
            &Attributes::none(),
            "en",
            1_700_000_000,
            427,
        )
    }

    #[test]
    fn test_url() {
        assert_eq!(info().url(), "service:directory-agent://10.0.0.1");
    }

    #[test]
    fn test_tcp_port_attribute_injected() {
        let da = info();
        assert!(da.attributes.contains_tag(TCP_PORT_TAG));
    }

    #[test]
    fn test_advert_echoes_request_context() {
        let advert = info().advert(7, "de", 1_700_000_000, false);
        assert_eq!(advert.xid, 7);
        assert_eq!(advert.language, "de");
        assert_eq!(advert.url, "service:directory-agent://10.0.0.1");
        assert!(!advert.multicast);
    }

    #[test]
    fn test_shutdown_advert_boot_time_zero() {
        let advert = info().advert(1, "en", 0, true);
        assert_eq!(advert.boot_time, 0);
        assert!(advert.multicast);
    }
}
