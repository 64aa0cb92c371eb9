// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service Request (RFC 2608 Sec.8.1).

use super::wire::{put_string, Reader};
use super::CodecError;
use crate::scopes::Scopes;
use crate::service_type::ServiceType;

/// A service discovery request from a UA or SA.
#[derive(Debug, Clone, PartialEq)]
pub struct SrvRqst {
    pub xid: u16,
    pub language: String,
    /// REQUEST-MCAST header flag.
    pub multicast: bool,
    /// Addresses (presentation form) that already answered this request.
    pub previous_responders: Vec<String>,
    /// Requested service type; `None` matches any type.
    pub service_type: Option<ServiceType>,
    pub scopes: Scopes,
    /// LDAPv3 predicate string; empty means no filter.
    pub predicate: String,
    /// SLP SPI for authenticated requests; must be empty here since
    /// security is out of scope.
    pub spi: String,
}

impl SrvRqst {
    /// Responder suppression check: exact string equality against the
    /// peer's presentation address, no canonicalization.
    pub fn contains_responder(&self, address: &str) -> bool {
        self.previous_responders.iter().any(|r| r == address)
    }

    pub(crate) fn encode_payload(&self, buf: &mut Vec<u8>) {
        put_string(buf, &self.previous_responders.join(","));
        let service_type = self
            .service_type
            .as_ref()
            .map(|t| t.as_str())
            .unwrap_or("");
        put_string(buf, service_type);
        put_string(buf, &self.scopes.as_comma_list());
        put_string(buf, &self.predicate);
        put_string(buf, &self.spi);
    }

    pub(crate) fn decode_payload(
        r: &mut Reader<'_>,
        xid: u16,
        language: String,
        multicast: bool,
    ) -> Result<Self, CodecError> {
        let responders = r.string()?;
        let service_type = r.string()?;
        let scopes = r.string()?;
        let predicate = r.string()?;
        let spi = r.string()?;
        Ok(Self {
            xid,
            language,
            multicast,
            previous_responders: responders
                .split(',')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            service_type: if service_type.trim().is_empty() {
                None
            } else {
                Some(ServiceType::new(&service_type))
            },
            scopes: Scopes::from_comma_list(&scopes),
            predicate,
            spi,
        })
    }
}
