// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service Registration (RFC 2608 Sec.8.3).

use super::wire::{put_string, Reader};
use super::{CodecError, UrlEntry};
use crate::attributes::Attributes;
use crate::scopes::Scopes;
use crate::service_info::ServiceInfo;
use crate::service_type::ServiceType;
use crate::service_url::ServiceUrl;

/// A registration from a Service Agent.
#[derive(Debug, Clone, PartialEq)]
pub struct SrvReg {
    pub xid: u16,
    pub language: String,
    pub multicast: bool,
    /// FRESH header flag: set means replace any existing registration;
    /// clear means merge the attributes into it.
    pub fresh: bool,
    pub url_entry: UrlEntry,
    pub service_type: ServiceType,
    pub scopes: Scopes,
    pub attributes: Attributes,
}

impl SrvReg {
    /// Whether this registration replaces (rather than updates) an
    /// existing entry.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub(crate) fn encode_payload(&self, buf: &mut Vec<u8>) {
        self.url_entry.encode(buf);
        put_string(buf, self.service_type.as_str());
        put_string(buf, &self.scopes.as_comma_list());
        put_string(buf, &self.attributes.to_string());
        buf.push(0); // attribute auth block count
    }

    pub(crate) fn decode_payload(
        r: &mut Reader<'_>,
        xid: u16,
        language: String,
        multicast: bool,
        fresh: bool,
    ) -> Result<Self, CodecError> {
        let url_entry = UrlEntry::decode(r)?;
        let service_type = r.string()?;
        let scopes = r.string()?;
        let attributes = r.string()?;
        let auths = r.u8()?;
        if auths != 0 {
            return Err(CodecError::AuthBlocksUnsupported);
        }
        Ok(Self {
            xid,
            language,
            multicast,
            fresh,
            url_entry,
            service_type: ServiceType::new(&service_type),
            scopes: Scopes::from_comma_list(&scopes),
            attributes: Attributes::parse(&attributes)?,
        })
    }
}

impl From<&SrvReg> for ServiceInfo {
    fn from(reg: &SrvReg) -> Self {
        ServiceInfo::new(
            ServiceUrl::new(reg.url_entry.url.clone(), reg.url_entry.lifetime),
            &reg.language,
            reg.scopes.clone(),
            reg.attributes.clone(),
        )
    }
}
