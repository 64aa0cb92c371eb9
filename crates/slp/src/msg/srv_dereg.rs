// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service Deregistration (RFC 2608 Sec.10.6).

use super::wire::{put_string, Reader};
use super::{CodecError, UrlEntry};
use crate::attributes::Attributes;
use crate::scopes::Scopes;
use crate::service_info::ServiceInfo;
use crate::service_url::ServiceUrl;

/// A deregistration from a Service Agent. A non-empty tag list removes
/// only those attributes; an empty tag list removes the whole entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SrvDeReg {
    pub xid: u16,
    pub language: String,
    pub multicast: bool,
    pub scopes: Scopes,
    pub url_entry: UrlEntry,
    pub tags: Vec<String>,
}

impl SrvDeReg {
    /// True when this is a partial deregistration of attributes only.
    pub fn is_update(&self) -> bool {
        !self.tags.is_empty()
    }

    pub(crate) fn encode_payload(&self, buf: &mut Vec<u8>) {
        put_string(buf, &self.scopes.as_comma_list());
        self.url_entry.encode(buf);
        put_string(buf, &self.tags.join(","));
    }

    pub(crate) fn decode_payload(
        r: &mut Reader<'_>,
        xid: u16,
        language: String,
        multicast: bool,
    ) -> Result<Self, CodecError> {
        let scopes = r.string()?;
        let url_entry = UrlEntry::decode(r)?;
        let tags = r.string()?;
        Ok(Self {
            xid,
            language,
            multicast,
            scopes: Scopes::from_comma_list(&scopes),
            url_entry,
            tags: tags
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }
}

impl From<&SrvDeReg> for ServiceInfo {
    /// The tag list becomes keyword attributes so that unmerging removes
    /// the named tags wholesale.
    fn from(dereg: &SrvDeReg) -> Self {
        let mut attributes = Attributes::none();
        for tag in &dereg.tags {
            attributes.add_keyword(tag);
        }
        ServiceInfo::new(
            ServiceUrl::new(dereg.url_entry.url.clone(), dereg.url_entry.lifetime),
            &dereg.language,
            dereg.scopes.clone(),
            attributes,
        )
    }
}
