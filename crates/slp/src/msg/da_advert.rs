// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Directory Agent Advertisement (RFC 2608 Sec.8.5).

use super::wire::{put_string, put_u16, put_u32, Reader};
use super::CodecError;
use crate::attributes::Attributes;
use crate::error::ErrorCode;
use crate::scopes::Scopes;

/// A DA's self-description, multicast unsolicited or unicast in answer
/// to a multicast SrvRqst for `service:directory-agent`.
#[derive(Debug, Clone, PartialEq)]
pub struct DaAdvert {
    pub xid: u16,
    pub language: String,
    pub multicast: bool,
    pub error_code: ErrorCode,
    /// Seconds since the epoch at which the DA booted; 0 announces that
    /// the DA is going down.
    pub boot_time: u32,
    /// `service:directory-agent://<host-address>`.
    pub url: String,
    pub scopes: Scopes,
    pub attributes: Attributes,
    pub spi: String,
}

impl DaAdvert {
    pub(crate) fn encode_payload(&self, buf: &mut Vec<u8>) {
        put_u16(buf, self.error_code.as_u16());
        put_u32(buf, self.boot_time);
        put_string(buf, &self.url);
        put_string(buf, &self.scopes.as_comma_list());
        put_string(buf, &self.attributes.to_string());
        put_string(buf, &self.spi);
        buf.push(0); // auth block count
    }

    pub(crate) fn decode_payload(
        r: &mut Reader<'_>,
        xid: u16,
        language: String,
        multicast: bool,
    ) -> Result<Self, CodecError> {
        let error_code = ErrorCode::from_u16(r.u16()?);
        let boot_time = r.u32()?;
        let url = r.string()?;
        let scopes = r.string()?;
        let attributes = r.string()?;
        let spi = r.string()?;
        let auths = r.u8()?;
        if auths != 0 {
            return Err(CodecError::AuthBlocksUnsupported);
        }
        Ok(Self {
            xid,
            language,
            multicast,
            error_code,
            boot_time,
            url,
            scopes: Scopes::from_comma_list(&scopes),
            attributes: Attributes::parse(&attributes)?,
            spi,
        })
    }
}
