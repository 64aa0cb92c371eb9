// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service Reply (RFC 2608 Sec.8.2).

use super::wire::{put_u16, Reader};
use super::{CodecError, UrlEntry};
use crate::error::ErrorCode;

/// The answer to a unicast SrvRqst: matching URL entries, or an error
/// code with an empty list.
#[derive(Debug, Clone, PartialEq)]
pub struct SrvRply {
    pub xid: u16,
    pub language: String,
    pub error_code: ErrorCode,
    pub url_entries: Vec<UrlEntry>,
}

impl SrvRply {
    pub fn new(xid: u16, language: &str, error_code: ErrorCode, url_entries: Vec<UrlEntry>) -> Self {
        Self {
            xid,
            language: language.to_string(),
            error_code,
            url_entries,
        }
    }

    pub(crate) fn encode_payload(&self, buf: &mut Vec<u8>) {
        put_u16(buf, self.error_code.as_u16());
        put_u16(buf, self.url_entries.len() as u16);
        for entry in &self.url_entries {
            entry.encode(buf);
        }
    }

    pub(crate) fn decode_payload(
        r: &mut Reader<'_>,
        xid: u16,
        language: String,
    ) -> Result<Self, CodecError> {
        let error_code = ErrorCode::from_u16(r.u16()?);
        let count = r.u16()? as usize;
        let mut url_entries = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            url_entries.push(UrlEntry::decode(r)?);
        }
        Ok(Self {
            xid,
            language,
            error_code,
            url_entries,
        })
    }
}
