// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service Acknowledgement (RFC 2608 Sec.8.4).

use super::wire::{put_u16, Reader};
use super::CodecError;
use crate::error::ErrorCode;

/// The answer to SrvReg and SrvDeReg: just an error code.
#[derive(Debug, Clone, PartialEq)]
pub struct SrvAck {
    pub xid: u16,
    pub language: String,
    pub error_code: ErrorCode,
}

impl SrvAck {
    pub fn new(xid: u16, language: &str, error_code: ErrorCode) -> Self {
        Self {
            xid,
            language: language.to_string(),
            error_code,
        }
    }

    pub(crate) fn encode_payload(&self, buf: &mut Vec<u8>) {
        put_u16(buf, self.error_code.as_u16());
    }

    pub(crate) fn decode_payload(
        r: &mut Reader<'_>,
        xid: u16,
        language: String,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            xid,
            language,
            error_code: ErrorCode::from_u16(r.u16()?),
        })
    }
}
