// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SLPv2 message types and their binary wire codecs (RFC 2608 Sec.8).
//!
//! Only the six message types a Directory Agent touches are implemented:
//! SrvRqst, SrvRply, SrvReg, SrvDeReg, SrvAck and DAAdvert.
//!
//! Wire header:
//! ```text
//! +--------+--------+-----------------+-----------------+
//! | ver=2  | func   | length (u24)                      |
//! +--------+--------+-----------------+-----------------+
//! | flags (u16)     | next ext offset (u24)    | XID .. |
//! +-----------------+--------------------------+--------+
//! | .. XID | lang tag length (u16) | lang tag           |
//! +--------+-----------------------+--------------------+
//! ```
//!
//! Authentication blocks are out of scope; messages carrying them are
//! rejected at decode.

mod da_advert;
mod srv_ack;
mod srv_dereg;
mod srv_reg;
mod srv_rply;
mod srv_rqst;
pub(crate) mod wire;

pub use da_advert::DaAdvert;
pub use srv_ack::SrvAck;
pub use srv_dereg::SrvDeReg;
pub use srv_reg::SrvReg;
pub use srv_rply::SrvRply;
pub use srv_rqst::SrvRqst;

use crate::attributes::AttributesError;
use wire::{put_string, put_u16, put_u24, Reader};

/// SLP protocol version emitted and accepted.
pub const PROTOCOL_VERSION: u8 = 2;

/// Header flag: the reply overflowed the datagram size.
pub const FLAG_OVERFLOW: u16 = 0x8000;
/// Header flag: SrvReg carries a fresh (replacing) registration.
pub const FLAG_FRESH: u16 = 0x4000;
/// Header flag: the request was multicast.
pub const FLAG_MCAST: u16 = 0x2000;

/// SLPv2 function identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionId {
    SrvRqst = 1,
    SrvRply = 2,
    SrvReg = 3,
    SrvDeReg = 4,
    SrvAck = 5,
    DaAdvert = 8,
}

impl FunctionId {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(FunctionId::SrvRqst),
            2 => Some(FunctionId::SrvRply),
            3 => Some(FunctionId::SrvReg),
            4 => Some(FunctionId::SrvDeReg),
            5 => Some(FunctionId::SrvAck),
            8 => Some(FunctionId::DaAdvert),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// A decoded SLP message, tagged by type.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    SrvRqst(SrvRqst),
    SrvRply(SrvRply),
    SrvReg(SrvReg),
    SrvDeReg(SrvDeReg),
    SrvAck(SrvAck),
    DaAdvert(DaAdvert),
}

impl Message {
    pub fn function_id(&self) -> FunctionId {
        match self {
            Message::SrvRqst(_) => FunctionId::SrvRqst,
            Message::SrvRply(_) => FunctionId::SrvRply,
            Message::SrvReg(_) => FunctionId::SrvReg,
            Message::SrvDeReg(_) => FunctionId::SrvDeReg,
            Message::SrvAck(_) => FunctionId::SrvAck,
            Message::DaAdvert(_) => FunctionId::DaAdvert,
        }
    }

    /// The transaction id echoed in replies.
    pub fn xid(&self) -> u16 {
        match self {
            Message::SrvRqst(m) => m.xid,
            Message::SrvRply(m) => m.xid,
            Message::SrvReg(m) => m.xid,
            Message::SrvDeReg(m) => m.xid,
            Message::SrvAck(m) => m.xid,
            Message::DaAdvert(m) => m.xid,
        }
    }

    pub fn language(&self) -> &str {
        match self {
            Message::SrvRqst(m) => &m.language,
            Message::SrvRply(m) => &m.language,
            Message::SrvReg(m) => &m.language,
            Message::SrvDeReg(m) => &m.language,
            Message::SrvAck(m) => &m.language,
            Message::DaAdvert(m) => &m.language,
        }
    }

    /// Whether the REQUEST-MCAST header flag was set. Replies are never
    /// multicast.
    pub fn is_multicast(&self) -> bool {
        match self {
            Message::SrvRqst(m) => m.multicast,
            Message::SrvReg(m) => m.multicast,
            Message::SrvDeReg(m) => m.multicast,
            Message::DaAdvert(m) => m.multicast,
            Message::SrvRply(_) | Message::SrvAck(_) => false,
        }
    }

    /// Serialize to the wire form, header included.
    pub fn encode(&self) -> Vec<u8> {
        let (flags, xid, language) = match self {
            Message::SrvRqst(m) => (mcast_flag(m.multicast), m.xid, m.language.as_str()),
            Message::SrvRply(m) => (0, m.xid, m.language.as_str()),
            Message::SrvReg(m) => (
                mcast_flag(m.multicast) | if m.fresh { FLAG_FRESH } else { 0 },
                m.xid,
                m.language.as_str(),
            ),
            Message::SrvDeReg(m) => (mcast_flag(m.multicast), m.xid, m.language.as_str()),
            Message::SrvAck(m) => (0, m.xid, m.language.as_str()),
            Message::DaAdvert(m) => (mcast_flag(m.multicast), m.xid, m.language.as_str()),
        };

        let mut buf = Vec::with_capacity(64);
        buf.push(PROTOCOL_VERSION);
        buf.push(self.function_id().as_u8());
        put_u24(&mut buf, 0); // length, patched below
        put_u16(&mut buf, flags);
        put_u24(&mut buf, 0); // next extension offset
        put_u16(&mut buf, xid);
        put_string(&mut buf, language);

        match self {
            Message::SrvRqst(m) => m.encode_payload(&mut buf),
            Message::SrvRply(m) => m.encode_payload(&mut buf),
            Message::SrvReg(m) => m.encode_payload(&mut buf),
            Message::SrvDeReg(m) => m.encode_payload(&mut buf),
            Message::SrvAck(m) => m.encode_payload(&mut buf),
            Message::DaAdvert(m) => m.encode_payload(&mut buf),
        }

        let length = buf.len() as u32;
        buf[2..5].copy_from_slice(&length.to_be_bytes()[1..]);
        buf
    }

    /// Decode one complete message. The buffer must hold exactly the
    /// bytes of the message; the declared header length is checked.
    pub fn decode(buf: &[u8]) -> Result<Message, CodecError> {
        let mut r = Reader::new(buf);
        let version = r.u8()?;
        if version != PROTOCOL_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        let function = r.u8()?;
        let declared = r.u24()? as usize;
        if declared != buf.len() {
            return Err(CodecError::LengthMismatch {
                declared,
                actual: buf.len(),
            });
        }
        let flags = r.u16()?;
        let _ext_offset = r.u24()?;
        let xid = r.u16()?;
        let language = r.string()?;
        let multicast = flags & FLAG_MCAST != 0;

        let function =
            FunctionId::from_u8(function).ok_or(CodecError::UnknownFunction(function))?;
        let message = match function {
            FunctionId::SrvRqst => {
                Message::SrvRqst(SrvRqst::decode_payload(&mut r, xid, language, multicast)?)
            }
            FunctionId::SrvRply => {
                Message::SrvRply(SrvRply::decode_payload(&mut r, xid, language)?)
            }
            FunctionId::SrvReg => Message::SrvReg(SrvReg::decode_payload(
                &mut r,
                xid,
                language,
                multicast,
                flags & FLAG_FRESH != 0,
            )?),
            FunctionId::SrvDeReg => {
                Message::SrvDeReg(SrvDeReg::decode_payload(&mut r, xid, language, multicast)?)
            }
            FunctionId::SrvAck => Message::SrvAck(SrvAck::decode_payload(&mut r, xid, language)?),
            FunctionId::DaAdvert => {
                Message::DaAdvert(DaAdvert::decode_payload(&mut r, xid, language, multicast)?)
            }
        };
        if r.remaining() != 0 {
            return Err(CodecError::TrailingBytes(r.remaining()));
        }
        Ok(message)
    }
}

fn mcast_flag(multicast: bool) -> u16 {
    if multicast {
        FLAG_MCAST
    } else {
        0
    }
}

/// A URL entry as carried by SrvRply, SrvReg and SrvDeReg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlEntry {
    /// Remaining registration lifetime in seconds.
    pub lifetime: u16,
    pub url: String,
}

impl UrlEntry {
    pub fn new(url: impl Into<String>, lifetime: u16) -> Self {
        Self {
            lifetime,
            url: url.into(),
        }
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(0); // reserved
        put_u16(buf, self.lifetime);
        put_string(buf, &self.url);
        buf.push(0); // url auth block count
    }

    pub(crate) fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let _reserved = r.u8()?;
        let lifetime = r.u16()?;
        let url = r.string()?;
        let auths = r.u8()?;
        if auths != 0 {
            return Err(CodecError::AuthBlocksUnsupported);
        }
        Ok(Self { lifetime, url })
    }
}

/// Failures while encoding or decoding SLP wire messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Buffer ended before the message did.
    Truncated,
    /// Message version other than 2.
    UnsupportedVersion(u8),
    /// Function id this implementation does not know.
    UnknownFunction(u8),
    /// Header length does not match the received buffer.
    LengthMismatch { declared: usize, actual: usize },
    /// Bytes left over after the payload.
    TrailingBytes(usize),
    /// A string field is not valid UTF-8.
    BadUtf8,
    /// The message carries authentication blocks, which are out of scope.
    AuthBlocksUnsupported,
    /// The attribute list string does not parse.
    BadAttributes(AttributesError),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Truncated => write!(f, "truncated message"),
            CodecError::UnsupportedVersion(v) => write!(f, "unsupported SLP version {}", v),
            CodecError::UnknownFunction(id) => write!(f, "unknown function id {}", id),
            CodecError::LengthMismatch { declared, actual } => {
                write!(f, "declared length {} but got {} bytes", declared, actual)
            }
            CodecError::TrailingBytes(n) => write!(f, "{} trailing bytes after payload", n),
            CodecError::BadUtf8 => write!(f, "string field is not valid UTF-8"),
            CodecError::AuthBlocksUnsupported => {
                write!(f, "authentication blocks are not supported")
            }
            CodecError::BadAttributes(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<AttributesError> for CodecError {
    fn from(err: AttributesError) -> Self {
        CodecError::BadAttributes(err)
    }
}
