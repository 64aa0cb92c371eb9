// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport servers and the message-listener seam.
//!
//! Both the UDP and TCP servers deliver decoded messages to a single
//! registered [`MessageListener`]; the listener writes any reply through
//! the event's [`ReplyWriter`], which is bound to the transport the
//! request arrived on. Handlers must not retain the writer past the
//! callback.

pub mod tcp;
pub mod udp;

use crate::msg::Message;
use std::io;
use std::net::SocketAddr;

/// Well-known SLP port for UDP and TCP (RFC 2608 Sec.3).
pub const SLP_PORT: u16 = 427;

/// Serializes one message and transmits it back on the originating
/// transport.
pub trait ReplyWriter {
    fn write_message(&mut self, message: &Message) -> io::Result<()>;
}

/// One inbound message together with its transport context.
pub struct MessageEvent<'a> {
    pub message: Message,
    /// The local binding the message arrived on.
    pub local_addr: SocketAddr,
    /// The peer that sent the message.
    pub peer_addr: SocketAddr,
    /// Reply channel on the same transport; valid only for the duration
    /// of the callback.
    pub writer: &'a mut dyn ReplyWriter,
}

/// Callback invoked by the transport servers for every decoded message.
/// May be called concurrently from multiple reader threads.
pub trait MessageListener: Send + Sync {
    fn handle(&self, event: MessageEvent<'_>);
}
