// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TCP transport: accept loop, length-framed message reads, and reply
//! writes on the same connection.
//!
//! Requesters prefer TCP towards a Directory Agent, so unlike UAs and
//! SAs the DA always listens on the SLP TCP port.

use super::{MessageEvent, MessageListener, ReplyWriter};
use crate::msg::Message;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Largest framed message accepted off a connection.
const MAX_TCP_MESSAGE: usize = 1 << 20;

/// Poll interval for the shutdown flag in the accept loop and in idle
/// connections.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Accepts connections on the SLP TCP port and feeds framed messages to
/// the listener; replies are written back on the same stream.
pub struct TcpConnectorServer {
    socket: Option<TcpListener>,
    local_addr: SocketAddr,
    listener: Arc<dyn MessageListener>,
    shutdown: Arc<AtomicBool>,
    accept_handle: Option<JoinHandle<()>>,
    connections: Arc<parking_lot::Mutex<Vec<JoinHandle<()>>>>,
}

impl TcpConnectorServer {
    pub fn bind(addr: SocketAddr, listener: Arc<dyn MessageListener>) -> io::Result<Self> {
        let socket = TcpListener::bind(addr)?;
        socket.set_nonblocking(true)?;
        let local_addr = socket.local_addr()?;
        Ok(Self {
            socket: Some(socket),
            local_addr,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
            accept_handle: None,
            connections: Arc::new(parking_lot::Mutex::new(Vec::new())),
        })
    }

    /// The actually bound address (resolves port 0 to the real port).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Spawn the accept thread. Idempotent.
    pub fn start(&mut self) {
        let Some(socket) = self.socket.take() else {
            return;
        };
        let listener = Arc::clone(&self.listener);
        let shutdown = Arc::clone(&self.shutdown);
        let connections = Arc::clone(&self.connections);
        self.accept_handle = Some(std::thread::spawn(move || {
            accept_loop(&socket, &listener, &shutdown, &connections);
        }));
        log::debug!("[tcp] server listening on {}", self.local_addr);
    }

    /// Stop accepting, then wait for the accept thread and all
    /// connection threads. Idempotent.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.accept_handle.take() {
            let _ = handle.join();
        }
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.connections.lock());
        for handle in handles {
            let _ = handle.join();
        }
        log::debug!("[tcp] server stopped");
    }
}

impl Drop for TcpConnectorServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(
    socket: &TcpListener,
    listener: &Arc<dyn MessageListener>,
    shutdown: &Arc<AtomicBool>,
    connections: &Arc<parking_lot::Mutex<Vec<JoinHandle<()>>>>,
) {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        match socket.accept() {
            Ok((stream, peer)) => {
                log::debug!("[tcp] connection from {}", peer);
                let listener = Arc::clone(listener);
                let shutdown = Arc::clone(shutdown);
                let handle = std::thread::spawn(move || {
                    connection_loop(stream, peer, &*listener, &shutdown);
                });
                connections.lock().push(handle);
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(err) => {
                log::warn!("[tcp] accept error: {}", err);
                std::thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

struct TcpReplyWriter<'a> {
    stream: &'a mut TcpStream,
}

impl ReplyWriter for TcpReplyWriter<'_> {
    fn write_message(&mut self, message: &Message) -> io::Result<()> {
        self.stream.write_all(&message.encode())
    }
}

fn connection_loop(
    mut stream: TcpStream,
    peer: SocketAddr,
    listener: &dyn MessageListener,
    shutdown: &AtomicBool,
) {
    let Ok(local_addr) = stream.local_addr() else {
        return;
    };
    let _ = stream.set_nodelay(true);
    if stream.set_read_timeout(Some(POLL_INTERVAL)).is_err() {
        return;
    }

    loop {
        match read_framed(&mut stream, shutdown) {
            Ok(Some(bytes)) => {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                match Message::decode(&bytes) {
                    Ok(message) => {
                        let mut writer = TcpReplyWriter {
                            stream: &mut stream,
                        };
                        listener.handle(MessageEvent {
                            message,
                            local_addr,
                            peer_addr: peer,
                            writer: &mut writer,
                        });
                    }
                    Err(err) => {
                        log::debug!("[tcp] dropping undecodable message from {}: {}", peer, err);
                        break;
                    }
                }
            }
            Ok(None) => break,
            Err(err) => {
                log::debug!("[tcp] connection to {} closed: {}", peer, err);
                break;
            }
        }
    }
    log::debug!("[tcp] connection from {} done", peer);
}

/// Read one length-framed SLP message. Returns `Ok(None)` on a clean
/// close or shutdown. Idle timeouts while waiting for the first byte
/// keep the connection open; a timeout mid-message is an error.
fn read_framed(stream: &mut TcpStream, shutdown: &AtomicBool) -> io::Result<Option<Vec<u8>>> {
    let mut first = [0u8; 1];
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return Ok(None);
        }
        match stream.read(&mut first) {
            Ok(0) => return Ok(None),
            Ok(_) => break,
            Err(err)
                if err.kind() == io::ErrorKind::WouldBlock
                    || err.kind() == io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    // version byte read; the next 4 bytes complete the fixed prefix
    // (function id + u24 length).
    let mut prefix = [0u8; 4];
    stream.read_exact(&mut prefix)?;
    let length = u32::from_be_bytes([0, prefix[1], prefix[2], prefix[3]]) as usize;
    if length < 5 || length > MAX_TCP_MESSAGE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unreasonable message length {}", length),
        ));
    }

    let mut buf = vec![0u8; length];
    buf[0] = first[0];
    buf[1..5].copy_from_slice(&prefix);
    stream.read_exact(&mut buf[5..])?;
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::msg::{SrvAck, SrvRqst};
    use crate::scopes::Scopes;

    /// Acks every inbound message with its XID.
    struct AckingListener;

    impl MessageListener for AckingListener {
        fn handle(&self, event: MessageEvent<'_>) {
            let ack = Message::SrvAck(SrvAck::new(
                event.message.xid(),
                event.message.language(),
                ErrorCode::Success,
            ));
            let _ = event.writer.write_message(&ack);
        }
    }

    fn read_reply(stream: &mut TcpStream) -> Message {
        let mut header = [0u8; 5];
        stream.read_exact(&mut header).unwrap();
        let length = u32::from_be_bytes([0, header[2], header[3], header[4]]) as usize;
        let mut buf = vec![0u8; length];
        buf[..5].copy_from_slice(&header);
        stream.read_exact(&mut buf[5..]).unwrap();
        Message::decode(&buf).unwrap()
    }

    #[test]
    fn test_request_reply_over_tcp() {
        let mut server = TcpConnectorServer::bind(
            "127.0.0.1:0".parse().unwrap(),
            Arc::new(AckingListener),
        )
        .unwrap();
        let addr = server.local_addr();
        server.start();

        let mut client = TcpStream::connect(addr).unwrap();
        client
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let request = Message::SrvRqst(SrvRqst {
            xid: 42,
            language: "en".into(),
            multicast: false,
            previous_responders: Vec::new(),
            service_type: None,
            scopes: Scopes::default_scope(),
            predicate: String::new(),
            spi: String::new(),
        });
        client.write_all(&request.encode()).unwrap();

        let reply = read_reply(&mut client);
        assert_eq!(reply.xid(), 42);
        assert!(matches!(reply, Message::SrvAck(_)));

        // A second request on the same connection also works.
        let request = Message::SrvRqst(SrvRqst {
            xid: 43,
            language: "en".into(),
            multicast: false,
            previous_responders: Vec::new(),
            service_type: None,
            scopes: Scopes::default_scope(),
            predicate: String::new(),
            spi: String::new(),
        });
        client.write_all(&request.encode()).unwrap();
        assert_eq!(read_reply(&mut client).xid(), 43);

        drop(client);
        server.stop();
    }

    #[test]
    fn test_stop_unblocks_idle_connection() {
        let mut server = TcpConnectorServer::bind(
            "127.0.0.1:0".parse().unwrap(),
            Arc::new(AckingListener),
        )
        .unwrap();
        let addr = server.local_addr();
        server.start();

        // Open a connection and leave it idle; stop() must still return.
        let _client = TcpStream::connect(addr).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        server.stop();
    }
}
