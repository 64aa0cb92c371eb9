// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! UDP transport: multicast group membership, datagram send, and the
//! reader threads that feed the message listener.

use super::{MessageEvent, MessageListener, ReplyWriter, SLP_PORT};
use crate::msg::Message;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// SLP administrative-scope multicast group (RFC 2608 Sec.3).
pub const SLP_MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 253);

/// Largest datagram the reader accepts.
const MAX_DATAGRAM: usize = 8192;

/// Poll interval for the shutdown flag in reader threads.
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// A bound UDP socket joined to the SLP multicast group, usable both for
/// receiving requests and for sending adverts and unicast replies.
/// Clones share the underlying socket.
#[derive(Clone)]
pub struct UdpConnector {
    socket: Arc<UdpSocket>,
    /// Address reported as the local endpoint of inbound messages: the
    /// advertised interface plus the actually bound port.
    local_addr: SocketAddr,
    /// Where multicast adverts go.
    multicast_addr: SocketAddr,
}

impl UdpConnector {
    /// Bind to `(bind_ip, port)` and join the SLP multicast group.
    ///
    /// `advertised_ip` is the interface literal this connector answers
    /// for; it differs from `bind_ip` when binding a wildcard address.
    /// Port 0 picks an ephemeral port (used by tests); multicast sends
    /// still target the well-known SLP port in that case.
    pub fn bind(bind_ip: IpAddr, port: u16, advertised_ip: IpAddr) -> io::Result<Self> {
        let domain = if bind_ip.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };
        let socket2 = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket2.set_reuse_address(true)?;
        socket2.bind(&SocketAddr::new(bind_ip, port).into())?;
        let socket: UdpSocket = socket2.into();

        if bind_ip.is_ipv4() {
            join_multicast_group(&socket);
            let _ = socket.set_multicast_loop_v4(true);
            // RFC 2608 Sec.6: default multicast TTL is 255.
            let _ = socket.set_multicast_ttl_v4(255);
        }

        let bound = socket.local_addr()?;
        let multicast_port = if port == 0 { SLP_PORT } else { port };
        Ok(Self {
            socket: Arc::new(socket),
            local_addr: SocketAddr::new(advertised_ip, bound.port()),
            multicast_addr: SocketAddr::new(IpAddr::V4(SLP_MULTICAST_GROUP), multicast_port),
        })
    }

    /// The advertised local endpoint (interface literal + bound port).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The actually bound socket address (differs from `local_addr` in
    /// the wildcard and ephemeral-port cases).
    pub fn bound_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Multicast a message to the SLP group.
    pub fn send_multicast(&self, message: &Message) -> io::Result<()> {
        let bytes = message.encode();
        self.socket.send_to(&bytes, self.multicast_addr)?;
        log::debug!(
            "[udp] sent multicast {:?} ({} bytes) to {}",
            message.function_id(),
            bytes.len(),
            self.multicast_addr
        );
        Ok(())
    }

    /// Send a message to a specific peer.
    pub fn send_to(&self, message: &Message, peer: SocketAddr) -> io::Result<()> {
        let bytes = message.encode();
        self.socket.send_to(&bytes, peer)?;
        log::debug!(
            "[udp] sent unicast {:?} ({} bytes) to {}",
            message.function_id(),
            bytes.len(),
            peer
        );
        Ok(())
    }
}

/// Join the SLP multicast group on every non-loopback IPv4 interface,
/// falling back to the unspecified interface. Join failures are
/// non-fatal: the connector still serves unicast traffic.
fn join_multicast_group(socket: &UdpSocket) {
    let interfaces = interface_addrs();
    if interfaces.is_empty() {
        match socket.join_multicast_v4(&SLP_MULTICAST_GROUP, &Ipv4Addr::UNSPECIFIED) {
            Ok(()) => log::debug!("[udp] joined {} on UNSPECIFIED", SLP_MULTICAST_GROUP),
            Err(err) => log::debug!(
                "[udp] join {} on UNSPECIFIED failed (non-fatal): {}",
                SLP_MULTICAST_GROUP,
                err
            ),
        }
        return;
    }
    for iface in &interfaces {
        match socket.join_multicast_v4(&SLP_MULTICAST_GROUP, iface) {
            Ok(()) => log::debug!("[udp] joined {} on interface {}", SLP_MULTICAST_GROUP, iface),
            Err(err) => log::debug!(
                "[udp] join {} on {} failed (non-fatal): {}",
                SLP_MULTICAST_GROUP,
                iface,
                err
            ),
        }
    }
}

/// Non-loopback IPv4 interface addresses of this host.
pub fn interface_addrs() -> Vec<Ipv4Addr> {
    let interfaces = match local_ip_address::list_afinet_netifas() {
        Ok(ifs) => ifs,
        Err(err) => {
            log::debug!("[udp] failed to list network interfaces: {}", err);
            return Vec::new();
        }
    };
    let mut addrs = Vec::new();
    for (_name, ip) in interfaces {
        if let IpAddr::V4(ipv4) = ip {
            if !ipv4.is_loopback() {
                addrs.push(ipv4);
            }
        }
    }
    addrs
}

struct UdpReplyWriter<'a> {
    socket: &'a UdpSocket,
    peer: SocketAddr,
}

impl ReplyWriter for UdpReplyWriter<'_> {
    fn write_message(&mut self, message: &Message) -> io::Result<()> {
        self.socket.send_to(&message.encode(), self.peer)?;
        Ok(())
    }
}

/// Reader threads over one or more connectors, feeding the listener.
pub struct UdpConnectorServer {
    connectors: Vec<UdpConnector>,
    listener: Arc<dyn MessageListener>,
    shutdown: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl UdpConnectorServer {
    pub fn new(connectors: Vec<UdpConnector>, listener: Arc<dyn MessageListener>) -> Self {
        Self {
            connectors,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
            handles: Vec::new(),
        }
    }

    pub fn connectors(&self) -> &[UdpConnector] {
        &self.connectors
    }

    /// Spawn one reader thread per connector. Idempotent.
    pub fn start(&mut self) -> io::Result<()> {
        if !self.handles.is_empty() {
            return Ok(());
        }
        for connector in &self.connectors {
            connector.socket.set_read_timeout(Some(READ_TIMEOUT))?;
            let socket = Arc::clone(&connector.socket);
            let local_addr = connector.local_addr;
            let listener = Arc::clone(&self.listener);
            let shutdown = Arc::clone(&self.shutdown);
            self.handles.push(std::thread::spawn(move || {
                reader_loop(&socket, local_addr, &*listener, &shutdown);
            }));
        }
        log::debug!("[udp] server started with {} connector(s)", self.connectors.len());
        Ok(())
    }

    /// Stop the reader threads and wait for them. Idempotent.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        log::debug!("[udp] server stopped");
    }
}

impl Drop for UdpConnectorServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn reader_loop(
    socket: &UdpSocket,
    local_addr: SocketAddr,
    listener: &dyn MessageListener,
    shutdown: &AtomicBool,
) {
    let mut buf = [0u8; MAX_DATAGRAM];
    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        let (len, peer) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(err)
                if err.kind() == io::ErrorKind::WouldBlock
                    || err.kind() == io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(err) => {
                if !shutdown.load(Ordering::Relaxed) {
                    log::debug!("[udp] recv error on {}: {}", local_addr, err);
                }
                continue;
            }
        };
        // Messages arriving during teardown are dropped.
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        match Message::decode(&buf[..len]) {
            Ok(message) => {
                let mut writer = UdpReplyWriter { socket, peer };
                listener.handle(MessageEvent {
                    message,
                    local_addr,
                    peer_addr: peer,
                    writer: &mut writer,
                });
            }
            Err(err) => {
                log::debug!("[udp] dropping undecodable datagram from {}: {}", peer, err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::msg::SrvAck;
    use parking_lot::Mutex;
    use std::time::Instant;

    /// Records inbound messages and acks every one of them.
    #[derive(Default)]
    struct AckingListener {
        seen: Mutex<Vec<Message>>,
    }

    impl MessageListener for AckingListener {
        fn handle(&self, event: MessageEvent<'_>) {
            let ack = Message::SrvAck(SrvAck::new(
                event.message.xid(),
                event.message.language(),
                ErrorCode::Success,
            ));
            let _ = event.writer.write_message(&ack);
            self.seen.lock().push(event.message);
        }
    }

    fn loopback() -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }

    #[test]
    fn test_unicast_receive_and_reply() {
        let connector = UdpConnector::bind(loopback(), 0, loopback()).unwrap();
        let target = connector.bound_addr().unwrap();
        let listener = Arc::new(AckingListener::default());
        let mut server = UdpConnectorServer::new(vec![connector], listener.clone());
        server.start().unwrap();

        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let request = Message::SrvAck(SrvAck::new(77, "en", ErrorCode::Success));
        client.send_to(&request.encode(), target).unwrap();

        let mut buf = [0u8; MAX_DATAGRAM];
        let (len, _) = client.recv_from(&mut buf).unwrap();
        let reply = Message::decode(&buf[..len]).unwrap();
        assert_eq!(reply.xid(), 77);

        let deadline = Instant::now() + Duration::from_secs(2);
        while listener.seen.lock().is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(listener.seen.lock().len(), 1);

        server.stop();
    }

    #[test]
    fn test_undecodable_datagram_is_dropped() {
        let connector = UdpConnector::bind(loopback(), 0, loopback()).unwrap();
        let target = connector.bound_addr().unwrap();
        let listener = Arc::new(AckingListener::default());
        let mut server = UdpConnectorServer::new(vec![connector], listener.clone());
        server.start().unwrap();

        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client.send_to(b"not an slp message", target).unwrap();
        client
            .send_to(
                &Message::SrvAck(SrvAck::new(5, "en", ErrorCode::Success)).encode(),
                target,
            )
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while listener.seen.lock().is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        // Only the valid message was delivered.
        assert_eq!(listener.seen.lock().len(), 1);
        assert_eq!(listener.seen.lock()[0].xid(), 5);

        server.stop();
    }

    #[test]
    fn test_stop_is_idempotent() {
        let connector = UdpConnector::bind(loopback(), 0, loopback()).unwrap();
        let listener = Arc::new(AckingListener::default());
        let mut server = UdpConnectorServer::new(vec![connector], listener);
        server.start().unwrap();
        server.stop();
        server.stop();
    }
}
