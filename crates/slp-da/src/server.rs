// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Directory Agent server core.
//!
//! One message listener is registered with both the UDP and the TCP
//! server; it routes on the multicast flag and the message type:
//!
//! - multicast SrvRqst for `service:directory-agent` is answered with a
//!   unicast DAAdvert, subject to responder suppression and weak scope
//!   match; every other multicast message is dropped.
//! - unicast SrvRqst is answered with a SrvRply of matching services;
//!   SrvReg and SrvDeReg mutate the registry and are acknowledged with a
//!   SrvAck; every other unicast message is dropped.
//!
//! Dropped messages are logged at debug and produce no reply; a DA must
//! never answer off-topic traffic with transport-level errors.

use crate::config::{ConfigError, DirectoryAgentConfig};
use parking_lot::{Mutex, RwLock};
use slp::attributes::Attributes;
use slp::cache::{CacheResult, ServiceInfoCache, ServiceListener};
use slp::directory_agent::DirectoryAgentInfo;
use slp::error::{ErrorCode, SlpError};
use slp::filter::Filter;
use slp::msg::{Message, SrvAck, SrvDeReg, SrvReg, SrvRply, SrvRqst, UrlEntry};
use slp::net::tcp::TcpConnectorServer;
use slp::net::udp::{interface_addrs, UdpConnector, UdpConnectorServer};
use slp::net::{MessageEvent, MessageListener, ReplyWriter};
use slp::scheduler::Scheduler;
use slp::scopes::Scopes;
use slp::service_info::ServiceInfo;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// An SLP Directory Agent: a cache of service registrations answering
/// discovery queries, so that UAs and SAs can use unicast TCP instead of
/// multicast convergence.
///
/// Only one instance can run per host since it listens on the SLP TCP
/// port. `start` and `stop` drive the lifecycle; `stop` is idempotent.
pub struct DirectoryAgentServer {
    state: Arc<DaState>,
    scheduler: Mutex<Option<Arc<Scheduler>>>,
    runtime: Mutex<Option<Runtime>>,
}

/// Everything the handlers touch; shared with the transport threads.
struct DaState {
    config: DirectoryAgentConfig,
    scopes: Scopes,
    attributes: Attributes,
    language: String,
    cache: ServiceInfoCache,
    /// DA self-descriptions keyed by expanded address literal. Built at
    /// start, immutable afterwards.
    directory_agents: RwLock<HashMap<String, DirectoryAgentInfo>>,
    running: AtomicBool,
    xid: AtomicU16,
}

/// Live transports and tasks; present only while running.
struct Runtime {
    udp_server: UdpConnectorServer,
    tcp_servers: Vec<TcpConnectorServer>,
    scheduler: Arc<Scheduler>,
    /// (connector, advertised address) pairs for multicast adverts.
    advert_targets: Arc<Vec<(UdpConnector, String)>>,
    tcp_addrs: Vec<SocketAddr>,
}

impl DirectoryAgentServer {
    pub fn new(config: DirectoryAgentConfig) -> Result<Self, ServerError> {
        config.validate().map_err(ServerError::Config)?;
        let scopes = config.parsed_scopes();
        let attributes =
            Attributes::parse(&config.attributes).map_err(|e| {
                ServerError::Config(ConfigError::InvalidValue(format!("bad attributes: {}", e)))
            })?;
        let language = config.language.clone();
        Ok(Self {
            state: Arc::new(DaState {
                config,
                scopes,
                attributes,
                language,
                cache: ServiceInfoCache::new(),
                directory_agents: RwLock::new(HashMap::new()),
                running: AtomicBool::new(false),
                xid: AtomicU16::new(1),
            }),
            scheduler: Mutex::new(None),
            runtime: Mutex::new(None),
        })
    }

    /// Inject the periodic-task scheduler to use instead of an internal
    /// one. Must be called before `start`.
    pub fn set_scheduler(&self, scheduler: Arc<Scheduler>) {
        *self.scheduler.lock() = Some(scheduler);
    }

    /// Bind the transports, send the boot DAAdvert and start the
    /// periodic tasks.
    pub fn start(&self) -> Result<(), ServerError> {
        if self.state.running.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyRunning);
        }
        if let Err(err) = self.do_start() {
            self.state.running.store(false, Ordering::SeqCst);
            return Err(err);
        }
        Ok(())
    }

    fn do_start(&self) -> Result<(), ServerError> {
        let state = &self.state;
        let port = state.config.port;
        let boot_time = unix_seconds();

        // Expand wildcard bindings and build one DA description per
        // advertised address, keyed by the expanded literal so handlers
        // can resolve the binding from a datagram's local address.
        let bindings = resolve_bindings(&state.config.addresses);
        {
            let mut das = state.directory_agents.write();
            for binding in &bindings {
                for advertised in &binding.advertised {
                    let address = advertised.to_string();
                    das.insert(
                        address.clone(),
                        DirectoryAgentInfo::new(
                            &address,
                            state.scopes.clone(),
                            &state.attributes,
                            &state.language,
                            boot_time,
                            port,
                        ),
                    );
                }
            }
        }

        let listener: Arc<dyn MessageListener> = Arc::new(DaListener {
            state: Arc::clone(state),
        });

        let mut connectors = Vec::with_capacity(bindings.len());
        let mut advert_targets = Vec::with_capacity(bindings.len());
        for binding in &bindings {
            let primary = binding.advertised[0];
            let connector = UdpConnector::bind(binding.bind_ip, port, primary)
                .map_err(|e| ServerError::Bind(format!("udp {}:{}: {}", binding.bind_ip, port, e)))?;
            advert_targets.push((connector.clone(), primary.to_string()));
            connectors.push(connector);
        }
        let mut udp_server = UdpConnectorServer::new(connectors, Arc::clone(&listener));
        udp_server
            .start()
            .map_err(|e| ServerError::Bind(e.to_string()))?;

        let mut tcp_servers = Vec::with_capacity(bindings.len());
        let mut tcp_addrs = Vec::with_capacity(bindings.len());
        for binding in &bindings {
            let addr = SocketAddr::new(binding.bind_ip, port);
            let mut tcp = TcpConnectorServer::bind(addr, Arc::clone(&listener))
                .map_err(|e| ServerError::Bind(format!("tcp {}: {}", addr, e)))?;
            tcp.start();
            tcp_addrs.push(tcp.local_addr());
            tcp_servers.push(tcp);
        }

        let scheduler = self
            .scheduler
            .lock()
            .take()
            .unwrap_or_else(|| Arc::new(Scheduler::new()));
        let advert_targets = Arc::new(advert_targets);

        // Purge expired services periodically (0 disables).
        if let Some(period) = state.config.purge_period() {
            let purge_state = Arc::clone(state);
            scheduler.schedule_with_fixed_delay("purger", period, period, move || {
                let purged = purge_state.cache.purge();
                if !purged.is_empty() {
                    log::debug!("[da] purged {} expired service(s)", purged.len());
                }
            });
        }

        // DAs advertise on boot (RFC 2608 Sec.12.1)...
        send_multicast_adverts(state, &advert_targets, false);

        // ...and unsolicited every advertisement period (Sec.12.2).
        if let Some(period) = state.config.advertisement_period() {
            let advert_state = Arc::clone(state);
            let targets = Arc::clone(&advert_targets);
            scheduler.schedule_with_fixed_delay("unsolicited-daadvert", period, period, move || {
                send_multicast_adverts(&advert_state, &targets, false);
            });
        }

        log::info!(
            "[da] directory agent started on port {} serving scopes [{}] at {:?}",
            port,
            state.scopes,
            advert_targets.iter().map(|(_, a)| a.as_str()).collect::<Vec<_>>()
        );

        *self.runtime.lock() = Some(Runtime {
            udp_server,
            tcp_servers,
            scheduler,
            advert_targets,
            tcp_addrs,
        });
        Ok(())
    }

    /// Cancel the periodic tasks, send the shutdown DAAdvert (boot time
    /// 0 announces "going down"), then stop the transports. Idempotent;
    /// inner failures are swallowed so teardown always completes.
    pub fn stop(&self) {
        if !self.state.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let Some(mut runtime) = self.runtime.lock().take() else {
            return;
        };
        runtime.scheduler.shutdown();
        send_multicast_adverts(&self.state, &runtime.advert_targets, true);
        for tcp in &mut runtime.tcp_servers {
            tcp.stop();
        }
        runtime.udp_server.stop();
        log::info!("[da] directory agent stopped");
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// All services currently registered, in insertion order.
    pub fn services(&self) -> Vec<ServiceInfo> {
        self.state.cache.matching(None, None, None, None)
    }

    pub fn add_service_listener(&self, listener: Arc<dyn ServiceListener>) {
        self.state.cache.add_service_listener(listener);
    }

    pub fn remove_service_listener(&self, listener: &Arc<dyn ServiceListener>) {
        self.state.cache.remove_service_listener(listener);
    }

    /// Bound TCP addresses while running (resolves ephemeral ports).
    pub fn tcp_addrs(&self) -> Vec<SocketAddr> {
        self.runtime
            .lock()
            .as_ref()
            .map(|r| r.tcp_addrs.clone())
            .unwrap_or_default()
    }
}

impl Drop for DirectoryAgentServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One configured binding: the address to bind plus the addresses it
/// stands for (more than one when the configured address is a wildcard).
struct Binding {
    bind_ip: IpAddr,
    advertised: Vec<IpAddr>,
}

/// Expand configured addresses; wildcards become the host's non-loopback
/// interface addresses, falling back to loopback.
fn resolve_bindings(addresses: &[String]) -> Vec<Binding> {
    let mut bindings = Vec::with_capacity(addresses.len());
    for address in addresses {
        let Ok(ip) = address.parse::<IpAddr>() else {
            // Config validation already rejected this.
            continue;
        };
        if ip.is_unspecified() {
            let mut advertised: Vec<IpAddr> =
                interface_addrs().into_iter().map(IpAddr::V4).collect();
            if advertised.is_empty() {
                log::warn!(
                    "[da] no non-loopback interface found for wildcard {}, using loopback",
                    ip
                );
                advertised.push(IpAddr::V4(std::net::Ipv4Addr::LOCALHOST));
            }
            log::debug!("[da] expanded wildcard {} to {:?}", ip, advertised);
            bindings.push(Binding {
                bind_ip: ip,
                advertised,
            });
        } else {
            bindings.push(Binding {
                bind_ip: ip,
                advertised: vec![ip],
            });
        }
    }
    bindings
}

fn unix_seconds() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

/// Multicast one DAAdvert per binding. Send failures are logged and
/// discarded; adverts are best-effort.
fn send_multicast_adverts(
    state: &DaState,
    targets: &[(UdpConnector, String)],
    shutting_down: bool,
) {
    let das = state.directory_agents.read();
    for (connector, address) in targets {
        let Some(info) = das.get(address) else {
            continue;
        };
        let boot_time = if shutting_down { 0 } else { info.boot_time };
        let advert = info.advert(state.next_xid(), &state.language, boot_time, true);
        if let Err(err) = connector.send_multicast(&Message::DaAdvert(advert)) {
            log::warn!("[da] failed to multicast DAAdvert for {}: {}", address, err);
        }
    }
}

/// The single listener registered with both transport servers.
struct DaListener {
    state: Arc<DaState>,
}

impl MessageListener for DaListener {
    fn handle(&self, event: MessageEvent<'_>) {
        self.state.dispatch(event);
    }
}

impl DaState {
    fn next_xid(&self) -> u16 {
        self.xid.fetch_add(1, Ordering::Relaxed)
    }

    /// Route one inbound message. Directory Agents passively tolerate
    /// unknown and off-topic traffic: anything not handled is dropped
    /// silently.
    fn dispatch(&self, event: MessageEvent<'_>) {
        // Between detach-begin and socket close inbound messages are
        // dropped.
        if !self.running.load(Ordering::SeqCst) {
            return;
        }
        let MessageEvent {
            message,
            local_addr,
            peer_addr,
            writer,
        } = event;
        if message.is_multicast() {
            match message {
                Message::SrvRqst(rqst) => {
                    self.handle_multicast_srv_rqst(&rqst, local_addr, peer_addr, writer)
                }
                other => log::debug!(
                    "[da] dropping multicast {:?}: not handled by directory agents",
                    other.function_id()
                ),
            }
        } else {
            match message {
                Message::SrvRqst(rqst) => {
                    self.handle_srv_rqst(&rqst, local_addr, peer_addr, writer)
                }
                Message::SrvReg(reg) => self.handle_srv_reg(&reg, peer_addr, writer),
                Message::SrvDeReg(dereg) => self.handle_srv_dereg(&dereg, peer_addr, writer),
                other => log::debug!(
                    "[da] dropping unicast {:?}: not handled by directory agents",
                    other.function_id()
                ),
            }
        }
    }

    /// Multicast SrvRqst: only DA discovery is answered, with a unicast
    /// DAAdvert to the requester.
    fn handle_multicast_srv_rqst(
        &self,
        rqst: &SrvRqst,
        local_addr: SocketAddr,
        peer_addr: SocketAddr,
        writer: &mut dyn ReplyWriter,
    ) {
        let address = local_addr.ip().to_string();
        let das = self.directory_agents.read();
        let Some(da) = das.get(&address) else {
            log::debug!(
                "[da] dropping SrvRqst: arrived on unknown address {}",
                address
            );
            return;
        };

        // Responder suppression: exact string comparison, no address
        // canonicalization.
        if rqst.contains_responder(&da.address) {
            log::debug!(
                "[da] dropping SrvRqst from {}: already among previous responders",
                peer_addr
            );
            return;
        }

        if !self.scopes.weak_match(&rqst.scopes) {
            log::debug!(
                "[da] dropping SrvRqst from {}: no scope overlap between [{}] and [{}]",
                peer_addr,
                self.scopes,
                rqst.scopes
            );
            return;
        }

        if rqst.service_type.as_ref() != Some(&DirectoryAgentInfo::service_type()) {
            log::debug!(
                "[da] dropping multicast SrvRqst from {}: service type {:?} is not {}",
                peer_addr,
                rqst.service_type,
                slp::DIRECTORY_AGENT_SERVICE_TYPE
            );
            return;
        }

        log::debug!("[da] answering DA discovery from {}", peer_addr);
        let advert = da.advert(rqst.xid, &rqst.language, da.boot_time, false);
        write_reply(writer, &Message::DaAdvert(advert), peer_addr);
    }

    /// Unicast SrvRqst: reply with the matching services. A malformed
    /// filter yields an error reply with an empty URL list, never a
    /// dropped request.
    fn handle_srv_rqst(
        &self,
        rqst: &SrvRqst,
        local_addr: SocketAddr,
        peer_addr: SocketAddr,
        writer: &mut dyn ReplyWriter,
    ) {
        let address = local_addr.ip().to_string();
        if !self.directory_agents.read().contains_key(&address) {
            log::debug!(
                "[da] dropping SrvRqst: arrived on unknown address {}",
                address
            );
            return;
        }

        if !rqst.spi.is_empty() {
            log::debug!("[da] SrvRqst carries SPI '{}': not supported", rqst.spi);
            let reply = SrvRply::new(
                rqst.xid,
                &rqst.language,
                ErrorCode::AuthenticationUnknown,
                Vec::new(),
            );
            write_reply(writer, &Message::SrvRply(reply), peer_addr);
            return;
        }

        let filter = match Filter::parse_optional(&rqst.predicate) {
            Ok(filter) => filter,
            Err(err) => {
                log::debug!("[da] bad filter '{}': {}", rqst.predicate, err);
                let reply = SrvRply::new(
                    rqst.xid,
                    &rqst.language,
                    ErrorCode::InvalidRegistration,
                    Vec::new(),
                );
                write_reply(writer, &Message::SrvRply(reply), peer_addr);
                return;
            }
        };

        let matches = self.cache.matching(
            rqst.service_type.as_ref(),
            Some(&rqst.language),
            Some(&rqst.scopes),
            filter.as_ref(),
        );
        let now = Instant::now();
        let entries: Vec<UrlEntry> = matches
            .iter()
            .map(|s| UrlEntry::new(s.url.url(), s.remaining_lifetime(now)))
            .collect();
        log::debug!(
            "[da] returning {} service(s) of type {:?}",
            entries.len(),
            rqst.service_type
        );
        let reply = SrvRply::new(rqst.xid, &rqst.language, ErrorCode::Success, entries);
        write_reply(writer, &Message::SrvRply(reply), peer_addr);
    }

    fn handle_srv_reg(&self, reg: &SrvReg, peer_addr: SocketAddr, writer: &mut dyn ReplyWriter) {
        let service = ServiceInfo::from(reg);
        let error_code = match self.cache_service(service, !reg.is_fresh()) {
            Ok(_) => ErrorCode::Success,
            Err(err) => {
                log::debug!("[da] registration from {} rejected: {}", peer_addr, err);
                err.code
            }
        };
        let ack = SrvAck::new(reg.xid, &reg.language, error_code);
        write_reply(writer, &Message::SrvAck(ack), peer_addr);
    }

    fn handle_srv_dereg(
        &self,
        dereg: &SrvDeReg,
        peer_addr: SocketAddr,
        writer: &mut dyn ReplyWriter,
    ) {
        let service = ServiceInfo::from(dereg);
        let error_code = match self.uncache_service(service, dereg.is_update()) {
            Ok(_) => ErrorCode::Success,
            Err(err) => {
                log::debug!("[da] deregistration from {} rejected: {}", peer_addr, err);
                err.code
            }
        };
        let ack = SrvAck::new(dereg.xid, &dereg.language, error_code);
        write_reply(writer, &Message::SrvAck(ack), peer_addr);
    }

    /// Replace or update a cached service. The DA must own every scope
    /// of the service (RFC 2608 Sec.7.0).
    fn cache_service(&self, service: ServiceInfo, update: bool) -> Result<CacheResult, SlpError> {
        if !self.scopes.contains_all(&service.scopes) {
            return Err(SlpError::new(
                ErrorCode::ScopeNotSupported,
                format!(
                    "cannot register {}: scopes [{}] not within DA scopes [{}]",
                    service.url, service.scopes, self.scopes
                ),
            ));
        }
        if update {
            self.cache.add_attributes(&service.key(), &service.attributes)
        } else {
            self.cache.put(service)
        }
    }

    /// Remove or update a cached service, behind the same scope check.
    fn uncache_service(&self, service: ServiceInfo, update: bool) -> Result<CacheResult, SlpError> {
        if !self.scopes.contains_all(&service.scopes) {
            return Err(SlpError::new(
                ErrorCode::ScopeNotSupported,
                format!(
                    "cannot deregister {}: scopes [{}] not within DA scopes [{}]",
                    service.url, service.scopes, self.scopes
                ),
            ));
        }
        if update {
            self.cache
                .remove_attributes(&service.key(), &service.attributes)
        } else {
            Ok(self.cache.remove(&service.key()))
        }
    }
}

/// Write a reply, logging and discarding transport failures; any cache
/// change already committed stands.
fn write_reply(writer: &mut dyn ReplyWriter, message: &Message, peer: SocketAddr) {
    if let Err(err) = writer.write_message(message) {
        log::warn!(
            "[da] failed to write {:?} reply to {}: {}",
            message.function_id(),
            peer,
            err
        );
    }
}

/// Server error types.
#[derive(Debug)]
pub enum ServerError {
    Config(ConfigError),
    Bind(String),
    AlreadyRunning,
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration error: {}", e),
            Self::Bind(s) => write!(f, "bind error: {}", s),
            Self::AlreadyRunning => write!(f, "server already running"),
        }
    }
}

impl std::error::Error for ServerError {}

#[cfg(test)]
mod tests {
    use super::*;
    use slp::service_type::ServiceType;

    /// Captures replies instead of writing them to a socket.
    #[derive(Default)]
    struct Capture {
        messages: Vec<Message>,
    }

    impl ReplyWriter for Capture {
        fn write_message(&mut self, message: &Message) -> std::io::Result<()> {
            self.messages.push(message.clone());
            Ok(())
        }
    }

    fn state_with(scopes: &[&str], addresses: &[&str]) -> DaState {
        let scopes = Scopes::new(scopes);
        let das = addresses
            .iter()
            .map(|a| {
                (
                    a.to_string(),
                    DirectoryAgentInfo::new(
                        a,
                        scopes.clone(),
                        &Attributes::none(),
                        "en",
                        1_700_000_000,
                        427,
                    ),
                )
            })
            .collect();
        DaState {
            config: DirectoryAgentConfig::default(),
            scopes,
            attributes: Attributes::none(),
            language: "en".into(),
            cache: ServiceInfoCache::new(),
            directory_agents: RwLock::new(das),
            running: AtomicBool::new(true),
            xid: AtomicU16::new(1),
        }
    }

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    fn dispatch(state: &DaState, message: Message, local: &str, peer: &str) -> Vec<Message> {
        let mut capture = Capture::default();
        state.dispatch(MessageEvent {
            message,
            local_addr: addr(local),
            peer_addr: addr(peer),
            writer: &mut capture,
        });
        capture.messages
    }

    fn discovery_rqst(xid: u16, previous_responders: &[&str]) -> SrvRqst {
        SrvRqst {
            xid,
            language: "en".into(),
            multicast: true,
            previous_responders: previous_responders.iter().map(|s| s.to_string()).collect(),
            service_type: Some(ServiceType::new(slp::DIRECTORY_AGENT_SERVICE_TYPE)),
            scopes: Scopes::default_scope(),
            predicate: String::new(),
            spi: String::new(),
        }
    }

    fn query_rqst(xid: u16, service_type: &str, predicate: &str) -> SrvRqst {
        SrvRqst {
            xid,
            language: "en".into(),
            multicast: false,
            previous_responders: Vec::new(),
            service_type: Some(ServiceType::new(service_type)),
            scopes: Scopes::default_scope(),
            predicate: predicate.into(),
            spi: String::new(),
        }
    }

    fn printer_reg(xid: u16, fresh: bool, attributes: &str) -> SrvReg {
        SrvReg {
            xid,
            language: "en".into(),
            multicast: false,
            fresh,
            url_entry: UrlEntry::new("service:printer://p1", 60),
            service_type: ServiceType::new("service:printer"),
            scopes: Scopes::default_scope(),
            attributes: Attributes::parse(attributes).unwrap(),
        }
    }

    fn printer_dereg(xid: u16, tags: &[&str]) -> SrvDeReg {
        SrvDeReg {
            xid,
            language: "en".into(),
            multicast: false,
            scopes: Scopes::default_scope(),
            url_entry: UrlEntry::new("service:printer://p1", 60),
            tags: tags.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_multicast_discovery_answered_with_da_advert() {
        let state = state_with(&["default"], &["10.0.0.1"]);
        let replies = dispatch(
            &state,
            Message::SrvRqst(discovery_rqst(7, &[])),
            "10.0.0.1:427",
            "10.0.0.9:3214",
        );

        assert_eq!(replies.len(), 1);
        match &replies[0] {
            Message::DaAdvert(advert) => {
                assert_eq!(advert.xid, 7);
                assert_eq!(advert.language, "en");
                assert_eq!(advert.url, "service:directory-agent://10.0.0.1");
                assert_eq!(advert.error_code, ErrorCode::Success);
                assert_eq!(advert.boot_time, 1_700_000_000);
                assert!(!advert.multicast);
            }
            other => panic!("expected DAAdvert, got {:?}", other),
        }
    }

    #[test]
    fn test_responder_suppression_produces_no_reply() {
        let state = state_with(&["default"], &["10.0.0.1"]);
        let replies = dispatch(
            &state,
            Message::SrvRqst(discovery_rqst(7, &["10.0.0.1"])),
            "10.0.0.1:427",
            "10.0.0.9:3214",
        );
        assert!(replies.is_empty());
    }

    #[test]
    fn test_multicast_discovery_unknown_binding_is_dropped() {
        let state = state_with(&["default"], &["10.0.0.1"]);
        let replies = dispatch(
            &state,
            Message::SrvRqst(discovery_rqst(7, &[])),
            "10.9.9.9:427",
            "10.0.0.9:3214",
        );
        assert!(replies.is_empty());
    }

    #[test]
    fn test_multicast_discovery_scope_mismatch_is_dropped() {
        let state = state_with(&["branch"], &["10.0.0.1"]);
        let mut rqst = discovery_rqst(7, &[]);
        rqst.scopes = Scopes::new(["hq"]);
        let replies = dispatch(&state, Message::SrvRqst(rqst), "10.0.0.1:427", "10.0.0.9:1");
        assert!(replies.is_empty());
    }

    #[test]
    fn test_multicast_discovery_wrong_service_type_is_dropped() {
        let state = state_with(&["default"], &["10.0.0.1"]);
        let mut rqst = discovery_rqst(7, &[]);
        rqst.service_type = Some(ServiceType::new("service:printer"));
        let replies = dispatch(&state, Message::SrvRqst(rqst), "10.0.0.1:427", "10.0.0.9:1");
        assert!(replies.is_empty());
    }

    #[test]
    fn test_multicast_non_srv_rqst_is_dropped() {
        let state = state_with(&["default"], &["10.0.0.1"]);
        let mut reg = printer_reg(3, true, "(color=true)");
        reg.multicast = true;
        let replies = dispatch(&state, Message::SrvReg(reg), "10.0.0.1:427", "10.0.0.9:1");
        assert!(replies.is_empty());
    }

    #[test]
    fn test_registration_then_query() {
        let state = state_with(&["default"], &["10.0.0.1"]);

        let replies = dispatch(
            &state,
            Message::SrvReg(printer_reg(9, true, "(color=true),(ppm=10)")),
            "10.0.0.1:427",
            "10.0.0.7:50000",
        );
        assert_eq!(replies.len(), 1);
        match &replies[0] {
            Message::SrvAck(ack) => {
                assert_eq!(ack.xid, 9);
                assert_eq!(ack.error_code, ErrorCode::Success);
            }
            other => panic!("expected SrvAck, got {:?}", other),
        }

        let replies = dispatch(
            &state,
            Message::SrvRqst(query_rqst(10, "service:printer", "(ppm>=5)")),
            "10.0.0.1:427",
            "10.0.0.8:50001",
        );
        assert_eq!(replies.len(), 1);
        match &replies[0] {
            Message::SrvRply(rply) => {
                assert_eq!(rply.xid, 10);
                assert_eq!(rply.error_code, ErrorCode::Success);
                assert_eq!(rply.url_entries.len(), 1);
                assert_eq!(rply.url_entries[0].url, "service:printer://p1");
                assert!(rply.url_entries[0].lifetime <= 60);
                assert!(rply.url_entries[0].lifetime >= 58);
            }
            other => panic!("expected SrvRply, got {:?}", other),
        }
    }

    #[test]
    fn test_query_language_must_match() {
        let state = state_with(&["default"], &["10.0.0.1"]);
        dispatch(
            &state,
            Message::SrvReg(printer_reg(1, true, "(ppm=10)")),
            "10.0.0.1:427",
            "10.0.0.7:1",
        );

        let mut rqst = query_rqst(2, "service:printer", "");
        rqst.language = "de".into();
        let replies = dispatch(&state, Message::SrvRqst(rqst), "10.0.0.1:427", "10.0.0.8:1");
        match &replies[0] {
            Message::SrvRply(rply) => assert!(rply.url_entries.is_empty()),
            other => panic!("expected SrvRply, got {:?}", other),
        }
    }

    #[test]
    fn test_scope_rejection_on_registration() {
        let state = state_with(&["branch"], &["10.0.0.1"]);
        let mut reg = printer_reg(4, true, "(color=true)");
        reg.scopes = Scopes::new(["hq"]);

        let replies = dispatch(&state, Message::SrvReg(reg), "10.0.0.1:427", "10.0.0.7:1");
        match &replies[0] {
            Message::SrvAck(ack) => assert_eq!(ack.error_code, ErrorCode::ScopeNotSupported),
            other => panic!("expected SrvAck, got {:?}", other),
        }
        assert!(state.cache.matching(None, None, None, None).is_empty());
    }

    #[test]
    fn test_partial_update_keeps_registration_instant() {
        let state = state_with(&["default"], &["10.0.0.1"]);
        dispatch(
            &state,
            Message::SrvReg(printer_reg(5, true, "(color=true),(ppm=10)")),
            "10.0.0.1:427",
            "10.0.0.7:1",
        );
        let registered_at = state.cache.matching(None, None, None, None)[0].registered_at;

        let replies = dispatch(
            &state,
            Message::SrvReg(printer_reg(6, false, "(location=floor2)")),
            "10.0.0.1:427",
            "10.0.0.7:1",
        );
        match &replies[0] {
            Message::SrvAck(ack) => assert_eq!(ack.error_code, ErrorCode::Success),
            other => panic!("expected SrvAck, got {:?}", other),
        }

        let replies = dispatch(
            &state,
            Message::SrvRqst(query_rqst(7, "service:printer", "(location=floor2)")),
            "10.0.0.1:427",
            "10.0.0.8:1",
        );
        match &replies[0] {
            Message::SrvRply(rply) => assert_eq!(rply.url_entries.len(), 1),
            other => panic!("expected SrvRply, got {:?}", other),
        }

        let current = &state.cache.matching(None, None, None, None)[0];
        assert_eq!(current.registered_at, registered_at);
        assert!(current.attributes.contains_tag("color"));
    }

    #[test]
    fn test_update_of_unregistered_service_is_invalid() {
        let state = state_with(&["default"], &["10.0.0.1"]);
        let replies = dispatch(
            &state,
            Message::SrvReg(printer_reg(8, false, "(location=floor2)")),
            "10.0.0.1:427",
            "10.0.0.7:1",
        );
        match &replies[0] {
            Message::SrvAck(ack) => assert_eq!(ack.error_code, ErrorCode::InvalidUpdate),
            other => panic!("expected SrvAck, got {:?}", other),
        }
    }

    #[test]
    fn test_full_deregistration() {
        let state = state_with(&["default"], &["10.0.0.1"]);
        dispatch(
            &state,
            Message::SrvReg(printer_reg(1, true, "(color=true)")),
            "10.0.0.1:427",
            "10.0.0.7:1",
        );

        let replies = dispatch(
            &state,
            Message::SrvDeReg(printer_dereg(2, &[])),
            "10.0.0.1:427",
            "10.0.0.7:1",
        );
        match &replies[0] {
            Message::SrvAck(ack) => assert_eq!(ack.error_code, ErrorCode::Success),
            other => panic!("expected SrvAck, got {:?}", other),
        }
        assert!(state.cache.matching(None, None, None, None).is_empty());
    }

    #[test]
    fn test_partial_deregistration_removes_tags_only() {
        let state = state_with(&["default"], &["10.0.0.1"]);
        dispatch(
            &state,
            Message::SrvReg(printer_reg(1, true, "(color=true),(ppm=10)")),
            "10.0.0.1:427",
            "10.0.0.7:1",
        );

        let replies = dispatch(
            &state,
            Message::SrvDeReg(printer_dereg(2, &["color"])),
            "10.0.0.1:427",
            "10.0.0.7:1",
        );
        match &replies[0] {
            Message::SrvAck(ack) => assert_eq!(ack.error_code, ErrorCode::Success),
            other => panic!("expected SrvAck, got {:?}", other),
        }

        let services = state.cache.matching(None, None, None, None);
        assert_eq!(services.len(), 1);
        assert!(!services[0].attributes.contains_tag("color"));
        assert!(services[0].attributes.contains_tag("ppm"));
    }

    #[test]
    fn test_deregistration_of_absent_service_is_acked() {
        let state = state_with(&["default"], &["10.0.0.1"]);
        let replies = dispatch(
            &state,
            Message::SrvDeReg(printer_dereg(2, &[])),
            "10.0.0.1:427",
            "10.0.0.7:1",
        );
        match &replies[0] {
            Message::SrvAck(ack) => assert_eq!(ack.error_code, ErrorCode::Success),
            other => panic!("expected SrvAck, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_filter_yields_error_reply() {
        let state = state_with(&["default"], &["10.0.0.1"]);
        let replies = dispatch(
            &state,
            Message::SrvRqst(query_rqst(3, "service:printer", "(ppm>=")),
            "10.0.0.1:427",
            "10.0.0.8:1",
        );
        assert_eq!(replies.len(), 1);
        match &replies[0] {
            Message::SrvRply(rply) => {
                assert_eq!(rply.error_code, ErrorCode::InvalidRegistration);
                assert!(rply.url_entries.is_empty());
            }
            other => panic!("expected SrvRply, got {:?}", other),
        }
    }

    #[test]
    fn test_spi_yields_authentication_unknown() {
        let state = state_with(&["default"], &["10.0.0.1"]);
        let mut rqst = query_rqst(3, "service:printer", "");
        rqst.spi = "some-spi".into();
        let replies = dispatch(&state, Message::SrvRqst(rqst), "10.0.0.1:427", "10.0.0.8:1");
        match &replies[0] {
            Message::SrvRply(rply) => {
                assert_eq!(rply.error_code, ErrorCode::AuthenticationUnknown);
                assert!(rply.url_entries.is_empty());
            }
            other => panic!("expected SrvRply, got {:?}", other),
        }
    }

    #[test]
    fn test_unicast_query_on_unknown_binding_is_dropped() {
        let state = state_with(&["default"], &["10.0.0.1"]);
        let replies = dispatch(
            &state,
            Message::SrvRqst(query_rqst(3, "service:printer", "")),
            "10.9.9.9:427",
            "10.0.0.8:1",
        );
        assert!(replies.is_empty());
    }

    #[test]
    fn test_unicast_off_topic_message_is_dropped() {
        let state = state_with(&["default"], &["10.0.0.1"]);
        let advert = DirectoryAgentInfo::new(
            "10.0.0.2",
            Scopes::default_scope(),
            &Attributes::none(),
            "en",
            1,
            427,
        )
        .advert(1, "en", 1, false);
        let replies = dispatch(
            &state,
            Message::DaAdvert(advert),
            "10.0.0.1:427",
            "10.0.0.2:427",
        );
        assert!(replies.is_empty());
    }

    #[test]
    fn test_messages_are_dropped_after_stop_begins() {
        let state = state_with(&["default"], &["10.0.0.1"]);
        state.running.store(false, Ordering::SeqCst);
        let replies = dispatch(
            &state,
            Message::SrvRqst(query_rqst(3, "service:printer", "")),
            "10.0.0.1:427",
            "10.0.0.8:1",
        );
        assert!(replies.is_empty());
    }
}
