//! Per-datagram request handling.
//!
//! A single [`RequestHandler`] is shared by every in-flight task. It owns
//! the decision logic of the protocol:
//!
//! - DISCOVER is answered with an OFFER carrying the client's existing
//!   address, or the next free one, and with NAK once the pool is empty.
//! - REQUEST is answered with an ACK only when the requested address
//!   matches the recorded lease; any mismatch or unknown client gets a
//!   NAK and leaves the table untouched.
//! - Everything else is answered with a NAK.
//!
//! Replies normally go back to the datagram's source. A datagram whose
//! source address is the wildcard is treated as relayed and the reply is
//! directed at the configured gateway instead, on the source's port.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::lease::LeaseTable;
use crate::message::{LeaseParams, Reply, Request};

/// Turns one inbound datagram into at most one reply datagram.
pub struct RequestHandler {
    config: Arc<Config>,
    leases: Arc<LeaseTable>,
    socket: Arc<UdpSocket>,
}

impl RequestHandler {
    /// Creates a handler over a shared lease table and reply socket.
    pub fn new(config: Arc<Config>, leases: Arc<LeaseTable>, socket: Arc<UdpSocket>) -> Self {
        Self {
            config,
            leases,
            socket,
        }
    }

    /// Parses `data`, computes the reply and sends it.
    pub async fn handle_datagram(&self, data: &[u8], source: SocketAddr) -> Result<()> {
        let request = Request::parse(data, source);

        match &request {
            Request::Discover { client_id } => info!("DISCOVER from {client_id} ({source})"),
            Request::RequestAddr {
                client_id,
                requested,
            } => info!("REQUEST for {requested} from {client_id} ({source})"),
            Request::Malformed { .. } => {}
        }

        let reply = self.respond(&request, source).await;
        let destination = self.reply_destination(source);
        self.socket.send_to(&reply.encode(), destination).await?;
        Ok(())
    }

    /// Computes the reply for one parsed request.
    ///
    /// This is the whole protocol state machine; it touches the lease
    /// table but never the network.
    pub async fn respond(&self, request: &Request, source: SocketAddr) -> Reply {
        match request {
            Request::Discover { client_id } => {
                match self.leases.offer(client_id, source).await {
                    Ok(record) => {
                        info!("Offering {} to {client_id}", record.address);
                        Reply::Offer(self.lease_params(record.address))
                    }
                    Err(error) => {
                        warn!("Refusing DISCOVER from {client_id}: {error}");
                        Reply::Nak
                    }
                }
            }
            Request::RequestAddr {
                client_id,
                requested,
            } => match self.leases.lookup(client_id).await {
                Some(record) if record.address == *requested => {
                    info!("Acknowledging {requested} for {client_id}");
                    Reply::Ack(self.lease_params(record.address))
                }
                Some(record) => {
                    warn!(
                        "Refusing REQUEST from {client_id}: holds {} but asked for {requested}",
                        record.address
                    );
                    Reply::Nak
                }
                None => {
                    warn!("Refusing REQUEST for {requested} from unknown client {client_id}");
                    Reply::Nak
                }
            },
            Request::Malformed { raw } => {
                warn!("Unparsable datagram from {source} ({} bytes)", raw.len());
                Reply::Nak
            }
        }
    }

    /// Where the reply to a datagram from `source` must be sent.
    ///
    /// A wildcard source cannot be replied to directly, so the reply is
    /// handed to the gateway for forwarding, keeping the source's port.
    fn reply_destination(&self, source: SocketAddr) -> SocketAddr {
        if source.ip().is_unspecified() {
            SocketAddr::new(IpAddr::V4(self.config.gateway), source.port())
        } else {
            source
        }
    }

    fn lease_params(&self, address: Ipv4Addr) -> LeaseParams {
        LeaseParams {
            address,
            netmask: self.config.netmask,
            gateway: self.config.gateway,
            dns: self.config.dns,
            lease_seconds: self.config.lease_duration_seconds,
        }
    }
}
