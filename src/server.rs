use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{error, info, warn};

use crate::admission::AdmissionControl;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::handler::RequestHandler;
use crate::lease::LeaseTable;

const RECV_BUFFER_SIZE: usize = 1500;

pub struct LeaseServer {
    config: Arc<Config>,
    leases: Arc<LeaseTable>,
    handler: Arc<RequestHandler>,
    admission: AdmissionControl,
    socket: Arc<UdpSocket>,
}

impl LeaseServer {
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let leases = Arc::new(LeaseTable::new(&config));

        let socket = Arc::new(Self::create_socket(&config)?);
        let handler = Arc::new(RequestHandler::new(
            Arc::clone(&config),
            Arc::clone(&leases),
            Arc::clone(&socket),
        ));
        let admission = AdmissionControl::new(config.max_in_flight);

        info!("Lease server starting on 0.0.0.0:{}", config.listen_port);
        info!(
            "Address pool: {} - {} ({} addresses)",
            config.pool_first(),
            config.pool_last(),
            config.pool_size
        );
        info!(
            "Handling at most {} datagrams in flight",
            config.max_in_flight
        );

        Ok(Self {
            config,
            leases,
            handler,
            admission,
            socket,
        })
    }

    fn create_socket(config: &Config) -> Result<UdpSocket> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
            .map_err(|error| Error::Socket(format!("Failed to create socket: {}", error)))?;

        socket
            .set_reuse_address(true)
            .map_err(|error| Error::Socket(format!("Failed to set SO_REUSEADDR: {}", error)))?;

        socket
            .set_nonblocking(true)
            .map_err(|error| Error::Socket(format!("Failed to set non-blocking: {}", error)))?;

        let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.listen_port);
        socket.bind(&bind_addr.into()).map_err(|error| {
            Error::Socket(format!("Failed to bind to {}: {}", bind_addr, error))
        })?;

        let std_socket: std::net::UdpSocket = socket.into();
        let tokio_socket = UdpSocket::from_std(std_socket).map_err(|error| {
            Error::Socket(format!("Failed to convert to tokio socket: {}", error))
        })?;

        Ok(tokio_socket)
    }

    /// Receives datagrams forever, spawning one handler task per datagram.
    ///
    /// A handler slot is claimed *before* reading from the socket. Once
    /// every slot is taken the loop stops draining the socket, so excess
    /// traffic queues in the kernel buffer rather than in memory here.
    pub async fn run(&self) -> Result<()> {
        let mut buffer = [0u8; RECV_BUFFER_SIZE];

        info!("Lease server ready and listening");

        loop {
            let permit = self.admission.admit().await;

            match self.socket.recv_from(&mut buffer).await {
                Ok((length, source)) => {
                    let data = buffer[..length].to_vec();
                    let handler = Arc::clone(&self.handler);

                    tokio::spawn(async move {
                        let _permit = permit;
                        if let Err(error) = handler.handle_datagram(&data, source).await {
                            warn!("Error handling datagram from {}: {}", source, error);
                        }
                    });
                }
                Err(error) => {
                    error!("Error receiving datagram: {}", error);
                }
            }
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn leases(&self) -> &LeaseTable {
        &self.leases
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    fn test_config(pool_size: u32) -> Config {
        Config {
            listen_port: 0,
            pool_size,
            ..Config::default()
        }
    }

    async fn start_server(pool_size: u32) -> SocketAddr {
        let server = LeaseServer::new(test_config(pool_size)).await.unwrap();
        let port = server.local_addr().unwrap().port();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        format!("127.0.0.1:{}", port).parse().unwrap()
    }

    async fn exchange(client: &UdpSocket, server: SocketAddr, message: &str) -> String {
        client.send_to(message.as_bytes(), server).await.unwrap();

        let mut buffer = [0u8; RECV_BUFFER_SIZE];
        let (length, _) = timeout(Duration::from_secs(2), client.recv_from(&mut buffer))
            .await
            .expect("timed out waiting for reply")
            .unwrap();
        String::from_utf8_lossy(&buffer[..length]).into_owned()
    }

    #[tokio::test]
    async fn test_server_binds_an_ephemeral_port() {
        let server = LeaseServer::new(test_config(10)).await.unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
        assert_eq!(server.config().pool_size, 10);
        assert_eq!(server.leases().lease_count().await, 0);
    }

    #[tokio::test]
    async fn test_server_rejects_invalid_config() {
        assert!(LeaseServer::new(test_config(0)).await.is_err());
    }

    #[tokio::test]
    async fn test_discover_request_exchange() {
        let server = start_server(10).await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let offer = exchange(&client, server, "DHCPDISCOVER CLIENT_ID: alpha").await;
        assert_eq!(
            offer,
            "DHCPOFFER IP: 192.168.1.101 NETMASK: 255.255.255.0 \
             GATEWAY: 192.168.1.1 DNS: 8.8.8.8 LEASE: 3600"
        );

        let ack = exchange(
            &client,
            server,
            "DHCPREQUEST IP: 192.168.1.101 CLIENT_ID: alpha",
        )
        .await;
        assert_eq!(
            ack,
            "DHCPACK IP: 192.168.1.101 NETMASK: 255.255.255.0 \
             GATEWAY: 192.168.1.1 DNS: 8.8.8.8 LEASE: 3600"
        );
    }

    #[tokio::test]
    async fn test_two_clients_then_exhaustion() {
        let server = start_server(2).await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let first = exchange(&client, server, "DHCPDISCOVER CLIENT_ID: alpha").await;
        assert!(first.starts_with("DHCPOFFER IP: 192.168.1.101"));

        let second = exchange(&client, server, "DHCPDISCOVER CLIENT_ID: beta").await;
        assert!(second.starts_with("DHCPOFFER IP: 192.168.1.102"));

        let third = exchange(&client, server, "DHCPDISCOVER CLIENT_ID: gamma").await;
        assert_eq!(third, "DHCPNAK");

        // The earlier offers stay valid: confirming works, poaching does not.
        let ack = exchange(
            &client,
            server,
            "DHCPREQUEST IP: 192.168.1.101 CLIENT_ID: alpha",
        )
        .await;
        assert!(ack.starts_with("DHCPACK IP: 192.168.1.101"));

        let nak = exchange(
            &client,
            server,
            "DHCPREQUEST IP: 192.168.1.101 CLIENT_ID: beta",
        )
        .await;
        assert_eq!(nak, "DHCPNAK");
    }

    #[tokio::test]
    async fn test_malformed_datagram_gets_nak() {
        let server = start_server(10).await;
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let reply = exchange(&client, server, "GET / HTTP/1.1").await;
        assert_eq!(reply, "DHCPNAK");
    }

    #[tokio::test]
    async fn test_concurrent_clients_get_distinct_addresses() {
        let server = start_server(20).await;

        let mut handles = Vec::new();
        for index in 0..8 {
            handles.push(tokio::spawn(async move {
                let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
                let message = format!("DHCPDISCOVER CLIENT_ID: client-{}", index);
                exchange(&client, server, &message).await
            }));
        }

        let mut addresses = HashSet::new();
        for handle in handles {
            let offer = handle.await.unwrap();
            let address = offer
                .split_whitespace()
                .nth(2)
                .expect("offer carries an address")
                .to_string();
            assert!(offer.starts_with("DHCPOFFER "));
            addresses.insert(address);
        }

        assert_eq!(addresses.len(), 8);
    }
}
