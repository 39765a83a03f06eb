//! Service discovery module
//!
//! Servers announce themselves by broadcasting an offer packet to the
//! well-known UDP port; clients listen on that port and take the first valid
//! offer they hear. There is no ranking between servers.

use bytes::Bytes;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;

use crate::protocol::{decode_offer, encode_offer, Offer};

/// Largest datagram read while listening; anything bigger is not an offer
const RECV_BUFFER_SIZE: usize = 2048;

/// Discovery errors
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to bind UDP port {port}: {source}")]
    Bind {
        port: u16,
        source: std::io::Error,
    },
}

pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// A server that answered discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredServer {
    /// Source address of the offer datagram
    pub address: IpAddr,
    /// TCP port sessions are accepted on
    pub tcp_port: u16,
    /// Advertised server name
    pub server_name: String,
}

impl DiscoveredServer {
    fn from_offer(from: SocketAddr, offer: Offer) -> Self {
        Self {
            address: from.ip(),
            tcp_port: offer.tcp_port,
            server_name: offer.server_name,
        }
    }

    /// Get a socket address for connection
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.tcp_port)
    }
}

/// Sends the server's offer to the broadcast address
pub struct Broadcaster {
    socket: UdpSocket,
    target: SocketAddr,
    packet: Bytes,
}

impl Broadcaster {
    /// Bind an ephemeral broadcast-enabled socket for `offer`
    pub async fn bind(address: IpAddr, port: u16, offer: &Offer) -> DiscoveryResult<Self> {
        let socket = UdpSocket::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0))
            .await
            .map_err(|source| DiscoveryError::Bind { port: 0, source })?;
        socket.set_broadcast(true)?;

        Ok(Self {
            socket,
            target: SocketAddr::new(address, port),
            packet: encode_offer(offer),
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Send one offer
    pub async fn send(&self) -> DiscoveryResult<()> {
        self.socket.send_to(&self.packet, self.target).await?;
        tracing::trace!("Offer sent to {}", self.target);
        Ok(())
    }
}

/// Listens on the well-known port for offers
pub struct OfferListener {
    socket: UdpSocket,
    timeout: Duration,
}

impl OfferListener {
    pub async fn bind(port: u16, timeout: Duration) -> DiscoveryResult<Self> {
        let socket = UdpSocket::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port))
            .await
            .map_err(|source| DiscoveryError::Bind { port, source })?;

        Ok(Self { socket, timeout })
    }

    pub fn local_addr(&self) -> DiscoveryResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Wait for the first valid offer
    ///
    /// Timeouts only restart the wait; malformed datagrams are skipped.
    pub async fn next_offer(&self) -> DiscoveryResult<DiscoveredServer> {
        let mut buf = [0u8; RECV_BUFFER_SIZE];

        loop {
            let (n, from) =
                match tokio::time::timeout(self.timeout, self.socket.recv_from(&mut buf)).await {
                    Ok(result) => result?,
                    Err(_) => {
                        tracing::debug!("No offer within {:?}, still listening", self.timeout);
                        continue;
                    }
                };

            match decode_offer(&buf[..n]) {
                Ok(offer) => {
                    let server = DiscoveredServer::from_offer(from, offer);
                    tracing::info!(
                        "Received offer from {} (name={}, tcp_port={})",
                        server.address,
                        server.server_name,
                        server.tcp_port
                    );
                    return Ok(server);
                }
                Err(e) => tracing::debug!("Ignoring datagram from {}: {}", from, e),
            }
        }
    }
}

/// Bind the discovery port, wait for one offer, and release the port
pub async fn listen_for_offer(port: u16, timeout: Duration) -> DiscoveryResult<DiscoveredServer> {
    let listener = OfferListener::bind(port, timeout).await?;
    tracing::debug!("Listening for offers on {}", listener.local_addr()?);
    listener.next_offer().await
}

/// Best-effort address of the outbound interface, for display only
///
/// Connecting a UDP socket sends nothing; it only makes the OS pick a route.
pub async fn local_ip() -> IpAddr {
    let probe = async {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect("8.8.8.8:80").await?;
        socket.local_addr()
    };

    match probe.await {
        Ok(addr) => addr.ip(),
        Err(e) => {
            tracing::debug!("Local address lookup failed: {}", e);
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        }
    }
}
