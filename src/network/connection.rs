//! Connection handling for blackjack-net
//!
//! Wraps one TCP byte stream and moves fixed-size packets across it:
//! - Exact-length reads, looping until the whole packet has arrived
//! - Session-level I/O timeout on every read and write
//! - Typed send/receive helpers for requests and payloads

use bytes::Bytes;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::protocol::{
    decode_decision, decode_payload, decode_request, encode_payload, encode_request, Decision,
    Payload, ProtocolError, Request, PAYLOAD_SIZE, REQUEST_SIZE,
};

/// Connection errors
///
/// Any of these ends the session it occurred in; nothing is retried at the
/// packet level.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Connection closed by peer")]
    Closed,

    #[error("Connection timeout")]
    Timeout,
}

pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Connection statistics
#[derive(Debug, Default, Clone)]
pub struct ConnectionStats {
    /// Packets sent
    pub packets_sent: u64,
    /// Packets received
    pub packets_received: u64,
    /// Bytes sent
    pub bytes_sent: u64,
    /// Bytes received
    pub bytes_received: u64,
}

/// A session stream to a remote blackjack-net peer
pub struct Connection<S = TcpStream> {
    /// Remote peer address
    remote_addr: SocketAddr,
    /// The byte stream
    stream: S,
    /// Bound on every read and write
    io_timeout: Duration,
    /// Statistics
    stats: ConnectionStats,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an established stream
    pub fn new(stream: S, remote_addr: SocketAddr, io_timeout: Duration) -> Self {
        Self {
            remote_addr,
            stream,
            io_timeout,
            stats: ConnectionStats::default(),
        }
    }

    /// Get the remote address
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Get connection statistics
    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Read exactly `N` bytes
    ///
    /// End of stream before the packet is complete, including before its
    /// first byte, is reported as [`ConnectionError::Closed`].
    async fn recv_exact<const N: usize>(&mut self) -> ConnectionResult<[u8; N]> {
        let mut buf = [0u8; N];
        let mut filled = 0;

        while filled < N {
            let read = self.stream.read(&mut buf[filled..]);
            let n = match tokio::time::timeout(self.io_timeout, read).await {
                Ok(result) => result?,
                Err(_) => return Err(ConnectionError::Timeout),
            };

            if n == 0 {
                if filled > 0 {
                    tracing::debug!(
                        "Peer {} closed after {} of {} bytes",
                        self.remote_addr,
                        filled,
                        N
                    );
                }
                return Err(ConnectionError::Closed);
            }
            filled += n;
        }

        self.stats.packets_received += 1;
        self.stats.bytes_received += N as u64;
        Ok(buf)
    }

    async fn send_bytes(&mut self, packet: Bytes) -> ConnectionResult<()> {
        let write = async {
            self.stream.write_all(&packet).await?;
            self.stream.flush().await
        };
        match tokio::time::timeout(self.io_timeout, write).await {
            Ok(result) => result?,
            Err(_) => return Err(ConnectionError::Timeout),
        }

        self.stats.packets_sent += 1;
        self.stats.bytes_sent += packet.len() as u64;
        Ok(())
    }

    /// Send the session request (client side)
    pub async fn send_request(&mut self, request: &Request) -> ConnectionResult<()> {
        self.send_bytes(encode_request(request)).await
    }

    /// Receive the session request (server side)
    pub async fn recv_request(&mut self) -> ConnectionResult<Request> {
        let raw = self.recv_exact::<REQUEST_SIZE>().await?;
        Ok(decode_request(&raw)?)
    }

    /// Send one game payload
    pub async fn send_payload(&mut self, payload: &Payload) -> ConnectionResult<()> {
        tracing::debug!("-> {}: {:?}", self.remote_addr, payload);
        self.send_bytes(encode_payload(payload)?).await
    }

    /// Receive one game payload
    pub async fn recv_payload(&mut self) -> ConnectionResult<Payload> {
        let raw = self.recv_exact::<PAYLOAD_SIZE>().await?;
        let payload = decode_payload(&raw)?;
        tracing::debug!("<- {}: {:?}", self.remote_addr, payload);
        Ok(payload)
    }

    /// Receive a client decision (server side)
    ///
    /// Only the header and the decision field are checked.
    pub async fn recv_decision(&mut self) -> ConnectionResult<Decision> {
        let raw = self.recv_exact::<PAYLOAD_SIZE>().await?;
        let decision = decode_decision(&raw)?;
        tracing::debug!("<- {}: {:?}", self.remote_addr, decision);
        Ok(decision)
    }

    /// Close the write half of the stream
    pub async fn close(&mut self) -> ConnectionResult<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Card, CardSlot, RoundResult, Suit};
    use tokio_test::io::Builder;

    fn addr() -> SocketAddr {
        "127.0.0.1:4000".parse().unwrap()
    }

    #[tokio::test]
    async fn test_recv_payload_across_partial_reads() {
        let card = Card::new(7, Suit::Hearts).unwrap();
        let packet = encode_payload(&Payload::card(card, RoundResult::NotOver)).unwrap();

        let mock = Builder::new()
            .read(&packet[..4])
            .read(&packet[4..11])
            .read(&packet[11..])
            .build();
        let mut conn = Connection::new(mock, addr(), Duration::from_secs(1));

        let payload = conn.recv_payload().await.unwrap();
        assert_eq!(payload.card, CardSlot::Dealt(card));
        assert_eq!(conn.stats().packets_received, 1);
        assert_eq!(conn.stats().bytes_received, PAYLOAD_SIZE as u64);
    }

    #[tokio::test]
    async fn test_short_read_is_closed() {
        let packet = encode_payload(&Payload::decision(Decision::Hit)).unwrap();
        let mock = Builder::new().read(&packet[..6]).build();
        let mut conn = Connection::new(mock, addr(), Duration::from_secs(1));

        assert!(matches!(
            conn.recv_payload().await,
            Err(ConnectionError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_bad_packet_is_protocol_error() {
        let mut packet = encode_payload(&Payload::decision(Decision::Hit))
            .unwrap()
            .to_vec();
        packet[0] = 0;
        let mock = Builder::new().read(&packet).build();
        let mut conn = Connection::new(mock, addr(), Duration::from_secs(1));

        assert!(matches!(
            conn.recv_payload().await,
            Err(ConnectionError::Protocol(ProtocolError::InvalidCookie(_)))
        ));
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let (client, _server) = tokio::io::duplex(64);
        let mut conn = Connection::new(client, addr(), Duration::from_millis(20));

        assert!(matches!(
            conn.recv_payload().await,
            Err(ConnectionError::Timeout)
        ));
    }

    #[tokio::test]
    async fn test_request_exchange() {
        let (client, server) = tokio::io::duplex(256);
        let mut client = Connection::new(client, addr(), Duration::from_secs(1));
        let mut server = Connection::new(server, addr(), Duration::from_secs(1));

        let request = Request {
            rounds: 3,
            client_name: "Player One".to_string(),
        };
        client.send_request(&request).await.unwrap();

        assert_eq!(server.recv_request().await.unwrap(), request);
        assert_eq!(client.stats().bytes_sent, REQUEST_SIZE as u64);
    }

    #[tokio::test]
    async fn test_recv_decision_tolerates_junk_fields() {
        let mut packet = encode_payload(&Payload::decision(Decision::Hit))
            .unwrap()
            .to_vec();
        packet[10] = 0x7f;
        packet[11..].copy_from_slice(&[0xde, 0xad, 0x09]);
        let mock = Builder::new().read(&packet).build();
        let mut conn = Connection::new(mock, addr(), Duration::from_secs(1));

        assert_eq!(conn.recv_decision().await.unwrap(), Decision::Hit);
        assert_eq!(conn.stats().packets_received, 1);
    }
}
