//! blackjack-net Server
//!
//! Advertises the server over UDP while accepting TCP sessions. Every
//! accepted session runs in its own task with its own deck and round state;
//! sessions share nothing but the listening socket.

use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, RwLock};

use super::connection::Connection;
use crate::config::NetworkConfig;
use crate::deck::Deck;
use crate::discovery::{Broadcaster, DiscoveryError};
use crate::game::{DealerRound, GameResult};
use crate::protocol::{Offer, RoundOutcome};

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Server already running")]
    AlreadyRunning,

    #[error("Server not running")]
    NotRunning,

    #[error("Bind failed: {0}")]
    BindFailed(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Events emitted by the server
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// Server is listening and broadcasting
    Started {
        tcp_addr: SocketAddr,
        offer: Offer,
    },
    /// A client sent its request
    SessionStarted {
        addr: SocketAddr,
        client_name: String,
        rounds: u8,
    },
    /// One round of a session ended
    RoundFinished {
        addr: SocketAddr,
        round: u8,
        outcome: RoundOutcome,
        player_total: u8,
        dealer_total: u8,
    },
    /// A session ended, normally or not
    SessionEnded {
        addr: SocketAddr,
        reason: String,
    },
    /// Server stopped
    Stopped,
    /// Error occurred
    Error {
        message: String,
    },
}

/// blackjack-net Server
pub struct Server {
    /// Network configuration
    config: NetworkConfig,
    /// Name advertised in offers
    name: String,
    /// Event sender
    event_tx: mpsc::Sender<ServerEvent>,
    /// Event receiver (for consumers)
    event_rx: Option<mpsc::Receiver<ServerEvent>>,
    /// Shutdown signal
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Whether the server is running
    running: Arc<RwLock<bool>>,
}

impl Server {
    /// Create a new server
    pub fn new(config: NetworkConfig, name: String) -> Self {
        let (event_tx, event_rx) = mpsc::channel(256);

        Self {
            config,
            name,
            event_tx,
            event_rx: Some(event_rx),
            shutdown_tx: None,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Take the event receiver (can only be called once)
    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<ServerEvent>> {
        self.event_rx.take()
    }

    /// Start listening and broadcasting offers
    pub async fn start(&mut self) -> ServerResult<SocketAddr> {
        {
            let running = self.running.read().await;
            if *running {
                return Err(ServerError::AlreadyRunning);
            }
        }

        let bind_addr = format!("0.0.0.0:{}", self.config.tcp_port);
        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            ServerError::BindFailed(format!("Failed to bind to {}: {}", bind_addr, e))
        })?;

        let local_addr = listener.local_addr()?;

        let offer = Offer {
            tcp_port: local_addr.port(),
            server_name: self.name.clone(),
        };
        let broadcaster = Broadcaster::bind(
            self.config.broadcast_address,
            self.config.udp_port,
            &offer,
        )
        .await?;

        tracing::info!(
            "Server listening on {}, offering to {}",
            local_addr,
            broadcaster.target()
        );

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown_tx = Some(shutdown_tx);

        {
            let mut running = self.running.write().await;
            *running = true;
        }

        emit(
            &self.event_tx,
            ServerEvent::Started {
                tcp_addr: local_addr,
                offer,
            },
        );

        let event_tx = self.event_tx.clone();
        let running = self.running.clone();
        let io_timeout = self.config.io_timeout();
        let mut offer_timer = tokio::time::interval(self.config.offer_interval());

        // Spawn the broadcast/accept loop
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = offer_timer.tick() => {
                        if let Err(e) = broadcaster.send().await {
                            tracing::warn!("Offer broadcast failed: {}", e);
                        }
                    }
                    result = listener.accept() => {
                        match result {
                            Ok((stream, addr)) => {
                                tracing::info!("New connection from {}", addr);

                                let event_tx = event_tx.clone();
                                tokio::spawn(async move {
                                    let mut conn = Connection::new(stream, addr, io_timeout);
                                    let reason = match serve_session(&mut conn, &event_tx).await {
                                        Ok(rounds) => format!("Played {} rounds", rounds),
                                        Err(e) => {
                                            tracing::error!("Session with {} failed: {}", addr, e);
                                            format!("Error: {}", e)
                                        }
                                    };
                                    let stats = conn.stats();
                                    tracing::debug!(
                                        "Session with {}: {} packets ({} bytes) sent, {} packets ({} bytes) received",
                                        addr,
                                        stats.packets_sent,
                                        stats.bytes_sent,
                                        stats.packets_received,
                                        stats.bytes_received
                                    );
                                    let _ = conn.close().await;
                                    emit(&event_tx, ServerEvent::SessionEnded { addr, reason });
                                });
                            }
                            Err(e) => {
                                tracing::error!("Accept error: {}", e);
                                emit(&event_tx, ServerEvent::Error {
                                    message: e.to_string(),
                                });
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Server shutdown requested");
                        break;
                    }
                }
            }

            let mut running = running.write().await;
            *running = false;

            emit(&event_tx, ServerEvent::Stopped);
        });

        Ok(local_addr)
    }

    /// Stop broadcasting and accepting; sessions in flight run to completion
    pub async fn stop(&mut self) -> ServerResult<()> {
        {
            let running = self.running.read().await;
            if !*running {
                return Err(ServerError::NotRunning);
            }
        }

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }

        Ok(())
    }

    /// Check if the server is running
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}

/// Publish an event without waiting
///
/// Events are dropped when nobody drains the channel, so a slow or absent
/// consumer never stalls a session.
fn emit(event_tx: &mpsc::Sender<ServerEvent>, event: ServerEvent) {
    if let Err(e) = event_tx.try_send(event) {
        tracing::trace!("Server event dropped: {}", e);
    }
}

/// Run one client session: read the request, then play its rounds in order
///
/// Returns the number of rounds played.
pub async fn serve_session<S>(
    conn: &mut Connection<S>,
    event_tx: &mpsc::Sender<ServerEvent>,
) -> GameResult<u8>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let addr = conn.remote_addr();
    let request = conn.recv_request().await?;

    tracing::info!(
        "Session from '{}' ({}) for {} rounds",
        request.client_name,
        addr,
        request.rounds
    );
    if request.rounds == 0 {
        tracing::warn!("Client {} requested zero rounds", addr);
    }

    emit(
        event_tx,
        ServerEvent::SessionStarted {
            addr,
            client_name: request.client_name.clone(),
            rounds: request.rounds,
        },
    );

    for round in 1..=request.rounds {
        let mut dealer = DealerRound::new(Deck::shuffled());
        let outcome = dealer.play(conn).await?;

        emit(
            event_tx,
            ServerEvent::RoundFinished {
                addr,
                round,
                outcome,
                player_total: dealer.player().total(),
                dealer_total: dealer.dealer().total(),
            },
        );
    }

    Ok(request.rounds)
}
