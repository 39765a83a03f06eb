//! blackjack-net Client
//!
//! Connects to a discovered server, sends the session request and plays the
//! requested number of rounds one after another.

use std::future::Future;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use super::connection::{Connection, ConnectionError};
use crate::config::NetworkConfig;
use crate::discovery::DiscoveryError;
use crate::game::{DecisionSource, GameError, PlayerRound, RoundObserver, SessionStats};
use crate::protocol::Request;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Game error: {0}")]
    Game(#[from] GameError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Round count must be between 1 and 255")]
    NoRounds,

    #[error("Connection timeout")]
    Timeout,

    #[error("Session interrupted")]
    Interrupted,
}

pub type ClientResult<T> = Result<T, ClientError>;

/// blackjack-net Client
pub struct Client {
    /// Network configuration
    config: NetworkConfig,
    /// Team name sent in the request
    name: String,
    /// Rounds to request
    rounds: u8,
}

impl Client {
    /// Create a new client
    pub fn new(config: NetworkConfig, name: String, rounds: u8) -> ClientResult<Self> {
        if rounds == 0 {
            return Err(ClientError::NoRounds);
        }

        Ok(Self {
            config,
            name,
            rounds,
        })
    }

    /// Open the TCP session
    pub async fn connect(&self, server_addr: SocketAddr) -> ClientResult<Connection> {
        tracing::info!("Connecting to {}", server_addr);

        let stream = match tokio::time::timeout(
            self.config.connect_timeout(),
            TcpStream::connect(server_addr),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(ClientError::Io(e)),
            Err(_) => return Err(ClientError::Timeout),
        };

        Ok(Connection::new(
            stream,
            server_addr,
            self.config.io_timeout(),
        ))
    }

    /// Send the request and play every round over an open connection
    pub async fn play_session<S, D, O>(
        &self,
        conn: &mut Connection<S>,
        decisions: &mut D,
        observer: &mut O,
    ) -> ClientResult<SessionStats>
    where
        S: AsyncRead + AsyncWrite + Unpin,
        D: DecisionSource + ?Sized,
        O: RoundObserver + ?Sized,
    {
        conn.send_request(&Request {
            rounds: self.rounds,
            client_name: self.name.clone(),
        })
        .await?;
        tracing::debug!("Sent request for {} rounds", self.rounds);

        let mut stats = SessionStats::default();
        for round in 1..=self.rounds {
            observer.round_started(round, self.rounds);
            let outcome = PlayerRound::new().play(conn, decisions, observer).await?;
            stats.record(outcome);
        }

        observer.session_finished(&stats);
        Ok(stats)
    }

    /// Connect to `server_addr`, play the session, then close
    ///
    /// The session is abandoned with [`ClientError::Interrupted`] as soon as
    /// `shutdown` completes. The connection is closed on every path.
    pub async fn run<D, O, F>(
        &self,
        server_addr: SocketAddr,
        decisions: &mut D,
        observer: &mut O,
        shutdown: F,
    ) -> ClientResult<SessionStats>
    where
        D: DecisionSource + ?Sized,
        O: RoundObserver + ?Sized,
        F: Future<Output = ()>,
    {
        let mut conn = self.connect(server_addr).await?;
        let result = tokio::select! {
            result = self.play_session(&mut conn, decisions, observer) => result,
            _ = shutdown => {
                tracing::info!("Session with {} interrupted", server_addr);
                Err(ClientError::Interrupted)
            }
        };
        let _ = conn.close().await;

        let stats = result?;
        tracing::info!(
            "Session with {} done: {} won, {} lost, {} tied",
            server_addr,
            stats.wins,
            stats.losses,
            stats.ties
        );
        Ok(stats)
    }
}
