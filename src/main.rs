//! blackjack-net - LAN blackjack over a fixed binary protocol
//!
//! A dealer server advertises itself over UDP broadcast; players discover it,
//! open a TCP session and play the number of rounds they asked for.

mod config;
mod console;
mod deck;
mod discovery;
mod game;
mod network;
mod protocol;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::Config;
use console::{Console, ConsolePresenter};
use game::{DecisionSource, ThresholdStrategy};
use network::{Client, ClientError, Server, ServerEvent};

/// Exit status after an operator interrupt (128 + SIGINT)
const EXIT_INTERRUPTED: i32 = 130;

/// blackjack-net - LAN blackjack dealer and player
#[derive(Parser)]
#[command(name = "bjnet")]
#[command(author = "blackjack-net Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Play blackjack against a dealer discovered on the local network", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the dealer: broadcast offers and serve sessions
    Server {
        /// Name to advertise
        #[arg(short, long)]
        name: Option<String>,

        /// TCP port to accept sessions on (0 = any free port)
        #[arg(short, long)]
        tcp_port: Option<u16>,

        /// UDP port offers are broadcast to
        #[arg(short, long)]
        udp_port: Option<u16>,
    },

    /// Run a player: wait for an offer and play a session
    Client {
        /// Team name sent to the server (prompted if missing)
        #[arg(short, long)]
        name: Option<String>,

        /// Rounds to play, 1-255 (prompted if missing)
        #[arg(short, long)]
        rounds: Option<u8>,

        /// Play without prompts, standing once the total reaches this value
        #[arg(short, long, value_name = "STAND_ON")]
        auto: Option<u8>,

        /// UDP port to listen for offers on
        #[arg(short, long)]
        udp_port: Option<u16>,
    },

    /// Show current configuration
    Config {
        /// Generate sample configuration
        #[arg(long)]
        generate: bool,

        /// Output path for generated config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show protocol and network information
    Info,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default().unwrap_or_default()
    };

    // Initialize logging
    let filter = if cli.verbose || config.general.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Server {
            name,
            tcp_port,
            udp_port,
        } => {
            run_server(config, name, tcp_port, udp_port).await?;
        }
        Commands::Client {
            name,
            rounds,
            auto,
            udp_port,
        } => {
            if !run_client(config, name, rounds, auto, udp_port).await? {
                // A pending stdin read cannot be cancelled; leaving through the
                // runtime would wait for the operator to press Enter.
                std::process::exit(EXIT_INTERRUPTED);
            }
        }
        Commands::Config { generate, output } => {
            if generate {
                if let Some(path) = output {
                    Config::sample().save(&path)?;
                    println!("Configuration written to: {}", path.display());
                } else {
                    println!("{}", config::generate_sample_config()?);
                }
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
        Commands::Info => {
            print_info(&config).await;
        }
    }

    Ok(())
}

/// Run the dealer until Ctrl+C
async fn run_server(
    mut config: Config,
    name: Option<String>,
    tcp_port: Option<u16>,
    udp_port: Option<u16>,
) -> anyhow::Result<()> {
    if let Some(port) = tcp_port {
        config.network.tcp_port = port;
    }
    if let Some(port) = udp_port {
        config.network.udp_port = port;
    }
    let name = name.unwrap_or(config.general.name.clone());

    tracing::info!("Starting blackjack-net server '{}'", name);

    let mut server = Server::new(config.network.clone(), name.clone());
    let mut event_rx = server
        .take_event_receiver()
        .ok_or_else(|| anyhow::anyhow!("server event receiver already taken"))?;

    let tcp_addr = server.start().await?;
    let ip = discovery::local_ip().await;

    println!("\n========================================");
    println!("  blackjack-net Server Running");
    println!("========================================");
    println!("  Name: {}", name);
    println!("  Address: {}:{}", ip, tcp_addr.port());
    println!(
        "  Offers: {}:{} every {:?}",
        config.network.broadcast_address,
        config.network.udp_port,
        config.network.offer_interval()
    );
    println!("========================================");
    println!("\nServer started, listening on IP address {}", ip);
    println!("Press Ctrl+C to stop.\n");

    // Main event loop
    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                match event {
                    ServerEvent::SessionStarted { addr, client_name, rounds } => {
                        println!("+ {} ({}) wants {} rounds", client_name, addr, rounds);
                    }
                    ServerEvent::Started { tcp_addr, offer } => {
                        tracing::info!(
                            "Advertising '{}' with TCP port {} (bound to {})",
                            offer.server_name,
                            offer.tcp_port,
                            tcp_addr
                        );
                    }
                    ServerEvent::RoundFinished { addr, round, outcome, player_total, dealer_total } => {
                        println!(
                            "  {} round {}: player {} ({} vs {})",
                            addr, round, outcome, player_total, dealer_total
                        );
                    }
                    ServerEvent::SessionEnded { addr, reason } => {
                        println!("- Session with {} ended ({})", addr, reason);
                    }
                    ServerEvent::Error { message } => {
                        tracing::error!("Server error: {}", message);
                    }
                    ServerEvent::Stopped => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
                break;
            }
        }
    }

    if server.is_running().await {
        server.stop().await?;
    }
    tracing::info!("Server stopped");

    Ok(())
}

/// Discover a server and play one full session
///
/// Returns `false` when the operator interrupted with Ctrl+C.
async fn run_client(
    mut config: Config,
    name: Option<String>,
    rounds: Option<u8>,
    auto: Option<u8>,
    udp_port: Option<u16>,
) -> anyhow::Result<bool> {
    if let Some(port) = udp_port {
        config.network.udp_port = port;
    }

    let mut console = Console::stdin();

    let name = match name {
        Some(name) => name,
        None => console.prompt_name().await?,
    };
    let rounds = match rounds.or(config.client.rounds) {
        Some(rounds) => rounds,
        None => console.prompt_rounds().await?,
    };

    let client = Client::new(config.network.clone(), name, rounds)?;
    let mut decisions: Box<dyn DecisionSource> = match auto.or(config.client.auto_stand_on) {
        Some(stand_on) => Box::new(ThresholdStrategy::new(stand_on)),
        None => Box::new(console),
    };
    let mut presenter = ConsolePresenter::new();

    println!(
        "Client started, listening for offer requests on UDP {}...",
        config.network.udp_port
    );

    // One handler for the whole client; once registered, SIGINT no longer
    // terminates the process by itself
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let server = tokio::select! {
            found = discovery::listen_for_offer(
                config.network.udp_port,
                config.network.discovery_timeout(),
            ) => found?,
            _ = &mut shutdown => {
                println!("\nStopped listening.");
                return Ok(false);
            }
        };

        println!(
            "Received offer from {} (name={}, tcp_port={})",
            server.address, server.server_name, server.tcp_port
        );

        let interrupted = async {
            let _ = (&mut shutdown).await;
        };
        match client
            .run(
                server.socket_addr(),
                decisions.as_mut(),
                &mut presenter,
                interrupted,
            )
            .await
        {
            Ok(_) => return Ok(true),
            Err(ClientError::Interrupted) => {
                println!("\nSession abandoned, connection closed.");
                return Ok(false);
            }
            Err(e) => {
                tracing::warn!("Session with {} failed: {}", server.server_name, e);
                println!("Session failed ({}), listening for offers again...", e);
            }
        }
    }
}

/// Print protocol constants and the local address
async fn print_info(config: &Config) {
    println!("blackjack-net Information");
    println!("=========================\n");

    println!("Local address: {}", discovery::local_ip().await);
    println!("Name: {}", config.general.name);

    println!("\nMagic cookie: {:#010x}", protocol::MAGIC_COOKIE);
    println!("Discovery port: {}", protocol::DISCOVERY_PORT);
    println!(
        "Packet sizes: offer {}, request {}, payload {}",
        protocol::OFFER_SIZE,
        protocol::REQUEST_SIZE,
        protocol::PAYLOAD_SIZE
    );
}
