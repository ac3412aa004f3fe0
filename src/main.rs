use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::info;
use tracing_subscriber::EnvFilter;

use leaseline::{Config, LeaseServer, LeaseTable, Result};

/// How long the probe client waits for each reply.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "leaseline")]
#[command(author, version, about = "A minimal address-leasing server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Run,
    ShowConfig,
    ListLeases,
    Probe {
        #[arg(short, long, default_value = "127.0.0.1:67")]
        server: SocketAddr,

        #[arg(long, default_value = "leaseline-probe")]
        client_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = Config::load_or_create(&cli.config)?;
            info!("Starting lease server with config: {:?}", cli.config);
            let server = LeaseServer::new(config).await?;

            tokio::select! {
                result = server.run() => result,
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal, stopping server");
                    Ok(())
                }
            }
        }
        Commands::ShowConfig => {
            let config = Config::load_or_create(&cli.config)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::ListLeases => {
            let config = Config::load_or_create(&cli.config)?;
            let table = LeaseTable::new(&config);
            let leases = table.list_leases().await;

            if leases.is_empty() {
                println!("No active leases.");
            } else {
                println!(
                    "{:<24} {:<16} {:<24} {:<10}",
                    "Client ID", "Address", "Expires At", "Remaining"
                );
                println!("{}", "-".repeat(76));

                for lease in leases {
                    let remaining = lease.remaining_seconds();
                    let remaining_str = if remaining > 0 {
                        format!("{}s", remaining)
                    } else {
                        "expired".to_string()
                    };

                    println!(
                        "{:<24} {:<16} {:<24} {:<10}",
                        lease.client_id,
                        lease.address,
                        lease.expires_at.format("%Y-%m-%d %H:%M:%S UTC"),
                        remaining_str
                    );
                }
            }

            Ok(())
        }
        Commands::Probe { server, client_id } => probe(server, &client_id).await,
    }
}

/// Runs one DISCOVER/OFFER/REQUEST exchange against a running server and
/// prints each message as it goes over the wire.
async fn probe(server: SocketAddr, client_id: &str) -> Result<()> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;

    let discover = format!("DHCPDISCOVER CLIENT_ID: {}", client_id);
    socket.send_to(discover.as_bytes(), server).await?;
    println!("-> {}", discover);

    let Some(offer) = receive_reply(&socket).await? else {
        println!("No reply within {} seconds.", PROBE_TIMEOUT.as_secs());
        return Ok(());
    };
    println!("<- {}", offer);

    if !offer.contains("DHCPOFFER") {
        println!("Server refused to offer an address.");
        return Ok(());
    }

    let Some(address) = field_after(&offer, "IP:") else {
        println!("Offer carried no address.");
        return Ok(());
    };

    let request = format!("DHCPREQUEST IP: {} CLIENT_ID: {}", address, client_id);
    socket.send_to(request.as_bytes(), server).await?;
    println!("-> {}", request);

    let Some(reply) = receive_reply(&socket).await? else {
        println!("No reply within {} seconds.", PROBE_TIMEOUT.as_secs());
        return Ok(());
    };
    println!("<- {}", reply);

    if reply.contains("DHCPACK") {
        println!("Lease confirmed: {}", address);
    } else {
        println!("Lease refused.");
    }

    Ok(())
}

async fn receive_reply(socket: &UdpSocket) -> Result<Option<String>> {
    let mut buffer = [0u8; 1500];
    match timeout(PROBE_TIMEOUT, socket.recv_from(&mut buffer)).await {
        Ok(received) => {
            let (length, _) = received?;
            Ok(Some(String::from_utf8_lossy(&buffer[..length]).into_owned()))
        }
        Err(_) => Ok(None),
    }
}

/// Returns the word following `marker` in a space-separated reply.
fn field_after(reply: &str, marker: &str) -> Option<String> {
    let mut words = reply.split_whitespace();
    while let Some(word) = words.next() {
        if word == marker {
            return words.next().map(str::to_string);
        }
    }
    None
}
