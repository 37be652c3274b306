//! Communicator Service Server
//!
//! Hosts a world communicator under a well-known id and lets clients create
//! more communicators remotely.
//!
//! USAGE:
//!   communicator-server [OPTIONS]
//!
//! EXAMPLES:
//!   communicator-server                  # Start with default settings
//!   communicator-server --port 8000      # Custom port
//!   communicator-server --size 16        # World of 16 ranks

mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use common::*;
use remobj::{Object, Orb, RmiServer, ServerConfig};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "communicator-server")]
#[command(version)]
#[command(about = "Communicator service server - hosts communicator objects")]
struct Args {
    /// Host address to bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port number to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Host name placed in published object URLs
    #[arg(long)]
    advertise: Option<String>,

    /// Number of ranks in the world communicator
    #[arg(long, default_value_t = 4)]
    size: i32,

    /// Maximum concurrent client connections
    #[arg(long, default_value_t = 1024)]
    max_connections: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;

    let mut config = ServerConfig::builder()
        .bind_addr(addr)
        .max_connections(args.max_connections);
    if let Some(host) = &args.advertise {
        config = config.advertise_host(host.clone());
    }

    let orb = Orb::new();
    orb.classes().register(
        COMMUNICATOR,
        Arc::new(|| Arc::new(LocalCommunicator::new("created", 0, 1)) as Arc<dyn Object>),
    );

    let server = RmiServer::bind(orb.clone(), config.build()).await?;
    let world = orb.publish_as(
        WORLD_ID,
        Arc::new(LocalCommunicator::new("world", 0, args.size)),
    )?;

    println!("========================================================");
    println!("         Communicator Service Server");
    println!("========================================================");
    println!("  Protocol:  remobj / TCP");
    println!("  Interface: {}", COMMUNICATOR);
    println!("  Endpoint:  {}", server.endpoint());
    println!("  World:     {}", world);
    println!("========================================================");
    println!("  Methods:");
    println!("    getRank, getSize, getName - Query the communicator");
    println!("    dup                       - Duplicate it");
    println!("    split <color>             - Derive a sub-communicator");
    println!("========================================================");
    println!("  Press Ctrl+C to stop");
    println!("========================================================");
    println!();

    info!("Starting communicator server on {}", addr);
    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
