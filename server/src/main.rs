use clap::{Parser, ValueEnum};
use server::network::{Server, ServerConfig};
use shared::{Endpoint, DEFAULT_UNIX_SOCKET_PATH};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Transport {
    Tcp,
    #[cfg(unix)]
    Unix,
}

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Password clients must supply
    password: String,
    /// Socket family to listen on
    #[clap(short, long, value_enum, default_value = "tcp")]
    transport: Transport,
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Unix socket path to listen on
    #[clap(short, long, default_value = DEFAULT_UNIX_SOCKET_PATH)]
    socket_path: PathBuf,
    /// Maximum number of players over the server's lifetime
    #[clap(short, long, default_value = "10")]
    max_clients: usize,
    /// Milliseconds a new connection has to send the password
    #[clap(long, default_value = "5000")]
    auth_timeout_ms: u64,
}

/// Parses command-line arguments, binds the endpoint and serves until Ctrl+C.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    let endpoint = match args.transport {
        Transport::Tcp => Endpoint::tcp(args.host, args.port),
        #[cfg(unix)]
        Transport::Unix => Endpoint::unix(args.socket_path)?,
    };

    let config = ServerConfig {
        endpoint,
        password: args.password,
        max_sessions: args.max_clients,
        auth_timeout: Duration::from_millis(args.auth_timeout_ms),
        ..ServerConfig::default()
    };

    let mut server = Server::bind(config).await?;
    println!("Waiting for players on {}", server.local_endpoint()?);

    server.run().await?;
    println!("\nConnection closed.");

    Ok(())
}
