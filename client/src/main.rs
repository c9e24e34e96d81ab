use clap::{Parser, ValueEnum};
use client::network::Client;
use log::info;
use shared::{Endpoint, ProtocolError, DEFAULT_UNIX_SOCKET_PATH};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Transport {
    Tcp,
    #[cfg(unix)]
    Unix,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Password expected by the server
    password: String,

    /// Socket family to connect over
    #[arg(short = 't', long, value_enum, default_value = "tcp")]
    transport: Transport,

    /// Server host
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Server Unix socket path
    #[arg(short = 's', long, default_value = DEFAULT_UNIX_SOCKET_PATH)]
    socket_path: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    let endpoint = match args.transport {
        Transport::Tcp => Endpoint::tcp(args.host, args.port),
        #[cfg(unix)]
        Transport::Unix => Endpoint::unix(args.socket_path)?,
    };

    info!("Starting client...");
    let client = match Client::connect(&endpoint, &args.password).await {
        Ok(client) => client,
        Err(ProtocolError::Rejected) => {
            println!("Wrong password!");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    println!("Connected as player {}. Waiting for opponents...", client.id());
    client.run().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_short_host_flag() {
        let args = Args::try_parse_from(["client", "secret", "-H", "10.0.0.5", "-p", "9000"]).unwrap();
        assert_eq!(args.password, "secret");
        assert_eq!(args.host, "10.0.0.5");
        assert_eq!(args.port, 9000);
    }
}
