use std::path::PathBuf;

use clap::Parser;

use tls_stream::net::connect;
use tls_stream::observability::logging;
use tls_stream::{EngineConfig, VerifyMode};

#[derive(Parser)]
#[command(name = "tls-probe")]
#[command(about = "Send a message over TLS and print the reply", long_about = None)]
struct Cli {
    /// Server address, e.g. 127.0.0.1:8443
    addr: String,

    /// Message to send.
    #[arg(default_value = "ping")]
    message: String,

    /// Name to verify the server certificate against.
    #[arg(short, long, default_value = "localhost")]
    server_name: String,

    /// Trust anchors (PEM). Without this the server certificate is not verified.
    #[arg(long)]
    ca: Option<PathBuf>,

    /// Client certificate (PEM).
    #[arg(long, requires = "key")]
    cert: Option<PathBuf>,

    /// Client private key (PEM).
    #[arg(long, requires = "cert")]
    key: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init("tls_stream=info,tls_probe=info");

    let mut config = EngineConfig::new();
    if let Some(ca) = &cli.ca {
        config.set_ca(ca)?;
        config.set_verify_mode(VerifyMode::Peer);
    }
    if let (Some(cert), Some(key)) = (&cli.cert, &cli.key) {
        config.set_cert(cert)?;
        config.set_key(key)?;
    }

    let mut stream = connect(cli.addr.as_str(), &cli.server_name, &config).await?;
    stream.write(cli.message.as_bytes()).await?;

    let mut reply = Vec::new();
    while reply.len() < cli.message.len() {
        match stream.read(16 * 1024).await? {
            Some(data) => reply.extend_from_slice(&data),
            None => break,
        }
    }

    if let Some(cert) = stream.peer_certificate()? {
        println!("server: {} (issuer {})", cert.subject(), cert.issuer());
    }
    println!("{}", String::from_utf8_lossy(&reply));

    let outcome = stream.close().await;
    tracing::debug!(?outcome, "Closed");
    Ok(())
}
