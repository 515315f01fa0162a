//! TLS echo server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client                ┌──────────────────────────────────────────────┐
//!     ──────── TCP ────────▶│  Listener ──accept──▶ EncryptedStream         │
//!                           │                        │  transport (TcpStream)│
//!                           │                        │  engine (rustls)      │
//!     ◀─────── TLS ─────────│  echo task ◀──read/write┘                     │
//!                           └──────────────────────────────────────────────┘
//! ```
//!
//! Every decrypted chunk is written straight back to the peer. On end of
//! stream the connection is closed with a close-notify exchange.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use tls_stream::config::loader::{engine_config, load_config};
use tls_stream::net::{CloseOutcome, Listener, TlsStream};
use tls_stream::observability::logging;

#[derive(Parser)]
#[command(name = "tls-echo")]
#[command(about = "TLS echo server", long_about = None)]
struct Cli {
    /// Path to the TOML settings file.
    #[arg(short, long, default_value = "tls-echo.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init("tls_stream=debug,tls_echo=debug");

    tracing::info!("tls-echo v0.1.0 starting");

    let settings = load_config(&cli.config)?;
    let engine = engine_config(&settings.tls)?;
    engine.check()?;

    tracing::info!(
        bind_address = %settings.bind_address,
        verify_mode = %engine.verify_mode(),
        close_timeout_ms = settings.stream.close_timeout_ms,
        "Configuration loaded"
    );

    let listener = Listener::bind(&settings.bind_address, Arc::new(engine))
        .await?
        .with_close_timeout(Duration::from_millis(settings.stream.close_timeout_ms));
    let read_size = settings.stream.read_size;

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(stream) => {
                    tokio::spawn(echo(stream, read_size));
                }
                Err(e) => tracing::warn!(error = %e, "Accept failed"),
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn echo(mut stream: TlsStream, read_size: usize) {
    let stream_id = stream.id();
    let mut echoed = 0usize;

    loop {
        match stream.read(read_size).await {
            Ok(Some(data)) => match stream.write(&data).await {
                Ok(n) => echoed += n,
                Err(e) => {
                    tracing::warn!(%stream_id, error = %e, "Write failed");
                    break;
                }
            },
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(%stream_id, error = %e, "Read failed");
                break;
            }
        }
    }

    if let Ok(Some(cert)) = stream.peer_certificate() {
        tracing::info!(%stream_id, subject = cert.subject(), "Client certificate");
    }

    let outcome = stream.close().await;
    tracing::info!(
        %stream_id,
        bytes = echoed,
        graceful = outcome == CloseOutcome::Graceful,
        "Connection closed"
    );
}
