//! Client-side connection setup.

use tokio::net::{TcpStream, ToSocketAddrs};

use crate::config::EngineConfig;
use crate::engine::RustlsEngine;
use crate::net::stream::{EncryptedStream, StreamError};

/// A client-side encrypted stream over TCP.
pub type TlsClientStream = EncryptedStream<TcpStream, RustlsEngine>;

/// Connect to `addr` and wrap the socket in a client-mode engine that
/// authenticates `server_name`.
///
/// Like accept, this performs no handshake; the first read or write does.
pub async fn connect(
    addr: impl ToSocketAddrs,
    server_name: &str,
    config: &EngineConfig,
) -> Result<TlsClientStream, StreamError> {
    let engine = RustlsEngine::client(config, server_name)?;
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;

    let stream = EncryptedStream::new(stream, engine);
    tracing::debug!(
        stream_id = %stream.id(),
        server_name,
        "Connected"
    );
    Ok(stream)
}
