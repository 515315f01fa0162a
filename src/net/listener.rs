//! TLS listener.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections (waiting or non-blocking)
//! - Pair each connection with a fresh server-mode engine
//!
//! # Design Decisions
//! - The engine config is checked on every accept, before touching the socket
//! - No handshake at accept time; the first read or write on the stream
//!   drives it
//! - The rustls server config is built once and shared by every engine

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use rustls::ServerConfig;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};

use crate::config::{ConfigError, EngineConfig};
use crate::engine::{tls_config, EngineError, RustlsEngine};
use crate::net::stream::{EncryptedStream, DEFAULT_CLOSE_TIMEOUT};

/// A server-side encrypted stream over TCP.
pub type TlsStream = EncryptedStream<TcpStream, RustlsEngine>;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    Bind(io::Error),

    /// Failed to accept connection.
    #[error("Failed to accept: {0}")]
    Accept(io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ListenerError {
    /// True when a non-blocking accept found no pending connection.
    pub fn is_would_block(&self) -> bool {
        matches!(self, ListenerError::Accept(e) if e.kind() == io::ErrorKind::WouldBlock)
    }
}

/// Accepts TCP connections and wraps each in an [`EncryptedStream`].
pub struct Listener {
    inner: TcpListener,
    config: Arc<EngineConfig>,
    server_config: OnceLock<Arc<ServerConfig>>,
    close_timeout: Duration,
}

impl Listener {
    /// Bind to `addr`.
    pub async fn bind(addr: &str, config: Arc<EngineConfig>) -> Result<Self, ListenerError> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| ListenerError::Bind(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

        let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

        tracing::info!(
            address = %local_addr,
            verify_mode = %config.verify_mode(),
            "TLS listener bound"
        );

        Ok(Self::from_tcp(listener, config))
    }

    /// Wrap an already bound listener.
    pub fn from_tcp(inner: TcpListener, config: Arc<EngineConfig>) -> Self {
        Self {
            inner,
            config,
            server_config: OnceLock::new(),
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    /// Close timeout handed to every accepted stream.
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Wait for the next connection.
    pub async fn accept(&self) -> Result<TlsStream, ListenerError> {
        self.config.check()?;
        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;
        self.wrap(stream, addr)
    }

    /// Take a pending connection if there is one.
    ///
    /// Fails with an `Accept` error of kind `WouldBlock` otherwise; see
    /// [`ListenerError::is_would_block`].
    pub fn accept_nonblocking(&self) -> Result<TlsStream, ListenerError> {
        self.config.check()?;
        let mut cx = Context::from_waker(Waker::noop());
        match self.inner.poll_accept(&mut cx) {
            Poll::Ready(Ok((stream, addr))) => self.wrap(stream, addr),
            Poll::Ready(Err(e)) => Err(ListenerError::Accept(e)),
            Poll::Pending => Err(ListenerError::Accept(io::ErrorKind::WouldBlock.into())),
        }
    }

    /// The raw TCP listener.
    pub fn get_ref(&self) -> &TcpListener {
        &self.inner
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, io::Error> {
        self.inner.local_addr()
    }

    fn wrap(&self, stream: TcpStream, addr: SocketAddr) -> Result<TlsStream, ListenerError> {
        let engine = RustlsEngine::from_server_config(self.server_config()?)?;
        let stream = EncryptedStream::new(stream, engine).with_close_timeout(self.close_timeout);

        tracing::debug!(
            peer_addr = %addr,
            stream_id = %stream.id(),
            "Connection accepted"
        );
        Ok(stream)
    }

    fn server_config(&self) -> Result<Arc<ServerConfig>, EngineError> {
        if let Some(config) = self.server_config.get() {
            return Ok(Arc::clone(config));
        }
        let config = tls_config::server_config(&self.config)?;
        Ok(Arc::clone(self.server_config.get_or_init(|| config)))
    }
}
