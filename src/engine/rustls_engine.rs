//! rustls-backed engine.
//!
//! # Responsibilities
//! - Feed socket ciphertext into a `rustls::Connection`
//! - Hand out decrypted plaintext and outbound TLS records
//! - Track the close-notify exchange
//!
//! # Design Decisions
//! - One `extract` call yields one `write_tls` flight
//! - Plaintext is accepted at most one full record at a time, so large writes
//!   become several encrypt calls
//! - rustls refuses ciphertext once more than one record of plaintext is
//!   waiting; injected bytes it cannot take yet stay in `pending_tls` and are
//!   fed as the caller drains plaintext

use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

use rustls::{ClientConfig, ClientConnection, Connection, ServerConfig, ServerConnection};

use crate::config::EngineConfig;
use crate::engine::{tls_config, Engine, EngineError};

/// Largest plaintext fragment a TLS record carries.
pub const MAX_RECORD_PLAINTEXT: usize = 16 * 1024;

pub struct RustlsEngine {
    conn: Connection,
    /// Decrypted bytes buffered in `conn`, as of the last read or inject.
    plaintext_available: usize,
    /// Injected ciphertext not yet handed to `conn`.
    pending_tls: Vec<u8>,
    close_sent: bool,
    peer_closed: bool,
}

impl RustlsEngine {
    /// Server-mode engine bound to `config`.
    pub fn server(config: &EngineConfig) -> Result<Self, EngineError> {
        Self::from_server_config(tls_config::server_config(config)?)
    }

    /// Client-mode engine that will authenticate `server_name`.
    pub fn client(config: &EngineConfig, server_name: &str) -> Result<Self, EngineError> {
        Self::from_client_config(tls_config::client_config(config)?, server_name)
    }

    pub fn from_server_config(config: Arc<ServerConfig>) -> Result<Self, EngineError> {
        Ok(Self::new(ServerConnection::new(config)?.into()))
    }

    pub fn from_client_config(
        config: Arc<ClientConfig>,
        server_name: &str,
    ) -> Result<Self, EngineError> {
        let name = tls_config::server_name(server_name)?;
        Ok(Self::new(ClientConnection::new(config, name)?.into()))
    }

    fn new(conn: Connection) -> Self {
        Self {
            conn,
            plaintext_available: 0,
            pending_tls: Vec::new(),
            close_sent: false,
            peer_closed: false,
        }
    }

    pub fn is_server(&self) -> bool {
        matches!(self.conn, Connection::Server(_))
    }

    /// Hand buffered ciphertext to rustls until it is all consumed or a full
    /// record of plaintext is waiting to be read.
    fn feed_pending(&mut self) -> Result<(), EngineError> {
        while !self.pending_tls.is_empty() {
            if self.plaintext_available >= MAX_RECORD_PLAINTEXT {
                break;
            }

            let n = self
                .conn
                .read_tls(&mut Cursor::new(&self.pending_tls[..]))
                .map_err(|e| EngineError::Stalled(e.to_string()))?;
            if n == 0 {
                return Err(EngineError::Stalled(format!(
                    "engine did not consume ciphertext: {} bytes pending",
                    self.pending_tls.len()
                )));
            }
            self.pending_tls.drain(..n);

            let state = self.conn.process_new_packets()?;
            self.plaintext_available = state.plaintext_bytes_to_read();
            if state.peer_has_closed() {
                self.peer_closed = true;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for RustlsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RustlsEngine")
            .field("server", &self.is_server())
            .field("handshaking", &self.conn.is_handshaking())
            .field("plaintext_available", &self.plaintext_available)
            .field("pending_tls", &self.pending_tls.len())
            .field("close_sent", &self.close_sent)
            .field("peer_closed", &self.peer_closed)
            .finish()
    }
}

impl Engine for RustlsEngine {
    fn read_plaintext(&mut self) -> Result<Option<Vec<u8>>, EngineError> {
        if self.plaintext_available == 0 {
            self.feed_pending()?;
            if self.plaintext_available == 0 {
                return Ok(None);
            }
        }
        let mut buf = vec![0u8; self.plaintext_available.min(MAX_RECORD_PLAINTEXT)];
        match self.conn.reader().read(&mut buf) {
            // Ok(0) is a clean close-notify from the peer.
            Ok(0) => Ok(None),
            Ok(n) => {
                self.plaintext_available -= n;
                buf.truncate(n);
                Ok(Some(buf))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(EngineError::Io(e)),
        }
    }

    fn inject(&mut self, ciphertext: &[u8]) -> Result<(), EngineError> {
        self.pending_tls.extend_from_slice(ciphertext);
        self.feed_pending()
    }

    fn extract(&mut self) -> Option<Vec<u8>> {
        if !self.conn.wants_write() {
            return None;
        }
        let mut out = Vec::new();
        match self.conn.write_tls(&mut out) {
            Ok(n) if n > 0 => Some(out),
            _ => None,
        }
    }

    fn write_plaintext(&mut self, data: &[u8]) -> Result<usize, EngineError> {
        let len = data.len().min(MAX_RECORD_PLAINTEXT);
        self.conn
            .writer()
            .write(&data[..len])
            .map_err(EngineError::Io)
    }

    fn is_handshaking(&self) -> bool {
        self.conn.is_handshaking()
    }

    fn shutdown(&mut self) -> Result<bool, EngineError> {
        if !self.close_sent {
            self.conn.send_close_notify();
            self.close_sent = true;
        }
        Ok(self.peer_closed)
    }

    fn peer_closed(&self) -> bool {
        self.peer_closed
    }

    fn peer_certificate_der(&self) -> Option<Vec<u8>> {
        self.conn
            .peer_certificates()
            .and_then(|chain| chain.first())
            .map(|cert| cert.to_vec())
    }
}
