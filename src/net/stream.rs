//! Encrypted stream over a raw transport.
//!
//! # Responsibilities
//! - Drive the engine through handshake, data transfer and close-notify
//! - Shuttle ciphertext between the engine and the transport
//! - Present plain read/write/close operations to callers
//!
//! # Design Decisions
//! - Outbound protocol bytes are written before any call returns data, so a
//!   peer waiting on a handshake flight is never starved
//! - Reads return whatever plaintext the engine holds; record boundaries are
//!   not visible to callers
//! - `close` consumes the stream, so the transport is closed exactly once

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::engine::{Engine, EngineError};
use crate::net::certificate::{CertificateError, PeerCertificate};
use crate::net::transport::Transport;

/// How long `close` waits for each step of an unfinished handshake.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Bytes pulled per step when pumping a handshake during `close`.
const HANDSHAKE_PUMP_SIZE: usize = 1024;

static STREAM_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier attached to a stream's log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(u64);

impl StreamId {
    fn next() -> Self {
        Self(STREAM_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tls-{}", self.0)
    }
}

/// Errors surfaced by stream reads and writes.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Transport error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Certificate(#[from] CertificateError),
}

/// Result of a non-blocking read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// All plaintext the engine held, coalesced.
    Data(Vec<u8>),
    /// The peer closed the connection.
    Eof,
    /// Nothing available yet; retry once the transport is readable.
    WouldBlock,
}

/// How a `close` call ended. Close never fails; this is diagnostic only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Close-notify was exchanged with the peer.
    Graceful,
    /// The handshake never finished within the wait bound; no close-notify sent.
    HandshakeTimeout,
    /// An I/O or protocol error cut the exchange short.
    Aborted(String),
}

/// An encrypted byte stream: one transport, one engine.
pub struct EncryptedStream<T, E> {
    id: StreamId,
    transport: T,
    engine: E,
    peer_cert: Option<Arc<PeerCertificate>>,
    close_timeout: Duration,
}

impl<T: Transport, E: Engine> EncryptedStream<T, E> {
    /// Wrap a transport and a freshly created engine. No I/O happens here;
    /// the first read or write drives the handshake.
    pub fn new(transport: T, engine: E) -> Self {
        Self {
            id: StreamId::next(),
            transport,
            engine,
            peer_cert: None,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    /// The raw transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.transport.peer_addr()
    }

    /// Read decrypted bytes, waiting on the transport as needed.
    ///
    /// Returns `None` at end-of-stream. Handshake round-trips happen inside
    /// this call; it returns only once the engine yields plaintext.
    pub async fn read(&mut self, max_size: usize) -> Result<Option<Vec<u8>>, StreamError> {
        let mut buf = vec![0u8; max_size.max(1)];
        loop {
            if let Some(data) = self.engine.read_plaintext()? {
                self.send_pending().await?;
                return Ok(Some(data));
            }
            if self.engine.peer_closed() {
                self.send_pending().await?;
                return Ok(None);
            }

            let n = self.transport.read_into(&mut buf).await?;
            if n == 0 {
                tracing::debug!(stream_id = %self.id, "Transport reached end of stream");
                return Ok(None);
            }
            self.feed(&buf[..n]).await?;
        }
    }

    /// Read decrypted bytes without waiting for inbound data.
    ///
    /// Everything the engine currently holds is returned as one chunk. Only
    /// the write of pending handshake bytes may wait on the transport.
    pub async fn read_nonblocking(&mut self, max_size: usize) -> Result<ReadOutcome, StreamError> {
        let mut buf = vec![0u8; max_size.max(1)];
        loop {
            if let Some(data) = self.read_all_plaintext()? {
                self.send_pending().await?;
                return Ok(ReadOutcome::Data(data));
            }
            if self.engine.peer_closed() {
                self.send_pending().await?;
                return Ok(ReadOutcome::Eof);
            }

            let n = match self.transport.try_read_into(&mut buf) {
                Ok(0) => return Ok(ReadOutcome::Eof),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(ReadOutcome::WouldBlock)
                }
                Err(e) => return Err(e.into()),
            };
            self.feed(&buf[..n]).await?;
        }
    }

    /// Encrypt and send all of `data`. Returns `data.len()` on success.
    pub async fn write(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        let mut offset = 0;
        while offset < data.len() {
            let wrote = self.engine.write_plaintext(&data[offset..])?;
            self.send_pending().await?;

            if wrote == 0 {
                if !self.engine.is_handshaking() {
                    return Err(StreamError::Io(io::ErrorKind::WriteZero.into()));
                }
                self.pump_handshake().await?;
            }
            offset += wrote;
        }

        tracing::trace!(stream_id = %self.id, bytes = data.len(), "Wrote application data");
        Ok(data.len())
    }

    pub async fn flush(&mut self) -> Result<(), StreamError> {
        self.send_pending().await?;
        self.transport.flush().await?;
        Ok(())
    }

    /// The peer's certificate, parsed on first success and cached after.
    ///
    /// `None` is not cached; a later call asks the engine again.
    pub fn peer_certificate(&mut self) -> Result<Option<Arc<PeerCertificate>>, StreamError> {
        if let Some(cert) = &self.peer_cert {
            return Ok(Some(Arc::clone(cert)));
        }

        let Some(der) = self.engine.peer_certificate_der() else {
            return Ok(None);
        };
        let cert = Arc::new(PeerCertificate::from_der(der)?);
        self.peer_cert = Some(Arc::clone(&cert));
        Ok(Some(cert))
    }

    /// Best-effort close-notify exchange, then close the transport.
    ///
    /// Errors during the exchange are swallowed and reported through the
    /// returned [`CloseOutcome`]. The transport is closed on every path.
    pub async fn close(mut self) -> CloseOutcome {
        let outcome = match self.shutdown_sequence().await {
            Ok(outcome) => outcome,
            Err(e) => CloseOutcome::Aborted(e.to_string()),
        };

        match &outcome {
            CloseOutcome::Graceful => {
                tracing::debug!(stream_id = %self.id, "Close-notify exchanged")
            }
            CloseOutcome::HandshakeTimeout => tracing::debug!(
                stream_id = %self.id,
                timeout_ms = self.close_timeout.as_millis() as u64,
                "Handshake unfinished at close, skipping close-notify"
            ),
            CloseOutcome::Aborted(reason) => {
                tracing::debug!(stream_id = %self.id, reason = %reason, "TLS shutdown aborted")
            }
        }

        if let Err(e) = self.transport.close().await {
            tracing::debug!(stream_id = %self.id, error = %e, "Transport close failed");
        }
        outcome
    }

    async fn shutdown_sequence(&mut self) -> Result<CloseOutcome, StreamError> {
        // Finish a half-done handshake first so there is a session to close.
        while self.engine.is_handshaking() {
            let ready = tokio::time::timeout(self.close_timeout, self.transport.readable()).await;
            match ready {
                Err(_) => return Ok(CloseOutcome::HandshakeTimeout),
                Ok(result) => result?,
            }
            let outcome = self.read_nonblocking(HANDSHAKE_PUMP_SIZE).await?;
            if outcome == ReadOutcome::Eof && self.engine.is_handshaking() {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "peer closed during handshake",
                )
                .into());
            }
        }

        let mut buf = vec![0u8; HANDSHAKE_PUMP_SIZE];
        self.discard_plaintext()?;
        let mut done = self.engine.shutdown()?;
        loop {
            self.send_pending().await?;
            if done {
                return Ok(CloseOutcome::Graceful);
            }

            let n = self.transport.read_into(&mut buf).await?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "peer closed before close-notify",
                )
                .into());
            }
            self.engine.inject(&buf[..n])?;
            self.discard_plaintext()?;
            done = self.engine.shutdown()?;
        }
    }

    /// Inject ciphertext and flush whatever the engine wants to send back.
    ///
    /// On engine failure the pending bytes (usually an alert) still go out
    /// before the error is returned.
    async fn feed(&mut self, ciphertext: &[u8]) -> Result<(), StreamError> {
        if let Err(e) = self.engine.inject(ciphertext) {
            let _ = self.send_pending().await;
            return Err(e.into());
        }
        self.send_pending().await?;
        Ok(())
    }

    /// One transport read to move a stalled handshake forward.
    async fn pump_handshake(&mut self) -> Result<(), StreamError> {
        let mut buf = vec![0u8; HANDSHAKE_PUMP_SIZE];
        let n = self.transport.read_into(&mut buf).await?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "peer closed during handshake",
            )
            .into());
        }
        self.feed(&buf[..n]).await
    }

    /// Drop application data the peer sent ahead of its close-notify.
    fn discard_plaintext(&mut self) -> Result<(), EngineError> {
        let mut dropped = 0;
        while let Some(data) = self.engine.read_plaintext()? {
            dropped += data.len();
        }
        if dropped > 0 {
            tracing::debug!(
                stream_id = %self.id,
                bytes = dropped,
                "Discarded data received while closing"
            );
        }
        Ok(())
    }

    fn read_all_plaintext(&mut self) -> Result<Option<Vec<u8>>, EngineError> {
        let Some(mut output) = self.engine.read_plaintext()? else {
            return Ok(None);
        };
        while let Some(more) = self.engine.read_plaintext()? {
            output.extend_from_slice(&more);
        }
        Ok(Some(output))
    }

    async fn send_pending(&mut self) -> io::Result<()> {
        let mut sent = 0;
        while let Some(chunk) = self.engine.extract() {
            self.transport.write_all(&chunk).await?;
            sent += chunk.len();
        }
        if sent > 0 {
            self.transport.flush().await?;
            tracing::trace!(stream_id = %self.id, bytes = sent, "Flushed TLS records");
        }
        Ok(())
    }
}

impl<T, E> std::fmt::Debug for EncryptedStream<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedStream")
            .field("id", &self.id)
            .field("close_timeout", &self.close_timeout)
            .finish_non_exhaustive()
    }
}
