//! Raw duplex transport underneath an encrypted stream.
//!
//! The `Transport` trait is the socket-side seam: `EncryptedStream` only ever
//! talks to the network through it, which keeps the sequencing logic testable
//! against scripted transports.

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// A raw, ordered, bidirectional byte stream.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Wait for and read up to `buf.len()` bytes. `Ok(0)` is end-of-stream.
    async fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Read without waiting; fails with `WouldBlock` when nothing is ready.
    fn try_read_into(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    async fn flush(&mut self) -> io::Result<()>;

    /// Resolve once a read is likely to make progress.
    async fn readable(&self) -> io::Result<()>;

    /// Shut the transport down.
    async fn close(&mut self) -> io::Result<()>;

    fn peer_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait]
impl Transport for TcpStream {
    async fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        AsyncReadExt::read(self, buf).await
    }

    fn try_read_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        TcpStream::try_read(self, buf)
    }

    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        AsyncWriteExt::write_all(self, data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        AsyncWriteExt::flush(self).await
    }

    async fn readable(&self) -> io::Result<()> {
        TcpStream::readable(self).await
    }

    async fn close(&mut self) -> io::Result<()> {
        AsyncWriteExt::shutdown(self).await
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        TcpStream::peer_addr(self)
    }
}
