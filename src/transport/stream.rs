//! Stream transport with "write exactly" and "read exactly" primitives.
//!
//! # Example
//!
//! ```ignore
//! use betwire_client::transport::Transport;
//!
//! let mut transport = Transport::connect("server:12345").await?;
//! transport.send_all(&batch).await?;
//! let length = transport.receive_exact(2).await?;
//! transport.close().await;
//! ```

use std::io;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

use crate::error::{BetwireError, Result, Stage};

/// Exclusively owned connection to the server.
///
/// All reads and writes go through this type. The stream is released by
/// [`Transport::close`], which is idempotent; dropping the transport also
/// releases it.
pub struct Transport<S = TcpStream> {
    /// Connected stream, `None` once closed.
    stream: Option<S>,
    /// Bytes read from the stream but not consumed yet.
    pending: BytesMut,
}

impl Transport<TcpStream> {
    /// Open a TCP connection to `addr`.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| BetwireError::connection(Stage::Connect, e))?;
        Ok(Self::new(stream))
    }
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
            pending: BytesMut::new(),
        }
    }

    /// Write the whole buffer, looping over partial writes.
    ///
    /// A write that accepts zero bytes means the peer is gone.
    pub async fn send_all(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream_mut(Stage::Send)?;

        let mut written = 0;
        while written < data.len() {
            let n = stream
                .write(&data[written..])
                .await
                .map_err(|e| BetwireError::connection(Stage::Send, e))?;
            if n == 0 {
                return Err(BetwireError::connection(
                    Stage::Send,
                    io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("write returned 0 after {} of {} bytes", written, data.len()),
                    ),
                ));
            }
            written += n;
        }

        stream
            .flush()
            .await
            .map_err(|e| BetwireError::connection(Stage::Send, e))
    }

    /// Read exactly `n` bytes, looping over partial reads.
    ///
    /// Never returns a short buffer: EOF before `n` bytes is an error.
    pub async fn receive_exact(&mut self, n: usize) -> Result<Bytes> {
        while self.pending.len() < n {
            let missing = n - self.pending.len();
            self.fill(missing, n).await?;
        }
        Ok(self.pending.split_to(n).freeze())
    }

    /// Read between 1 and `max` bytes.
    ///
    /// Buffered bytes are returned first without touching the stream.
    pub async fn receive_some(&mut self, max: usize) -> Result<Bytes> {
        if max == 0 {
            return Ok(Bytes::new());
        }
        if self.pending.is_empty() {
            self.fill(max, max).await?;
        }
        let take = self.pending.len().min(max);
        Ok(self.pending.split_to(take).freeze())
    }

    /// Push bytes back so the next receive returns them first.
    pub fn unread(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let mut restored = BytesMut::with_capacity(data.len() + self.pending.len());
        restored.extend_from_slice(data);
        restored.extend_from_slice(&self.pending);
        self.pending = restored;
    }

    /// Release the stream. Safe to call more than once.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("Shutdown on close failed: {}", e);
            }
            self.pending.clear();
            debug!(action = "close_socket", result = "success");
        }
    }

    /// Whether [`Transport::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// One read of up to `want` bytes appended to `pending`.
    async fn fill(&mut self, want: usize, target: usize) -> Result<()> {
        let have = self.pending.len();
        let stream = self.stream_mut(Stage::Receive)?;

        let mut buf = vec![0u8; want];
        let n = stream
            .read(&mut buf)
            .await
            .map_err(|e| BetwireError::connection(Stage::Receive, e))?;
        if n == 0 {
            return Err(BetwireError::connection(
                Stage::Receive,
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "connection closed after {} of {} bytes",
                        have, target
                    ),
                ),
            ));
        }

        self.pending.extend_from_slice(&buf[..n]);
        Ok(())
    }

    fn stream_mut(&mut self, stage: Stage) -> Result<&mut S> {
        self.stream.as_mut().ok_or_else(|| {
            BetwireError::connection(
                stage,
                io::Error::new(io::ErrorKind::NotConnected, "transport is closed"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::duplex;
    use tokio_test::io::Builder;

    /// Stream whose writes always report zero bytes written.
    struct ZeroWriter;

    impl AsyncRead for ZeroWriter {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for ZeroWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Ok(0))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_send_all_loops_over_partial_writes() {
        let mock = Builder::new().write(b"hel").write(b"lo wo").write(b"rld").build();
        let mut transport = Transport::new(mock);

        transport.send_all(b"hello world").await.unwrap();
    }

    #[tokio::test]
    async fn test_send_all_zero_write_is_connection_error() {
        let mut transport = Transport::new(ZeroWriter);
        let err = transport.send_all(b"data").await.unwrap_err();

        assert!(err.is_connection());
        assert_eq!(err.stage(), Some(Stage::Send));
        match err {
            BetwireError::Connection { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::WriteZero)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_receive_exact_from_tiny_chunks() {
        let mock = Builder::new()
            .read(b"a")
            .read(b"bc")
            .read(b"d")
            .read(b"efg")
            .build();
        let mut transport = Transport::new(mock);

        let data = transport.receive_exact(7).await.unwrap();
        assert_eq!(&data[..], b"abcdefg");
    }

    #[tokio::test]
    async fn test_receive_exact_short_stream_fails() {
        let (client, mut server) = duplex(64);
        server.write_all(b"abc").await.unwrap();
        drop(server);

        let mut transport = Transport::new(client);
        let err = transport.receive_exact(5).await.unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Receive));
        assert!(err.to_string().contains("after 3 of 5 bytes"));
    }

    #[tokio::test]
    async fn test_receive_exact_keeps_surplus_for_next_read() {
        let mock = Builder::new().read(b"abcdef").build();
        let mut transport = Transport::new(mock);

        assert_eq!(&transport.receive_exact(2).await.unwrap()[..], b"ab");
        assert_eq!(&transport.receive_exact(4).await.unwrap()[..], b"cdef");
    }

    #[tokio::test]
    async fn test_receive_some_and_unread() {
        let mock = Builder::new().read(b"abcd").read(b"ef").build();
        let mut transport = Transport::new(mock);

        let first = transport.receive_some(3).await.unwrap();
        assert_eq!(&first[..], b"abc");

        transport.unread(b"bc");
        assert_eq!(&transport.receive_some(10).await.unwrap()[..], b"bc");
        assert_eq!(&transport.receive_exact(3).await.unwrap()[..], b"def");
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (client, _server) = duplex(64);
        let mut transport = Transport::new(client);

        transport.close().await;
        assert!(transport.is_closed());
        transport.close().await;
        assert!(transport.is_closed());

        let err = transport.send_all(b"x").await.unwrap_err();
        assert!(err.is_connection());
        assert!(transport.receive_exact(1).await.is_err());
    }
}
