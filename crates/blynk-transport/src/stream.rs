use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

/// A connected broker stream, plain or TLS.
///
/// Wraps either a plain TCP stream or a TLS session over TCP.
pub struct BlynkStream {
    inner: BlynkStreamInner,
}

enum BlynkStreamInner {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl BlynkStream {
    pub(crate) fn plain(stream: TcpStream) -> Self {
        Self {
            inner: BlynkStreamInner::Plain(stream),
        }
    }

    pub(crate) fn tls(stream: TlsStream<TcpStream>) -> Self {
        Self {
            inner: BlynkStreamInner::Tls(Box::new(stream)),
        }
    }

    /// Returns true if the stream is TLS-protected.
    pub fn is_tls(&self) -> bool {
        matches!(self.inner, BlynkStreamInner::Tls(_))
    }

    /// Negotiated TLS version, or `None` for a plain stream.
    pub fn tls_version(&self) -> Option<rustls::ProtocolVersion> {
        match &self.inner {
            BlynkStreamInner::Plain(_) => None,
            BlynkStreamInner::Tls(stream) => stream.get_ref().1.protocol_version(),
        }
    }

    /// Address of the connected broker.
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.tcp().peer_addr()
    }

    /// Local address of the connection.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.tcp().local_addr()
    }

    fn tcp(&self) -> &TcpStream {
        match &self.inner {
            BlynkStreamInner::Plain(stream) => stream,
            BlynkStreamInner::Tls(stream) => stream.get_ref().0,
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match self.inner {
            BlynkStreamInner::Plain(_) => "tcp",
            BlynkStreamInner::Tls(_) => "tls",
        }
    }
}

impl AsyncRead for BlynkStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            BlynkStreamInner::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            BlynkStreamInner::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for BlynkStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut self.get_mut().inner {
            BlynkStreamInner::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            BlynkStreamInner::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            BlynkStreamInner::Plain(stream) => Pin::new(stream).poll_flush(cx),
            BlynkStreamInner::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            BlynkStreamInner::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            BlynkStreamInner::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}

impl std::fmt::Debug for BlynkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlynkStream")
            .field("type", &self.transport_name())
            .field("peer", &self.peer_addr().ok())
            .finish()
    }
}
