use pin_project_lite::pin_project;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

pin_project! {
    /// A connection to the target store, either plain TCP or TLS over TCP.
    #[project = EndpointStreamProj]
    pub enum EndpointStream {
        Plain { #[pin] inner: TcpStream },
        Tls { #[pin] inner: TlsStream<TcpStream> },
    }
}

impl EndpointStream {
    pub fn is_tls(&self) -> bool {
        matches!(self, EndpointStream::Tls { .. })
    }
}

impl From<TcpStream> for EndpointStream {
    fn from(inner: TcpStream) -> Self {
        EndpointStream::Plain { inner }
    }
}

impl From<TlsStream<TcpStream>> for EndpointStream {
    fn from(inner: TlsStream<TcpStream>) -> Self {
        EndpointStream::Tls { inner }
    }
}

impl AsyncRead for EndpointStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.project() {
            EndpointStreamProj::Plain { inner } => inner.poll_read(cx, buf),
            EndpointStreamProj::Tls { inner } => inner.poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for EndpointStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.project() {
            EndpointStreamProj::Plain { inner } => inner.poll_write(cx, buf),
            EndpointStreamProj::Tls { inner } => inner.poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.project() {
            EndpointStreamProj::Plain { inner } => inner.poll_flush(cx),
            EndpointStreamProj::Tls { inner } => inner.poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.project() {
            EndpointStreamProj::Plain { inner } => inner.poll_shutdown(cx),
            EndpointStreamProj::Tls { inner } => inner.poll_shutdown(cx),
        }
    }
}
