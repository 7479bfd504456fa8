use crate::error::ConnectionError;
use crate::transport::stream::EndpointStream;
use crate::transport::tls::insecure_client_config;
use async_trait::async_trait;
use rustls::pki_types::ServerName;
use slowdrip_common::{ConfigurationError, EndpointConfig};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tokio_rustls::TlsConnector;
use tracing::debug;

/// Opens dedicated byte-stream connections to the target store.
///
/// Every call is a single attempt; callers decide what a failure means.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    async fn dial(&self) -> Result<Self::Stream, ConnectionError>;

    fn is_tls(&self) -> bool {
        false
    }
}

/// Rejects endpoints the dialer could never connect to as configured: a TLS
/// endpoint needs a host that is usable as a TLS server name.
pub fn check_endpoint(endpoint: &EndpointConfig) -> Result<(), ConfigurationError> {
    if endpoint.security.is_tls() && ServerName::try_from(endpoint.host.as_str()).is_err() {
        return Err(ConfigurationError::Invalid {
            field: "endpoint.host",
            reason: format!("{:?} is not a valid TLS server name", endpoint.host),
        });
    }
    Ok(())
}

/// Dials the configured endpoint over TCP, optionally wrapped in TLS.
pub struct TcpDialer {
    address: String,
    server_name: Option<ServerName<'static>>,
    tls: Option<TlsConnector>,
    connect_timeout: Duration,
}

impl TcpDialer {
    pub fn new(
        endpoint: &EndpointConfig,
        connect_timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        let (server_name, tls) = if endpoint.security.is_tls() {
            let name = ServerName::try_from(endpoint.host.clone())
                .map_err(|_| ConnectionError::InvalidServerName(endpoint.host.clone()))?;
            let connector = TlsConnector::from(insecure_client_config()?);
            (Some(name), Some(connector))
        } else {
            (None, None)
        };

        Ok(Self {
            address: endpoint.address(),
            server_name,
            tls,
            connect_timeout,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn connect(&self) -> Result<EndpointStream, ConnectionError> {
        let tcp = TcpStream::connect(&self.address).await?;
        tcp.set_nodelay(true)?;

        match (&self.tls, &self.server_name) {
            (Some(connector), Some(name)) => {
                let stream = connector.connect(name.clone(), tcp).await?;
                Ok(EndpointStream::from(stream))
            }
            _ => Ok(EndpointStream::from(tcp)),
        }
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    type Stream = EndpointStream;

    async fn dial(&self) -> Result<EndpointStream, ConnectionError> {
        debug!("Attempting connect to {}", self.address);
        match timeout(self.connect_timeout, self.connect()).await {
            Ok(stream) => {
                let s = stream?;
                debug!("Connected to {} (tls: {})", self.address, s.is_tls());
                Ok(s)
            }
            Err(_) => Err(ConnectionError::Timeout(self.connect_timeout)),
        }
    }

    fn is_tls(&self) -> bool {
        self.tls.is_some()
    }
}
