use crate::error::{FlushError, WriteError};
use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::MultiplexedConnection;
use redis::{Client, ErrorKind, RedisError};
use slowdrip_common::{EndpointConfig, TransportSecurity};
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// Structured access to the target store, shared by every population worker.
///
/// Implementations must keep concurrent calls from interleaving their frames.
#[async_trait]
pub trait StoreClient: Send + Sync + 'static {
    async fn set(&self, key: &str, value: Bytes) -> Result<(), WriteError>;

    async fn flush_all(&self) -> Result<(), FlushError>;
}

/// `StoreClient` over a shared multiplexed Redis connection.
///
/// The connection is opened on first use. Each command is written to the socket
/// as a whole frame, so concurrent `set` calls never interleave. A command that
/// fails because the socket went away discards the shared connection, and the
/// next call opens a fresh one. Connects are not serialized: callers racing on
/// an empty slot each dial, and the first to finish is kept.
pub struct RedisStore {
    client: Client,
    slot: Mutex<Slot>,
    connect_timeout: Duration,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    conn: Option<MultiplexedConnection>,
}

impl RedisStore {
    pub fn new(endpoint: &EndpointConfig, connect_timeout: Duration) -> Result<Self, RedisError> {
        let url = connection_url(endpoint);
        if endpoint.security.is_tls() {
            info!("Using TLS without certificate verification for store client");
        }
        Ok(Self {
            client: Client::open(url)?,
            slot: Mutex::new(Slot::default()),
            connect_timeout,
        })
    }

    /// Returns the shared connection and its generation, dialing if none is
    /// cached. The lock is never held across the dial.
    async fn connection(&self) -> Result<(u64, MultiplexedConnection), RedisError> {
        if let Some(conn) = self.slot.lock().await.current() {
            return Ok(conn);
        }

        debug!("Opening multiplexed store connection");
        let conn = match timeout(
            self.connect_timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        {
            Ok(conn) => conn?,
            Err(_) => {
                return Err(RedisError::from((
                    ErrorKind::IoError,
                    "store connect timed out",
                )))
            }
        };

        let mut slot = self.slot.lock().await;
        if let Some(existing) = slot.current() {
            return Ok(existing);
        }
        slot.generation += 1;
        slot.conn = Some(conn.clone());
        Ok((slot.generation, conn))
    }

    /// Drops the cached connection if it is still the one that failed.
    async fn discard(&self, generation: u64, error: &RedisError) {
        if !connection_lost(error) {
            return;
        }
        let mut slot = self.slot.lock().await;
        if slot.generation == generation && slot.conn.take().is_some() {
            warn!(error = %error, "Store connection lost, reconnecting on next call");
        }
    }
}

impl Slot {
    fn current(&self) -> Option<(u64, MultiplexedConnection)> {
        self.conn.as_ref().map(|c| (self.generation, c.clone()))
    }
}

fn connection_lost(error: &RedisError) -> bool {
    error.is_io_error() || error.is_connection_dropped()
}

#[async_trait]
impl StoreClient for RedisStore {
    async fn set(&self, key: &str, value: Bytes) -> Result<(), WriteError> {
        let (generation, mut conn) = self.connection().await.map_err(WriteError::Connection)?;
        let result: Result<(), RedisError> = redis::cmd("SET")
            .arg(key)
            .arg(&value[..])
            .query_async(&mut conn)
            .await;
        if let Err(e) = &result {
            self.discard(generation, e).await;
        }
        result.map_err(WriteError::Command)
    }

    async fn flush_all(&self) -> Result<(), FlushError> {
        let (generation, mut conn) = self.connection().await.map_err(FlushError::Connection)?;
        let result: Result<(), RedisError> = redis::cmd("FLUSHALL").query_async(&mut conn).await;
        if let Err(e) = &result {
            self.discard(generation, e).await;
        }
        result.map_err(FlushError::Command)
    }
}

/// Builds the client URL for `endpoint`. TLS endpoints carry the `#insecure`
/// marker, which disables certificate verification in the Redis client.
pub fn connection_url(endpoint: &EndpointConfig) -> String {
    let host = if endpoint.host.contains(':') {
        format!("[{}]", endpoint.host)
    } else {
        endpoint.host.clone()
    };
    match endpoint.security {
        TransportSecurity::Plain => format!("redis://{}:{}/", host, endpoint.port),
        TransportSecurity::TlsNoVerify => {
            format!("rediss://{}:{}/#insecure", host, endpoint.port)
        }
    }
}
