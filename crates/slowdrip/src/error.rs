use std::io;
use std::time::Duration;
use thiserror::Error;

/// Failure to open a transport connection to the target store.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("connect failed: {0}")]
    Io(#[from] io::Error),
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid TLS server name {0:?}")]
    InvalidServerName(String),
    #[error("TLS setup failed: {0}")]
    Tls(#[from] rustls::Error),
}

/// Failure of a single `SET` issued by a population worker.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("store connection failed: {0}")]
    Connection(#[source] redis::RedisError),
    #[error("SET rejected: {0}")]
    Command(#[from] redis::RedisError),
    #[error("computed value size {0} bytes is negative")]
    InvalidSize(i64),
}

#[derive(Debug, Error)]
pub enum FlushError {
    #[error("store connection failed: {0}")]
    Connection(#[source] redis::RedisError),
    #[error("FLUSHALL rejected: {0}")]
    Command(#[from] redis::RedisError),
}

/// Errors that abort the whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("flush failed: {0}")]
    Flush(#[from] FlushError),
}
