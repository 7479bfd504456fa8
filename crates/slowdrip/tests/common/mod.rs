#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use redis::{ErrorKind, RedisError};
use slowdrip::{
    ConnectionError, Dialer, EventSink, FlushError, RunEvent, StoreClient, WriteError,
};
use slowdrip_common::{EndpointConfig, RunConfig, TransportSecurity};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{duplex, DuplexStream};

pub fn config(workers: u32, initial_size_mib: i64, delta_mib: i64, idle_secs: u64) -> RunConfig {
    let endpoint = EndpointConfig {
        host: "127.0.0.1".to_string(),
        port: 6379,
        security: TransportSecurity::Plain,
    };
    let mut config = RunConfig::new(endpoint, workers);
    config.initial_size_mib = initial_size_mib;
    config.delta_mib = delta_mib;
    config.idle_secs = idle_secs;
    config
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RunEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&RunEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|&e| pred(e)).count()
    }

    pub fn heartbeats_for(&self, key: &str) -> usize {
        self.count(|e| matches!(e, RunEvent::Heartbeat { key: k, .. } if k == key))
    }

    pub fn written(&self) -> HashMap<String, usize> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                RunEvent::KeyWritten { key, bytes } => Some((key.clone(), *bytes)),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: RunEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Flush,
    Set { key: String, len: usize },
}

/// In-process store that records every call.
#[derive(Default)]
pub struct FakeStore {
    ops: Mutex<Vec<StoreOp>>,
    contents: Mutex<HashMap<String, Bytes>>,
    fail_key: Option<String>,
    fail_flush: bool,
    set_delay: Option<Duration>,
}

impl FakeStore {
    pub fn failing_key(key: &str) -> Self {
        Self {
            fail_key: Some(key.to_string()),
            ..Self::default()
        }
    }

    pub fn failing_flush() -> Self {
        Self {
            fail_flush: true,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            set_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn ops(&self) -> Vec<StoreOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn flushes(&self) -> usize {
        self.ops().iter().filter(|op| **op == StoreOp::Flush).count()
    }

    pub fn sets(&self) -> usize {
        self.ops()
            .iter()
            .filter(|op| matches!(op, StoreOp::Set { .. }))
            .count()
    }

    pub fn contents(&self) -> HashMap<String, Bytes> {
        self.contents.lock().unwrap().clone()
    }
}

#[async_trait]
impl StoreClient for FakeStore {
    async fn set(&self, key: &str, value: Bytes) -> Result<(), WriteError> {
        if let Some(delay) = self.set_delay {
            tokio::time::sleep(delay).await;
        }
        self.ops.lock().unwrap().push(StoreOp::Set {
            key: key.to_string(),
            len: value.len(),
        });
        if self.fail_key.as_deref() == Some(key) {
            return Err(WriteError::Command(RedisError::from((
                ErrorKind::ResponseError,
                "OOM command not allowed",
            ))));
        }
        self.contents.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn flush_all(&self) -> Result<(), FlushError> {
        self.ops.lock().unwrap().push(StoreOp::Flush);
        if self.fail_flush {
            return Err(FlushError::Command(RedisError::from((
                ErrorKind::ResponseError,
                "ERR flush refused",
            ))));
        }
        self.contents.lock().unwrap().clear();
        Ok(())
    }
}

/// Hands out in-memory connections and keeps the server ends for inspection.
/// The `fail_on`-th dial (1-based, in call order) is refused. A `broken`
/// dialer drops the server end immediately, so every write fails.
#[derive(Default)]
pub struct DuplexDialer {
    dials: AtomicU32,
    fail_on: Option<u32>,
    broken: bool,
    server_ends: Mutex<Vec<DuplexStream>>,
}

impl DuplexDialer {
    pub fn failing_on(nth: u32) -> Self {
        Self {
            fail_on: Some(nth),
            ..Self::default()
        }
    }

    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    pub fn dials(&self) -> u32 {
        self.dials.load(Ordering::SeqCst)
    }

    pub fn take_server_ends(&self) -> Vec<DuplexStream> {
        std::mem::take(&mut *self.server_ends.lock().unwrap())
    }
}

#[async_trait]
impl Dialer for DuplexDialer {
    type Stream = DuplexStream;

    async fn dial(&self) -> Result<DuplexStream, ConnectionError> {
        let nth = self.dials.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on == Some(nth) {
            return Err(ConnectionError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "simulated dial failure",
            )));
        }
        let (client, server) = duplex(1024);
        if !self.broken {
            self.server_ends.lock().unwrap().push(server);
        }
        Ok(client)
    }
}
