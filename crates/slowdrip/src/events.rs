//! Run events and the sink they are reported through.
//!
//! Drivers never log directly. Everything an operator needs to follow a run
//! (keys written, connection failures, idle-hold heartbeats) is emitted as a
//! [`RunEvent`] into an [`EventSink`]. The binary installs [`TracingSink`];
//! tests install a recording sink and assert on the captured events.

use crate::engine::orchestrator::Phase;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    PhaseEntered(Phase),
    FlushSkipped,
    PopulationStarted { workers: u32 },
    KeyWritten { key: String, bytes: usize },
    WriteFailed { key: String, error: String },
    PopulationFinished,
    SlowReadStarted { workers: u32, idle: Duration },
    TlsDial { index: u32 },
    ConnectFailed { index: u32, error: String },
    SendFailed { key: String, error: String },
    CommandSent { key: String },
    /// One idle-hold tick for `key`; `held` is the number of connections the
    /// phase holds open at that moment.
    Heartbeat { key: String, tick: u64, held: usize },
    ConnectionReleased { key: String, held_for: Duration },
    SlowReadFinished,
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: RunEvent);
}

/// Forwards events to `tracing` as structured records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: RunEvent) {
        match event {
            RunEvent::PhaseEntered(phase) => info!(phase = ?phase, "Phase reached"),
            RunEvent::FlushSkipped => info!("Flush skipped by configuration"),
            RunEvent::PopulationStarted { workers } => {
                info!(workers = workers, "Starting population stage")
            }
            RunEvent::KeyWritten { key, bytes } => {
                info!(key = %key, bytes = bytes, "Set key")
            }
            RunEvent::WriteFailed { key, error } => {
                warn!(key = %key, error = %error, "Error setting key")
            }
            RunEvent::PopulationFinished => info!("Population stage complete"),
            RunEvent::SlowReadStarted { workers, idle } => {
                info!(workers = workers, idle_secs = idle.as_secs(), "Starting slow-read stage")
            }
            RunEvent::TlsDial { index } => {
                debug!(key = %crate::key_for(index), "Using TLS connection")
            }
            RunEvent::ConnectFailed { index, error } => {
                warn!(key = %crate::key_for(index), error = %error, "Error connecting to store")
            }
            RunEvent::SendFailed { key, error } => {
                warn!(key = %key, error = %error, "Error sending GET command")
            }
            RunEvent::CommandSent { key } => info!(key = %key, "Sent GET command"),
            RunEvent::Heartbeat { key, tick, held } => {
                info!(key = %key, tick = tick, held_connections = held, "Holding connection")
            }
            RunEvent::ConnectionReleased { key, held_for } => {
                debug!(key = %key, held_ms = held_for.as_millis() as u64, "Connection released")
            }
            RunEvent::SlowReadFinished => info!("Slow-read stage complete"),
        }
    }
}
