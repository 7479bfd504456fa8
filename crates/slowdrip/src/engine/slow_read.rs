//! Slow-read phase: many clients that ask for a value and never take it.
//!
//! Each worker owns one raw connection, writes an inline `GET` for its key and
//! then holds the connection without reading the reply. With N workers the
//! server sits on N unacknowledged responses (some of them many MiB) for the
//! whole idle duration. The store client is deliberately not used here; its
//! buffering and reply handling would hide exactly the behaviour under test.

use crate::engine::hold::{idle_hold, HeldConnectionGuard};
use crate::events::{EventSink, RunEvent};
use crate::protocol::inline_get;
use crate::transport::Dialer;
use slowdrip_common::{key_for, RunConfig};
use std::io;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::task::TaskTracker;

pub async fn slow_fetch<D: Dialer>(
    config: Arc<RunConfig>,
    dialer: Arc<D>,
    events: Arc<dyn EventSink>,
) {
    events.emit(RunEvent::SlowReadStarted {
        workers: config.workers,
        idle: config.idle(),
    });

    let held = Arc::new(AtomicUsize::new(0));
    let tracker = TaskTracker::new();
    for index in 1..=config.workers {
        tracker.spawn(slow_read_worker(
            index,
            Arc::clone(&config),
            Arc::clone(&dialer),
            Arc::clone(&held),
            Arc::clone(&events),
        ));
    }
    tracker.close();
    tracker.wait().await;

    events.emit(RunEvent::SlowReadFinished);
}

async fn slow_read_worker<D: Dialer>(
    index: u32,
    config: Arc<RunConfig>,
    dialer: Arc<D>,
    held: Arc<AtomicUsize>,
    events: Arc<dyn EventSink>,
) {
    if dialer.is_tls() {
        events.emit(RunEvent::TlsDial { index });
    }

    let mut stream = match dialer.dial().await {
        Ok(s) => s,
        Err(e) => {
            events.emit(RunEvent::ConnectFailed {
                index,
                error: e.to_string(),
            });
            return;
        }
    };
    let guard = HeldConnectionGuard::new(&held);
    let key = key_for(index);

    if let Err(e) = send_command(&mut stream, &inline_get(&key)).await {
        events.emit(RunEvent::SendFailed {
            key,
            error: e.to_string(),
        });
        return;
    }
    events.emit(RunEvent::CommandSent { key: key.clone() });

    let held_for = idle_hold(
        &key,
        config.idle(),
        config.heartbeat(),
        &held,
        events.as_ref(),
    )
    .await;

    // Close only after the hold; the pending reply is never read.
    let _ = stream.shutdown().await;
    drop(stream);
    drop(guard);

    events.emit(RunEvent::ConnectionReleased { key, held_for });
}

async fn send_command<W>(stream: &mut W, command: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    stream.write_all(command).await?;
    stream.flush().await
}
