//! Idle hold for stalled connections.
//!
//! A slow-read worker sends its command and then sits on the connection
//! without reading. The hold is a series of short sleeps rather than one long
//! one, with a heartbeat event after every sleep, so an operator can watch the
//! stalled connections while the server is under pressure.

use crate::events::{EventSink, RunEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration, Instant};

/// Counts a connection as held for as long as the guard lives.
pub struct HeldConnectionGuard {
    held: Arc<AtomicUsize>,
}

impl HeldConnectionGuard {
    pub fn new(held: &Arc<AtomicUsize>) -> Self {
        held.fetch_add(1, Ordering::SeqCst);
        Self {
            held: Arc::clone(held),
        }
    }
}

impl Drop for HeldConnectionGuard {
    fn drop(&mut self) {
        self.held.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Sleeps for `idle` in steps of at most `heartbeat`, emitting one heartbeat
/// per step. The last step is shortened so the hold never exceeds `idle` by
/// more than timer slack, and never falls short of it.
///
/// Returns the time actually spent holding.
pub async fn idle_hold(
    key: &str,
    idle: Duration,
    heartbeat: Duration,
    held: &AtomicUsize,
    events: &dyn EventSink,
) -> Duration {
    let start = Instant::now();
    let mut tick = 0u64;

    loop {
        let elapsed = start.elapsed();
        if elapsed >= idle {
            return elapsed;
        }

        sleep(heartbeat.min(idle - elapsed)).await;
        tick += 1;
        events.emit(RunEvent::Heartbeat {
            key: key.to_string(),
            tick,
            held: held.load(Ordering::SeqCst),
        });
    }
}
