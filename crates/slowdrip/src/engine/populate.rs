use crate::error::WriteError;
use crate::events::{EventSink, RunEvent};
use crate::store::StoreClient;
use bytes::Bytes;
use slowdrip_common::{key_for, RunConfig};
use std::sync::Arc;
use tokio_util::task::TaskTracker;

/// Every value is this byte repeated; only the size matters to the server.
pub const FILLER: u8 = b'x';

/// Builds a value of exactly `size` filler bytes.
pub fn materialize_value(size: i64) -> Result<Bytes, WriteError> {
    let len = usize::try_from(size).map_err(|_| WriteError::InvalidSize(size))?;
    Ok(Bytes::from(vec![FILLER; len]))
}

/// Writes `key_1..=key_N` concurrently, one task per key, and returns once
/// every task has finished. Failed writes are reported and otherwise ignored.
pub async fn populate(
    config: Arc<RunConfig>,
    store: Arc<dyn StoreClient>,
    events: Arc<dyn EventSink>,
) {
    events.emit(RunEvent::PopulationStarted {
        workers: config.workers,
    });

    let tracker = TaskTracker::new();
    for index in 1..=config.workers {
        tracker.spawn(populate_worker(
            index,
            Arc::clone(&config),
            Arc::clone(&store),
            Arc::clone(&events),
        ));
    }
    tracker.close();
    tracker.wait().await;

    events.emit(RunEvent::PopulationFinished);
}

async fn populate_worker(
    index: u32,
    config: Arc<RunConfig>,
    store: Arc<dyn StoreClient>,
    events: Arc<dyn EventSink>,
) {
    let key = key_for(index);
    let result = match materialize_value(config.value_size_bytes(index)) {
        Ok(value) => {
            let bytes = value.len();
            store.set(&key, value).await.map(|_| bytes)
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(bytes) => events.emit(RunEvent::KeyWritten { key, bytes }),
        Err(e) => events.emit(RunEvent::WriteFailed {
            key,
            error: e.to_string(),
        }),
    }
}
