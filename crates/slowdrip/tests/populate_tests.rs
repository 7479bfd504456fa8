mod common;

use common::{config, FakeStore, RecordingSink, StoreOp};
use slowdrip::engine::populate::{materialize_value, FILLER};
use slowdrip::{populate, RunEvent, WriteError};
use std::sync::Arc;
use std::time::Duration;

const MIB: usize = 1_048_576;

#[tokio::test]
async fn writes_increasing_sizes_per_key() {
    let store = Arc::new(FakeStore::default());
    let sink = Arc::new(RecordingSink::default());

    populate(Arc::new(config(3, 1, 1, 0)), store.clone(), sink.clone()).await;

    let contents = store.contents();
    assert_eq!(contents.len(), 3);
    assert_eq!(contents["key_1"].len(), MIB);
    assert_eq!(contents["key_2"].len(), 2 * MIB);
    assert_eq!(contents["key_3"].len(), 3 * MIB);
    assert!(contents["key_3"].iter().all(|&b| b == FILLER));

    let written = sink.written();
    assert_eq!(written["key_2"], 2 * MIB);
    assert_eq!(sink.count(|e| matches!(e, RunEvent::PopulationFinished)), 1);
}

#[tokio::test]
async fn sizes_are_byte_exact_for_every_worker() {
    let store = Arc::new(FakeStore::default());
    let sink = Arc::new(RecordingSink::default());
    let cfg = config(6, 2, 1, 0);

    populate(Arc::new(cfg.clone()), store.clone(), sink).await;

    let contents = store.contents();
    for i in 1..=6u32 {
        let expected = (2 + (i as usize - 1)) * MIB;
        assert_eq!(contents[&format!("key_{}", i)].len(), expected, "key_{}", i);
        assert_eq!(cfg.value_size_bytes(i), expected as i64);
    }
}

#[tokio::test]
async fn failing_worker_does_not_stop_siblings() {
    let store = Arc::new(FakeStore::failing_key("key_2"));
    let sink = Arc::new(RecordingSink::default());

    populate(Arc::new(config(4, 1, 0, 0)), store.clone(), sink.clone()).await;

    assert_eq!(store.sets(), 4, "every worker attempted its write");
    assert_eq!(sink.written().len(), 3);
    let failures: Vec<_> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            RunEvent::WriteFailed { key, error } => Some((key, error)),
            _ => None,
        })
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "key_2");
    assert!(failures[0].1.contains("OOM"), "error was {}", failures[0].1);
}

#[tokio::test(start_paused = true)]
async fn returns_only_after_every_write_finished() {
    let store = Arc::new(FakeStore::slow(Duration::from_secs(3)));
    let sink = Arc::new(RecordingSink::default());
    let start = tokio::time::Instant::now();

    populate(Arc::new(config(5, 0, 0, 0)), store.clone(), sink.clone()).await;

    assert_eq!(store.sets(), 5);
    assert_eq!(sink.written().len(), 5);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(3));
    // All writes ran at once rather than one after another.
    assert!(elapsed < Duration::from_secs(6), "took {:?}", elapsed);
}

#[tokio::test]
async fn second_run_overwrites_the_same_keys() {
    let store = Arc::new(FakeStore::default());
    let sink = Arc::new(RecordingSink::default());
    let cfg = Arc::new(config(3, 1, 1, 0));

    populate(cfg.clone(), store.clone(), sink.clone()).await;
    let first = store.contents();
    populate(cfg, store.clone(), sink).await;
    let second = store.contents();

    assert_eq!(store.sets(), 6);
    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 3);
    for (key, value) in &first {
        assert_eq!(second[key].len(), value.len());
    }
}

#[tokio::test]
async fn zero_sized_values_are_still_written() {
    let store = Arc::new(FakeStore::default());
    let sink = Arc::new(RecordingSink::default());

    populate(Arc::new(config(2, 1, -1, 0)), store.clone(), sink.clone()).await;

    assert!(store.ops().contains(&StoreOp::Set {
        key: "key_2".to_string(),
        len: 0
    }));
    assert_eq!(sink.written()["key_2"], 0);
}

#[tokio::test]
async fn negative_size_fails_only_that_worker() {
    // Not validated on purpose: the driver must survive a bad size.
    let store = Arc::new(FakeStore::default());
    let sink = Arc::new(RecordingSink::default());

    populate(Arc::new(config(3, 1, -1, 0)), store.clone(), sink.clone()).await;

    assert_eq!(store.sets(), 2);
    assert_eq!(
        sink.count(|e| matches!(e, RunEvent::WriteFailed { key, .. } if key == "key_3")),
        1
    );
}

#[test]
fn materialize_value_rejects_negative_sizes() {
    assert_eq!(materialize_value(0).unwrap().len(), 0);
    assert_eq!(&materialize_value(5).unwrap()[..], b"xxxxx");
    assert!(matches!(
        materialize_value(-(MIB as i64)),
        Err(WriteError::InvalidSize(-1_048_576))
    ));
}
