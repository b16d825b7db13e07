//! Overflow policies for consumers that fall behind.

use std::sync::Arc;
use std::time::Duration;

use livequery::config::LoaderConfig;
use livequery::{Inline, LoaderError, Next, Overflow, Ownership, WorkerThread};

use crate::support::{
    TestProvider, artists, artists_query, capacity, flush, loader, recv_handle, touch,
};

#[test]
fn test_latest_closes_displaced_handles() {
    let (registry, provider) = artists();
    let recorder = TestProvider::new(provider);
    let loader = loader(Arc::clone(&recorder), &registry, Inline, LoaderConfig::default());
    let mut stream = loader.stream(artists_query(), Ownership::Consumer, Overflow::Latest);

    touch(&registry);
    touch(&registry);

    let returned = recorder.returned();
    assert_eq!(returned.len(), 3);
    assert_eq!(returned[0].close_count(), 1);
    assert_eq!(returned[1].close_count(), 1);

    let received = stream.try_next().handle().unwrap();
    assert!(Arc::ptr_eq(&received, &returned[2]));
    assert_eq!(received.close_count(), 0);
    assert!(stream.try_next().is_pending());
}

#[test]
fn test_buffer_keeps_everything() {
    let (registry, provider) = artists();
    let loader = loader(provider, &registry, Inline, capacity(1));
    let mut stream = loader.stream(artists_query(), Ownership::Consumer, Overflow::Buffer);

    for _ in 0..4 {
        touch(&registry);
    }
    let mut count = 0;
    while let Next::Handle(handle) = stream.try_next() {
        assert!(!handle.is_closed());
        count += 1;
    }
    assert_eq!(count, 5);
}

#[test]
fn test_error_overflow_terminates() {
    let (registry, provider) = artists();
    let recorder = TestProvider::new(provider);
    let loader = loader(Arc::clone(&recorder), &registry, Inline, capacity(2));
    let mut stream = loader.stream(artists_query(), Ownership::Engine, Overflow::Error);

    touch(&registry);
    touch(&registry);
    assert_eq!(registry.registration_count(), 0);

    let returned = recorder.returned();
    assert_eq!(returned.len(), 3);
    assert_eq!(returned[2].close_count(), 1);

    // Queued handles drain before the error.
    assert!(stream.try_next().handle().is_some());
    assert!(stream.try_next().handle().is_some());
    match stream.try_next() {
        Next::Failed(LoaderError::Overflow { capacity }) => assert_eq!(capacity, 2),
        other => panic!("expected overflow, got {other:?}"),
    }
    assert!(stream.try_next().is_closed());

    stream.cancel();
    for handle in &returned {
        assert_eq!(handle.close_count(), 1);
    }
}

#[tokio::test]
async fn test_block_stalls_reload_until_received() {
    let (registry, provider) = artists();
    let recorder = TestProvider::new(provider);
    let worker = Arc::new(WorkerThread::spawn("block-test").unwrap());
    let loader = loader(
        Arc::clone(&recorder),
        &registry,
        Arc::clone(&worker),
        capacity(1),
    );
    let mut stream = loader.stream(artists_query(), Ownership::Engine, Overflow::Block);
    flush(&worker);

    // The queue is full: this load is held back and later changes wait.
    touch(&registry);
    flush(&worker);
    touch(&registry);
    touch(&registry);
    flush(&worker);
    assert_eq!(recorder.started(), 2);
    assert_eq!(stream.stats().delivered, 0);

    let first = recv_handle(&mut stream).await;
    flush(&worker);
    assert_eq!(recorder.started(), 3);

    let second = recv_handle(&mut stream).await;
    let third = recv_handle(&mut stream).await;
    flush(&worker);
    assert_eq!(recorder.started(), 3);

    let returned = recorder.returned();
    assert!(Arc::ptr_eq(&first, &returned[0]));
    assert!(Arc::ptr_eq(&second, &returned[1]));
    assert!(Arc::ptr_eq(&third, &returned[2]));
    assert_eq!(first.close_count(), 1);
    assert_eq!(second.close_count(), 1);
    assert!(!third.is_closed());
}

#[tokio::test]
async fn test_block_does_not_stall_other_streams() {
    let (registry, provider) = artists();
    let worker = Arc::new(WorkerThread::spawn("block-shared-test").unwrap());
    let loader = loader(
        Arc::clone(&provider),
        &registry,
        Arc::clone(&worker),
        capacity(1),
    );

    let mut lagging = loader.stream(artists_query(), Ownership::Engine, Overflow::Block);
    let mut other = loader.stream(artists_query(), Ownership::Engine, Overflow::Latest);
    recv_handle(&mut other).await;

    // Fill the lagging stream and hold back one more result.
    provider.insert_row("artists", ["5", "Burzum"]).unwrap();
    flush(&worker);
    assert_eq!(recv_handle(&mut other).await.len(), 5);

    let load = loader.single(artists_query());
    let single = tokio::time::timeout(Duration::from_secs(1), load.wait())
        .await
        .expect("single load stalled behind a blocked stream")
        .unwrap();
    assert_eq!(single.len(), 5);

    provider.insert_row("artists", ["6", "Ulver"]).unwrap();
    assert_eq!(recv_handle(&mut other).await.len(), 6);

    // The lagging stream catches up from where it stopped.
    assert_eq!(recv_handle(&mut lagging).await.len(), 4);
    assert_eq!(recv_handle(&mut lagging).await.len(), 5);
    assert_eq!(recv_handle(&mut lagging).await.len(), 6);
}

#[test]
fn test_block_on_inline_scheduler() {
    let (registry, provider) = artists();
    let loader = loader(provider, &registry, Inline, capacity(1));
    let mut stream = loader.stream(artists_query(), Ownership::Consumer, Overflow::Block);

    touch(&registry);
    touch(&registry);
    assert_eq!(stream.stats().loads, 2);

    // Receiving makes room and runs the deferred reload right away.
    assert!(stream.try_next().handle().is_some());
    assert_eq!(stream.stats().loads, 3);
    assert!(stream.try_next().handle().is_some());
    assert!(stream.try_next().handle().is_some());
    assert!(stream.try_next().is_pending());
}

#[tokio::test]
async fn test_cancel_releases_held_handle() {
    let (registry, provider) = artists();
    let recorder = TestProvider::new(provider);
    let worker = Arc::new(WorkerThread::spawn("block-cancel-test").unwrap());
    let loader = loader(
        Arc::clone(&recorder),
        &registry,
        Arc::clone(&worker),
        capacity(1),
    );
    let mut stream = loader.stream(artists_query(), Ownership::Consumer, Overflow::Block);
    flush(&worker);

    touch(&registry);
    flush(&worker);
    touch(&registry);
    flush(&worker);
    stream.cancel();

    let returned = recorder.returned();
    assert_eq!(returned.len(), 2);
    for handle in &returned {
        assert_eq!(handle.close_count(), 1);
    }
    assert!(stream.recv().await.is_none());
}
