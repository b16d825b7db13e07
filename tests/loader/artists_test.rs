//! End to end: a live artists list reacting to an insert.

use std::sync::Arc;

use livequery::config::LoaderConfig;
use livequery::{Overflow, Ownership, ResourceHandle, WorkerThread};

use crate::support::{artists, artists_query, loader, names, recv_handle};

#[tokio::test]
async fn test_artists_live_list() {
    let (registry, provider) = artists();
    let loader = loader(
        Arc::clone(&provider),
        &registry,
        WorkerThread::spawn("artists-test").unwrap(),
        LoaderConfig::default(),
    );
    let mut stream = loader.stream(artists_query(), Ownership::Engine, Overflow::Latest);

    let first = recv_handle(&mut stream).await;
    assert_eq!(first.columns(), ["_id", "name"]);
    assert_eq!(
        names(&first),
        ["Darkspace", "KMFDM", "Mechina", "Paysage d'Hiver"]
    );

    provider.insert_row("artists", ["5", "Burzum"]).unwrap();
    let second = recv_handle(&mut stream).await;
    assert_eq!(
        names(&second),
        ["Burzum", "Darkspace", "KMFDM", "Mechina", "Paysage d'Hiver"]
    );
    assert_eq!(first.close_count(), 1);
    assert!(!second.is_closed());

    stream.cancel();
    assert_eq!(first.close_count(), 1);
    assert_eq!(second.close_count(), 1);
    assert_eq!(stream.stats().delivered, 2);
    assert_eq!(registry.registration_count(), 0);
}

#[tokio::test]
async fn test_artists_consumer_owned() {
    let (registry, provider) = artists();
    let loader = loader(
        Arc::clone(&provider),
        &registry,
        WorkerThread::spawn("artists-consumer-test").unwrap(),
        LoaderConfig::default(),
    );
    let mut stream = loader.unbounded(artists_query(), Ownership::Consumer);

    let first = recv_handle(&mut stream).await;
    provider
        .replace_rows("artists", [["1", "Darkspace"], ["2", "Mechina"]])
        .unwrap();
    let second = recv_handle(&mut stream).await;
    assert_eq!(names(&second), ["Darkspace", "Mechina"]);
    assert_eq!(first.close_count(), 0);

    // Closing is the consumer's job here.
    first.close();
    second.close();
    drop(stream);
    assert_eq!(first.close_count(), 1);
    assert_eq!(second.close_count(), 1);
}
