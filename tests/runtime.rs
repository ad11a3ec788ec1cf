// tests/runtime.rs

mod common;
use crate::common::fakes::{FakeDispatcher, FakeMetadataClient};
use crate::common::{init_tracing, with_timeout};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use watchhook::engine::{spawn_ticker, PollCycle, PollSettings, Runtime, RuntimeEvent, RuntimeOptions};
use watchhook::store::MemoryWatchStore;
use watchhook::types::RemoteTimestamp;
use watchhook::watch::WatchEntry;

fn setup() -> (FakeMetadataClient, FakeDispatcher, Arc<MemoryWatchStore>, PollCycle) {
    init_tracing();
    let client = FakeMetadataClient::new();
    client.set_modified("repo", "proj", 100);
    let dispatcher = FakeDispatcher::new();
    let store = Arc::new(MemoryWatchStore::new(vec![WatchEntry::new(
        "site",
        "repo",
        "proj",
        "http://hook/{project_modified}",
    )]));
    let cycle = PollCycle::new(
        Arc::new(client.clone()),
        Arc::new(dispatcher.clone()),
        store.clone(),
        PollSettings::default(),
    );
    (client, dispatcher, store, cycle)
}

#[tokio::test]
async fn once_mode_exits_after_the_requested_cycle() {
    let (_client, dispatcher, store, cycle) = setup();
    let (tx, rx) = mpsc::channel(8);

    tx.send(RuntimeEvent::RunRequested { force: false }).await.unwrap();
    let runtime = Runtime::new(cycle, rx, RuntimeOptions { exit_when_idle: true });
    let reports = with_timeout(runtime.run()).await.unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].notified(), 1);
    assert_eq!(dispatcher.urls(), vec!["http://hook/100".to_string()]);
    assert_eq!(
        store.get("site").await.unwrap().last_observed_modified,
        Some(RemoteTimestamp::from_millis(100))
    );
}

#[tokio::test]
async fn shutdown_waits_for_in_flight_cycles() {
    let (_client, dispatcher, store, cycle) = setup();
    dispatcher.set_delay(Duration::from_millis(100));
    let (tx, rx) = mpsc::channel(8);

    tx.send(RuntimeEvent::Tick).await.unwrap();
    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    // Never processed: shutdown comes first.
    tx.send(RuntimeEvent::RunRequested { force: true }).await.unwrap();

    let runtime = Runtime::new(cycle, rx, RuntimeOptions { exit_when_idle: false });
    let reports = with_timeout(runtime.run()).await.unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(dispatcher.call_count(), 1);
    assert_eq!(
        store.get("site").await.unwrap().last_observed_modified,
        Some(RemoteTimestamp::from_millis(100))
    );
}

#[tokio::test]
async fn closed_channel_stops_the_runtime() {
    let (_client, _dispatcher, _store, cycle) = setup();
    let (tx, rx) = mpsc::channel(8);
    drop(tx);

    let runtime = Runtime::new(cycle, rx, RuntimeOptions { exit_when_idle: false });
    let reports = with_timeout(runtime.run()).await.unwrap();
    assert!(reports.is_empty());
}

#[tokio::test]
async fn ticks_drive_repeated_cycles() {
    let (client, dispatcher, _store, cycle) = setup();
    let (tx, rx) = mpsc::channel(8);

    let ticker = spawn_ticker(Duration::from_millis(20), tx.clone(), false);
    let runtime = tokio::spawn(Runtime::new(cycle, rx, RuntimeOptions { exit_when_idle: false }).run());

    tokio::time::sleep(Duration::from_millis(150)).await;
    ticker.abort();
    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();

    let reports = with_timeout(runtime).await.unwrap().unwrap();
    assert!(reports.len() >= 2, "expected several cycles, got {}", reports.len());
    assert!(client.calls("repo", "proj") >= 2);
    // Only the first cycle saw a change.
    assert_eq!(dispatcher.call_count(), 1);
}
