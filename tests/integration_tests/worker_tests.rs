// Scan worker tests: a single worker wired to its own event channel

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use wallet_scanner::services::mock::{FailingKeyGenerator, FixedKeyGenerator, MapBalanceSource};
use wallet_scanner::services::scanner::{ScanWorker, WorkerEvent, WorkerState, event_channel};

use crate::test_utils::{
    KEY_ONE, KEY_ONE_ADDRESS, KEY_TWO, fast_settings, fixed_generator, oracle_with_primary,
};

#[tokio::test]
async fn test_worker_reports_found_and_batched_attempts() {
    let balances = MapBalanceSource::new();
    balances.set_balance(KEY_ONE_ADDRESS, 1234);
    let generator = Arc::new(
        FixedKeyGenerator::from_hex(&[KEY_ONE, KEY_TWO, KEY_TWO])
            .unwrap()
            .once(),
    );

    let (events, mut receiver) = event_channel(64);
    let (stop, stop_rx) = watch::channel(false);
    let handle = ScanWorker::new(
        7,
        generator.clone(),
        oracle_with_primary(balances),
        fast_settings(),
        events,
    )
    .spawn(stop_rx);

    let mut found = Vec::new();
    let mut attempts = 0;
    let mut errors = 0;
    while errors == 0 {
        match tokio::time::timeout(Duration::from_secs(2), receiver.recv()).await {
            Ok(Some(WorkerEvent::Found { worker_id, candidate })) => {
                assert_eq!(worker_id, Some(7));
                found.push(candidate);
            }
            Ok(Some(WorkerEvent::Attempt { count, .. })) => attempts += count,
            Ok(Some(WorkerEvent::Error { message, .. })) => {
                assert!(message.contains("exhausted"));
                errors += 1;
            }
            other => panic!("unexpected worker output: {other:?}"),
        }
    }

    stop.send_replace(true);
    handle.join().await.unwrap();
    while let Some(event) = receiver.try_recv() {
        if let WorkerEvent::Attempt { count, .. } = event {
            attempts += count;
        }
    }

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].result.address, KEY_ONE_ADDRESS);
    assert_eq!(found[0].result.balance, 1234);
    assert_eq!(found[0].keypair.private_key_hex(), KEY_ONE);
    // Three successful lookups, reported in a batch of two plus the remainder on stop
    assert_eq!(attempts, 3);
}

#[tokio::test]
async fn test_worker_stops_promptly_during_backoff() {
    let (events, mut receiver) = event_channel(64);
    let (stop, stop_rx) = watch::channel(false);
    let mut settings = fast_settings();
    settings.error_backoff = Duration::from_secs(60);

    let handle = ScanWorker::new(
        0,
        Arc::new(FailingKeyGenerator),
        oracle_with_primary(MapBalanceSource::new()),
        settings,
        events,
    )
    .spawn(stop_rx);

    assert!(matches!(
        receiver.recv().await,
        Some(WorkerEvent::Error { .. })
    ));

    stop.send_replace(true);
    tokio::time::timeout(Duration::from_secs(1), handle.join())
        .await
        .expect("worker should stop without waiting out the backoff")
        .unwrap();
}

#[tokio::test]
async fn test_worker_state_transitions() {
    let (events, _receiver) = event_channel(1024);
    let (stop, stop_rx) = watch::channel(false);

    let worker = ScanWorker::new(
        1,
        fixed_generator(&[KEY_ONE]),
        oracle_with_primary(MapBalanceSource::new()),
        fast_settings(),
        events,
    );
    let handle = worker.spawn(stop_rx);
    let mut state = handle.state_receiver();

    state
        .wait_for(|s| *s == WorkerState::Running)
        .await
        .unwrap();

    stop.send_replace(true);
    handle.join().await.unwrap();
    assert_eq!(*state.borrow(), WorkerState::Stopped);
}

#[tokio::test]
async fn test_worker_exits_when_stop_sender_dropped() {
    let (events, _receiver) = event_channel(1024);
    let (stop, stop_rx) = watch::channel(false);

    let handle = ScanWorker::new(
        2,
        fixed_generator(&[KEY_ONE]),
        oracle_with_primary(MapBalanceSource::new()),
        fast_settings(),
        events,
    )
    .spawn(stop_rx);

    drop(stop);
    tokio::time::timeout(Duration::from_secs(1), handle.join())
        .await
        .expect("worker should exit once its controller is gone")
        .unwrap();
}
