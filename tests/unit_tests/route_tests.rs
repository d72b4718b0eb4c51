// Route handler tests, calling handlers directly with managed state

use rocket::State;
use rocket::http::Status;
use rocket::serde::json::Json;
use std::time::Duration;

use wallet_scanner::guards::ApiToken;
use wallet_scanner::models::{AnalyzeKeyRequest, StartScanRequest};
use wallet_scanner::routes::{
    analyze_key, found_wallets, generate_wallet, index, scan_once, scan_stats, start_scan,
    stop_scan, validate_address,
};
use wallet_scanner::services::mock::MapBalanceSource;

use crate::test_utils::{
    KEY_ONE, KEY_ONE_ADDRESS, KEY_ONE_NATIVE_ADDRESS, TEST_TOKEN, create_test_app_state,
    fixed_generator,
};

fn token() -> ApiToken {
    ApiToken(TEST_TOKEN.to_string())
}

fn start_request(worker_count: usize) -> Json<StartScanRequest> {
    Json(StartScanRequest { worker_count })
}

#[tokio::test]
async fn test_index_reports_status() {
    let dir = tempfile::tempdir().unwrap();
    let app_state =
        create_test_app_state(&dir, fixed_generator(&[KEY_ONE]), MapBalanceSource::new()).await;

    let response = index(State::from(&app_state)).await.into_inner();
    assert!(response.success);
    let status = response.data.unwrap();
    assert_eq!(status.status, "online");
    assert_eq!(status.found_wallets, 0);
    assert!(!status.is_scanning);
}

#[tokio::test]
async fn test_start_then_start_again_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let balances = MapBalanceSource::new().with_delay(Duration::from_millis(20));
    let app_state = create_test_app_state(&dir, fixed_generator(&[KEY_ONE]), balances).await;
    let state = State::from(&app_state);

    let started = start_scan(state, start_request(2), token()).await.unwrap().into_inner();
    assert!(started.success);
    assert!(uuid_like(&started.data.unwrap()));

    let (status, body) = start_scan(state, start_request(1), token()).await.unwrap_err();
    assert_eq!(status, Status::Conflict);
    assert!(!body.success);
    assert!(body.message.contains("already running"));

    let stopped = stop_scan(state, token()).await.into_inner();
    assert!(stopped.success);
    let stats = stopped.data.unwrap();
    assert!(!stats.is_running);
    assert_eq!(stats.active_workers, 0);
}

#[tokio::test]
async fn test_start_with_invalid_worker_count() {
    let dir = tempfile::tempdir().unwrap();
    let app_state =
        create_test_app_state(&dir, fixed_generator(&[KEY_ONE]), MapBalanceSource::new()).await;
    let state = State::from(&app_state);

    for count in [0, 9, 1000] {
        let (status, body) = start_scan(state, start_request(count), token()).await.unwrap_err();
        assert_eq!(status, Status::BadRequest);
        assert!(body.data.is_none());
    }
    assert!(!app_state.controller.is_running().await);
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let app_state =
        create_test_app_state(&dir, fixed_generator(&[KEY_ONE]), MapBalanceSource::new()).await;
    let state = State::from(&app_state);

    for _ in 0..3 {
        let response = stop_scan(state, token()).await.into_inner();
        assert!(response.success);
        assert!(!response.data.unwrap().is_running);
    }
}

#[tokio::test]
async fn test_scan_once_finds_funded_wallet() {
    let dir = tempfile::tempdir().unwrap();
    let balances = MapBalanceSource::new();
    balances.set_balance(KEY_ONE_ADDRESS, 1234);
    let app_state = create_test_app_state(&dir, fixed_generator(&[KEY_ONE]), balances).await;
    let state = State::from(&app_state);

    let response = scan_once(state, token()).await.unwrap().into_inner();
    let result = response.data.unwrap();
    assert_eq!(result.address, KEY_ONE_ADDRESS);
    assert_eq!(result.balance, 1234);
    assert!(result.has_balance);
    assert!(response.message.contains("1234"));

    let found = found_wallets(state).await.into_inner().data.unwrap();
    assert_eq!(found.count, 1);
    assert_eq!(found.total_balance, 1234);
    assert_eq!(found.wallets[0].address(), KEY_ONE_ADDRESS);

    let stats = scan_stats(state).await.into_inner().data.unwrap();
    assert_eq!(stats.total_found, 1);
    assert_eq!(stats.total_attempts, 1);
    assert_eq!(stats.cumulative_balance, 1234);
}

#[tokio::test]
async fn test_scan_once_without_balance() {
    let dir = tempfile::tempdir().unwrap();
    let app_state =
        create_test_app_state(&dir, fixed_generator(&[KEY_ONE]), MapBalanceSource::new()).await;
    let state = State::from(&app_state);

    let result = scan_once(state, token()).await.unwrap().into_inner().data.unwrap();
    assert_eq!(result.balance, 0);
    assert!(!result.has_balance);

    let found = found_wallets(state).await.into_inner().data.unwrap();
    assert_eq!(found.count, 0);
}

#[tokio::test]
async fn test_generate_wallet_is_not_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let app_state =
        create_test_app_state(&dir, fixed_generator(&[KEY_ONE]), MapBalanceSource::new()).await;
    let state = State::from(&app_state);

    let generated = generate_wallet(state).unwrap().into_inner().data.unwrap();
    assert_eq!(generated.wallet.private_key, KEY_ONE);
    assert_eq!(generated.address(), KEY_ONE_ADDRESS);
    assert_eq!(generated.wallet.addresses.len(), 3);
    assert_eq!(generated.balance, 0);

    assert_eq!(app_state.controller.get_found_wallets().await.count, 0);
    assert_eq!(app_state.controller.get_stats().await.total_attempts, 0);
}

#[tokio::test]
async fn test_validate_address_route() {
    let dir = tempfile::tempdir().unwrap();
    let app_state =
        create_test_app_state(&dir, fixed_generator(&[KEY_ONE]), MapBalanceSource::new()).await;
    let state = State::from(&app_state);

    let valid = validate_address(state, KEY_ONE_NATIVE_ADDRESS).into_inner().data.unwrap();
    assert!(valid.is_valid);
    assert_eq!(valid.address, KEY_ONE_NATIVE_ADDRESS);

    let invalid = validate_address(state, "not-an-address").into_inner().data.unwrap();
    assert!(!invalid.is_valid);
    assert_eq!(invalid.format, "Invalid format");
}

#[test]
fn test_analyze_key_route() {
    let record = analyze_key(Json(AnalyzeKeyRequest {
        private_key: KEY_ONE.to_string(),
    }))
    .unwrap()
    .into_inner()
    .data
    .unwrap();
    assert_eq!(record.address, KEY_ONE_ADDRESS);
    assert_eq!(
        record.wif,
        "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn"
    );

    let (status, _) = analyze_key(Json(AnalyzeKeyRequest {
        private_key: "0".repeat(64),
    }))
    .unwrap_err();
    assert_eq!(status, Status::BadRequest);
}

fn uuid_like(value: &str) -> bool {
    value.len() == 36 && value.chars().filter(|c| *c == '-').count() == 4
}
