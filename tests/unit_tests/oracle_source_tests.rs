// Explorer client tests against a local HTTP stub

use std::time::Duration;

use wallet_scanner::services::oracle::sources::USER_AGENT;
use wallet_scanner::services::oracle::{
    BalanceSource, BlockCypherSource, EsploraSource, SourceError, SourceOutcome, build_http_client,
};

use crate::test_utils::{HttpStub, KEY_ONE_ADDRESS, unreachable_base_url};

const ESPLORA_BODY: &str = r#"{
    "address": "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH",
    "chain_stats": {
        "funded_txo_count": 3,
        "funded_txo_sum": 750000,
        "spent_txo_count": 1,
        "spent_txo_sum": 250000,
        "tx_count": 4
    },
    "mempool_stats": {
        "funded_txo_count": 0,
        "funded_txo_sum": 0,
        "spent_txo_count": 0,
        "spent_txo_sum": 0,
        "tx_count": 0
    }
}"#;

const BLOCKCYPHER_BODY: &str = r#"{
    "address": "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH",
    "total_received": 600000,
    "total_sent": 100000,
    "balance": 500000,
    "unconfirmed_balance": 0,
    "final_balance": 500000,
    "n_tx": 2
}"#;

fn client() -> reqwest::Client {
    build_http_client(Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn test_esplora_balance_is_funded_minus_spent() {
    let stub = HttpStub::start(200, ESPLORA_BODY).await;
    let source = EsploraSource::new(client(), &stub.base_url);

    let outcome = source.fetch_balance(KEY_ONE_ADDRESS).await;
    assert_eq!(outcome, Ok(SourceOutcome::Balance(500000)));

    let request = stub.requests.lock().unwrap()[0].clone();
    assert!(request.starts_with(&format!("GET /address/{KEY_ONE_ADDRESS} HTTP/1.1")));
    assert!(request.to_lowercase().contains(&format!("user-agent: {}", USER_AGENT.to_lowercase())));
}

#[tokio::test]
async fn test_esplora_trailing_slash_in_base_url() {
    let stub = HttpStub::start(200, ESPLORA_BODY).await;
    let source = EsploraSource::new(client(), format!("{}/", stub.base_url));

    source.fetch_balance(KEY_ONE_ADDRESS).await.unwrap();
    assert_eq!(
        stub.first_request_line(),
        Some(format!("GET /address/{KEY_ONE_ADDRESS} HTTP/1.1"))
    );
}

#[tokio::test]
async fn test_esplora_404_is_not_found() {
    let stub = HttpStub::start(404, "Address not found").await;
    let source = EsploraSource::new(client(), &stub.base_url);

    assert_eq!(
        source.fetch_balance(KEY_ONE_ADDRESS).await,
        Ok(SourceOutcome::NotFound)
    );
}

#[tokio::test]
async fn test_esplora_server_error_is_status_error() {
    let stub = HttpStub::start(500, "oops").await;
    let source = EsploraSource::new(client(), &stub.base_url);

    assert_eq!(
        source.fetch_balance(KEY_ONE_ADDRESS).await,
        Err(SourceError::Status(500))
    );
}

#[tokio::test]
async fn test_esplora_rate_limit_is_status_error() {
    let stub = HttpStub::start(429, "slow down").await;
    let source = EsploraSource::new(client(), &stub.base_url);

    assert_eq!(
        source.fetch_balance(KEY_ONE_ADDRESS).await,
        Err(SourceError::Status(429))
    );
}

#[tokio::test]
async fn test_esplora_malformed_body() {
    let stub = HttpStub::start(200, r#"{"chain_stats": "nope"}"#).await;
    let source = EsploraSource::new(client(), &stub.base_url);

    assert!(matches!(
        source.fetch_balance(KEY_ONE_ADDRESS).await,
        Err(SourceError::Malformed(_))
    ));
}

#[tokio::test]
async fn test_blockcypher_balance_path_and_field() {
    let stub = HttpStub::start(200, BLOCKCYPHER_BODY).await;
    let source = BlockCypherSource::new(client(), &stub.base_url);

    assert_eq!(
        source.fetch_balance(KEY_ONE_ADDRESS).await,
        Ok(SourceOutcome::Balance(500000))
    );
    assert_eq!(
        stub.first_request_line(),
        Some(format!("GET /addrs/{KEY_ONE_ADDRESS}/balance HTTP/1.1"))
    );
}

#[tokio::test]
async fn test_blockcypher_404_is_not_found() {
    let stub = HttpStub::start(404, r#"{"error": "not found"}"#).await;
    let source = BlockCypherSource::new(client(), &stub.base_url);

    assert_eq!(
        source.fetch_balance(KEY_ONE_ADDRESS).await,
        Ok(SourceOutcome::NotFound)
    );
}

#[tokio::test]
async fn test_unreachable_source_is_transport_error() {
    let source = EsploraSource::new(client(), unreachable_base_url().await);

    assert!(matches!(
        source.fetch_balance(KEY_ONE_ADDRESS).await,
        Err(SourceError::Transport(_))
    ));
}

#[tokio::test]
async fn test_client_timeout_is_timeout_error() {
    let stub = HttpStub::start_with_delay(200, ESPLORA_BODY, Duration::from_millis(500)).await;
    let client = build_http_client(Duration::from_millis(50)).unwrap();
    let source = EsploraSource::new(client, &stub.base_url);

    assert_eq!(
        source.fetch_balance(KEY_ONE_ADDRESS).await,
        Err(SourceError::Timeout)
    );
}
