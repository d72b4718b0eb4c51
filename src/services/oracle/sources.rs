//! HTTP balance sources: Blockstream's Esplora API and BlockCypher

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

use super::{BalanceSource, SourceError, SourceOutcome, check_supply};

pub const USER_AGENT: &str = concat!("wallet-scanner/", env!("CARGO_PKG_VERSION"));

/// Build the shared HTTP client used by both sources
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {e}"))
}

/// GET `url`, returning `None` on 404
async fn get_body(client: &reqwest::Client, url: &str) -> Result<Option<String>, SourceError> {
    let response = client.get(url).send().await?;
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(SourceError::Status(status.as_u16()));
    }

    Ok(Some(response.text().await?))
}

fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

#[derive(Debug, Deserialize)]
struct EsploraAddress {
    chain_stats: EsploraChainStats,
}

#[derive(Debug, Deserialize)]
struct EsploraChainStats {
    funded_txo_sum: u64,
    spent_txo_sum: u64,
}

/// Parse `GET /address/:address` from an Esplora instance
pub fn parse_esplora_balance(body: &str) -> Result<u64, SourceError> {
    let parsed: EsploraAddress =
        serde_json::from_str(body).map_err(|e| SourceError::Malformed(e.to_string()))?;
    let stats = parsed.chain_stats;
    stats
        .funded_txo_sum
        .checked_sub(stats.spent_txo_sum)
        .ok_or_else(|| {
            SourceError::Malformed(format!(
                "spent {} exceeds funded {}",
                stats.spent_txo_sum, stats.funded_txo_sum
            ))
        })
        .and_then(check_supply)
}

#[derive(Debug, Deserialize)]
struct BlockCypherBalance {
    balance: u64,
}

/// Parse `GET /addrs/:address/balance` from BlockCypher
pub fn parse_blockcypher_balance(body: &str) -> Result<u64, SourceError> {
    serde_json::from_str::<BlockCypherBalance>(body)
        .map_err(|e| SourceError::Malformed(e.to_string()))
        .and_then(|b| check_supply(b.balance))
}

/// Esplora REST API (blockstream.info by default)
pub struct EsploraSource {
    client: reqwest::Client,
    base_url: String,
}

impl EsploraSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl BalanceSource for EsploraSource {
    fn name(&self) -> &str {
        "esplora"
    }

    async fn fetch_balance(&self, address: &str) -> Result<SourceOutcome, SourceError> {
        let url = join_url(&self.base_url, &format!("address/{address}"));
        match get_body(&self.client, &url).await? {
            Some(body) => parse_esplora_balance(&body).map(SourceOutcome::Balance),
            None => Ok(SourceOutcome::NotFound),
        }
    }
}

/// BlockCypher REST API
pub struct BlockCypherSource {
    client: reqwest::Client,
    base_url: String,
}

impl BlockCypherSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl BalanceSource for BlockCypherSource {
    fn name(&self) -> &str {
        "blockcypher"
    }

    async fn fetch_balance(&self, address: &str) -> Result<SourceOutcome, SourceError> {
        let url = join_url(&self.base_url, &format!("addrs/{address}/balance"));
        match get_body(&self.client, &url).await? {
            Some(body) => parse_blockcypher_balance(&body).map(SourceOutcome::Balance),
            None => Ok(SourceOutcome::NotFound),
        }
    }
}
