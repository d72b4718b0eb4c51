//! Balance lookups against external block explorers
//!
//! [`BalanceOracle`] queries a primary [`BalanceSource`] and falls back to a
//! second one when the primary fails. "Address has no history" is a success
//! with a zero balance, never a failure, and it never triggers the fallback.

pub mod sources;

pub use sources::{BlockCypherSource, EsploraSource, build_http_client};

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Total bitcoin supply in satoshis; no address can hold more
pub const MAX_BALANCE_SATS: u64 = 21_000_000 * 100_000_000;

/// Reject balances no address can hold
pub fn check_supply(balance: u64) -> Result<u64, SourceError> {
    if balance > MAX_BALANCE_SATS {
        return Err(SourceError::Malformed(format!(
            "balance {balance} exceeds total supply"
        )));
    }
    Ok(balance)
}

/// Successful answer from a single balance source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOutcome {
    /// Funded minus spent, in satoshis
    Balance(u64),
    /// The source has never seen the address
    NotFound,
}

/// Failure of a single balance source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    Timeout,
    Transport(String),
    /// Non-success status other than 404
    Status(u16),
    Malformed(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "request timed out"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Status(code) => write!(f, "unexpected HTTP status {code}"),
            Self::Malformed(msg) => write!(f, "malformed response: {msg}"),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Malformed(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Which stage of the lookup produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStage {
    Primary,
    Fallback,
}

impl fmt::Display for SourceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Error type for balance lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// Both sources failed
    Unavailable {
        primary: SourceError,
        fallback: SourceError,
    },
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { primary, fallback } => write!(
                f,
                "Failed to check balance: {primary} (fallback: {fallback})"
            ),
        }
    }
}

impl std::error::Error for OracleError {}

/// An external service that reports the confirmed balance of an address
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn fetch_balance(&self, address: &str) -> Result<SourceOutcome, SourceError>;
}

/// Primary/fallback balance lookup. Every call is a fresh remote lookup.
#[derive(Clone)]
pub struct BalanceOracle {
    primary: Arc<dyn BalanceSource>,
    fallback: Arc<dyn BalanceSource>,
    /// Bound applied to each source independently
    timeout: Duration,
}

impl BalanceOracle {
    pub fn new(
        primary: Arc<dyn BalanceSource>,
        fallback: Arc<dyn BalanceSource>,
        timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Balance of `address` in satoshis
    pub async fn check_balance(&self, address: &str) -> Result<u64, OracleError> {
        let primary = match self.query(SourceStage::Primary, address).await {
            Ok(balance) => return Ok(balance),
            Err(e) => e,
        };

        tracing::warn!(
            "Primary balance source '{}' failed for {}: {}, trying fallback '{}'",
            self.primary.name(),
            address,
            primary,
            self.fallback.name()
        );

        match self.query(SourceStage::Fallback, address).await {
            Ok(balance) => Ok(balance),
            Err(fallback) => {
                tracing::error!("Balance check failed for {}: {}", address, primary);
                Err(OracleError::Unavailable { primary, fallback })
            }
        }
    }

    async fn query(&self, stage: SourceStage, address: &str) -> Result<u64, SourceError> {
        let source = match stage {
            SourceStage::Primary => &self.primary,
            SourceStage::Fallback => &self.fallback,
        };

        match tokio::time::timeout(self.timeout, source.fetch_balance(address)).await {
            Ok(Ok(SourceOutcome::Balance(balance))) => {
                tracing::debug!("{} source '{}': {} has {} sat", stage, source.name(), address, balance);
                check_supply(balance)
            }
            Ok(Ok(SourceOutcome::NotFound)) => {
                tracing::debug!("{} source '{}': {} has no history", stage, source.name(), address);
                Ok(0)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SourceError::Timeout),
        }
    }
}
