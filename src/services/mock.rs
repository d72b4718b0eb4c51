//! Mock implementations for testing the scanner services
//!
//! Deterministic key generators and in-process balance sources, so the
//! oracle, workers and controller can be exercised without network access.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use super::keygen::{GenerationError, KeyGenerator, Keypair};
use super::oracle::{BalanceSource, SourceError, SourceOutcome};

/// Key generator that hands out a fixed list of keypairs, cycling by default
pub struct FixedKeyGenerator {
    keys: Vec<Keypair>,
    next: AtomicUsize,
    cycle: bool,
}

impl FixedKeyGenerator {
    pub fn new(keys: Vec<Keypair>) -> Self {
        Self {
            keys,
            next: AtomicUsize::new(0),
            cycle: true,
        }
    }

    /// Hand out each key once, then fail like an exhausted entropy source
    pub fn once(mut self) -> Self {
        self.cycle = false;
        self
    }

    /// Build from 64-hex-character private keys
    pub fn from_hex(keys: &[&str]) -> Result<Self, GenerationError> {
        let keys = keys
            .iter()
            .map(|k| Keypair::from_hex(k))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(keys))
    }

    /// Number of keys handed out so far
    pub fn generated(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }
}

impl KeyGenerator for FixedKeyGenerator {
    fn generate(&self) -> Result<Keypair, GenerationError> {
        if self.keys.is_empty() {
            return Err(GenerationError::Entropy("no fixed keys configured".to_string()));
        }
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        if !self.cycle && index >= self.keys.len() {
            return Err(GenerationError::Entropy("fixed keys exhausted".to_string()));
        }
        Ok(self.keys[index % self.keys.len()].clone())
    }
}

/// Key generator whose entropy source is always exhausted
#[derive(Debug, Default)]
pub struct FailingKeyGenerator;

impl KeyGenerator for FailingKeyGenerator {
    fn generate(&self) -> Result<Keypair, GenerationError> {
        Err(GenerationError::Entropy("entropy source exhausted".to_string()))
    }
}

/// Balance source that always returns the same answer
pub struct StaticBalanceSource {
    result: Result<SourceOutcome, SourceError>,
    calls: AtomicUsize,
}

impl StaticBalanceSource {
    pub fn new(result: Result<SourceOutcome, SourceError>) -> Self {
        Self {
            result,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn balance(satoshis: u64) -> Self {
        Self::new(Ok(SourceOutcome::Balance(satoshis)))
    }

    pub fn not_found() -> Self {
        Self::new(Ok(SourceOutcome::NotFound))
    }

    pub fn failing(error: SourceError) -> Self {
        Self::new(Err(error))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BalanceSource for StaticBalanceSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_balance(&self, _address: &str) -> Result<SourceOutcome, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Balance source that answers after a fixed delay
pub struct SlowBalanceSource {
    delay: Duration,
    satoshis: u64,
}

impl SlowBalanceSource {
    pub fn new(delay: Duration, satoshis: u64) -> Self {
        Self { delay, satoshis }
    }
}

#[async_trait]
impl BalanceSource for SlowBalanceSource {
    fn name(&self) -> &str {
        "slow"
    }

    async fn fetch_balance(&self, _address: &str) -> Result<SourceOutcome, SourceError> {
        tokio::time::sleep(self.delay).await;
        Ok(SourceOutcome::Balance(self.satoshis))
    }
}

/// Balance source backed by an address → balance map; unknown addresses are not found
#[derive(Debug, Clone, Default)]
pub struct MapBalanceSource {
    balances: Arc<RwLock<HashMap<String, u64>>>,
    delay: Option<Duration>,
}

impl MapBalanceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every lookup, to keep lookups in flight during tests
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_balance(&self, address: &str, satoshis: u64) {
        let mut balances = self.balances.write().unwrap();
        balances.insert(address.to_string(), satoshis);
    }
}

#[async_trait]
impl BalanceSource for MapBalanceSource {
    fn name(&self) -> &str {
        "map"
    }

    async fn fetch_balance(&self, address: &str) -> Result<SourceOutcome, SourceError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let balance = self.balances.read().unwrap().get(address).copied();
        Ok(match balance {
            Some(satoshis) => SourceOutcome::Balance(satoshis),
            None => SourceOutcome::NotFound,
        })
    }
}
