use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Standardized encodings of a public key into a Bitcoin address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AddressVariant {
    /// P2PKH, starts with "1"
    Legacy,
    /// P2WPKH, starts with "bc1q"
    SegwitNative,
    /// P2SH-P2WPKH, starts with "3"
    SegwitWrapped,
}

impl AddressVariant {
    /// The variant used for balance lookups
    pub const PRIMARY: AddressVariant = AddressVariant::Legacy;

    pub fn as_str(&self) -> &'static str {
        match self {
            AddressVariant::Legacy => "legacy",
            AddressVariant::SegwitNative => "segwit-native",
            AddressVariant::SegwitWrapped => "segwit-wrapped",
        }
    }
}

impl fmt::Display for AddressVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All address variants derived from a single public key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressSet(BTreeMap<AddressVariant, String>);

impl AddressSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, variant: AddressVariant, address: String) {
        self.0.insert(variant, address);
    }

    pub fn get(&self, variant: AddressVariant) -> Option<&str> {
        self.0.get(&variant).map(String::as_str)
    }

    /// Address used for balance lookups
    pub fn primary(&self) -> Option<&str> {
        self.get(AddressVariant::PRIMARY)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AddressVariant, &String)> {
        self.0.iter()
    }
}

/// Key material and addresses of a generated wallet, hex encoded for output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub private_key: String,
    pub public_key: String,
    pub wif: String,
    /// Primary address (legacy P2PKH)
    pub address: String,
    pub addresses: AddressSet,
}

/// Outcome of a single scan attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub address: String,
    /// Balance in satoshis
    pub balance: u64,
    pub has_balance: bool,
}

impl ScanResult {
    pub fn new(address: String, balance: u64) -> Self {
        Self {
            address,
            balance,
            has_balance: balance > 0,
        }
    }
}

/// A generated wallet observed to hold funds. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundWallet {
    #[serde(flatten)]
    pub wallet: WalletRecord,
    /// Balance in satoshis at discovery time
    pub balance: u64,
    pub found_at: DateTime<Utc>,
}

impl FoundWallet {
    pub fn new(wallet: WalletRecord, balance: u64) -> Self {
        Self {
            wallet,
            balance,
            found_at: Utc::now(),
        }
    }

    pub fn address(&self) -> &str {
        &self.wallet.address
    }
}

/// Read-only aggregate view of the found-wallet store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoundWalletsSnapshot {
    pub wallets: Vec<FoundWallet>,
    pub count: usize,
    pub total_balance: u64,
}

impl FoundWalletsSnapshot {
    pub fn from_wallets(wallets: Vec<FoundWallet>) -> Self {
        let total_balance = total_balance(&wallets);
        Self {
            count: wallets.len(),
            total_balance,
            wallets,
        }
    }
}

/// Sum of balances, saturating rather than wrapping
fn total_balance(wallets: &[FoundWallet]) -> u64 {
    wallets
        .iter()
        .fold(0u64, |total, w| total.saturating_add(w.balance))
}

/// Process-wide scan statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanStats {
    pub total_attempts: u64,
    pub total_found: u64,
    /// Sum of found balances in satoshis
    pub cumulative_balance: u64,
    pub total_errors: u64,
    /// Found wallets whose durable write has not succeeded yet
    pub pending_writes: usize,
    pub is_running: bool,
    pub active_workers: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub attempts_per_minute: f64,
}

impl ScanStats {
    /// Rebuild the durable part of the stats by replaying stored wallets
    pub fn from_found(wallets: &[FoundWallet]) -> Self {
        Self {
            total_found: wallets.len() as u64,
            cumulative_balance: total_balance(wallets),
            ..Default::default()
        }
    }

    /// Attempts per minute since `started_at`, 0.0 if not started
    pub fn rate_at(&self, now: DateTime<Utc>) -> f64 {
        let Some(started_at) = self.started_at else {
            return 0.0;
        };
        let elapsed_ms = (now - started_at).num_milliseconds();
        if elapsed_ms <= 0 {
            return 0.0;
        }
        self.total_attempts as f64 / (elapsed_ms as f64 / 60_000.0)
    }
}
