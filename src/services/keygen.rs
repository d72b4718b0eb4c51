//! Candidate key generation and Bitcoin address derivation
//!
//! Keys come from the operating system CSPRNG. Address encodings are delegated
//! to the `bitcoin` crate; every generated key is compressed, so all three
//! address variants are always derivable.

use bitcoin::address::NetworkUnchecked;
use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey, SignOnly};
use bitcoin::{Address, CompressedPublicKey, Network, PrivateKey};
use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt;

use crate::models::{AddressSet, AddressVariant, WalletRecord};

/// Network all keys and addresses are derived for
pub const NETWORK: Network = Network::Bitcoin;

/// Redraws allowed when random bytes fall outside the secp256k1 scalar range
const MAX_REDRAWS: usize = 8;

/// Error type for key generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The entropy source failed or kept producing out-of-range scalars
    Entropy(String),
    /// Supplied key material is not a valid secp256k1 secret key
    InvalidKey(String),
    /// The derived address set lacks the primary variant
    MissingPrimaryAddress,
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entropy(msg) => write!(f, "Failed to generate wallet: {msg}"),
            Self::InvalidKey(msg) => write!(f, "Invalid private key: {msg}"),
            Self::MissingPrimaryAddress => write!(f, "No primary address could be derived"),
        }
    }
}

impl std::error::Error for GenerationError {}

/// A secp256k1 private scalar and its public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keypair {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl Keypair {
    pub fn from_secret_key(secp: &Secp256k1<SignOnly>, secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(secp, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Parse a private key given as 64 hex characters
    pub fn from_hex(private_key: &str) -> Result<Self, GenerationError> {
        let private_key = private_key.trim();
        if private_key.len() != 64 {
            return Err(GenerationError::InvalidKey(
                "Must be 64 hexadecimal characters".to_string(),
            ));
        }
        let bytes = hex::decode(private_key)
            .map_err(|e| GenerationError::InvalidKey(format!("Invalid hex: {e}")))?;
        let secret_key =
            SecretKey::from_slice(&bytes).map_err(|e| GenerationError::InvalidKey(e.to_string()))?;
        Ok(Self::from_secret_key(&Secp256k1::signing_only(), secret_key))
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Compressed SEC1 encoding
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Wallet import format (compressed, mainnet)
    pub fn wif(&self) -> String {
        PrivateKey::new(self.secret_key, NETWORK).to_wif()
    }

    /// Hex-encoded key material together with the given address set
    pub fn to_record(&self, addresses: AddressSet) -> WalletRecord {
        WalletRecord {
            private_key: self.private_key_hex(),
            public_key: self.public_key_hex(),
            wif: self.wif(),
            address: addresses.primary().unwrap_or_default().to_string(),
            addresses,
        }
    }
}

/// Source of candidate keypairs
pub trait KeyGenerator: Send + Sync {
    fn generate(&self) -> Result<Keypair, GenerationError>;

    fn derive_addresses(&self, public_key: &PublicKey) -> AddressSet {
        derive_addresses(public_key)
    }
}

/// Generates uniformly random keys from the OS entropy source
pub struct RandomKeyGenerator {
    secp: Secp256k1<SignOnly>,
}

impl RandomKeyGenerator {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::signing_only(),
        }
    }
}

impl Default for RandomKeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyGenerator for RandomKeyGenerator {
    fn generate(&self) -> Result<Keypair, GenerationError> {
        let mut bytes = [0u8; 32];
        for _ in 0..MAX_REDRAWS {
            OsRng
                .try_fill_bytes(&mut bytes)
                .map_err(|e| GenerationError::Entropy(e.to_string()))?;
            // Zero and values >= the curve order are rejected; redraw keeps the distribution uniform
            if let Ok(secret_key) = SecretKey::from_slice(&bytes) {
                return Ok(Keypair::from_secret_key(&self.secp, secret_key));
            }
        }
        Err(GenerationError::Entropy(format!(
            "no valid scalar after {MAX_REDRAWS} draws"
        )))
    }
}

/// Derive every supported address variant for a public key
pub fn derive_addresses(public_key: &PublicKey) -> AddressSet {
    let compressed = CompressedPublicKey(*public_key);
    let mut addresses = AddressSet::new();

    addresses.insert(
        AddressVariant::Legacy,
        Address::p2pkh(compressed, NETWORK).to_string(),
    );
    addresses.insert(
        AddressVariant::SegwitNative,
        Address::p2wpkh(&compressed, NETWORK).to_string(),
    );
    addresses.insert(
        AddressVariant::SegwitWrapped,
        Address::p2shwpkh(&compressed, NETWORK).to_string(),
    );

    addresses
}

/// Whether the string is a well-formed mainnet Base58Check or Bech32/Bech32m address
pub fn validate_address(address: &str) -> bool {
    if address.is_empty() {
        return false;
    }
    address
        .parse::<Address<NetworkUnchecked>>()
        .map(|parsed| parsed.is_valid_for_network(NETWORK))
        .unwrap_or(false)
}

/// Human readable name of the address format, if valid
pub fn describe_address(address: &str) -> &'static str {
    if !validate_address(address) {
        return "Invalid format";
    }
    match address.chars().next() {
        Some('1') => "Valid Bitcoin address (legacy P2PKH)",
        Some('3') => "Valid Bitcoin address (P2SH)",
        _ => "Valid Bitcoin address (bech32)",
    }
}
