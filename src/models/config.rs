use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PRIMARY_ORACLE_URL: &str = "https://blockstream.info/api";
pub const DEFAULT_FALLBACK_ORACLE_URL: &str = "https://api.blockcypher.com/v1/btc/main";
pub const DEFAULT_FOUND_WALLETS_PATH: &str = "found-wallets.json";

/// Timing and batching knobs for a single scan worker
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Delay between successful attempts
    pub pace_delay: Duration,
    /// Delay after a failed attempt
    pub error_backoff: Duration,
    /// Attempts are reported upward once per this many attempts
    pub attempt_batch: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            pace_delay: Duration::from_millis(100),
            error_backoff: Duration::from_millis(2000),
            attempt_batch: 10,
        }
    }
}

/// Configuration for the scanner service
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub primary_oracle_url: String,
    pub fallback_oracle_url: String,
    /// Per-source timeout for balance lookups
    pub oracle_timeout: Duration,
    pub worker: WorkerSettings,
    /// Upper bound accepted by start_scanning
    pub max_workers: usize,
    pub found_wallets_path: PathBuf,
    /// Bearer token for the control endpoints
    pub access_token: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            primary_oracle_url: DEFAULT_PRIMARY_ORACLE_URL.to_string(),
            fallback_oracle_url: DEFAULT_FALLBACK_ORACLE_URL.to_string(),
            oracle_timeout: Duration::from_secs(10),
            worker: WorkerSettings::default(),
            max_workers: 16,
            found_wallets_path: PathBuf::from(DEFAULT_FOUND_WALLETS_PATH),
            access_token: String::new(),
        }
    }
}

impl ScannerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let access_token = non_empty_var("SCANNER_ACCESS_TOKEN")
            .ok_or_else(|| "SCANNER_ACCESS_TOKEN environment variable not set".to_string())?;

        let oracle_timeout = Duration::from_secs(parse_var(
            "ORACLE_TIMEOUT_SECS",
            defaults.oracle_timeout.as_secs(),
        )?);
        let pace_delay = Duration::from_millis(parse_var(
            "SCAN_PACE_MS",
            defaults.worker.pace_delay.as_millis() as u64,
        )?);
        let error_backoff = Duration::from_millis(parse_var(
            "SCAN_ERROR_BACKOFF_MS",
            defaults.worker.error_backoff.as_millis() as u64,
        )?);
        let attempt_batch = parse_var("SCAN_ATTEMPT_BATCH", defaults.worker.attempt_batch)?;
        let max_workers = parse_var("SCAN_MAX_WORKERS", defaults.max_workers)?;

        if oracle_timeout.is_zero() {
            return Err("ORACLE_TIMEOUT_SECS must be greater than zero".to_string());
        }
        if attempt_batch == 0 {
            return Err("SCAN_ATTEMPT_BATCH must be greater than zero".to_string());
        }
        if max_workers == 0 {
            return Err("SCAN_MAX_WORKERS must be greater than zero".to_string());
        }

        Ok(Self {
            primary_oracle_url: non_empty_var("PRIMARY_ORACLE_URL")
                .unwrap_or(defaults.primary_oracle_url),
            fallback_oracle_url: non_empty_var("FALLBACK_ORACLE_URL")
                .unwrap_or(defaults.fallback_oracle_url),
            oracle_timeout,
            worker: WorkerSettings {
                pace_delay,
                error_backoff,
                attempt_batch,
            },
            max_workers,
            found_wallets_path: non_empty_var("FOUND_WALLETS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.found_wallets_path),
            access_token,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(name: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty_var(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| format!("Invalid {name} value '{raw}': {e}")),
        None => Ok(default),
    }
}
