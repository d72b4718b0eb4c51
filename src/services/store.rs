//! Append-only JSON store of found wallets
//!
//! The whole list is rewritten on every append: serialized to a temporary
//! file, flushed, then renamed over the store file. Appends are serialized by
//! a single mutex, and the in-memory list only changes after the durable
//! write succeeded. A corrupt file that could not be moved aside blocks all
//! writes until it can be.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::models::{FoundWallet, FoundWalletsSnapshot};

/// Error type for durable writes
#[derive(Debug)]
pub enum StoreError {
    Serialize(serde_json::Error),
    Io { path: PathBuf, error: std::io::Error },
    /// An unreadable store file is still in place and would be overwritten
    Unmovable { path: PathBuf },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialize(e) => write!(f, "Failed to serialize found wallets: {e}"),
            Self::Io { path, error } => {
                write!(f, "Failed to write found wallets to {}: {error}", path.display())
            }
            Self::Unmovable { path } => write!(
                f,
                "Unreadable store file {} could not be moved aside, refusing to overwrite it",
                path.display()
            ),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Serialize(e) => Some(e),
            Self::Io { error, .. } => Some(error),
            Self::Unmovable { .. } => None,
        }
    }
}

pub struct FoundWalletStore {
    path: PathBuf,
    wallets: Mutex<Vec<FoundWallet>>,
    /// Set while an unreadable original still sits at `path`
    blocked: AtomicBool,
}

impl FoundWalletStore {
    /// Open the store at `path`, loading any previously found wallets
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (wallets, moved_aside) = read_store(&path).await;
        Self {
            path,
            wallets: Mutex::new(wallets),
            blocked: AtomicBool::new(!moved_aside),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the durable list. A missing file is an empty store; an unreadable
    /// or corrupt file is moved aside and the store starts fresh.
    pub async fn load(path: &Path) -> Vec<FoundWallet> {
        read_store(path).await.0
    }

    /// Durably append a wallet. Concurrent callers are serialized.
    pub async fn append(&self, wallet: FoundWallet) -> Result<(), StoreError> {
        let mut wallets = self.wallets.lock().await;
        if self.blocked.load(Ordering::Acquire) {
            if !quarantine(&self.path).await {
                return Err(StoreError::Unmovable {
                    path: self.path.clone(),
                });
            }
            self.blocked.store(false, Ordering::Release);
        }

        let address = wallet.address().to_string();
        wallets.push(wallet);

        if let Err(e) = write_atomically(&self.path, &wallets).await {
            wallets.pop();
            return Err(e);
        }

        tracing::info!(
            "Found wallet {} saved to {} ({} total)",
            address,
            self.path.display(),
            wallets.len()
        );
        Ok(())
    }

    pub async fn wallets(&self) -> Vec<FoundWallet> {
        self.wallets.lock().await.clone()
    }

    pub async fn snapshot(&self) -> FoundWalletsSnapshot {
        FoundWalletsSnapshot::from_wallets(self.wallets().await)
    }

    pub async fn len(&self) -> usize {
        self.wallets.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Read the store file. The flag is false when an unreadable file could not
/// be moved aside and is still in place.
async fn read_store(path: &Path) -> (Vec<FoundWallet>, bool) {
    let data = match tokio::fs::read_to_string(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("No existing {} file, starting fresh", path.display());
            return (Vec::new(), true);
        }
        Err(e) => {
            tracing::warn!("Failed to read {}: {}, starting fresh", path.display(), e);
            return (Vec::new(), quarantine(path).await);
        }
    };

    match serde_json::from_str::<Vec<FoundWallet>>(&data) {
        Ok(wallets) => {
            tracing::info!("Loaded {} previously found wallets", wallets.len());
            (wallets, true)
        }
        Err(e) => {
            tracing::warn!("Corrupt found wallets file {}: {}, starting fresh", path.display(), e);
            (Vec::new(), quarantine(path).await)
        }
    }
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError {
    let path = path.to_path_buf();
    move |error| StoreError::Io { path, error }
}

async fn write_atomically(path: &Path, wallets: &[FoundWallet]) -> Result<(), StoreError> {
    let data = serde_json::to_vec_pretty(wallets).map_err(StoreError::Serialize)?;
    let tmp_path = sibling_path(path, ".tmp");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_error(parent))?;
    }

    let mut file = tokio::fs::File::create(&tmp_path)
        .await
        .map_err(io_error(&tmp_path))?;
    file.write_all(&data).await.map_err(io_error(&tmp_path))?;
    file.sync_all().await.map_err(io_error(&tmp_path))?;
    drop(file);

    tokio::fs::rename(&tmp_path, path).await.map_err(io_error(path))
}

/// Move an unusable store file out of the way so it is not overwritten.
/// Returns false if the file is still in place.
async fn quarantine(path: &Path) -> bool {
    let target = sibling_path(path, &format!(".corrupt-{}", chrono::Utc::now().timestamp()));
    match tokio::fs::rename(path, &target).await {
        Ok(()) => {
            tracing::warn!("Moved unreadable store file to {}", target.display());
            true
        }
        Err(_) if tokio::fs::symlink_metadata(path).await.is_err() => true,
        Err(e) => {
            tracing::error!(
                "Failed to move {} aside: {}, found wallets will not be written over it",
                path.display(),
                e
            );
            sentry::capture_message(
                &format!("Unreadable store file {} could not be moved aside: {e}", path.display()),
                sentry::Level::Error,
            );
            false
        }
    }
}
