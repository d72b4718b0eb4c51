//! Scan controller: worker pool lifecycle and event consumption
//!
//! The controller owns the only mutable aggregate state in the engine. Worker
//! events are handled by a single consumer task, which is the only writer of
//! [`ScanStats`] counters and the only caller of [`FoundWalletStore::append`].
//! The consumer is never aborted, so a found wallet that reached the channel
//! is always persisted (or kept pending and surfaced loudly).

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::events::{Candidate, ControlMessage, EventReceiver, EventSender, WorkerEvent};
use super::worker::{ScanWorker, WorkerHandle, WorkerState, scan_candidate};
use super::{ScanError, event_channel};
use crate::models::{FoundWallet, FoundWalletsSnapshot, ScanResult, ScanStats, WorkerSettings};
use crate::services::keygen::{self, KeyGenerator};
use crate::services::oracle::BalanceOracle;
use crate::services::store::{FoundWalletStore, StoreError};

const EVENT_CHANNEL_CAPACITY: usize = 256;
const STORE_RETRY_DELAY: Duration = Duration::from_millis(250);

struct ScanRun {
    id: Uuid,
    stop: watch::Sender<bool>,
    workers: Vec<WorkerHandle>,
}

pub struct ScanController {
    generator: Arc<dyn KeyGenerator>,
    oracle: Arc<BalanceOracle>,
    store: Arc<FoundWalletStore>,
    settings: WorkerSettings,
    max_workers: usize,
    stats: Arc<RwLock<ScanStats>>,
    events: EventSender,
    /// Held across start/stop so they never interleave
    run: Mutex<Option<ScanRun>>,
    /// States of the current or most recent run's workers
    worker_states: RwLock<Vec<watch::Receiver<WorkerState>>>,
}

impl ScanController {
    /// Create a controller and its event consumer. Must be called inside a tokio runtime.
    pub async fn new(
        generator: Arc<dyn KeyGenerator>,
        oracle: Arc<BalanceOracle>,
        store: Arc<FoundWalletStore>,
        settings: WorkerSettings,
        max_workers: usize,
    ) -> Self {
        let stats = Arc::new(RwLock::new(ScanStats::from_found(&store.wallets().await)));
        let (events, receiver) = event_channel(EVENT_CHANNEL_CAPACITY);
        let consumer = tokio::spawn(consume_events(receiver, store.clone(), stats.clone()));
        tokio::spawn(supervise_consumer(consumer));

        Self {
            generator,
            oracle,
            store,
            settings,
            max_workers,
            stats,
            events,
            run: Mutex::new(None),
            worker_states: RwLock::new(Vec::new()),
        }
    }

    /// Spawn `worker_count` workers. Returns the id of the new scan run.
    pub async fn start_scanning(&self, worker_count: usize) -> Result<Uuid, ScanError> {
        let mut run = self.run.lock().await;
        if run.is_some() {
            return Err(ScanError::AlreadyRunning);
        }
        if self.events.is_closed() {
            tracing::error!("Refusing to start scanning: event consumer is gone");
            return Err(ScanError::ControllerClosed);
        }
        if worker_count == 0 || worker_count > self.max_workers {
            return Err(ScanError::InvalidWorkerCount {
                requested: worker_count,
                max: self.max_workers,
            });
        }

        {
            let mut stats = self.stats.write().await;
            stats.total_attempts = 0;
            stats.total_errors = 0;
            stats.started_at = Some(Utc::now());
            stats.is_running = true;
        }

        let id = Uuid::new_v4();
        let (stop, stop_rx) = watch::channel(false);
        let workers: Vec<WorkerHandle> = (0..worker_count)
            .map(|worker_id| {
                ScanWorker::new(
                    worker_id,
                    self.generator.clone(),
                    self.oracle.clone(),
                    self.settings.clone(),
                    self.events.clone(),
                )
                .spawn(stop_rx.clone())
            })
            .collect();

        *self.worker_states.write().await = workers.iter().map(|w| w.state_receiver()).collect();
        tracing::info!("Scan {} started with {} worker(s)", id, worker_count);

        *run = Some(ScanRun { id, stop, workers });
        Ok(id)
    }

    /// Signal all workers, wait for them, and persist every event they sent.
    /// Does nothing when not running.
    pub async fn stop_scanning(&self) {
        let mut run = self.run.lock().await;
        let Some(active) = run.take() else {
            tracing::debug!("stop_scanning called while not running");
            return;
        };

        tracing::info!("Stopping scan {} ({} worker(s))", active.id, active.workers.len());
        active.stop.send_replace(true);

        for worker in active.workers {
            let id = worker.id;
            if let Err(e) = worker.join().await {
                tracing::error!("Scan worker {} terminated abnormally: {}", id, e);
            }
        }

        if !self.events.flush().await {
            tracing::error!("Event consumer is gone, scan {} may have unprocessed events", active.id);
        }

        self.stats.write().await.is_running = false;
        tracing::info!("Scan {} stopped", active.id);
    }

    pub async fn is_running(&self) -> bool {
        self.stats.read().await.is_running
    }

    pub async fn get_stats(&self) -> ScanStats {
        let mut stats = self.stats.read().await.clone();
        stats.active_workers = self
            .worker_states()
            .await
            .into_iter()
            .filter(|s| *s == WorkerState::Running)
            .count();
        stats.attempts_per_minute = stats.rate_at(Utc::now());
        stats
    }

    /// States of the current or most recent run's workers
    pub async fn worker_states(&self) -> Vec<WorkerState> {
        self.worker_states
            .read()
            .await
            .iter()
            .map(|state| *state.borrow())
            .collect()
    }

    pub async fn get_found_wallets(&self) -> FoundWalletsSnapshot {
        self.store.snapshot().await
    }

    /// A freshly generated wallet with zero balance, not persisted and not looked up
    pub fn generate_one(&self) -> Result<FoundWallet, ScanError> {
        let keypair = self.generator.generate()?;
        let addresses = self.generator.derive_addresses(keypair.public_key());
        Ok(FoundWallet::new(keypair.to_record(addresses), 0))
    }

    pub fn validate_address(&self, address: &str) -> bool {
        keygen::validate_address(address)
    }

    /// Run a single scan attempt outside the worker pool. A found wallet is
    /// persisted through the regular event path before this returns.
    pub async fn scan_once(&self) -> Result<ScanResult, ScanError> {
        match scan_candidate(self.generator.as_ref(), &self.oracle).await {
            Ok(candidate) => {
                let result = candidate.result.clone();
                if result.has_balance {
                    self.report(WorkerEvent::Found {
                        worker_id: None,
                        candidate,
                    })
                    .await?;
                }
                self.report(WorkerEvent::Attempt {
                    worker_id: None,
                    count: 1,
                })
                .await?;
                if !self.events.flush().await {
                    return Err(ScanError::ControllerClosed);
                }
                Ok(result)
            }
            Err(e) => {
                self.report(WorkerEvent::Error {
                    worker_id: None,
                    message: e.to_string(),
                })
                .await?;
                if !self.events.flush().await {
                    return Err(ScanError::ControllerClosed);
                }
                Err(e)
            }
        }
    }

    async fn report(&self, event: WorkerEvent) -> Result<(), ScanError> {
        if self.events.emit(event).await {
            Ok(())
        } else {
            Err(ScanError::ControllerClosed)
        }
    }
}

/// Escalate if the event consumer dies; nothing found after that can be persisted
async fn supervise_consumer(consumer: JoinHandle<()>) {
    match consumer.await {
        Ok(()) => tracing::debug!("Event consumer finished"),
        Err(e) => {
            tracing::error!(
                "Event consumer terminated abnormally: {}, found wallets can no longer be persisted",
                e
            );
            sentry::capture_message(
                &format!("Scan event consumer terminated abnormally: {e}"),
                sentry::Level::Error,
            );
        }
    }
}

async fn consume_events(
    mut receiver: EventReceiver,
    store: Arc<FoundWalletStore>,
    stats: Arc<RwLock<ScanStats>>,
) {
    // Found wallets whose durable write failed even after a retry
    let mut pending: Vec<FoundWallet> = Vec::new();

    while let Some(message) = receiver.recv_message().await {
        match message {
            ControlMessage::Event(WorkerEvent::Attempt { count, .. }) => {
                stats.write().await.total_attempts += count;
            }
            ControlMessage::Event(WorkerEvent::Found {
                worker_id,
                candidate,
            }) => {
                let wallet = found_wallet(candidate);
                tracing::info!(
                    "FOUND WALLET WITH BALANCE: {} - {} sat (worker {:?})",
                    wallet.address(),
                    wallet.balance,
                    worker_id
                );
                {
                    let mut stats = stats.write().await;
                    stats.total_found += 1;
                    stats.cumulative_balance =
                        stats.cumulative_balance.saturating_add(wallet.balance);
                }
                pending.push(wallet);
                persist_pending(&store, &mut pending).await;
                stats.write().await.pending_writes = pending.len();
            }
            ControlMessage::Event(WorkerEvent::Error { worker_id, message }) => {
                stats.write().await.total_errors += 1;
                tracing::warn!("Scan error (worker {:?}): {}", worker_id, message);
            }
            ControlMessage::Flush(ack) => {
                if !pending.is_empty() {
                    persist_pending(&store, &mut pending).await;
                    stats.write().await.pending_writes = pending.len();
                }
                let _ = ack.send(());
            }
        }
    }

    for wallet in &pending {
        tracing::error!(
            "Found wallet was never persisted: {}",
            serde_json::to_string(wallet).unwrap_or_else(|_| wallet.address().to_string())
        );
    }
}

fn found_wallet(candidate: Candidate) -> FoundWallet {
    let Candidate {
        keypair,
        addresses,
        result,
    } = candidate;
    FoundWallet::new(keypair.to_record(addresses), result.balance)
}

/// Write pending wallets in discovery order, stopping at the first failure
async fn persist_pending(store: &FoundWalletStore, pending: &mut Vec<FoundWallet>) {
    while let Some(wallet) = pending.first().cloned() {
        let address = wallet.address().to_string();
        match append_with_retry(store, wallet).await {
            Ok(()) => {
                pending.remove(0);
            }
            Err(e) => {
                tracing::error!(
                    "Failed to persist found wallet {}: {} ({} pending)",
                    address,
                    e,
                    pending.len()
                );
                sentry::capture_message(
                    &format!("Failed to persist found wallet {address}: {e}"),
                    sentry::Level::Error,
                );
                break;
            }
        }
    }
}

async fn append_with_retry(store: &FoundWalletStore, wallet: FoundWallet) -> Result<(), StoreError> {
    match store.append(wallet.clone()).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::warn!("Failed to save found wallet {}: {}, retrying", wallet.address(), e);
            tokio::time::sleep(STORE_RETRY_DELAY).await;
            store.append(wallet).await
        }
    }
}
